use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Failure taxonomy shared by the invitation validator, the submission
/// controller and the registry calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    EmptyCode,
    TooShort,
    TooLong,
    ClientValidation,
    Network,
    Timeout,
    ServerRejected,
    MalformedResponse,
    InFlight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, deserialize_with = "crate::util::null_as_default")]
    pub reason: String,
}

impl ErrorDetail {
    pub fn reason(reason: impl Into<String>) -> Self {
        Self {
            field: None,
            reason: reason.into(),
        }
    }

    pub fn field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            reason: reason.into(),
        }
    }
}

/// Structured error in the backend's `{errorMessage, details, status}` shape.
///
/// Every failure that crosses a network boundary (or is caught before one) is
/// mapped into this type, so callers only ever see a finite set of kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{error_message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub error_message: String,
    pub details: Vec<ErrorDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, details: Vec<ErrorDetail>) -> Self {
        Self {
            kind,
            error_message: message.into(),
            details,
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn network() -> Self {
        Self::new(
            ErrorKind::Network,
            "Unable to connect to server. Please check your internet connection and try again.",
            vec![ErrorDetail::reason("Network error")],
        )
    }

    pub fn timeout() -> Self {
        Self::new(
            ErrorKind::Timeout,
            "Request timed out. Please check your connection and try again.",
            vec![ErrorDetail::reason("Request timeout")],
        )
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::MalformedResponse,
            "Invalid response from server",
            vec![ErrorDetail::reason(reason)],
        )
    }

    pub fn in_flight() -> Self {
        Self::new(
            ErrorKind::InFlight,
            "Your response is already being sent. Please wait a moment.",
            vec![ErrorDetail::reason("Submission in progress")],
        )
    }

    pub fn is_network(&self) -> bool {
        matches!(self.kind, ErrorKind::Network | ErrorKind::Timeout)
    }

    /// Message suitable for display. Server rejections are matched against a
    /// handful of known cases to produce friendlier copy; everything else is
    /// passed through.
    pub fn friendly_message(&self) -> String {
        if self.kind != ErrorKind::ServerRejected {
            return self.error_message.clone();
        }

        let mut haystack = self.error_message.to_lowercase();
        for detail in &self.details {
            haystack.push(' ');
            haystack.push_str(&detail.reason.to_lowercase());
        }

        let friendly = if haystack.contains("invalid invitation")
            || (haystack.contains("invalid") && haystack.contains("code"))
            || haystack.contains("not found")
        {
            "The invitation code is invalid. Please check your code and try again."
        } else if haystack.contains("expired") {
            "This invitation code has expired. Please contact us for assistance."
        } else if haystack.contains("already used") {
            "This invitation code has already been used."
        } else if haystack.contains("exceed") || haystack.contains("maximum") {
            "Your party is larger than this invitation allows. Please remove a guest and try again."
        } else if haystack.contains("email") {
            "Please provide a valid email address."
        } else if haystack.contains("plus one") {
            "Please provide your plus one's name."
        } else {
            return self.error_message.clone();
        };
        friendly.to_string()
    }
}

/// Errors raised by request handlers themselves, as opposed to backend
/// failures which are rendered inline.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    Session(#[from] tower_sessions::session::Error),

    #[error(transparent)]
    SessionStore(#[from] tower_sessions::session_store::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h1>Something went wrong</h1><p>Please try again in a moment.</p>"),
        )
            .into_response()
    }
}
