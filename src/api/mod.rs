use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ApiError, ErrorDetail, ErrorKind};
use crate::rsvp::{ExistingRsvp, Invitation};

pub mod invitation;
pub mod registry;
pub mod rsvp;

use registry::{Donation, DonationPayload, RegistryOverview};
use rsvp::RsvpPayload;

/// Characters escaped when a value is placed in a URL path segment.
pub(crate) const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

/// The external wedding backend. `ApiClient` talks to it over HTTP; tests
/// substitute in-memory implementations.
#[async_trait]
pub trait WeddingBackend: Send + Sync {
    async fn validate_invitation(&self, code: &str) -> Result<Invitation, ApiError>;

    async fn submit_rsvp(&self, payload: &RsvpPayload) -> Result<ExistingRsvp, ApiError>;

    async fn registry_overview(&self) -> Result<RegistryOverview, ApiError>;

    async fn recent_donations(&self) -> Result<Vec<Donation>, ApiError>;

    async fn submit_donation(&self, payload: &DonationPayload) -> Result<Donation, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

/// Error body as sent by the backend. Every field is optional because not
/// every failing endpoint uses the standard shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireError {
    error_message: Option<String>,
    message: Option<String>,
    error: Option<String>,
    details: Option<Vec<ErrorDetail>>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.http.get(format!("{}{}", self.base_url, path));
        self.send(Method::GET, path, request).await
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        self.send(Method::POST, path, request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|e| transport_error(&method, path, e))?;
        let status = response.status();
        debug!("{} {} -> {}", method, path, status);

        if !status.is_success() {
            let err = error_from_response(response).await;
            warn!("{} {} rejected: {}", method, path, err);
            return Err(err);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&method, path, e))?;
        serde_json::from_slice(&body).map_err(|e| {
            warn!("{} {} returned an unexpected body: {}", method, path, e);
            ApiError::malformed(e.to_string())
        })
    }
}

fn transport_error(method: &Method, path: &str, err: reqwest::Error) -> ApiError {
    warn!("{} {} failed: {}", method, path, err);
    if err.is_timeout() {
        ApiError::timeout()
    } else {
        ApiError::network()
    }
}

async fn error_from_response(response: reqwest::Response) -> ApiError {
    let status = response.status();
    let fallback = format!(
        "HTTP {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status")
    );

    let wire = match response.bytes().await {
        Ok(body) => serde_json::from_slice::<WireError>(&body).ok(),
        Err(_) => None,
    };

    let (message, details) = match wire {
        Some(wire) => {
            let message = wire.error_message.or(wire.message).unwrap_or(fallback);
            let details = wire.details.unwrap_or_else(|| {
                vec![ErrorDetail::reason(
                    wire.error.unwrap_or_else(|| "Server error".into()),
                )]
            });
            (message, details)
        }
        None => (fallback, vec![ErrorDetail::reason("Server error")]),
    };

    ApiError::new(ErrorKind::ServerRejected, message, details).with_status(status.as_u16())
}

#[async_trait]
impl WeddingBackend for ApiClient {
    async fn validate_invitation(&self, code: &str) -> Result<Invitation, ApiError> {
        self.fetch_invitation(code).await
    }

    async fn submit_rsvp(&self, payload: &RsvpPayload) -> Result<ExistingRsvp, ApiError> {
        self.post_rsvp(payload).await
    }

    async fn registry_overview(&self) -> Result<RegistryOverview, ApiError> {
        self.fetch_registry_overview().await
    }

    async fn recent_donations(&self) -> Result<Vec<Donation>, ApiError> {
        self.fetch_recent_donations().await
    }

    async fn submit_donation(&self, payload: &DonationPayload) -> Result<Donation, ApiError> {
        self.post_donation(payload).await
    }
}
