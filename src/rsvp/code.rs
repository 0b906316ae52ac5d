use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ApiError, ErrorDetail, ErrorKind};

pub const MIN_CODE_LEN: usize = 3;
pub const MAX_CODE_LEN: usize = 20;

lazy_static! {
    static ref DISALLOWED_CODE_CHARS: Regex = Regex::new(r"[^A-Z0-9-]").unwrap();
}

/// Trims, uppercases and strips everything outside `[A-Z0-9-]`.
pub fn normalize(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    DISALLOWED_CODE_CHARS.replace_all(&upper, "").into_owned()
}

/// Normalizes and checks the length bounds, without touching the network.
pub fn parse(raw: &str) -> Result<String, ApiError> {
    let code = normalize(raw);
    let len = code.chars().count();

    if code.is_empty() {
        return Err(client_error(ErrorKind::EmptyCode, "Invitation code is required"));
    }
    if len < MIN_CODE_LEN {
        return Err(client_error(
            ErrorKind::TooShort,
            "Please enter a valid invitation code",
        ));
    }
    if len > MAX_CODE_LEN {
        return Err(client_error(
            ErrorKind::TooLong,
            "Please enter a valid invitation code",
        ));
    }
    Ok(code)
}

fn client_error(kind: ErrorKind, message: &str) -> ApiError {
    ApiError::new(
        kind,
        message,
        vec![ErrorDetail::field("invitationCode", message)],
    )
}
