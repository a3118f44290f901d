use thiserror::Error;

/// Longest slice of a response body kept in an error message
const BODY_PREVIEW_BYTES: usize = 500;

/// Failures talking to the identity service.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The service answered with `success: false`
    #[error("{0}")]
    Rejected(String),

    #[error("Email or password is incorrect, or the session has ended")]
    Unauthorized,

    #[error("Not allowed for this account: {0}")]
    Forbidden(String),

    #[error("Request was not accepted: {0}")]
    BadRequest(String),

    #[error("Identity service endpoint missing: {0}")]
    NotFound(String),

    #[error("Identity service failed: {0}")]
    ServerError(String),

    #[error("Unexpected identity service response: {0}")]
    InvalidResponse(String),

    #[error("Could not reach the identity service: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl ApiError {
    /// Map a non-success status and its body onto an error.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let preview = body_preview(body);
        match status.as_u16() {
            400 | 409 | 422 => ApiError::BadRequest(preview),
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden(preview),
            404 => ApiError::NotFound(preview),
            500..=599 => ApiError::ServerError(preview),
            _ => ApiError::InvalidResponse(format!("HTTP {}: {}", status, preview)),
        }
    }
}

fn body_preview(body: &str) -> String {
    if body.len() <= BODY_PREVIEW_BYTES {
        return body.to_string();
    }
    let mut cut = BODY_PREVIEW_BYTES;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... ({} bytes in full)", &body[..cut], body.len())
}
