use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - check the Airtable API key")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Airtable is receiving too many requests. Please wait a few seconds and try again.")]
    RateLimited,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Airtable reports errors either as `{"error": {"type", "message"}}`
/// or as a bare `{"error": "NOT_FOUND"}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        message: Option<String>,
    },
    Code(String),
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the diagnostic text out of an Airtable error body, falling back
    /// to the (truncated) raw body.
    pub fn diagnostic(body: &str) -> String {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(ErrorEnvelope {
                error: ErrorBody::Detailed { kind, message: Some(message) },
            }) => format!("{}: {}", kind, message),
            Ok(ErrorEnvelope {
                error: ErrorBody::Detailed { kind, message: None },
            }) => kind,
            Ok(ErrorEnvelope {
                error: ErrorBody::Code(code),
            }) => code,
            Err(_) => Self::truncate_body(body),
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let diagnostic = Self::diagnostic(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(diagnostic),
            404 => ApiError::NotFound(diagnostic),
            429 => ApiError::RateLimited,
            400 | 422 => ApiError::InvalidRequest(diagnostic),
            500..=599 => ApiError::ServerError(diagnostic),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, diagnostic)),
        }
    }

    /// HTTP status this error should be reported with by the API layer.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::AccessDenied(_) => 403,
            ApiError::Unauthorized => 502,
            ApiError::NotFound(_) => 404,
            ApiError::RateLimited => 429,
            ApiError::InvalidRequest(_) => 422,
            ApiError::ServerError(_)
            | ApiError::NetworkError(_)
            | ApiError::InvalidResponse(_) => 502,
        }
    }
}
