use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chaskibots_core::airtable::{ApiError, FormulaError};
use chaskibots_core::repository::RepositoryError;
use serde_json::json;
use tracing::{error, warn};

/// Handler error. Wraps whatever the core returned and picks the HTTP
/// status by looking at the underlying error type.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        let code = if let Some(err) = self.0.downcast_ref::<RepositoryError>() {
            match err {
                RepositoryError::Invalid(_) => 400,
                RepositoryError::InvalidAccessCode => 401,
                RepositoryError::NotFound(_) => 404,
                RepositoryError::Conflict(_) => 409,
            }
        } else if let Some(err) = self.0.downcast_ref::<ApiError>() {
            err.status_code()
        } else if self.0.downcast_ref::<FormulaError>().is_some() {
            400
        } else {
            500
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Message sent to the client. Unclassified failures are not echoed.
    fn message(&self) -> String {
        if let Some(err) = self.0.downcast_ref::<RepositoryError>() {
            err.to_string()
        } else if let Some(err) = self.0.downcast_ref::<ApiError>() {
            err.to_string()
        } else if let Some(err) = self.0.downcast_ref::<FormulaError>() {
            err.to_string()
        } else {
            "Internal server error".to_string()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %format!("{:#}", self.0), "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "Request rejected");
        }

        let body = json!({
            "success": false,
            "error": self.message(),
        });
        (status, Json(body)).into_response()
    }
}
