use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use parley_types::api::ErrorResponse;
use parley_upstream::UpstreamError;

/// Everything a handler can fail with. Each variant's display string is safe
/// to send to the client; internal detail goes to the log in `into_response`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{0} is already taken")]
    Conflict(&'static str),

    /// One message for unknown username and wrong password, so the response
    /// cannot be used to enumerate accounts.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("invalid or expired verification code")]
    InvalidCode,

    #[error("authentication required")]
    Unauthorized,

    #[error("service unavailable")]
    Dependency(#[from] UpstreamError),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InvalidCredentials | ApiError::InvalidCode | ApiError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Dependency(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A `spawn_blocking` task panicked or was cancelled.
pub(crate) fn join_error(e: tokio::task::JoinError) -> ApiError {
    ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Dependency(e) => warn!("upstream failure: {:?}", e),
            ApiError::Internal(e) => error!("internal error: {:#}", e),
            _ => {}
        }

        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
