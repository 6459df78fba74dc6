use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use parley_types::api::SessionStage;

use crate::AppState;
use crate::error::ApiError;

/// Identity of the caller, injected as a request extension by `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub username: String,
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Gate for chat/history/search: the session must exist, be unexpired, and
/// have passed verification. A pending session token is not enough.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or(ApiError::Unauthorized)?
        .to_string();

    let session = state
        .sessions
        .get(&token)
        .await
        .ok_or(ApiError::Unauthorized)?;

    if session.stage != SessionStage::Authenticated {
        return Err(ApiError::Unauthorized);
    }

    req.extensions_mut().insert(CurrentUser {
        user_id: session.user_id,
        username: session.username,
    });
    Ok(next.run(req).await)
}
