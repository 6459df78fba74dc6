use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

/// Authenticated proxy to the external search provider. The provider's
/// structured result passes through untouched; the API key never leaves the
/// server side.
pub async fn search(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if params.query.trim().is_empty() {
        return Err(ApiError::Validation("query must not be empty".into()));
    }

    let results = state.search.search(&params.query).await?;
    Ok(Json(results))
}
