use axum::{
    Extension, Json,
    extract::{Query, State},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use parley_types::api::{ChatRequest, ChatResponse, HistoryEntry};

use crate::AppState;
use crate::error::{ApiError, join_error};
use crate::middleware::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    10
}

pub async fn chat(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::Validation("message must not be empty".into()));
    }

    let mut message = req.message;
    let mut extraction_error = None;

    if let Some(document) = &req.document {
        let bytes = B64
            .decode(document)
            .map_err(|_| ApiError::Validation("document is not valid base64".into()))?;

        // Extraction failure is not fatal: the chat goes through with the
        // original message and the error is reported back alongside it.
        match state.extractor.extract(bytes).await {
            Ok(text) if !text.trim().is_empty() => {
                message.push_str("\n\nExtracted document text:\n");
                message.push_str(text.trim());
            }
            Ok(_) => {}
            Err(e) => {
                warn!("document extraction failed for {}: {}", user.username, e);
                extraction_error = Some(e.to_string());
            }
        }
    }

    let response = state.responder.complete(&message).await?;

    // The ledger row is written only after the responder has fully answered,
    // so a timed-out upstream call never leaves a half-written entry.
    let db = state.clone();
    let entry_id = Uuid::new_v4().to_string();
    let uid = user.user_id.to_string();
    let (stored_message, stored_response) = (message, response.clone());
    tokio::task::spawn_blocking(move || {
        db.db
            .insert_chat_entry(&entry_id, &uid, &stored_message, &stored_response)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(ChatResponse {
        response,
        extraction_error,
    }))
}

pub async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let limit = query.limit.min(50);

    let db = state.clone();
    let uid = user.user_id.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.recent_chat_entries(&uid, limit))
        .await
        .map_err(join_error)??;

    let entries = rows
        .into_iter()
        .map(|row| {
            let timestamp = row
                .created_at
                .parse::<chrono::DateTime<Utc>>()
                .unwrap_or_else(|e| {
                    warn!("Corrupt created_at '{}' on entry '{}': {}", row.created_at, row.id, e);
                    chrono::DateTime::default()
                });
            HistoryEntry {
                message: row.message,
                response: row.response,
                timestamp,
            }
        })
        .collect();

    Ok(Json(entries))
}
