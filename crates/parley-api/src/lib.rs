pub mod auth;
pub mod chat;
pub mod error;
pub mod middleware;
pub mod search;
pub mod session;
pub mod verification;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use chrono::Duration;

use parley_db::Database;
use parley_upstream::{DocumentExtractor, Mailer, Responder, SearchProvider};
use session::SessionStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub sessions: Arc<dyn SessionStore>,
    pub mailer: Arc<dyn Mailer>,
    pub responder: Arc<dyn Responder>,
    pub search: Arc<dyn SearchProvider>,
    pub extractor: Arc<dyn DocumentExtractor>,
    pub session_ttl: Duration,
    pub code_ttl: Duration,
}

/// Full application router. Auth routes are public (verify and logout do
/// their own token lookup since they accept pre-authenticated sessions);
/// everything else requires an authenticated session.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/verify", post(auth::verify))
        .route("/logout", post(auth::logout))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/chat", post(chat::chat))
        .route("/history", get(chat::history))
        .route("/search", get(search::search))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
