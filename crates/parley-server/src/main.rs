mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use parley_api::{AppState, AppStateInner};
use parley_api::session::MemoryStore;
use parley_upstream::{HttpExtractor, HttpMailer, HttpResponder, HttpSearch};

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = parley_db::Database::open(&PathBuf::from(&config.db_path))?;

    // External collaborators share one timeout-bounded HTTP client.
    let client = parley_upstream::http_client(config.upstream_timeout)?;
    let mailer = HttpMailer::new(
        client.clone(),
        config.mail_endpoint.clone(),
        config.mail_token.clone(),
        config.mail_from.clone(),
    );
    let responder = HttpResponder::new(
        client.clone(),
        config.ai_endpoint.clone(),
        config.ai_api_key.clone(),
        config.ai_model.clone(),
    );
    let search = HttpSearch::new(
        client.clone(),
        config.search_endpoint.clone(),
        config.search_api_key.clone(),
    );
    let extractor = HttpExtractor::new(client, config.extractor_endpoint.clone());

    let state: AppState = Arc::new(AppStateInner {
        db,
        sessions: Arc::new(MemoryStore::new()),
        mailer: Arc::new(mailer),
        responder: Arc::new(responder),
        search: Arc::new(search),
        extractor: Arc::new(extractor),
        session_ttl: config.session_ttl,
        code_ttl: config.code_ttl,
    });

    let app = parley_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Parley server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
