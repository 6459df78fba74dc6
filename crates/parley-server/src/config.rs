use std::time::Duration;

use anyhow::{Context, Result};

/// All runtime configuration, read once at startup. Holds secrets, so no
/// Debug derive.
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,

    pub session_ttl: chrono::Duration,
    pub code_ttl: chrono::Duration,
    pub upstream_timeout: Duration,

    pub mail_endpoint: String,
    pub mail_token: String,
    pub mail_from: String,

    pub ai_endpoint: String,
    pub ai_api_key: String,
    pub ai_model: String,

    pub search_endpoint: String,
    pub search_api_key: String,

    pub extractor_endpoint: String,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn required(name: &'static str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{} must be set", name))
}

fn secs(name: &str, default: i64) -> Result<i64> {
    match std::env::var(name) {
        Ok(v) => v.parse().with_context(|| format!("{} is not a number", name)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: var_or("PARLEY_HOST", "0.0.0.0"),
            port: var_or("PARLEY_PORT", "3000").parse().context("PARLEY_PORT is not a port number")?,
            db_path: var_or("PARLEY_DB_PATH", "parley.db"),

            // Sessions last a day; codes last ten minutes.
            session_ttl: chrono::Duration::seconds(secs("PARLEY_SESSION_TTL_SECS", 86_400)?),
            code_ttl: chrono::Duration::seconds(secs("PARLEY_CODE_TTL_SECS", 600)?),
            upstream_timeout: Duration::from_secs(
                secs("PARLEY_UPSTREAM_TIMEOUT_SECS", 30)?.max(1) as u64,
            ),

            mail_endpoint: var_or("PARLEY_MAIL_ENDPOINT", "https://api.postmarkapp.com/email"),
            mail_token: required("PARLEY_MAIL_TOKEN")?,
            mail_from: var_or("PARLEY_MAIL_FROM", "noreply@example.com"),

            ai_endpoint: var_or(
                "PARLEY_AI_ENDPOINT",
                "https://api.openai.com/v1/chat/completions",
            ),
            ai_api_key: required("PARLEY_AI_API_KEY")?,
            ai_model: var_or("PARLEY_AI_MODEL", "gpt-4o-mini"),

            search_endpoint: var_or("PARLEY_SEARCH_ENDPOINT", "https://serpapi.com/search"),
            search_api_key: required("PARLEY_SEARCH_API_KEY")?,

            extractor_endpoint: var_or("PARLEY_EXTRACTOR_ENDPOINT", "http://127.0.0.1:9998/tika"),
        })
    }
}
