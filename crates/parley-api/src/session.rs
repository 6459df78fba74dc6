use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::{DateTime, Utc};
use rand::RngCore;
use uuid::Uuid;

use parley_types::api::SessionStage;

/// Server-side session record. The client only ever holds the opaque token
/// that keys it; absence of a record is the anonymous state.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub username: String,
    pub stage: SessionStage,
    /// Wrong verification codes submitted on this session so far.
    pub verify_attempts: u32,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn pending(user_id: Uuid, username: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            username,
            stage: SessionStage::PendingVerification,
            verify_attempts: 0,
            expires_at,
        }
    }
}

/// 256-bit random token, base64url. Opaque: carries no claims, so a token is
/// worthless without the server-side record.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    B64.encode(bytes)
}

/// Pluggable session backend. The in-memory store covers a single instance;
/// a multi-instance deployment would put an external cache behind this trait.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts or replaces the record for `token`.
    async fn put(&self, token: &str, session: Session);
    /// Returns the live record for `token`; expired records count as absent.
    async fn get(&self, token: &str) -> Option<Session>;
    async fn remove(&self, token: &str);
}

pub struct MemoryStore {
    inner: Mutex<HashMap<String, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn put(&self, token: &str, session: Session) {
        let mut map = self.inner.lock().expect("session store lock poisoned");
        // Reap expired records here, so abandoned pending sessions do not
        // pile up waiting for their exact token to be queried again.
        let now = Utc::now();
        map.retain(|_, s| s.expires_at > now);
        map.insert(token.to_string(), session);
    }

    async fn get(&self, token: &str) -> Option<Session> {
        let mut map = self.inner.lock().expect("session store lock poisoned");
        if let Some(s) = map.get(token) {
            if s.expires_at > Utc::now() {
                return Some(s.clone());
            }
        }
        // Expired (or never existed): drop any stale record.
        map.remove(token);
        None
    }

    async fn remove(&self, token: &str) {
        let mut map = self.inner.lock().expect("session store lock poisoned");
        map.remove(token);
    }
}
