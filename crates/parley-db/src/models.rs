/// Database row types — these map directly to SQLite rows.
/// Distinct from parley-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub email: String,
    pub verification_code: Option<String>,
    pub verification_expires_at: Option<String>,
    pub created_at: String,
}

pub struct ChatEntryRow {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub response: String,
    pub created_at: String,
}
