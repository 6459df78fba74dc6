use crate::Database;
use crate::models::{ChatEntryRow, UserRow};
use anyhow::Result;
use chrono::SecondsFormat;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        email: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, email) VALUES (?1, ?2, ?3, ?4)",
                (id, username, password_hash, email),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Single UPDATE so concurrent logins cannot interleave code and expiry.
    pub fn set_verification_code(&self, user_id: &str, code: &str, expires_at: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET verification_code = ?1, verification_expires_at = ?2 WHERE id = ?3",
                (code, expires_at, user_id),
            )?;
            Ok(())
        })
    }

    pub fn clear_verification_code(&self, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET verification_code = NULL, verification_expires_at = NULL WHERE id = ?1",
                [user_id],
            )?;
            Ok(())
        })
    }

    // -- Chat history --

    /// Appends a ledger entry. The timestamp is assigned here, at write time,
    /// from the server clock; the caller never supplies it.
    pub fn insert_chat_entry(
        &self,
        id: &str,
        user_id: &str,
        message: &str,
        response: &str,
    ) -> Result<String> {
        // Fixed-width UTC format so timestamps sort lexicographically.
        let created_at = chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO chat_history (id, user_id, message, response, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, user_id, message, response, &created_at),
            )?;
            Ok(created_at)
        })
    }

    pub fn recent_chat_entries(&self, user_id: &str, limit: u32) -> Result<Vec<ChatEntryRow>> {
        self.with_conn(|conn| query_recent_entries(conn, user_id, limit))
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is always a literal from this module, never user input.
    let sql = format!(
        "SELECT id, username, password, email, verification_code, verification_expires_at, created_at
         FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                email: row.get(3)?,
                verification_code: row.get(4)?,
                verification_expires_at: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_recent_entries(conn: &Connection, user_id: &str, limit: u32) -> Result<Vec<ChatEntryRow>> {
    // rowid breaks ties between entries written within the same microsecond:
    // the table is append-only, so rowid order is insertion order.
    let mut stmt = conn.prepare(
        "SELECT id, user_id, message, response, created_at
         FROM chat_history
         WHERE user_id = ?1
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?2",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![user_id, limit], |row| {
            Ok(ChatEntryRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                message: row.get(2)?,
                response: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn db_with_user(username: &str, email: &str) -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        db.create_user(&id, username, "$argon2id$fake", email).unwrap();
        (db, id)
    }

    #[test]
    fn duplicate_username_rejected() {
        let (db, _) = db_with_user("alice", "a@x.com");
        let err = db
            .create_user("other-id", "alice", "$argon2id$fake", "b@x.com")
            .unwrap_err();
        assert!(crate::is_unique_violation(&err));
    }

    #[test]
    fn duplicate_email_rejected() {
        let (db, _) = db_with_user("alice", "a@x.com");
        let err = db
            .create_user("other-id", "bob", "$argon2id$fake", "a@x.com")
            .unwrap_err();
        assert!(crate::is_unique_violation(&err));
    }

    #[test]
    fn other_failures_are_not_unique_violations() {
        let (db, _) = db_with_user("alice", "a@x.com");
        // Foreign key failure: no such user.
        let err = db
            .insert_chat_entry("e1", "missing-user", "hi", "hello")
            .unwrap_err();
        assert!(!crate::is_unique_violation(&err));
    }

    #[test]
    fn verification_code_set_and_clear() {
        let (db, id) = db_with_user("alice", "a@x.com");

        assert!(db.get_user_by_id(&id).unwrap().unwrap().verification_code.is_none());

        db.set_verification_code(&id, "123456", "2099-01-01T00:00:00Z").unwrap();
        let user = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(user.verification_code.as_deref(), Some("123456"));
        assert_eq!(
            user.verification_expires_at.as_deref(),
            Some("2099-01-01T00:00:00Z")
        );

        db.clear_verification_code(&id).unwrap();
        let user = db.get_user_by_id(&id).unwrap().unwrap();
        assert!(user.verification_code.is_none());
        assert!(user.verification_expires_at.is_none());
    }

    #[test]
    fn lookup_by_username_and_email() {
        let (db, id) = db_with_user("alice", "a@x.com");
        assert_eq!(db.get_user_by_username("alice").unwrap().unwrap().id, id);
        assert_eq!(db.get_user_by_email("a@x.com").unwrap().unwrap().id, id);
        assert!(db.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn recent_entries_newest_first_with_limit() {
        let (db, id) = db_with_user("alice", "a@x.com");

        for i in 0..15 {
            let entry_id = uuid::Uuid::new_v4().to_string();
            db.insert_chat_entry(&entry_id, &id, &format!("q{}", i), &format!("a{}", i))
                .unwrap();
        }

        let entries = db.recent_chat_entries(&id, 10).unwrap();
        assert_eq!(entries.len(), 10);
        // Newest insertion comes back first even when timestamps collide.
        assert_eq!(entries[0].message, "q14");
        assert_eq!(entries[9].message, "q5");
        for pair in entries.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[test]
    fn history_is_per_user() {
        let (db, alice) = db_with_user("alice", "a@x.com");
        let bob = uuid::Uuid::new_v4().to_string();
        db.create_user(&bob, "bob", "$argon2id$fake", "b@x.com").unwrap();

        db.insert_chat_entry("e1", &alice, "hi", "hello").unwrap();
        db.insert_chat_entry("e2", &alice, "again", "yes").unwrap();

        assert_eq!(db.recent_chat_entries(&alice, 10).unwrap().len(), 2);
        assert!(db.recent_chat_entries(&bob, 10).unwrap().is_empty());
    }
}
