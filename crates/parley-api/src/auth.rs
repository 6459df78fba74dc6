use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use parley_db::models::UserRow;
use parley_types::api::{
    LoginRequest, RegisterRequest, RegisterResponse, SessionResponse, SessionStage, VerifyRequest,
};

use crate::AppState;
use crate::error::{ApiError, join_error};
use crate::middleware::bearer_token;
use crate::session::{self, Session};
use crate::verification;

/// Wrong codes allowed on one session before it is revoked.
const MAX_VERIFY_ATTEMPTS: u32 = 5;

const MAIL_SUBJECT: &str = "Your Verification Code";

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::Validation(
            "username must be 3-32 characters".into(),
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    if !req.email.contains('@') || req.email.len() > 254 {
        return Err(ApiError::Validation("email address is not valid".into()));
    }

    // Check for duplicates before hashing; the UNIQUE constraints still back
    // this up against races.
    let db = state.clone();
    let (username, email) = (req.username.clone(), req.email.clone());
    let lookups: anyhow::Result<(Option<UserRow>, Option<UserRow>)> =
        tokio::task::spawn_blocking(move || {
            Ok((
                db.db.get_user_by_username(&username)?,
                db.db.get_user_by_email(&email)?,
            ))
        })
        .await
        .map_err(join_error)?;
    let (by_name, by_email) = lookups?;

    if by_name.is_some() {
        return Err(ApiError::Conflict("username"));
    }
    if by_email.is_some() {
        return Err(ApiError::Conflict("email"));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
        .to_string();

    let user_id = Uuid::new_v4();
    let db = state.clone();
    let (id, username, email) = (user_id.to_string(), req.username.clone(), req.email.clone());
    tokio::task::spawn_blocking(move || db.db.create_user(&id, &username, &password_hash, &email))
        .await
        .map_err(join_error)?
        .map_err(|e| {
            // A concurrent registration can slip past the pre-check and land
            // on the UNIQUE constraint instead.
            if parley_db::is_unique_violation(&e) {
                ApiError::Conflict("username or email")
            } else {
                ApiError::Internal(e)
            }
        })?;

    info!("registered user {}", req.username);
    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let db = state.clone();
    let username = req.username.clone();
    let user = tokio::task::spawn_blocking(move || db.db.get_user_by_username(&username))
        .await
        .map_err(join_error)??;

    let Some(user) = user else {
        // Burn the same work as a real check so response timing does not
        // reveal whether the username exists.
        equalize_timing(&req.password);
        return Err(ApiError::InvalidCredentials);
    };

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unparseable: {}", e)))?;

    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(ApiError::InvalidCredentials);
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id '{}': {}", user.id, e)))?;

    // Issue a fresh code; any prior unredeemed code is overwritten.
    let code = verification::generate_code();
    let expires_at = (Utc::now() + state.code_ttl).to_rfc3339();
    let db = state.clone();
    let (uid, stored_code, stored_exp) = (user.id.clone(), code.clone(), expires_at);
    tokio::task::spawn_blocking(move || {
        db.db.set_verification_code(&uid, &stored_code, &stored_exp)
    })
    .await
    .map_err(join_error)??;

    let body = format!("Your verification code is {}", code);
    if let Err(e) = state.mailer.send(&user.email, MAIL_SUBJECT, &body).await {
        error!("verification mail for {} not accepted: {}", user.username, e);
        return Err(ApiError::Dependency(e));
    }

    let token = session::generate_token();
    state
        .sessions
        .put(
            &token,
            Session::pending(user_id, user.username.clone(), Utc::now() + state.session_ttl),
        )
        .await;

    info!("credentials verified for {}, code issued", user.username);
    Ok(Json(SessionResponse {
        token,
        username: user.username,
        stage: SessionStage::PendingVerification,
    }))
}

pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or(ApiError::Unauthorized)?
        .to_string();
    let mut session = state
        .sessions
        .get(&token)
        .await
        .ok_or(ApiError::Unauthorized)?;
    if session.stage != SessionStage::PendingVerification {
        return Err(ApiError::Unauthorized);
    }

    let db = state.clone();
    let uid = session.user_id.to_string();
    let user = tokio::task::spawn_blocking(move || db.db.get_user_by_id(&uid))
        .await
        .map_err(join_error)??
        .ok_or(ApiError::Unauthorized)?;

    let ok = verification::code_is_valid(
        user.verification_code.as_deref(),
        user.verification_expires_at.as_deref(),
        &req.code,
        Utc::now(),
    );

    if !ok {
        session.verify_attempts += 1;
        if session.verify_attempts >= MAX_VERIFY_ATTEMPTS {
            warn!(
                "verification attempt limit reached for {}, session revoked",
                session.username
            );
            state.sessions.remove(&token).await;
        } else {
            state.sessions.put(&token, session).await;
        }
        return Err(ApiError::InvalidCode);
    }

    // Single-use: the code is gone before the session is promoted.
    let db = state.clone();
    let uid = user.id.clone();
    tokio::task::spawn_blocking(move || db.db.clear_verification_code(&uid))
        .await
        .map_err(join_error)??;

    session.stage = SessionStage::Authenticated;
    session.verify_attempts = 0;
    let username = session.username.clone();
    state.sessions.put(&token, session).await;

    info!("user {} authenticated", username);
    Ok(Json(SessionResponse {
        token,
        username,
        stage: SessionStage::Authenticated,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError::Unauthorized)?;
    // Unknown or expired tokens have nothing to log out of.
    state
        .sessions
        .get(token)
        .await
        .ok_or(ApiError::Unauthorized)?;
    state.sessions.remove(token).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Runs one Argon2id hashing round and discards it, to keep the
/// unknown-username path as slow as the wrong-password path.
fn equalize_timing(password: &str) {
    let salt = SaltString::generate(&mut OsRng);
    let _ = Argon2::default().hash_password(password.as_bytes(), &salt);
}
