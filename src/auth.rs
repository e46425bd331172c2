//! Bearer-credential primitives and the session middleware.
//!
//! Two kinds of artifact are produced here: signed, time-limited session
//! tokens (HS256) and random one-time reset tokens of which only the SHA-256
//! digest is ever stored. Signature and expiry failures stay distinct inside
//! this module; the middleware collapses them into a single `Unauthorized`
//! at the boundary so callers cannot probe which check failed.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

use crate::application::AppState;
use crate::domain::errors::ApiError;

/// Claims carried by a session token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Owning user id.
    sub: String,
    /// Expiry, seconds since epoch.
    exp: usize,
}

/// Session-token verification failure. Kept distinct internally; never
/// exposed past the middleware.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionTokenError {
    #[error("session token expired")]
    Expired,
    #[error("session token signature invalid")]
    InvalidSignature,
}

/// Sign a session token for `user_id` expiring after `ttl`.
pub fn create_session_token(
    user_id: &str,
    secret: &str,
    ttl: Duration,
) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + ttl).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to sign session token: {}", e)))
}

/// Verify a session token and return the user id it names.
pub fn verify_session_token(token: &str, secret: &str) -> Result<String, SessionTokenError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => SessionTokenError::Expired,
        _ => SessionTokenError::InvalidSignature,
    })?;
    Ok(data.claims.sub)
}

/// Generate a reset token: 32 random bytes, hex-encoded.
///
/// Returns `(plaintext, digest)`. Only the digest may be persisted; the
/// plaintext is handed out once and never logged.
pub fn generate_reset_token() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let plaintext = hex::encode(bytes);
    let digest = hash_reset_token(&plaintext);
    (plaintext, digest)
}

/// One-way hash used to match a supplied reset token against storage.
pub fn hash_reset_token(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

/// Identity resolved by the session middleware, available to handlers as a
/// request extension.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Middleware guarding every portfolio route: extract the bearer token,
/// verify it, and confirm the referenced user still exists. A deleted
/// user's still-valid token must not authorize anything.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request).ok_or(ApiError::Unauthorized)?;

    let user_id =
        verify_session_token(token, &state.config.jwt_secret).map_err(|e| {
            warn!("Rejected session token: {}", e);
            ApiError::Unauthorized
        })?;

    let user = state
        .users
        .find_by_id(&user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        name: user.name,
        email: user.email,
    });
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
