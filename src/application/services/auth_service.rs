//! Registration, login and the password-reset flows.
//!
//! All credential material is one-way hashed before it reaches storage:
//! passwords as Argon2id PHC strings, reset tokens as SHA-256 digests. The
//! notification sender is the only collaborator that ever sees a reset-token
//! plaintext, and only inside the reset link it is asked to deliver.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use tracing::{error, info};

use crate::auth;
use crate::config::AppConfig;
use crate::domain::entities::user::{PublicUser, User};
use crate::domain::errors::ApiError;
use crate::domain::repositories::notifier::ResetNotifier;
use crate::persistence::repository::UserRepository;

/// Minimum accepted password length, enforced at registration and reset.
const MIN_PASSWORD_LENGTH: usize = 6;

/// A freshly authenticated session: the signed bearer token plus the public
/// projection of its user.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: PublicUser,
}

pub struct AuthService {
    users: UserRepository,
    notifier: Arc<dyn ResetNotifier>,
    config: Arc<AppConfig>,
}

impl AuthService {
    pub fn new(
        users: UserRepository,
        notifier: Arc<dyn ResetNotifier>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            users,
            notifier,
            config,
        }
    }

    /// Create an account and open a session for it.
    ///
    /// Duplicate emails are rejected up front; the store's unique index backs
    /// this up against races.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("name must not be empty".to_string()));
        }
        let email = normalize_email(email)?;
        validate_password(password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ApiError::Validation("Email already registered".to_string()));
        }

        let user = User::new(name.to_string(), email, hash_password(password)?);
        self.users.create(&user).await?;
        info!("Registered user {}", user.id);

        self.open_session(&user)
    }

    /// Verify credentials and open a session.
    ///
    /// Unknown email and wrong password produce the same failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let email = normalize_email(email)?;
        let user: User = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(ApiError::InvalidCredentials)?
            .into();

        if !verify_password(password, &user.password_hash) {
            return Err(ApiError::InvalidCredentials);
        }
        self.open_session(&user)
    }

    /// Issue a reset token and hand the reset link to the notification
    /// sender.
    ///
    /// Only the token's digest and expiry are persisted. When the send fails
    /// (or times out) after the fields were written, they are cleared again
    /// so no pending reset state survives a failed issuance.
    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        let email = normalize_email(email)?;
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(ApiError::NotFound("User"))?;

        let (plaintext, digest) = auth::generate_reset_token();
        let expires = Utc::now() + Duration::minutes(self.config.reset_token_ttl_minutes);
        self.users.set_reset_token(&user.id, &digest, expires).await?;

        let reset_url = format!(
            "{}/reset-password/{}",
            self.config.frontend_url.trim_end_matches('/'),
            plaintext
        );
        let send = tokio::time::timeout(
            self.config.upstream_timeout,
            self.notifier.send_reset_link(&email, &reset_url),
        )
        .await;
        let failure = match send {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some("notification dispatch timed out".to_string()),
        };

        if let Some(reason) = failure {
            // The token was persisted before the send; undo it.
            if let Err(cleanup) = self.users.clear_reset_token(&user.id).await {
                error!(
                    "Failed to clear reset token after send failure for {}: {}",
                    user.id, cleanup
                );
            }
            return Err(ApiError::UpstreamUnavailable(reason));
        }

        info!("Password reset issued for user {}", user.id);
        Ok(())
    }

    /// Consume a reset token and set the new password in one store
    /// transaction. A second attempt with the same plaintext fails because
    /// the consuming statement already cleared the stored digest.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ApiError> {
        validate_password(new_password)?;
        let digest = auth::hash_reset_token(token);
        let password_hash = hash_password(new_password)?;

        let user_id = self
            .users
            .consume_reset_token(&digest, &password_hash, Utc::now())
            .await?
            .ok_or(ApiError::InvalidOrExpiredToken)?;

        info!("Password reset completed for user {}", user_id);
        Ok(())
    }

    fn open_session(&self, user: &User) -> Result<Session, ApiError> {
        let token = auth::create_session_token(
            &user.id,
            &self.config.jwt_secret,
            Duration::days(self.config.session_ttl_days),
        )?;
        Ok(Session {
            token,
            user: PublicUser::from(user),
        })
    }
}

fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation(
            "a valid email address is required".to_string(),
        ));
    }
    Ok(email)
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Hash a password into an Argon2id PHC string with a fresh salt.
pub(crate) fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a stored PHC string. An unparseable stored hash
/// verifies as false rather than erroring.
pub(crate) fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("hunter2secret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2secret", &hash));
        assert!(!verify_password("hunter2wrong", &hash));
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("hunter2secret").unwrap();
        let b = hash_password("hunter2secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn corrupt_stored_hash_verifies_false() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            normalize_email("  Alice@Example.COM ").unwrap(),
            "alice@example.com"
        );
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("   ").is_err());
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }
}
