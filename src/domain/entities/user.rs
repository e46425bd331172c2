use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A registered account. Owns zero or more portfolios.
///
/// The password is stored only as an Argon2id PHC hash. The reset-token pair
/// (`reset_token_hash`, `reset_token_expires`) is populated by the
/// forgot-password flow and cleared when the token is consumed or when
/// issuance fails after the fields were written.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub reset_token_hash: Option<String>,
    pub reset_token_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        User {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash,
            reset_token_hash: None,
            reset_token_expires: None,
            created_at: Utc::now(),
        }
    }
}

/// The caller-visible projection of a user. Never carries hashes or
/// reset-token state.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}
