//! Outbound notification interface for the password-reset flow.
//!
//! Email delivery itself is out of scope; the reset flow only needs a
//! collaborator it can hand the one-time reset link to. The plaintext token
//! is embedded in that link and must never be persisted or logged by an
//! implementation.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("notification dispatch failed: {0}")]
    Dispatch(String),
}

/// Black-box sender for password-reset notifications.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    /// Deliver the reset link to `email`. The link embeds the one-time
    /// plaintext token; this call is the only place it leaves the service.
    async fn send_reset_link(&self, email: &str, reset_url: &str) -> Result<(), NotifyError>;
}
