//! Default reset notifier used when no mail transport is wired in.

use async_trait::async_trait;
use tracing::info;

use crate::domain::repositories::notifier::{NotifyError, ResetNotifier};

/// Records that a reset was dispatched without going anywhere. The reset URL
/// embeds the one-time token, so only the recipient address is logged.
pub struct LogNotifier;

#[async_trait]
impl ResetNotifier for LogNotifier {
    async fn send_reset_link(&self, email: &str, _reset_url: &str) -> Result<(), NotifyError> {
        info!("Password reset notification dispatched to {}", email);
        Ok(())
    }
}
