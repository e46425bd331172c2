//! External quote source interface.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Failure modes of a quote provider call. All of them mean the upstream
/// response as a whole is unusable; a merely incomplete quote set is not an
/// error (see [`QuoteProvider::fetch_prices`]).
#[derive(Debug, Clone, Error)]
pub enum QuoteError {
    #[error("quote provider request failed: {0}")]
    Transport(String),

    #[error("quote provider returned status {0}")]
    Status(u16),

    #[error("quote provider response malformed: {0}")]
    Malformed(String),
}

/// External collaborator returning current market prices for a set of
/// symbols. Implementations live in `infrastructure`.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Name of this provider, for logging.
    fn name(&self) -> &str;

    /// Fetch current prices for the given upper-case symbols in a single
    /// batched call.
    ///
    /// The returned map is keyed by upper-case symbol. Symbols the provider
    /// cannot quote are simply absent from the map; partial coverage is a
    /// normal outcome, not an error. An `Err` means the call itself failed
    /// (transport, non-2xx, undecodable body) and no quote may be used.
    async fn fetch_prices(&self, symbols: &[String]) -> Result<HashMap<String, f64>, QuoteError>;
}
