//! Error taxonomy for the portfolio service.
//!
//! Every component-level failure surfaces as a typed `ApiError` through the
//! application services; the HTTP boundary maps each variant to exactly one
//! status/message pair. `Unauthorized`, `Forbidden` and `NotFound` are kept
//! distinct because they carry different client remediation (re-login vs.
//! no-permission vs. wrong-resource).

use thiserror::Error;

use crate::domain::repositories::quote_provider::QuoteError;
use crate::persistence::DatabaseError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or out-of-range request field. Never retried.
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired session token, or a token whose user no
    /// longer exists. Signature and expiry failures are collapsed into this
    /// single variant at the boundary to avoid an oracle.
    #[error("Not authorized to access this route")]
    Unauthorized,

    /// Login failure. Unknown email and wrong password are the same error.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Valid caller, wrong resource owner. Never leaks whether the resource
    /// exists under another owner.
    #[error("Not authorized to access this resource")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Reset-token consumption failure. Deliberately generic: token-not-found
    /// and token-expired are not distinguished, to prevent enumeration.
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    /// Quote provider or notification sender failure. Nothing was written;
    /// the caller may safely retry the whole operation.
    #[error("Upstream service unavailable")]
    UpstreamUnavailable(String),

    /// Any unexpected failure. The detail is logged server-side only.
    #[error("Internal server error")]
    Internal(String),
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<QuoteError> for ApiError {
    fn from(e: QuoteError) -> Self {
        ApiError::UpstreamUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_display_hides_detail() {
        let err = ApiError::Internal("sqlite disk full".to_string());
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn upstream_display_hides_detail() {
        let err = ApiError::UpstreamUnavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "Upstream service unavailable");
    }

    #[test]
    fn reset_token_failure_is_generic() {
        assert_eq!(
            ApiError::InvalidOrExpiredToken.to_string(),
            "Invalid or expired token"
        );
    }
}
