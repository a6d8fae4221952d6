//! Error types for credential acquisition.

use gameshelf_cache::CacheError;

/// Errors returned by the issuer and the credential manager.
///
/// Network failures and non-success HTTP statuses are distinct variants so
/// callers can tell an outage from a misconfiguration.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The issuer could not be reached (DNS, connect, TLS, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The issuer answered with a non-success status code.
    #[error("HTTP error: status {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The issuer's response body could not be interpreted.
    #[error("Malformed token response: {0}")]
    InvalidResponse(String),

    /// The issuer returned an empty access token.
    #[error("Token response contained an empty access token")]
    EmptyToken,

    /// The issuer client could not be built from configuration.
    #[error("Invalid issuer configuration: {0}")]
    InvalidConfig(String),

    /// Writing to or reading from a cache tier failed.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// The shared cancellation signal fired.
    #[error("Operation cancelled")]
    Cancelled,
}

impl CredentialError {
    /// Returns `true` for outages worth retrying soon: network failures,
    /// issuer 5xx/429, and cache tier failures.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Cache(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns `true` for errors that will not clear up without an
    /// operational fix (bad credentials, malformed responses).
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        !self.is_transient() && !matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CredentialError::Status {
            status: 401,
            body: "invalid_client".to_string(),
        };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("invalid_client"));
    }

    #[test]
    fn test_error_predicates() {
        assert!(CredentialError::Network("refused".into()).is_transient());
        assert!(
            CredentialError::Status {
                status: 503,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            CredentialError::Status {
                status: 400,
                body: String::new()
            }
            .is_permanent()
        );
        assert!(CredentialError::EmptyToken.is_permanent());
        assert!(CredentialError::InvalidResponse("x".into()).is_permanent());
        assert!(!CredentialError::Cancelled.is_transient());
        assert!(!CredentialError::Cancelled.is_permanent());
    }
}
