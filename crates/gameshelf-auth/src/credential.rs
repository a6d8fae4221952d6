//! Issued credential and the issuer's wire format.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::CredentialError;

/// Token endpoint response body.
///
/// Accepts both `accessToken`/`expiresIn` and the RFC 6749
/// `access_token`/`expires_in` spellings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(alias = "access_token")]
    pub access_token: String,

    #[serde(alias = "token_type", default = "default_token_type")]
    pub token_type: String,

    /// Lifetime in seconds.
    #[serde(alias = "expires_in")]
    pub expires_in: i64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"***")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// An access token valid until `expires_at`.
///
/// Never mutated; a refresh produces a new value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: OffsetDateTime,
}

impl Credential {
    /// Convert a token response into a credential, turning the relative
    /// `expires_in` into an absolute deadline from `issued_at`.
    pub fn from_response(
        response: TokenResponse,
        issued_at: OffsetDateTime,
    ) -> Result<Self, CredentialError> {
        if response.access_token.trim().is_empty() {
            return Err(CredentialError::EmptyToken);
        }
        if response.expires_in <= 0 {
            return Err(CredentialError::InvalidResponse(format!(
                "expires_in must be positive, got {}",
                response.expires_in
            )));
        }
        let expires_at = issued_at
            .checked_add(time::Duration::seconds(response.expires_in))
            .ok_or_else(|| {
                CredentialError::InvalidResponse(format!(
                    "expires_in {} is beyond the representable date range",
                    response.expires_in
                ))
            })?;
        Ok(Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_at,
        })
    }

    /// Time left before expiry; zero once expired.
    pub fn remaining(&self) -> Duration {
        let left = self.expires_at - OffsetDateTime::now_utc();
        if left.is_positive() {
            left.unsigned_abs()
        } else {
            Duration::ZERO
        }
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"***")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
