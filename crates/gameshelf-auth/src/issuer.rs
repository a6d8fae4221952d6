//! Token endpoint client.

use async_trait::async_trait;
use gameshelf_config::CredentialsConfig;
use time::OffsetDateTime;

use crate::credential::{Credential, TokenResponse};
use crate::error::CredentialError;

/// Longest slice of an error body kept in [`CredentialError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Source of fresh credentials.
///
/// Implementations make exactly one attempt per call; retry policy belongs
/// to the caller.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self) -> Result<Credential, CredentialError>;
}

/// Client-credentials grant over HTTP(S).
pub struct HttpTokenIssuer {
    http_client: reqwest::Client,
    issuer_url: String,
    client_id: String,
    client_secret: String,
    scope: Option<String>,
}

impl HttpTokenIssuer {
    /// Build an issuer from configuration. The configured request timeout
    /// bounds every call.
    pub fn new(config: &CredentialsConfig) -> Result<Self, CredentialError> {
        if !config.is_configured() {
            return Err(CredentialError::InvalidConfig(
                "credentials.issuer_url is empty".to_string(),
            ));
        }
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CredentialError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            http_client,
            issuer_url: config.issuer_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
        })
    }
}

#[async_trait]
impl TokenIssuer for HttpTokenIssuer {
    async fn issue(&self) -> Result<Credential, CredentialError> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if let Some(scope) = self.scope.as_deref() {
            form.push(("scope", scope));
        }

        tracing::debug!(issuer = %self.issuer_url, "Requesting credential from issuer");

        let response = self
            .http_client
            .post(&self.issuer_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(issuer = %self.issuer_url, error = %e, "Issuer request failed");
                CredentialError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(
                body.char_indices()
                    .nth(MAX_ERROR_BODY)
                    .map_or(body.len(), |(i, _)| i),
            );
            tracing::warn!(
                issuer = %self.issuer_url,
                status = status.as_u16(),
                "Issuer rejected credential request"
            );
            return Err(CredentialError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let issued_at = OffsetDateTime::now_utc();
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::InvalidResponse(e.to_string()))?;

        let credential = Credential::from_response(token, issued_at)?;
        tracing::info!(
            issuer = %self.issuer_url,
            expires_at = %credential.expires_at,
            "Credential issued"
        );
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_issuer_is_rejected() {
        let result = HttpTokenIssuer::new(&CredentialsConfig::default());
        assert!(matches!(result, Err(CredentialError::InvalidConfig(_))));
    }
}
