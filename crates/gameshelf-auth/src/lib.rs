//! External credential lifecycle.
//!
//! - [`Credential`] - an issued access token with its absolute expiry
//! - [`TokenIssuer`] / [`HttpTokenIssuer`] - client-credentials grant against
//!   the configured token endpoint
//! - [`CredentialManager`] - local tier → remote tier → issuer fallback chain

pub mod credential;
pub mod error;
pub mod issuer;
pub mod manager;

pub use credential::{Credential, TokenResponse};
pub use error::CredentialError;
pub use issuer::{HttpTokenIssuer, TokenIssuer};
pub use manager::CredentialManager;
