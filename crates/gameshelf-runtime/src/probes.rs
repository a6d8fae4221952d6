//! Startup gates for the external credential.
//!
//! Order matters: reaching the network comes first, then the remote cache,
//! then issuing the credential, then storing it. Each stage is pointless
//! while the previous one is failing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gameshelf_auth::{Credential, CredentialManager};
use gameshelf_cache::MultiTierCache;
use gameshelf_config::BootstrapConfig;
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bootstrap::{BootstrapPipeline, millis};
use crate::gate::{ReadinessGate, ReadinessProbe};

/// Opens a short-lived TCP connection to a well-known host.
pub struct NetworkProbe {
    addr: String,
    timeout: Duration,
}

impl NetworkProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ReadinessProbe for NetworkProbe {
    async fn probe(&self, _cancel: &CancellationToken) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                warn!(addr = %self.addr, error = %e, "Network probe failed");
                false
            }
            Err(_) => {
                warn!(
                    addr = %self.addr,
                    timeout_ms = millis(self.timeout),
                    "Network probe timed out"
                );
                false
            }
        }
    }
}

/// Pings the remote tier; passes once it reports ready.
pub struct RemoteCacheProbe {
    cache: Arc<MultiTierCache>,
}

impl RemoteCacheProbe {
    pub fn new(cache: Arc<MultiTierCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ReadinessProbe for RemoteCacheProbe {
    async fn probe(&self, _cancel: &CancellationToken) -> bool {
        self.cache.ping_remote().await
    }
}

/// Hand-off between the acquire and persist gates.
#[derive(Clone, Default)]
pub struct CredentialSlot(Arc<Mutex<Option<Credential>>>);

impl CredentialSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, credential: Credential) {
        *self.0.lock() = Some(credential);
    }

    pub fn get(&self) -> Option<Credential> {
        self.0.lock().clone()
    }
}

/// Issues a credential straight from the issuer, bypassing both tiers.
pub struct CredentialAcquireProbe {
    manager: Arc<CredentialManager>,
    slot: CredentialSlot,
}

impl CredentialAcquireProbe {
    pub fn new(manager: Arc<CredentialManager>, slot: CredentialSlot) -> Self {
        Self { manager, slot }
    }
}

#[async_trait]
impl ReadinessProbe for CredentialAcquireProbe {
    async fn probe(&self, cancel: &CancellationToken) -> bool {
        match self.manager.issue_fresh(cancel).await {
            Ok(credential) => {
                debug!(expires_at = %credential.expires_at, "Bootstrap credential acquired");
                self.slot.store(credential);
                true
            }
            Err(e) => {
                // permanent errors are retried on the same cadence
                warn!(
                    error = %e,
                    transient = e.is_transient(),
                    "Credential acquisition failed"
                );
                false
            }
        }
    }
}

/// Writes the acquired credential into both cache tiers.
pub struct CredentialPersistProbe {
    manager: Arc<CredentialManager>,
    slot: CredentialSlot,
}

impl CredentialPersistProbe {
    pub fn new(manager: Arc<CredentialManager>, slot: CredentialSlot) -> Self {
        Self { manager, slot }
    }
}

#[async_trait]
impl ReadinessProbe for CredentialPersistProbe {
    async fn probe(&self, cancel: &CancellationToken) -> bool {
        let credential = match self.slot.get() {
            Some(credential) if !credential.is_expired() => credential,
            held => {
                // an expired credential can never be stored
                if held.is_some() {
                    warn!("Held credential expired before it was stored, re-acquiring");
                } else {
                    warn!("No credential to persist, acquiring");
                }
                match self.manager.issue_fresh(cancel).await {
                    Ok(fresh) => {
                        self.slot.store(fresh.clone());
                        fresh
                    }
                    Err(e) => {
                        warn!(error = %e, "Credential re-acquisition failed");
                        return false;
                    }
                }
            }
        };

        match self.manager.persist(&credential).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Credential persistence failed");
                false
            }
        }
    }
}

/// The four-stage startup pipeline: network → remote cache → credential
/// acquisition → credential persistence.
pub fn credential_bootstrap(
    config: &BootstrapConfig,
    cache: Arc<MultiTierCache>,
    manager: Arc<CredentialManager>,
) -> BootstrapPipeline {
    let slot = CredentialSlot::new();
    BootstrapPipeline::new()
        .gate(ReadinessGate::new(
            "network",
            config.network_retry(),
            NetworkProbe::new(
                config.network_probe_addr.clone(),
                config.network_probe_timeout(),
            ),
        ))
        .gate(ReadinessGate::new(
            "remote-cache",
            config.cache_retry(),
            RemoteCacheProbe::new(cache),
        ))
        .gate(ReadinessGate::new(
            "credential-acquire",
            config.credential_retry(),
            CredentialAcquireProbe::new(manager.clone(), slot.clone()),
        ))
        .gate(ReadinessGate::new(
            "credential-persist",
            config.persist_retry(),
            CredentialPersistProbe::new(manager, slot),
        ))
}
