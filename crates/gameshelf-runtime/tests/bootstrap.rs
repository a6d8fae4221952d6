//! Ordering and cancellation of the startup pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gameshelf_auth::{Credential, CredentialError, CredentialManager, TokenIssuer};
use gameshelf_cache::{InMemoryTier, MultiTierCache, RemoteTier};
use gameshelf_config::BootstrapConfig;
use gameshelf_runtime::{
    BootstrapError, BootstrapPipeline, CredentialRefreshTask, IntervalScheduler, ReadinessGate,
    credential_bootstrap, remote_ready_predicate,
};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn later_gate_never_probed_before_earlier_gate_passes() {
    let first_passed = Arc::new(AtomicBool::new(false));
    let first_attempts = Arc::new(AtomicU32::new(0));
    let out_of_order = Arc::new(AtomicBool::new(false));
    let second_calls = Arc::new(AtomicU32::new(0));

    let first = {
        let first_passed = first_passed.clone();
        let first_attempts = first_attempts.clone();
        ReadinessGate::from_fn("network", Duration::from_millis(5), move || {
            let first_passed = first_passed.clone();
            let first_attempts = first_attempts.clone();
            async move {
                let ok = first_attempts.fetch_add(1, Ordering::SeqCst) + 1 >= 3;
                if ok {
                    first_passed.store(true, Ordering::SeqCst);
                }
                ok
            }
        })
    };
    let second = {
        let first_passed = first_passed.clone();
        let out_of_order = out_of_order.clone();
        let second_calls = second_calls.clone();
        ReadinessGate::from_fn("remote-cache", Duration::from_millis(5), move || {
            let first_passed = first_passed.clone();
            let out_of_order = out_of_order.clone();
            let second_calls = second_calls.clone();
            async move {
                second_calls.fetch_add(1, Ordering::SeqCst);
                if !first_passed.load(Ordering::SeqCst) {
                    out_of_order.store(true, Ordering::SeqCst);
                }
                true
            }
        })
    };

    let cancel = CancellationToken::new();
    BootstrapPipeline::new()
        .gate(first)
        .gate(second)
        .run(&cancel)
        .await
        .unwrap();

    assert_eq!(first_attempts.load(Ordering::SeqCst), 3);
    assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    assert!(!out_of_order.load(Ordering::SeqCst));
}

#[tokio::test]
async fn cancellation_during_retry_wait_returns_promptly() {
    let later_probed = Arc::new(AtomicBool::new(false));
    let retry = Duration::from_millis(500);

    let pipeline = {
        let later_probed = later_probed.clone();
        BootstrapPipeline::new()
            .gate(ReadinessGate::from_fn("remote-cache", retry, || async { false }))
            .gate(ReadinessGate::from_fn(
                "credential-acquire",
                retry,
                move || {
                    let later_probed = later_probed.clone();
                    async move {
                        later_probed.store(true, Ordering::SeqCst);
                        true
                    }
                },
            ))
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });
    }

    let started = Instant::now();
    let result = pipeline.run(&cancel).await;

    assert_eq!(
        result,
        Err(BootstrapError::Cancelled {
            gate: "remote-cache".into()
        })
    );
    assert!(started.elapsed() < retry);
    assert!(!later_probed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn cancellation_interrupts_a_hanging_probe() {
    let pipeline = BootstrapPipeline::new().gate(ReadinessGate::from_fn(
        "network",
        Duration::from_secs(30),
        || std::future::pending::<bool>(),
    ));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cancel.cancel();
        });
    }

    let result = tokio::time::timeout(Duration::from_secs(2), pipeline.run(&cancel))
        .await
        .expect("pipeline should stop on cancellation");
    assert!(matches!(result, Err(BootstrapError::Cancelled { .. })));
}

/// Fails the first `failures` calls, then issues `tok-<n>`.
struct FlakyIssuer {
    calls: AtomicU32,
    failures: u32,
}

#[async_trait]
impl TokenIssuer for FlakyIssuer {
    async fn issue(&self) -> Result<Credential, CredentialError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.failures {
            return Err(CredentialError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(Credential {
            access_token: format!("tok-{n}"),
            token_type: "Bearer".into(),
            expires_at: OffsetDateTime::now_utc() + time::Duration::seconds(300),
        })
    }
}

fn fast_config(probe_addr: String) -> BootstrapConfig {
    BootstrapConfig {
        network_probe_addr: probe_addr,
        network_probe_timeout_ms: 500,
        network_retry_secs: 1,
        cache_retry_secs: 1,
        credential_retry_secs: 1,
        persist_retry_secs: 1,
    }
}

#[tokio::test]
async fn credential_bootstrap_populates_both_tiers() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let probe_addr = listener.local_addr().unwrap().to_string();

    let remote = Arc::new(InMemoryTier::new(Duration::from_secs(300)));
    let cache = Arc::new(MultiTierCache::new(
        remote.clone(),
        Duration::from_secs(30),
        Duration::from_secs(300),
    ));
    let issuer = Arc::new(FlakyIssuer {
        calls: AtomicU32::new(0),
        failures: 1,
    });
    let manager = Arc::new(CredentialManager::new(
        cache.clone(),
        issuer.clone(),
        "gameshelf:credential",
    ));

    let pipeline = credential_bootstrap(&fast_config(probe_addr), cache.clone(), manager);
    let cancel = CancellationToken::new();
    tokio::time::timeout(Duration::from_secs(5), pipeline.run(&cancel))
        .await
        .expect("bootstrap should finish")
        .expect("bootstrap should succeed");

    assert_eq!(issuer.calls.load(Ordering::SeqCst), 2);
    assert!(remote.is_ready());
    assert_eq!(
        cache.get_local("gameshelf:credential").as_deref(),
        Some("tok-2")
    );
    assert_eq!(
        remote.get("gameshelf:credential").await.unwrap().as_deref(),
        Some("tok-2")
    );
}

#[tokio::test]
async fn refresh_ticks_wait_for_remote_readiness() {
    let remote = Arc::new(InMemoryTier::new(Duration::from_secs(300)));
    let cache = Arc::new(MultiTierCache::new(
        remote.clone(),
        Duration::from_secs(30),
        Duration::from_secs(300),
    ));
    let issuer = Arc::new(FlakyIssuer {
        calls: AtomicU32::new(0),
        failures: 0,
    });
    let manager = Arc::new(CredentialManager::new(
        cache.clone(),
        issuer.clone(),
        "gameshelf:credential",
    ));

    let scheduler = Arc::new(
        IntervalScheduler::new(
            "credential-refresh",
            Duration::from_millis(10),
            Arc::new(CredentialRefreshTask::new(manager)),
        )
        .with_readiness(remote_ready_predicate(cache.clone())),
    );
    let cancel = CancellationToken::new();
    let handle = {
        let scheduler = scheduler.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.start(cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(issuer.calls.load(Ordering::SeqCst), 0);

    assert!(cache.ping_remote().await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();

    // First ready tick issues, later ticks hit the cache
    assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);
    assert!(scheduler.stats().runs >= 1);
    assert!(scheduler.stats().skipped >= 1);
}
