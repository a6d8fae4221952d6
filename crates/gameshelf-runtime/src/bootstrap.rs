//! Staged startup: each gate blocks the next until its probe passes.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::BootstrapError;
use crate::gate::ReadinessGate;

/// Ordered list of gates run once at process start.
///
/// Gates never run concurrently and a gate is retried at its own interval
/// for as long as it takes. The only way out besides success is
/// cancellation, observed both while a probe is in flight and during the
/// wait between attempts.
#[derive(Debug, Default)]
pub struct BootstrapPipeline {
    gates: Vec<ReadinessGate>,
}

impl BootstrapPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a gate; gates run in insertion order.
    pub fn gate(mut self, gate: ReadinessGate) -> Self {
        self.gates.push(gate);
        self
    }

    pub fn gate_names(&self) -> Vec<&str> {
        self.gates.iter().map(|g| g.name.as_str()).collect()
    }

    /// Pass every gate in order.
    ///
    /// # Errors
    ///
    /// [`BootstrapError::Cancelled`] naming the pending gate, as soon as
    /// `cancel` fires.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), BootstrapError> {
        info!(gates = ?self.gate_names(), "Bootstrap started");

        for (index, gate) in self.gates.iter().enumerate() {
            self.pass(index, gate, cancel).await?;
        }

        info!("Bootstrap complete");
        Ok(())
    }

    async fn pass(
        &self,
        index: usize,
        gate: &ReadinessGate,
        cancel: &CancellationToken,
    ) -> Result<(), BootstrapError> {
        let cancelled = || BootstrapError::Cancelled {
            gate: gate.name.clone(),
        };
        let mut attempt: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }
            attempt += 1;

            let passed = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                passed = gate.probe.probe(cancel) => passed,
            };

            if passed {
                info!(
                    gate = %gate.name,
                    stage = index + 1,
                    attempts = attempt,
                    "Bootstrap gate passed"
                );
                return Ok(());
            }

            warn!(
                gate = %gate.name,
                stage = index + 1,
                attempt,
                retry_in_ms = millis(gate.retry_interval),
                "Bootstrap gate not ready, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                _ = tokio::time::sleep(gate.retry_interval) => {}
            }
        }
    }
}

/// Milliseconds for log fields, saturating at `u64::MAX`.
pub(crate) fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
