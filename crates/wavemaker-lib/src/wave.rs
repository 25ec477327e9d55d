//! Wave life-cycle controller
//!
//! Drives the repeating create -> ready -> hold -> delete -> terminate ->
//! cooldown cycle. The controller owns timing and cancellation; workload
//! identity lives solely in the platform and is re-derived by label query
//! on every poll, so a stale batch left behind by a crashed prior run is
//! picked up by the next deprovision sweep.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::batch;
use crate::client::WorkloadClient;
use crate::poll::{poll_until, PollError, PollPolicy, PollState};
use crate::requests::ResourceRequests;

/// What to do when a readiness or termination poll runs out of attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExhaustionPolicy {
    /// Log a warning and advance to the next phase anyway.
    #[default]
    Proceed,
    /// Treat exhaustion as a fatal error and stop the controller.
    FailWave,
}

impl FromStr for ExhaustionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proceed" => Ok(ExhaustionPolicy::Proceed),
            "fail-wave" => Ok(ExhaustionPolicy::FailWave),
            other => Err(format!(
                "unknown poll exhaustion policy {other:?}, expected proceed or fail-wave"
            )),
        }
    }
}

/// Immutable configuration for the wave cycle, built once at startup
#[derive(Debug, Clone)]
pub struct WaveConfig {
    /// Pods per batch
    pub count: usize,
    /// How long to hold each wave at full scale
    pub hold: Duration,
    /// Cooldown between the end of one wave and the next creation
    pub interval: Duration,
    /// Namespace the batch lives in
    pub namespace: String,
    /// Resource requests shared by every pod in a batch
    pub requests: ResourceRequests,
    /// Poll exhaustion handling
    pub on_exhaustion: ExhaustionPolicy,
}

/// The cyclic state machine driving waves until cancellation
pub struct WaveController {
    config: WaveConfig,
    policy: PollPolicy,
    client: Arc<dyn WorkloadClient>,
    cancel: CancellationToken,
}

impl WaveController {
    pub fn new(
        config: WaveConfig,
        policy: PollPolicy,
        client: Arc<dyn WorkloadClient>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            policy,
            client,
            cancel,
        }
    }

    /// Run waves until the cancellation token fires
    pub async fn run(&self) -> Result<()> {
        loop {
            if !self.run_wave().await? {
                info!("shutting down");
                return Ok(());
            }
        }
    }

    /// Drive one full wave. Returns `Ok(false)` when cancellation ended the
    /// wave early, `Ok(true)` when the next wave should start.
    async fn run_wave(&self) -> Result<bool> {
        if self.cancel.is_cancelled() {
            return Ok(false);
        }

        batch::create_batch(
            self.client.as_ref(),
            self.config.count,
            &self.config.namespace,
            &self.config.requests,
        )
        .await;

        if !self.resolve_poll(self.await_ready().await, "readiness")? {
            return Ok(false);
        }

        info!("running wave");
        if !self.pause(self.config.hold).await {
            return Ok(false);
        }

        if let Err(e) = batch::deprovision_batch(self.client.as_ref()).await {
            // Membership is re-derived by the termination poll, which
            // retries the listing under its own policy.
            error!(error = %e, "listing pods for deprovision");
        }

        if !self.resolve_poll(self.await_terminated().await, "termination")? {
            return Ok(false);
        }

        info!("completed wave");
        Ok(self.pause(self.config.interval).await)
    }

    /// Wait until every labeled pod reports a true `Ready` condition.
    async fn await_ready(&self) -> Result<(), PollError> {
        let client = self.client.as_ref();
        poll_until(&self.policy, &self.cancel, move || async move {
            let pods = match client.list_batch().await {
                Ok(pods) => pods,
                Err(e) => {
                    error!(error = %e, "listing pods");
                    return Ok(PollState::Retry(format!("listing pods: {e}")));
                }
            };
            let unready = pods.iter().filter(|p| !batch::is_pod_ready(p)).count();
            if unready > 0 {
                info!(remaining = unready, "waiting on remaining pods to go ready");
                return Ok(PollState::Retry(format!("{unready} pods not ready")));
            }
            info!("all pods are ready");
            Ok(PollState::Done)
        })
        .await
    }

    /// Wait until no labeled pods remain.
    async fn await_terminated(&self) -> Result<(), PollError> {
        let client = self.client.as_ref();
        poll_until(&self.policy, &self.cancel, move || async move {
            let pods = match client.list_batch().await {
                Ok(pods) => pods,
                Err(e) => {
                    error!(error = %e, "listing pods");
                    return Ok(PollState::Retry(format!("listing pods: {e}")));
                }
            };
            if !pods.is_empty() {
                info!(remaining = pods.len(), "waiting on remaining pods to terminate");
                return Ok(PollState::Retry(format!("{} pods remaining", pods.len())));
            }
            Ok(PollState::Done)
        })
        .await
    }

    /// Map a poll result onto the state machine: exhaustion advances or
    /// fails per policy, cancellation ends the wave.
    fn resolve_poll(&self, result: Result<(), PollError>, phase: &str) -> Result<bool> {
        match result {
            Ok(()) => Ok(true),
            Err(PollError::Cancelled) => Ok(false),
            Err(e @ PollError::Exhausted { .. }) => match self.config.on_exhaustion {
                ExhaustionPolicy::Proceed => {
                    warn!(phase, error = %e, "poll exhausted, proceeding");
                    Ok(true)
                }
                ExhaustionPolicy::FailWave => Err(anyhow::Error::from(e).context(format!(
                    "{phase} poll exhausted and exhaustion policy is fail-wave"
                ))),
            },
            Err(PollError::Fatal(e)) => Err(e),
        }
    }

    /// Sleep for `duration` unless cancellation fires first. Returns whether
    /// the full duration elapsed.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancel.cancelled() => false,
        }
    }
}
