//! Periodic poll scheduler.
//!
//! On a fixed interval, snapshots the currently connected switches and
//! issues one request per registered statistics kind to each of them.
//! The scheduler never waits for replies; request/reply correlation is
//! implicit and handled on the inbound path by the dispatcher. Per-target
//! failures are logged and the cycle continues with the remaining
//! targets.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::StatsError;
use crate::model::{PollTarget, Topology};
use crate::stats::StatsRegistry;
use crate::transport::OutboundHandle;

pub struct PollScheduler {
    topology: Arc<Topology>,
    registry: Arc<StatsRegistry>,
    outbound: OutboundHandle,
    interval: Duration,
}

impl std::fmt::Debug for PollScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollScheduler")
            .field("interval", &self.interval)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl PollScheduler {
    pub fn new(
        topology: Arc<Topology>,
        registry: Arc<StatsRegistry>,
        outbound: OutboundHandle,
        interval: Duration,
    ) -> Self {
        Self {
            topology,
            registry,
            outbound,
            interval,
        }
    }

    /// Start the scheduler loop on its own task.
    ///
    /// The first cycle runs immediately, then one per interval.
    pub fn spawn(self) -> SchedulerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(stop_rx));
        SchedulerHandle {
            stop: stop_tx,
            task,
        }
    }

    async fn run(self, mut stop: watch::Receiver<bool>) {
        tracing::info!(interval = ?self.interval, "Poll scheduler started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.poll_cycle().await,
                _ = stop.changed() => break,
            }
        }
        tracing::info!("Poll scheduler stopped");
    }

    /// Run one poll cycle over the current connected-target snapshot.
    ///
    /// Targets are polled in stable order; all kinds for a target are
    /// attempted within the same cycle.
    pub async fn poll_cycle(&self) {
        let targets = self.topology.connected_targets().await;
        tracing::debug!(targets = targets.len(), "Poll cycle started");

        for target in &targets {
            self.poll_target(target);
        }
    }

    fn poll_target(&self, target: &PollTarget) {
        for handler in self.registry.handlers() {
            match handler.request(target) {
                Ok(request) => {
                    if let Err(e) = self.outbound.send(request, target.connection) {
                        // Connection may have gone away between snapshot
                        // and send; the cycle moves on.
                        tracing::warn!(
                            switch = %target.switch.id(),
                            kind = %handler.kind(),
                            error = %e,
                            "Request send failed"
                        );
                    }
                }
                Err(StatsError::UnsupportedProtocolVersion(version)) => {
                    tracing::warn!(
                        switch = %target.switch.id(),
                        version,
                        "No request builder for version, skipping target this cycle"
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        switch = %target.switch.id(),
                        kind = %handler.kind(),
                        error = %e,
                        "Request build failed"
                    );
                }
            }
        }
    }
}

/// Handle to a running scheduler.
pub struct SchedulerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the scheduler: no new cycles start. Requests already in
    /// flight simply never see a matching reply, which is not an error.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}
