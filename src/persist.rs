//! Persistence emitter.
//!
//! Wraps a normalized measurement into an asynchronous save instruction
//! for the storage collaborator: a destination namespace derived from
//! switch identity, kind and sub-identity, the counter values, a
//! timestamp captured at emission time, and a one-shot completion handle.
//! Emission is fire-and-forget; the completion handle is consumed by a
//! detached task that logs failures and never retries.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use crate::error::StatsError;
use crate::model::{FlowId, SwitchId};

/// Default persistence channel capacity.
pub const DEFAULT_PERSISTENCE_CAPACITY: usize = 4096;

/// An asynchronous save instruction addressed to the storage collaborator.
#[derive(Debug)]
pub struct SaveRequest {
    /// Destination namespace, e.g. `"<dpid>.port_no.1"`.
    pub namespace: String,
    /// Counter values keyed by field name.
    pub values: BTreeMap<String, u64>,
    /// Captured when the measurement was emitted.
    pub ts: DateTime<Utc>,
    done: oneshot::Sender<Result<(), String>>,
}

impl SaveRequest {
    /// Report the outcome of the save back to the emitter.
    ///
    /// Dropping a request without completing it is allowed; the save is
    /// then simply unobserved.
    pub fn complete(self, result: Result<(), String>) {
        let _ = self.done.send(result);
    }
}

/// Namespace for per-port measurements.
pub fn port_namespace(switch: &SwitchId, port_no: u32) -> String {
    format!("{switch}.port_no.{port_no}")
}

/// Namespace for per-flow measurements.
pub fn flow_namespace(switch: &SwitchId, flow: &FlowId) -> String {
    format!("{switch}.flow.{flow}")
}

/// Fire-and-forget hand-off to the storage collaborator.
///
/// Cloneable; each reply handler holds one. `emit` must run inside a
/// tokio runtime because the completion watcher is spawned as a task.
#[derive(Clone)]
pub struct Emitter {
    tx: mpsc::Sender<SaveRequest>,
    dropped: Arc<AtomicU64>,
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}

impl Emitter {
    /// Create an emitter plus the receiver the storage collaborator
    /// drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SaveRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Package and send one save instruction.
    ///
    /// Never blocks. Storage-side failures arrive asynchronously through
    /// the completion handle and are logged by a detached watcher task.
    ///
    /// # Errors
    /// Returns `PersistenceSend` if the channel is full or closed; the
    /// instruction is dropped and counted.
    pub fn emit(
        &self,
        namespace: String,
        values: BTreeMap<String, u64>,
    ) -> Result<(), StatsError> {
        let (done_tx, done_rx) = oneshot::channel();
        let request = SaveRequest {
            namespace: namespace.clone(),
            values,
            ts: Utc::now(),
            done: done_tx,
        };

        if let Err(e) = self.tx.try_send(request) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    tracing::warn!(namespace = %namespace, "Persistence channel full, dropping save");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    tracing::warn!(namespace = %namespace, "Persistence channel closed, dropping save");
                }
            }
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(StatsError::PersistenceSend);
        }

        tokio::spawn(async move {
            match done_rx.await {
                Ok(Ok(())) => {
                    tracing::trace!(namespace = %namespace, "Save confirmed");
                }
                Ok(Err(e)) => {
                    tracing::error!(namespace = %namespace, error = %e, "Save failed");
                }
                // Collaborator dropped the handle without reporting; the
                // save is unobserved, which is not an error.
                Err(_) => {}
            }
        });
        Ok(())
    }

    /// Total save instructions dropped because the channel was full or
    /// closed.
    pub fn dropped_saves(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_namespaces() {
        let switch = SwitchId::from("00:01");
        assert_eq!(port_namespace(&switch, 1), "00:01.port_no.1");
        let flow = FlowId("01.00.0001.in_port=1".to_string());
        assert_eq!(
            flow_namespace(&switch, &flow),
            "00:01.flow.01.00.0001.in_port=1"
        );
    }

    #[tokio::test]
    async fn test_emit_delivers_instruction() {
        let (emitter, mut rx) = Emitter::channel(8);
        emitter
            .emit("sw1.port_no.1".to_string(), values(&[("rx_bytes", 100)]))
            .unwrap();

        let request = rx.recv().await.unwrap();
        assert_eq!(request.namespace, "sw1.port_no.1");
        assert_eq!(request.values.get("rx_bytes"), Some(&100));
        request.complete(Ok(()));
    }

    #[tokio::test]
    async fn test_emit_failure_is_logged_not_raised() {
        let (emitter, mut rx) = Emitter::channel(8);
        emitter
            .emit("sw1.port_no.1".to_string(), values(&[("rx_bytes", 1)]))
            .unwrap();

        let request = rx.recv().await.unwrap();
        // A storage-side failure only reaches the log; the emitter keeps
        // accepting instructions.
        request.complete(Err("disk full".to_string()));
        emitter
            .emit("sw1.port_no.2".to_string(), values(&[("rx_bytes", 2)]))
            .unwrap();
        assert!(rx.recv().await.is_some());
        assert_eq!(emitter.dropped_saves(), 0);
    }

    #[tokio::test]
    async fn test_emit_full_channel_drops_and_counts() {
        let (emitter, _rx) = Emitter::channel(1);
        emitter.emit("a".to_string(), values(&[])).unwrap();
        let err = emitter.emit("b".to_string(), values(&[])).unwrap_err();
        assert!(matches!(err, StatsError::PersistenceSend));
        assert_eq!(emitter.dropped_saves(), 1);
    }

    #[tokio::test]
    async fn test_emit_closed_channel_drops_and_counts() {
        let (emitter, rx) = Emitter::channel(1);
        drop(rx);
        let err = emitter.emit("a".to_string(), values(&[])).unwrap_err();
        assert!(matches!(err, StatsError::PersistenceSend));
        assert_eq!(emitter.dropped_saves(), 1);
    }

    #[tokio::test]
    async fn test_unobserved_completion_is_fine() {
        let (emitter, mut rx) = Emitter::channel(8);
        emitter.emit("sw1.port_no.1".to_string(), values(&[])).unwrap();
        let request = rx.recv().await.unwrap();
        drop(request); // never completed
        tokio::task::yield_now().await;
    }
}
