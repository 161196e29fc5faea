//! Inbound reply dispatcher.
//!
//! Routes each normalized reply to the handler registered for its kind.
//! Pure routing: no blocking I/O, no state beyond the shared read-only
//! registry. A reply for an unregistered kind is logged and dropped so a
//! partially-understood protocol never halts processing of other kinds.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::stats::StatsRegistry;
use crate::transport::ReplyEvent;

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<StatsRegistry>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}

impl Dispatcher {
    pub fn new(registry: Arc<StatsRegistry>) -> Self {
        Self { registry }
    }

    /// Route one reply event to its handler.
    pub async fn dispatch(&self, event: ReplyEvent) {
        let ReplyEvent { switch, reply } = event;

        match self.registry.lookup(reply.kind) {
            Ok(handler) => {
                handler
                    .on_reply(&switch, reply.version, &reply.entries)
                    .await;
            }
            Err(e) => {
                tracing::debug!(
                    switch = %switch.id(),
                    kind = %reply.kind,
                    error = %e,
                    "No handler for reply, dropping"
                );
            }
        }
    }

    /// Drive the inbound path from the transport's reply channel.
    ///
    /// Each event is dispatched on its own task so replies from
    /// different switches are handled concurrently. Returns when the
    /// transport closes the channel.
    pub async fn run(self, mut rx: mpsc::Receiver<ReplyEvent>) {
        tracing::info!("Dispatcher started");
        while let Some(event) = rx.recv().await {
            let dispatcher = self.clone();
            tokio::spawn(async move { dispatcher.dispatch(event).await });
        }
        tracing::info!("Dispatcher stopped");
    }
}
