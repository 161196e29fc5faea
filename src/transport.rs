//! Transport collaborator seam.
//!
//! The engine never touches sockets. Outbound requests are handed to the
//! transport through a bounded channel; inbound replies arrive as
//! [`ReplyEvent`]s on a channel the dispatcher consumes. Both hand-offs
//! are non-blocking `try_send`s: a full or closed channel drops the
//! message with a warning rather than stalling the polling loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::StatsError;
use crate::model::{ConnectionId, Switch};
use crate::proto::{StatRequest, StatReply};

/// Default outbound channel capacity.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 1024;

/// An outbound request addressed to a connection.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    pub request: StatRequest,
    pub destination: ConnectionId,
}

/// An inbound reply paired with the switch it originated from.
///
/// The switch reference is resolved by the transport layer; a reply
/// whose connection has since closed is still delivered against the
/// last-known switch when one is available.
#[derive(Debug, Clone)]
pub struct ReplyEvent {
    pub switch: Arc<Switch>,
    pub reply: StatReply,
}

/// Non-blocking hand-off to the transport's outbound queue.
#[derive(Clone)]
pub struct OutboundHandle {
    tx: mpsc::Sender<OutboundFrame>,
    dropped: Arc<AtomicU64>,
}

impl std::fmt::Debug for OutboundHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundHandle").finish_non_exhaustive()
    }
}

impl OutboundHandle {
    /// Create a handle plus the receiver the transport drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Hand a request to the transport.
    ///
    /// # Errors
    /// Returns `TransportSend` if the channel is full or closed; the
    /// request is dropped and counted.
    pub fn send(&self, request: StatRequest, destination: ConnectionId) -> Result<(), StatsError> {
        let frame = OutboundFrame {
            request,
            destination,
        };
        if let Err(e) = self.tx.try_send(frame) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    tracing::warn!(?destination, "Outbound channel full, dropping request");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    tracing::warn!(?destination, "Outbound channel closed, dropping request");
                }
            }
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(StatsError::TransportSend);
        }
        Ok(())
    }

    /// Total requests dropped because the channel was full or closed.
    pub fn dropped_requests(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{ProtocolVersion, RequestBody, StatsKind};

    fn port_request() -> StatRequest {
        StatRequest::new(
            StatsKind::Port,
            RequestBody::all_ports(ProtocolVersion::V0x01),
        )
    }

    #[tokio::test]
    async fn test_send_delivers_frame() {
        let (handle, mut rx) = OutboundHandle::channel(4);
        handle.send(port_request(), ConnectionId(3)).unwrap();

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.destination, ConnectionId(3));
        assert_eq!(frame.request.kind, StatsKind::Port);
        assert_eq!(handle.dropped_requests(), 0);
    }

    #[tokio::test]
    async fn test_send_full_channel_drops_and_counts() {
        let (handle, _rx) = OutboundHandle::channel(1);
        handle.send(port_request(), ConnectionId(1)).unwrap();

        let err = handle.send(port_request(), ConnectionId(1)).unwrap_err();
        assert!(matches!(err, StatsError::TransportSend));
        assert_eq!(handle.dropped_requests(), 1);
    }

    #[tokio::test]
    async fn test_send_closed_channel_fails() {
        let (handle, rx) = OutboundHandle::channel(1);
        drop(rx);
        assert!(handle.send(port_request(), ConnectionId(1)).is_err());
        assert_eq!(handle.dropped_requests(), 1);
    }
}
