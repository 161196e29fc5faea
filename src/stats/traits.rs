//! Core statistics handler trait.

use std::sync::Arc;

use crate::error::StatsError;
use crate::model::{PollTarget, Switch};
use crate::proto::{ProtocolVersion, RawEntries, StatRequest, StatsKind};

/// A handler for one statistics kind, across both protocol versions.
///
/// Handlers are registered once at startup and shared read-only across
/// the poll scheduler and concurrent reply dispatches. Implementations
/// must not perform blocking I/O: requests are non-blocking channel
/// hand-offs, and reply handling only touches the externally-synchronized
/// host object model and the persistence emitter.
#[async_trait::async_trait]
pub trait StatsHandler: Send + Sync + 'static {
    /// The statistics kind this handler owns. Exactly one handler per
    /// kind may be registered.
    fn kind(&self) -> StatsKind;

    /// Build a request for the target's negotiated version, always
    /// asking for all entities of this kind.
    ///
    /// # Errors
    /// Returns `UnsupportedProtocolVersion` if no builder exists for the
    /// target's version; the caller skips the target for the cycle.
    fn request(&self, target: &PollTarget) -> Result<StatRequest, StatsError>;

    /// Normalize and apply one reply's entry sequence.
    ///
    /// Failures are handler-local: an entry referencing an unresolved
    /// port or flow skips the state update but is still persisted, and
    /// nothing propagates upward.
    async fn on_reply(&self, switch: &Arc<Switch>, version: ProtocolVersion, entries: &RawEntries);
}
