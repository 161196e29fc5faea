//! Type registry mapping statistics kinds to their handlers.
//!
//! Built once during setup and immutable afterwards, so concurrent
//! lookups from the scheduler and the inbound dispatch path need no
//! locking.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StatsError;
use crate::proto::StatsKind;
use crate::stats::StatsHandler;

/// Builder for [`StatsRegistry`]; registration happens only here.
#[derive(Default)]
pub struct StatsRegistryBuilder {
    handlers: BTreeMap<StatsKind, Arc<dyn StatsHandler>>,
}

impl StatsRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler to its kind.
    ///
    /// # Errors
    /// Returns `DuplicateKind` if the kind already has a handler; kinds
    /// are globally unique.
    pub fn register(mut self, handler: Arc<dyn StatsHandler>) -> Result<Self, StatsError> {
        let kind = handler.kind();
        if self.handlers.contains_key(&kind) {
            return Err(StatsError::DuplicateKind(kind));
        }
        self.handlers.insert(kind, handler);
        Ok(self)
    }

    /// Freeze the registry.
    pub fn build(self) -> StatsRegistry {
        StatsRegistry {
            handlers: self.handlers,
        }
    }
}

/// Immutable kind-to-handler mapping.
pub struct StatsRegistry {
    handlers: BTreeMap<StatsKind, Arc<dyn StatsHandler>>,
}

impl std::fmt::Debug for StatsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsRegistry")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StatsRegistry {
    /// Look up the handler for a kind.
    ///
    /// # Errors
    /// Returns `UnknownKind`; the dispatcher treats this as non-fatal
    /// and logs it.
    pub fn lookup(&self, kind: StatsKind) -> Result<&Arc<dyn StatsHandler>, StatsError> {
        self.handlers.get(&kind).ok_or(StatsError::UnknownKind {
            code: kind.wire_code(),
        })
    }

    /// Registered handlers in stable kind order.
    pub fn handlers(&self) -> impl Iterator<Item = &Arc<dyn StatsHandler>> {
        self.handlers.values()
    }

    /// Registered kinds in stable order.
    pub fn kinds(&self) -> impl Iterator<Item = StatsKind> + '_ {
        self.handlers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
