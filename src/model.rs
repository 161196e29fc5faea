//! Host object model collaborator.
//!
//! Switch, interface and flow records are owned by the host platform;
//! this engine only performs lookups and single-field counter updates
//! against them. The types here are the in-memory representation the
//! platform hands to the poller and the reply handlers. Mutation is
//! internally synchronized so reply handling for different switches can
//! run concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::proto::{ProtocolVersion, RawFlowEntry, RawPortEntry};

// =============================================================================
// Identities
// =============================================================================

/// Switch datapath identifier (dpid).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwitchId(pub String);

impl std::fmt::Display for SwitchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SwitchId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SwitchId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Opaque handle to a live transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

/// Deterministic flow identity, stable across poll cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowId(pub String);

impl std::fmt::Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Version-aware flow identity factory.
///
/// Reconstructs the identity of a flow from a raw stats entry so a reply
/// can be matched against the flows the switch currently tracks. The id
/// is a canonical string over the fields that define flow equality; two
/// entries describing the same flow always produce the same id.
pub struct FlowFactory;

impl FlowFactory {
    pub fn from_raw(version: ProtocolVersion, entry: &RawFlowEntry) -> FlowId {
        let mut id = format!(
            "{:02x}.{:02x}.{:04x}",
            version.wire(),
            entry.table_id,
            entry.priority
        );
        for (field, value) in &entry.match_fields {
            id.push('.');
            id.push_str(field);
            id.push('=');
            id.push_str(value);
        }
        FlowId(id)
    }
}

// =============================================================================
// Normalized measurements
// =============================================================================

/// Per-port cumulative counters as reported by the switch.
///
/// Plain pass-through copies of the wire values; no deltas are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
}

impl PortCounters {
    pub fn update(&mut self, entry: &RawPortEntry) {
        self.rx_bytes = entry.rx_bytes;
        self.tx_bytes = entry.tx_bytes;
        self.rx_dropped = entry.rx_dropped;
        self.tx_dropped = entry.tx_dropped;
        self.rx_errors = entry.rx_errors;
        self.tx_errors = entry.tx_errors;
    }
}

impl From<&RawPortEntry> for PortCounters {
    fn from(entry: &RawPortEntry) -> Self {
        let mut counters = Self::default();
        counters.update(entry);
        counters
    }
}

/// Per-flow cumulative counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCounters {
    pub packet_count: u64,
    pub byte_count: u64,
}

/// Aggregate counters for a whole-switch query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateCounters {
    pub packet_count: u64,
    pub byte_count: u64,
    pub flow_count: u32,
}

// =============================================================================
// Switch / interface / flow records
// =============================================================================

/// A switch interface with a lazily-initialized counter slot.
#[derive(Debug)]
pub struct Interface {
    port_no: u32,
    name: String,
    stats: RwLock<Option<PortCounters>>,
}

impl Interface {
    pub fn new(port_no: u32, name: impl Into<String>) -> Self {
        Self {
            port_no,
            name: name.into(),
            stats: RwLock::new(None),
        }
    }

    pub fn port_no(&self) -> u32 {
        self.port_no
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Overwrite the counter slot, creating it on first update.
    pub async fn update_counters(&self, entry: &RawPortEntry) {
        let mut slot = self.stats.write().await;
        match slot.as_mut() {
            Some(counters) => counters.update(entry),
            None => *slot = Some(PortCounters::from(entry)),
        }
    }

    /// Snapshot of the counter slot, `None` before the first update.
    pub async fn counters(&self) -> Option<PortCounters> {
        *self.stats.read().await
    }
}

/// A flow tracked by a switch, with its counter slot.
#[derive(Debug)]
pub struct Flow {
    id: FlowId,
    stats: RwLock<FlowCounters>,
}

impl Flow {
    pub fn new(id: FlowId) -> Self {
        Self {
            id,
            stats: RwLock::new(FlowCounters::default()),
        }
    }

    pub fn id(&self) -> &FlowId {
        &self.id
    }

    pub async fn update_counters(&self, counters: FlowCounters) {
        *self.stats.write().await = counters;
    }

    pub async fn counters(&self) -> FlowCounters {
        *self.stats.read().await
    }
}

/// Connection state fixed at handshake by the host platform.
///
/// The version is carried as the raw negotiated byte: the platform may
/// speak versions this engine has no request builders for, which the
/// builders surface as `UnsupportedProtocolVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionState {
    pub id: ConnectionId,
    pub version: u8,
}

/// A switch record: identity, interfaces, tracked flows and connection.
#[derive(Debug)]
pub struct Switch {
    id: SwitchId,
    connection: RwLock<Option<ConnectionState>>,
    interfaces: RwLock<HashMap<u32, Arc<Interface>>>,
    flows: RwLock<HashMap<FlowId, Arc<Flow>>>,
}

impl Switch {
    pub fn new(id: impl Into<SwitchId>) -> Self {
        Self {
            id: id.into(),
            connection: RwLock::new(None),
            interfaces: RwLock::new(HashMap::new()),
            flows: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &SwitchId {
        &self.id
    }

    pub async fn set_connection(&self, state: Option<ConnectionState>) {
        *self.connection.write().await = state;
    }

    pub async fn connection(&self) -> Option<ConnectionState> {
        *self.connection.read().await
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.read().await.is_some()
    }

    pub async fn add_interface(&self, iface: Interface) -> Arc<Interface> {
        let iface = Arc::new(iface);
        self.interfaces
            .write()
            .await
            .insert(iface.port_no(), Arc::clone(&iface));
        iface
    }

    /// Interface lookup by port number; `None` for ports the platform
    /// does not know about.
    pub async fn interface_by_port_no(&self, port_no: u32) -> Option<Arc<Interface>> {
        self.interfaces.read().await.get(&port_no).cloned()
    }

    pub async fn track_flow(&self, flow: Flow) -> Arc<Flow> {
        let flow = Arc::new(flow);
        self.flows
            .write()
            .await
            .insert(flow.id().clone(), Arc::clone(&flow));
        flow
    }

    /// Flow lookup by identity; `None` once a flow has expired.
    pub async fn flow_by_id(&self, id: &FlowId) -> Option<Arc<Flow>> {
        self.flows.read().await.get(id).cloned()
    }
}

// =============================================================================
// Topology
// =============================================================================

/// A live connection bound to a switch and its negotiated version.
///
/// Snapshot element handed to the poll scheduler; read-only to this
/// engine.
#[derive(Debug, Clone)]
pub struct PollTarget {
    pub switch: Arc<Switch>,
    pub connection: ConnectionId,
    /// Raw negotiated version byte from the handshake.
    pub version: u8,
}

/// The set of switches known to the host platform.
#[derive(Debug, Default)]
pub struct Topology {
    switches: RwLock<HashMap<SwitchId, Arc<Switch>>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_switch(&self, switch: Switch) -> Arc<Switch> {
        let switch = Arc::new(switch);
        self.switches
            .write()
            .await
            .insert(switch.id().clone(), Arc::clone(&switch));
        switch
    }

    pub async fn switch(&self, id: &SwitchId) -> Option<Arc<Switch>> {
        self.switches.read().await.get(id).cloned()
    }

    /// Snapshot the currently connected switches as poll targets.
    ///
    /// Targets are sorted by switch id so a poll cycle visits switches
    /// in a stable order.
    pub async fn connected_targets(&self) -> Vec<PollTarget> {
        let switches: Vec<Arc<Switch>> = self.switches.read().await.values().cloned().collect();
        let mut targets = Vec::new();
        for switch in switches {
            if let Some(conn) = switch.connection().await {
                targets.push(PollTarget {
                    switch,
                    connection: conn.id,
                    version: conn.version,
                });
            }
        }
        targets.sort_by(|a, b| a.switch.id().0.cmp(&b.switch.id().0));
        targets
    }
}
