//! Port statistics handler.
//!
//! Requests counters for all ports of a switch and, per reply entry,
//! updates the matching interface's counter slot and emits one
//! persistence instruction. An entry for a port with no known interface
//! skips the state update but is still persisted.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StatsError;
use crate::model::{PollTarget, Switch};
use crate::persist::{port_namespace, Emitter};
use crate::proto::{
    ProtocolVersion, RawEntries, RawPortEntry, RequestBody, StatRequest, StatsKind,
};
use crate::stats::StatsHandler;

pub struct PortStatsHandler {
    emitter: Emitter,
}

impl PortStatsHandler {
    pub fn new(emitter: Emitter) -> Self {
        Self { emitter }
    }

    async fn update_interface(switch: &Arc<Switch>, entry: &RawPortEntry) {
        match switch.interface_by_port_no(entry.port_no).await {
            Some(iface) => iface.update_counters(entry).await,
            None => {
                tracing::debug!(
                    switch = %switch.id(),
                    port_no = entry.port_no,
                    "No interface for port, skipping state update"
                );
            }
        }
    }

    fn values(entry: &RawPortEntry) -> BTreeMap<String, u64> {
        BTreeMap::from([
            ("rx_bytes".to_string(), entry.rx_bytes),
            ("tx_bytes".to_string(), entry.tx_bytes),
            ("rx_dropped".to_string(), entry.rx_dropped),
            ("tx_dropped".to_string(), entry.tx_dropped),
            ("rx_errors".to_string(), entry.rx_errors),
            ("tx_errors".to_string(), entry.tx_errors),
        ])
    }
}

#[async_trait::async_trait]
impl StatsHandler for PortStatsHandler {
    fn kind(&self) -> StatsKind {
        StatsKind::Port
    }

    fn request(&self, target: &PollTarget) -> Result<StatRequest, StatsError> {
        let version = ProtocolVersion::from_wire(target.version)?;
        tracing::debug!(switch = %target.switch.id(), %version, "Port stats request built");
        Ok(StatRequest::new(
            StatsKind::Port,
            RequestBody::all_ports(version),
        ))
    }

    async fn on_reply(
        &self,
        switch: &Arc<Switch>,
        _version: ProtocolVersion,
        entries: &RawEntries,
    ) {
        let RawEntries::Port(entries) = entries else {
            tracing::warn!(switch = %switch.id(), "Port reply carried non-port entries, dropping");
            return;
        };

        for entry in entries {
            Self::update_interface(switch, entry).await;
            if let Err(e) = self.emitter.emit(
                port_namespace(switch.id(), entry.port_no),
                Self::values(entry),
            ) {
                tracing::warn!(switch = %switch.id(), port_no = entry.port_no, error = %e,
                    "Port measurement not persisted");
            }

            tracing::debug!(
                switch = %switch.id(),
                port_no = entry.port_no,
                rx_bytes = entry.rx_bytes,
                tx_bytes = entry.tx_bytes,
                rx_dropped = entry.rx_dropped,
                tx_dropped = entry.tx_dropped,
                rx_errors = entry.rx_errors,
                tx_errors = entry.tx_errors,
                "Received port stats"
            );
        }
    }
}
