//! Flow statistics handler.
//!
//! Requests counters for all flows of a switch. Per reply entry, the
//! flow identity is reconstructed with the version-aware flow factory
//! and the tracked flow's counters are updated when the switch still
//! knows the flow; entries for flows that expired between request and
//! reply are not an error. Packet and byte counts are persisted as two
//! independent instructions so a partial write failure on one says
//! nothing about the other.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StatsError;
use crate::model::{FlowCounters, FlowFactory, PollTarget, Switch};
use crate::persist::{flow_namespace, Emitter};
use crate::proto::{ProtocolVersion, RawEntries, RequestBody, StatRequest, StatsKind};
use crate::stats::StatsHandler;

pub struct FlowStatsHandler {
    emitter: Emitter,
}

impl FlowStatsHandler {
    pub fn new(emitter: Emitter) -> Self {
        Self { emitter }
    }
}

#[async_trait::async_trait]
impl StatsHandler for FlowStatsHandler {
    fn kind(&self) -> StatsKind {
        StatsKind::Flow
    }

    fn request(&self, target: &PollTarget) -> Result<StatRequest, StatsError> {
        let version = ProtocolVersion::from_wire(target.version)?;
        tracing::debug!(switch = %target.switch.id(), %version, "Flow stats request built");
        Ok(StatRequest::new(
            StatsKind::Flow,
            RequestBody::all_flows(version),
        ))
    }

    async fn on_reply(&self, switch: &Arc<Switch>, version: ProtocolVersion, entries: &RawEntries) {
        let RawEntries::Flow(entries) = entries else {
            tracing::warn!(switch = %switch.id(), "Flow reply carried non-flow entries, dropping");
            return;
        };

        for entry in entries {
            let flow_id = FlowFactory::from_raw(version, entry);

            match switch.flow_by_id(&flow_id).await {
                Some(flow) => {
                    flow.update_counters(FlowCounters {
                        packet_count: entry.packet_count,
                        byte_count: entry.byte_count,
                    })
                    .await;
                }
                // Flows may expire between request and reply.
                None => {
                    tracing::debug!(
                        switch = %switch.id(),
                        flow = %flow_id,
                        "Flow no longer tracked, skipping state update"
                    );
                }
            }

            // Packet and byte counts go out as independent instructions;
            // one failing says nothing about the other.
            let namespace = flow_namespace(switch.id(), &flow_id);
            for (field, value) in [
                ("packet_count", entry.packet_count),
                ("byte_count", entry.byte_count),
            ] {
                if let Err(e) = self.emitter.emit(
                    namespace.clone(),
                    BTreeMap::from([(field.to_string(), value)]),
                ) {
                    tracing::warn!(switch = %switch.id(), flow = %flow_id, field, error = %e,
                        "Flow measurement not persisted");
                }
            }

            tracing::debug!(
                switch = %switch.id(),
                flow = %flow_id,
                packet_count = entry.packet_count,
                byte_count = entry.byte_count,
                "Received flow stats"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Flow;
    use crate::proto::RawFlowEntry;

    fn entry() -> RawFlowEntry {
        RawFlowEntry {
            table_id: 0,
            priority: 100,
            match_fields: BTreeMap::from([("in_port".to_string(), "1".to_string())]),
            packet_count: 42,
            byte_count: 4200,
        }
    }

    #[tokio::test]
    async fn test_tracked_flow_updated_and_persisted_twice() {
        let (emitter, mut rx) = Emitter::channel(8);
        let handler = FlowStatsHandler::new(emitter);

        let switch = Arc::new(Switch::new("sw1"));
        let id = FlowFactory::from_raw(ProtocolVersion::V0x01, &entry());
        let flow = switch.track_flow(Flow::new(id.clone())).await;

        handler
            .on_reply(
                &switch,
                ProtocolVersion::V0x01,
                &RawEntries::Flow(vec![entry()]),
            )
            .await;

        let counters = flow.counters().await;
        assert_eq!(counters.packet_count, 42);
        assert_eq!(counters.byte_count, 4200);

        // Two independent instructions, same namespace.
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.namespace, format!("sw1.flow.{id}"));
        assert_eq!(first.namespace, second.namespace);
        assert_eq!(first.values.get("packet_count"), Some(&42));
        assert!(!first.values.contains_key("byte_count"));
        assert_eq!(second.values.get("byte_count"), Some(&4200));
        assert!(!second.values.contains_key("packet_count"));
    }

    #[tokio::test]
    async fn test_expired_flow_still_persisted() {
        let (emitter, mut rx) = Emitter::channel(8);
        let handler = FlowStatsHandler::new(emitter);
        let switch = Arc::new(Switch::new("sw1"));

        handler
            .on_reply(
                &switch,
                ProtocolVersion::V0x04,
                &RawEntries::Flow(vec![entry()]),
            )
            .await;

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_request_builds_wildcard_body() {
        let handler = FlowStatsHandler::new(Emitter::channel(1).0);
        let target = PollTarget {
            switch: Arc::new(Switch::new("sw1")),
            connection: crate::model::ConnectionId(1),
            version: 0x04,
        };
        let request = handler.request(&target).unwrap();
        assert_eq!(request.kind, StatsKind::Flow);
        assert_eq!(request.body, RequestBody::all_flows(ProtocolVersion::V0x04));
    }
}
