//! Aggregate statistics handler.
//!
//! Requests whole-switch aggregate counters and emits one persistence
//! instruction per reply entry. The aggregation identity is a policy
//! decision, not something the protocol pins down, so the namespace
//! sub-key is configurable.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StatsError;
use crate::model::{PollTarget, Switch, SwitchId};
use crate::persist::Emitter;
use crate::proto::{ProtocolVersion, RawEntries, RequestBody, StatRequest, StatsKind};
use crate::stats::StatsHandler;

/// Aggregation identity policy for the persistence namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AggregateKey {
    /// Key aggregate measurements by switch identity alone.
    #[default]
    SwitchId,
    /// Append a fixed label under the switch identity, for hosts that
    /// run several labelled aggregate queries.
    Label(String),
}

impl AggregateKey {
    pub fn namespace(&self, switch: &SwitchId) -> String {
        match self {
            Self::SwitchId => format!("{switch}.aggregate"),
            Self::Label(label) => format!("{switch}.aggregate.{label}"),
        }
    }
}

pub struct AggregateStatsHandler {
    emitter: Emitter,
    key: AggregateKey,
}

impl AggregateStatsHandler {
    pub fn new(emitter: Emitter, key: AggregateKey) -> Self {
        Self { emitter, key }
    }
}

#[async_trait::async_trait]
impl StatsHandler for AggregateStatsHandler {
    fn kind(&self) -> StatsKind {
        StatsKind::Aggregate
    }

    fn request(&self, target: &PollTarget) -> Result<StatRequest, StatsError> {
        let version = ProtocolVersion::from_wire(target.version)?;
        tracing::debug!(switch = %target.switch.id(), %version, "Aggregate stats request built");
        Ok(StatRequest::new(
            StatsKind::Aggregate,
            RequestBody::all_aggregate(version),
        ))
    }

    async fn on_reply(
        &self,
        switch: &Arc<Switch>,
        _version: ProtocolVersion,
        entries: &RawEntries,
    ) {
        let RawEntries::Aggregate(entries) = entries else {
            tracing::warn!(
                switch = %switch.id(),
                "Aggregate reply carried non-aggregate entries, dropping"
            );
            return;
        };

        for entry in entries {
            if let Err(e) = self.emitter.emit(
                self.key.namespace(switch.id()),
                BTreeMap::from([
                    ("packet_count".to_string(), entry.packet_count),
                    ("byte_count".to_string(), entry.byte_count),
                    ("flow_count".to_string(), u64::from(entry.flow_count)),
                ]),
            ) {
                tracing::warn!(switch = %switch.id(), error = %e,
                    "Aggregate measurement not persisted");
            }

            tracing::debug!(
                switch = %switch.id(),
                packet_count = entry.packet_count,
                byte_count = entry.byte_count,
                flow_count = entry.flow_count,
                "Received aggregate stats"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::RawAggregateEntry;

    fn entry() -> RawAggregateEntry {
        RawAggregateEntry {
            packet_count: 10,
            byte_count: 1000,
            flow_count: 3,
        }
    }

    #[test]
    fn test_key_namespaces() {
        let switch = SwitchId::from("sw1");
        assert_eq!(AggregateKey::SwitchId.namespace(&switch), "sw1.aggregate");
        assert_eq!(
            AggregateKey::Label("edge".to_string()).namespace(&switch),
            "sw1.aggregate.edge"
        );
    }

    #[tokio::test]
    async fn test_one_instruction_per_entry() {
        let (emitter, mut rx) = Emitter::channel(8);
        let handler = AggregateStatsHandler::new(emitter, AggregateKey::default());
        let switch = Arc::new(Switch::new("sw1"));

        handler
            .on_reply(
                &switch,
                ProtocolVersion::V0x01,
                &RawEntries::Aggregate(vec![entry(), entry()]),
            )
            .await;

        for _ in 0..2 {
            let save = rx.recv().await.unwrap();
            assert_eq!(save.namespace, "sw1.aggregate");
            assert_eq!(save.values.get("packet_count"), Some(&10));
            assert_eq!(save.values.get("byte_count"), Some(&1000));
            assert_eq!(save.values.get("flow_count"), Some(&3));
        }
    }

    #[tokio::test]
    async fn test_request_per_version() {
        let handler = AggregateStatsHandler::new(Emitter::channel(1).0, AggregateKey::default());
        let target = PollTarget {
            switch: Arc::new(Switch::new("sw1")),
            connection: crate::model::ConnectionId(1),
            version: 0x01,
        };
        let request = handler.request(&target).unwrap();
        assert_eq!(request.kind, StatsKind::Aggregate);
        assert_eq!(
            request.body,
            RequestBody::all_aggregate(ProtocolVersion::V0x01)
        );
    }
}
