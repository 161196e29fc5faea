//! Wire-facing protocol types.
//!
//! This module knows the *logical* side of the two supported OpenFlow
//! encodings: statistics kind codes, protocol version tags, and the
//! semantic fields of request/reply bodies. Framing, checksums and byte
//! layout belong to the transport collaborator and never appear here.
//!
//! Both supported versions use identical numeric codes for equivalent
//! statistics kinds (v0x01 `body_type` and v0x04 `multipart_type` share
//! the same value space), which is what lets a single [`StatsKind`]
//! registry serve both encodings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::error::StatsError;

// =============================================================================
// Wire constants
// =============================================================================

/// Bit-exact wire values shared with the switch side.
pub mod wire {
    /// v0x01 `OFPST_FLOW` / v0x04 `OFPMP_FLOW`.
    pub const STATS_FLOW: u16 = 1;
    /// v0x01 `OFPST_AGGREGATE` / v0x04 `OFPMP_AGGREGATE`.
    pub const STATS_AGGREGATE: u16 = 2;
    /// v0x01 `OFPST_PORT` / v0x04 `OFPMP_PORT_STATS`.
    pub const STATS_PORT: u16 = 4;

    /// v0x01 `OFPP_NONE`: wildcard meaning "all ports".
    pub const OFPP_NONE: u16 = 0xffff;
    /// v0x04 `OFPP_ANY`: wildcard meaning "all ports".
    pub const OFPP_ANY: u32 = 0xffff_ffff;
    /// `OFPTT_ALL`: wildcard meaning "all tables" (both versions).
    pub const OFPTT_ALL: u8 = 0xff;
    /// v0x04 `OFPG_ANY`: wildcard meaning "any group".
    pub const OFPG_ANY: u32 = 0xffff_ffff;
}

// =============================================================================
// Version and kind tags
// =============================================================================

/// Protocol version negotiated at handshake; fixed for a connection's
/// lifetime. Exactly two incompatible encodings are in use.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProtocolVersion {
    /// OpenFlow 1.0 (version byte 0x01).
    V0x01,
    /// OpenFlow 1.3 (version byte 0x04).
    V0x04,
}

impl ProtocolVersion {
    /// Version byte as it appears in the message header.
    pub fn wire(&self) -> u8 {
        match self {
            Self::V0x01 => 0x01,
            Self::V0x04 => 0x04,
        }
    }

    /// Parse a version byte.
    ///
    /// # Errors
    /// Returns `UnsupportedProtocolVersion` for any other byte.
    pub fn from_wire(byte: u8) -> Result<Self, StatsError> {
        match byte {
            0x01 => Ok(Self::V0x01),
            0x04 => Ok(Self::V0x04),
            other => Err(StatsError::UnsupportedProtocolVersion(other)),
        }
    }
}

/// Logical category of counters requested and reported.
///
/// Stable across protocol versions; the on-wire numeric code coincides
/// for the versions supported by protocol design.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StatsKind {
    Flow,
    Aggregate,
    Port,
}

impl StatsKind {
    /// Numeric code in the request/reply envelope (identical for both
    /// supported versions).
    pub fn wire_code(&self) -> u16 {
        match self {
            Self::Flow => wire::STATS_FLOW,
            Self::Aggregate => wire::STATS_AGGREGATE,
            Self::Port => wire::STATS_PORT,
        }
    }

    /// Map a wire code back to a kind.
    ///
    /// # Errors
    /// Returns `UnknownKind` for codes this engine does not handle
    /// (e.g. table or queue statistics).
    pub fn from_wire_code(code: u16) -> Result<Self, StatsError> {
        match code {
            wire::STATS_FLOW => Ok(Self::Flow),
            wire::STATS_AGGREGATE => Ok(Self::Aggregate),
            wire::STATS_PORT => Ok(Self::Port),
            other => Err(StatsError::UnknownKind { code: other }),
        }
    }
}

// =============================================================================
// Outbound requests
// =============================================================================

/// Version-specific request body.
///
/// Every variant requests *all* entities of its kind: the filter fields
/// are fixed wildcard values, never caller-supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestBody {
    /// v0x01 `PortStatsRequest`.
    PortV0x01 { port_no: u16 },
    /// v0x04 `PortStatsRequest`.
    PortV0x04 { port_no: u32 },
    /// v0x01 `FlowStatsRequest`.
    FlowV0x01 { table_id: u8, out_port: u16 },
    /// v0x04 `FlowStatsRequest`.
    FlowV0x04 {
        table_id: u8,
        out_port: u32,
        out_group: u32,
    },
    /// v0x01 `AggregateStatsRequest`.
    AggregateV0x01 { table_id: u8, out_port: u16 },
    /// v0x04 `AggregateStatsRequest`.
    AggregateV0x04 {
        table_id: u8,
        out_port: u32,
        out_group: u32,
    },
}

impl RequestBody {
    /// Wildcard port-stats body for the given version.
    pub fn all_ports(version: ProtocolVersion) -> Self {
        match version {
            ProtocolVersion::V0x01 => Self::PortV0x01 {
                port_no: wire::OFPP_NONE,
            },
            ProtocolVersion::V0x04 => Self::PortV0x04 {
                port_no: wire::OFPP_ANY,
            },
        }
    }

    /// Wildcard flow-stats body for the given version.
    pub fn all_flows(version: ProtocolVersion) -> Self {
        match version {
            ProtocolVersion::V0x01 => Self::FlowV0x01 {
                table_id: wire::OFPTT_ALL,
                out_port: wire::OFPP_NONE,
            },
            ProtocolVersion::V0x04 => Self::FlowV0x04 {
                table_id: wire::OFPTT_ALL,
                out_port: wire::OFPP_ANY,
                out_group: wire::OFPG_ANY,
            },
        }
    }

    /// Wildcard aggregate-stats body for the given version.
    pub fn all_aggregate(version: ProtocolVersion) -> Self {
        match version {
            ProtocolVersion::V0x01 => Self::AggregateV0x01 {
                table_id: wire::OFPTT_ALL,
                out_port: wire::OFPP_NONE,
            },
            ProtocolVersion::V0x04 => Self::AggregateV0x04 {
                table_id: wire::OFPTT_ALL,
                out_port: wire::OFPP_ANY,
                out_group: wire::OFPG_ANY,
            },
        }
    }

    /// Protocol version this body is shaped for.
    pub fn version(&self) -> ProtocolVersion {
        match self {
            Self::PortV0x01 { .. } | Self::FlowV0x01 { .. } | Self::AggregateV0x01 { .. } => {
                ProtocolVersion::V0x01
            }
            Self::PortV0x04 { .. } | Self::FlowV0x04 { .. } | Self::AggregateV0x04 { .. } => {
                ProtocolVersion::V0x04
            }
        }
    }
}

/// An outbound statistics request.
///
/// Immutable once built; owned by the transport layer after hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatRequest {
    pub kind: StatsKind,
    pub body: RequestBody,
}

impl StatRequest {
    pub fn new(kind: StatsKind, body: RequestBody) -> Self {
        Self { kind, body }
    }
}

// =============================================================================
// Inbound replies
// =============================================================================

/// Raw per-port record from a port-stats reply.
///
/// Counters are cumulative values reported by the switch, carried as
/// opaque unsigned integers. The v0x01 16-bit port number is widened
/// to 32 bits during envelope conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPortEntry {
    pub port_no: u32,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
}

/// Raw per-flow record from a flow-stats reply.
///
/// Carries the identity fields the flow factory needs plus the counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFlowEntry {
    pub table_id: u8,
    pub priority: u16,
    /// Match fields in wire order, already decoded to name/value pairs
    /// by the transport collaborator.
    pub match_fields: BTreeMap<String, String>,
    pub packet_count: u64,
    pub byte_count: u64,
}

/// Raw record from an aggregate-stats reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAggregateEntry {
    pub packet_count: u64,
    pub byte_count: u64,
    pub flow_count: u32,
}

/// Homogeneous sequence of raw reply records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEntries {
    Port(Vec<RawPortEntry>),
    Flow(Vec<RawFlowEntry>),
    Aggregate(Vec<RawAggregateEntry>),
}

impl RawEntries {
    /// Number of per-entity records in the reply body.
    pub fn len(&self) -> usize {
        match self {
            Self::Port(v) => v.len(),
            Self::Flow(v) => v.len(),
            Self::Aggregate(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kind the entry sequence belongs to.
    pub fn kind(&self) -> StatsKind {
        match self {
            Self::Port(_) => StatsKind::Port,
            Self::Flow(_) => StatsKind::Flow,
            Self::Aggregate(_) => StatsKind::Aggregate,
        }
    }
}

/// A version-normalized statistics reply.
///
/// The two reply envelopes name their kind tag differently (`body_type`
/// vs `multipart_type`) but share the same value space and semantic
/// fields. Conversion is explicit per version rather than assumed
/// structurally; see [`V0x01StatsReply`] and [`V0x04MultipartReply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatReply {
    pub kind: StatsKind,
    /// Encoding that produced this reply; kept so normalizers can apply
    /// version-aware collaborators (e.g. the flow identity factory).
    pub version: ProtocolVersion,
    pub entries: RawEntries,
}

/// v0x01 `ofpt_stats_reply` envelope as delivered by the transport.
#[derive(Debug, Clone)]
pub struct V0x01StatsReply {
    pub body_type: u16,
    pub body: RawEntries,
}

/// v0x04 `ofpt_multipart_reply` envelope as delivered by the transport.
#[derive(Debug, Clone)]
pub struct V0x04MultipartReply {
    pub multipart_type: u16,
    pub body: RawEntries,
}

impl StatReply {
    /// Normalize a v0x01 reply, reading the kind from `body_type`.
    ///
    /// # Errors
    /// Returns `UnknownKind` if the code has no kind in this engine.
    pub fn from_v0x01(reply: V0x01StatsReply) -> Result<Self, StatsError> {
        let kind = StatsKind::from_wire_code(reply.body_type)?;
        Ok(Self {
            kind,
            version: ProtocolVersion::V0x01,
            entries: reply.body,
        })
    }

    /// Normalize a v0x04 reply, reading the kind from `multipart_type`.
    ///
    /// # Errors
    /// Returns `UnknownKind` if the code has no kind in this engine.
    pub fn from_v0x04(reply: V0x04MultipartReply) -> Result<Self, StatsError> {
        let kind = StatsKind::from_wire_code(reply.multipart_type)?;
        Ok(Self {
            kind,
            version: ProtocolVersion::V0x04,
            entries: reply.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_codes() {
        assert_eq!(StatsKind::Flow.wire_code(), 1);
        assert_eq!(StatsKind::Aggregate.wire_code(), 2);
        assert_eq!(StatsKind::Port.wire_code(), 4);
    }

    #[test]
    fn test_kind_from_wire_code_roundtrip() {
        for kind in [StatsKind::Flow, StatsKind::Aggregate, StatsKind::Port] {
            assert_eq!(StatsKind::from_wire_code(kind.wire_code()).unwrap(), kind);
        }
    }

    #[test]
    fn test_kind_from_wire_code_unknown() {
        // OFPST_TABLE is real protocol but not handled by this engine.
        let err = StatsKind::from_wire_code(3).unwrap_err();
        assert!(matches!(err, StatsError::UnknownKind { code: 3 }));
    }

    #[test]
    fn test_version_bytes() {
        assert_eq!(ProtocolVersion::V0x01.wire(), 0x01);
        assert_eq!(ProtocolVersion::V0x04.wire(), 0x04);
        assert_eq!(
            ProtocolVersion::from_wire(0x04).unwrap(),
            ProtocolVersion::V0x04
        );
        assert!(matches!(
            ProtocolVersion::from_wire(0x05),
            Err(StatsError::UnsupportedProtocolVersion(0x05))
        ));
    }

    #[test]
    fn test_request_bodies_use_wildcards() {
        match RequestBody::all_ports(ProtocolVersion::V0x01) {
            RequestBody::PortV0x01 { port_no } => assert_eq!(port_no, wire::OFPP_NONE),
            other => panic!("unexpected body: {other:?}"),
        }
        match RequestBody::all_flows(ProtocolVersion::V0x04) {
            RequestBody::FlowV0x04 {
                table_id,
                out_port,
                out_group,
            } => {
                assert_eq!(table_id, wire::OFPTT_ALL);
                assert_eq!(out_port, wire::OFPP_ANY);
                assert_eq!(out_group, wire::OFPG_ANY);
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_request_body_version() {
        assert_eq!(
            RequestBody::all_aggregate(ProtocolVersion::V0x01).version(),
            ProtocolVersion::V0x01
        );
        assert_eq!(
            RequestBody::all_aggregate(ProtocolVersion::V0x04).version(),
            ProtocolVersion::V0x04
        );
    }

    #[test]
    fn test_reply_normalization_reads_version_field() {
        let entries = RawEntries::Aggregate(vec![RawAggregateEntry {
            packet_count: 10,
            byte_count: 1000,
            flow_count: 2,
        }]);

        let v1 = StatReply::from_v0x01(V0x01StatsReply {
            body_type: wire::STATS_AGGREGATE,
            body: entries.clone(),
        })
        .unwrap();
        let v4 = StatReply::from_v0x04(V0x04MultipartReply {
            multipart_type: wire::STATS_AGGREGATE,
            body: entries,
        })
        .unwrap();

        assert_eq!(v1.kind, StatsKind::Aggregate);
        assert_eq!(v4.kind, StatsKind::Aggregate);
        assert_eq!(v1.version, ProtocolVersion::V0x01);
        assert_eq!(v4.version, ProtocolVersion::V0x04);
        assert_eq!(v1.entries, v4.entries);
    }

    #[test]
    fn test_reply_normalization_unknown_code() {
        let reply = V0x01StatsReply {
            body_type: 5, // OFPST_QUEUE
            body: RawEntries::Port(vec![]),
        };
        assert!(matches!(
            StatReply::from_v0x01(reply),
            Err(StatsError::UnknownKind { code: 5 })
        ));
    }
}
