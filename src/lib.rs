//! ofpoll - OpenFlow switch statistics polling engine
//!
//! This crate polls connected switches for traffic statistics over a
//! request/reply protocol, normalizes replies from two incompatible wire
//! encodings behind one dispatch table, updates in-memory switch and
//! interface state, and forwards measurements to a storage collaborator.
//!
//! # Architecture
//!
//! - **Registry**: immutable mapping from statistics kind to handler
//! - **Handlers**: per-kind request builders and reply normalizers
//!   (port, flow, aggregate), covering both protocol versions
//! - **Poll scheduler**: fixed-interval loop issuing requests to every
//!   connected switch
//! - **Dispatcher**: routes inbound replies to their handlers,
//!   concurrently across switches
//! - **Persistence emitter**: fire-and-forget save instructions to the
//!   storage collaborator
//!
//! Transport, the switch object model's ownership, and durable storage
//! are external collaborators reached through channels and shared
//! references; this engine never performs blocking I/O.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ofpoll::{
//!     AggregateStatsHandler, Dispatcher, Emitter, FlowStatsHandler, OutboundHandle,
//!     PollConfig, PollScheduler, PortStatsHandler, StatsRegistryBuilder, Topology,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), ofpoll::StatsError> {
//! let config = PollConfig::default();
//! let (emitter, _saves) = Emitter::channel(config.persistence_capacity);
//! let (outbound, _requests) = OutboundHandle::channel(config.outbound_capacity);
//!
//! let registry = Arc::new(
//!     StatsRegistryBuilder::new()
//!         .register(Arc::new(PortStatsHandler::new(emitter.clone())))?
//!         .register(Arc::new(FlowStatsHandler::new(emitter.clone())))?
//!         .register(Arc::new(AggregateStatsHandler::new(
//!             emitter,
//!             config.aggregate_key(),
//!         )))?
//!         .build(),
//! );
//!
//! let topology = Arc::new(Topology::new());
//! let scheduler = PollScheduler::new(
//!     Arc::clone(&topology),
//!     Arc::clone(&registry),
//!     outbound,
//!     config.poll_interval(),
//! )
//! .spawn();
//!
//! let (replies_tx, replies_rx) = tokio::sync::mpsc::channel(256);
//! # let _ = replies_tx;
//! tokio::spawn(Dispatcher::new(registry).run(replies_rx));
//!
//! scheduler.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod persist;
pub mod poller;
pub mod proto;
pub mod stats;
pub mod transport;

pub use config::PollConfig;
pub use dispatch::Dispatcher;
pub use error::StatsError;
pub use model::{
    AggregateCounters, ConnectionId, ConnectionState, Flow, FlowCounters, FlowFactory, FlowId,
    Interface, PollTarget, PortCounters, Switch, SwitchId, Topology,
};
pub use persist::{Emitter, SaveRequest};
pub use poller::{PollScheduler, SchedulerHandle};
pub use proto::{
    ProtocolVersion, RawAggregateEntry, RawEntries, RawFlowEntry, RawPortEntry, RequestBody,
    StatReply, StatRequest, StatsKind, V0x01StatsReply, V0x04MultipartReply,
};
pub use stats::{
    AggregateKey, AggregateStatsHandler, FlowStatsHandler, PortStatsHandler, StatsHandler,
    StatsRegistry, StatsRegistryBuilder,
};
pub use transport::{OutboundFrame, OutboundHandle, ReplyEvent};
