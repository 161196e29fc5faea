//! Statistics handlers and their type registry.
//!
//! One handler per statistics kind, each covering both protocol
//! versions: it builds version-shaped requests and normalizes raw reply
//! entries into state updates and persistence instructions.
//!
//! # Architecture
//!
//! - [`StatsHandler`]: per-kind request builder + reply normalizer
//! - [`StatsRegistry`]: immutable kind-to-handler mapping, built once at
//!   startup and shared lock-free across the scheduler and dispatcher
//! - [`PortStatsHandler`] / [`FlowStatsHandler`] / [`AggregateStatsHandler`]:
//!   the three kinds this engine polls

pub mod aggregate;
pub mod flow;
pub mod port;
mod registry;
mod traits;

pub use aggregate::{AggregateKey, AggregateStatsHandler};
pub use flow::FlowStatsHandler;
pub use port::PortStatsHandler;
pub use registry::{StatsRegistry, StatsRegistryBuilder};
pub use traits::StatsHandler;
