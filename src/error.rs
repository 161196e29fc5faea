//! Error taxonomy for the polling and dispatch paths.
//!
//! Every failure here is local and non-fatal: a poll cycle or a reply
//! dispatch logs the error and keeps processing the remaining switches
//! and kinds. Nothing in this crate propagates upward in a way that
//! interrupts the loops.

use thiserror::Error;

use crate::proto::StatsKind;

/// Errors raised by the statistics engine.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Reply tagged with a code no handler is registered for.
    /// Logged and dropped; other kinds keep flowing.
    #[error("no handler registered for stats code {code}")]
    UnknownKind { code: u16 },

    /// Handler is registered but a duplicate registration was attempted.
    #[error("handler for {0} already registered")]
    DuplicateKind(StatsKind),

    /// Target negotiated a version this engine has no request builder
    /// for. The target is skipped for the cycle.
    #[error("unsupported protocol version 0x{0:02x}")]
    UnsupportedProtocolVersion(u8),

    /// Outbound channel rejected the request (full or closed). The cycle
    /// continues with the remaining targets.
    #[error("failed to hand request to transport")]
    TransportSend,

    /// Persistence channel rejected the save instruction (full or
    /// closed). Never retried.
    #[error("failed to hand save instruction to storage")]
    PersistenceSend,

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// YAML parse error while loading configuration.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// I/O error while reading configuration.
    #[error("config io error: {0}")]
    ConfigIo(#[from] std::io::Error),
}
