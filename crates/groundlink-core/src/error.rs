// ── Core error types ──
//
// Consumers of this crate never see tungstenite or serde errors raw;
// transport and wire failures are translated into these variants.

use thiserror::Error;

use groundlink_proto::ProtoError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cannot connect to bridge at {url}: {reason}")]
    ConnectFailed { url: String, reason: String },

    #[error("bridge disconnected")]
    BridgeDisconnected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid bridge address: {0}")]
    InvalidAddress(String),

    #[error(transparent)]
    Protocol(#[from] ProtoError),

    #[error("internal error: {0}")]
    Internal(String),
}
