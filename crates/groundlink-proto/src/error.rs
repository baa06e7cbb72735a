use thiserror::Error;

/// Errors produced by the wire layer.
///
/// `MalformedFrame` and `UnknownOp` are per-segment: one bad segment in a
/// multi-frame message never aborts the segments around it.
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("malformed frame: {reason}")]
    MalformedFrame { segment: String, reason: String },

    #[error("unknown op '{op}'")]
    UnknownOp { op: String },

    #[error("failed to encode envelope: {0}")]
    Encode(String),

    #[error("payload does not match expected shape: {0}")]
    PayloadShape(String),

    #[error("register payload has wrong width: expected {expected} bytes, got {got}")]
    RegisterWidth { expected: usize, got: usize },
}
