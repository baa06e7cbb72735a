// groundlink-proto: Wire protocol for the telemetry bridge link.
//
// Newline-delimited JSON envelopes over a persistent WebSocket. This crate
// is pure data: no I/O, no async. The session layer in groundlink-core owns
// the transport.

pub mod conbus;
pub mod envelope;
pub mod error;
pub mod topics;

pub use conbus::{ConbusResponse, RegisterType, RegisterValue};
pub use envelope::{
    ConbusFrame, ConfigFrame, DataFrame, Envelope, NodeReport, PresetReport, SystemReport,
    decode_frame, decode_frames, encode,
};
pub use error::ProtoError;
