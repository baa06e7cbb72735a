//! Register bus framing.
//!
//! Conbus traffic rides in `data` frames on the conbus topic (inbound)
//! and `conbus` envelopes (outbound). The numeric id encodes direction
//! and device: instructions are `base + device`, responses come back in
//! the `[1100, 1200)` (read) and `[1300, 1400)` (write) ranges. Ids
//! outside those ranges are not ours and are dropped without comment.

use serde::{Deserialize, Serialize};

use crate::envelope::ConbusFrame;
use crate::error::ProtoError;

pub const READ_INSTRUCTION_BASE: u16 = 1000;
pub const READ_RESPONSE_BASE: u16 = 1100;
pub const WRITE_INSTRUCTION_BASE: u16 = 1200;
pub const WRITE_RESPONSE_BASE: u16 = 1300;

/// Device-id window width for each range.
const RANGE_WIDTH: u16 = 100;

/// Register address that asks a device to dump every register.
pub const READ_ALL: u8 = 0xFF;

// ── Instructions ─────────────────────────────────────────────────────

/// Build a read instruction for one register (or all, via [`READ_ALL`]).
pub fn read_instruction(device: u8, address: u8, iterator: Option<u64>) -> ConbusFrame {
    ConbusFrame {
        id: READ_INSTRUCTION_BASE + u16::from(device),
        data: vec![address],
        iterator,
    }
}

/// Build a write instruction carrying a register value payload.
pub fn write_instruction(
    device: u8,
    address: u8,
    payload: &[u8],
    iterator: Option<u64>,
) -> ConbusFrame {
    let mut data = Vec::with_capacity(1 + payload.len());
    data.push(address);
    data.extend_from_slice(payload);
    ConbusFrame {
        id: WRITE_INSTRUCTION_BASE + u16::from(device),
        data,
        iterator,
    }
}

// ── Responses ────────────────────────────────────────────────────────

/// A classified inbound register-bus frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConbusResponse {
    Read {
        device: u8,
        address: u8,
        data: Vec<u8>,
    },
    Write {
        device: u8,
        address: u8,
        data: Vec<u8>,
    },
}

impl ConbusResponse {
    pub fn device(&self) -> u8 {
        match self {
            Self::Read { device, .. } | Self::Write { device, .. } => *device,
        }
    }

    pub fn address(&self) -> u8 {
        match self {
            Self::Read { address, .. } | Self::Write { address, .. } => *address,
        }
    }

    pub fn data(&self) -> &[u8] {
        match self {
            Self::Read { data, .. } | Self::Write { data, .. } => data,
        }
    }
}

/// Classify an inbound frame by id range.
///
/// Returns `None` for ids outside both response ranges and for frames
/// with no address byte -- both are ignored, never errors.
pub fn parse_response(id: u16, data: &[u8]) -> Option<ConbusResponse> {
    let (&address, payload) = data.split_first()?;

    if (READ_RESPONSE_BASE..READ_RESPONSE_BASE + RANGE_WIDTH).contains(&id) {
        #[allow(clippy::cast_possible_truncation)]
        let device = (id - READ_RESPONSE_BASE) as u8;
        return Some(ConbusResponse::Read {
            device,
            address,
            data: payload.to_vec(),
        });
    }

    if (WRITE_RESPONSE_BASE..WRITE_RESPONSE_BASE + RANGE_WIDTH).contains(&id) {
        #[allow(clippy::cast_possible_truncation)]
        let device = (id - WRITE_RESPONSE_BASE) as u8;
        return Some(ConbusResponse::Write {
            device,
            address,
            data: payload.to_vec(),
        });
    }

    None
}

// ── Register value codecs ────────────────────────────────────────────

/// Wire type of a register, as declared by the device descriptor table.
///
/// The displayed type is determined solely by the descriptor entry,
/// never inferred from payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterType {
    Bool,
    Int,
    Uint,
    Float,
}

/// A decoded register value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegisterValue {
    Bool(bool),
    Int(i32),
    Uint(u32),
    Float(f32),
}

impl RegisterValue {
    /// Decode raw register bytes according to the declared type.
    /// Multi-byte values are little-endian.
    pub fn decode(ty: RegisterType, bytes: &[u8]) -> Result<Self, ProtoError> {
        match ty {
            RegisterType::Bool => match bytes {
                [b] => Ok(Self::Bool(*b != 0)),
                _ => Err(width_error(1, bytes.len())),
            },
            RegisterType::Int => Ok(Self::Int(i32::from_le_bytes(four(bytes)?))),
            RegisterType::Uint => Ok(Self::Uint(u32::from_le_bytes(four(bytes)?))),
            RegisterType::Float => Ok(Self::Float(f32::from_le_bytes(four(bytes)?))),
        }
    }

    /// Encode back to raw register bytes.
    pub fn to_bytes(self) -> Vec<u8> {
        match self {
            Self::Bool(b) => vec![u8::from(b)],
            Self::Int(v) => v.to_le_bytes().to_vec(),
            Self::Uint(v) => v.to_le_bytes().to_vec(),
            Self::Float(v) => v.to_le_bytes().to_vec(),
        }
    }

    pub fn register_type(self) -> RegisterType {
        match self {
            Self::Bool(_) => RegisterType::Bool,
            Self::Int(_) => RegisterType::Int,
            Self::Uint(_) => RegisterType::Uint,
            Self::Float(_) => RegisterType::Float,
        }
    }
}

impl std::fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:.6}"),
        }
    }
}

fn four(bytes: &[u8]) -> Result<[u8; 4], ProtoError> {
    bytes
        .try_into()
        .map_err(|_| width_error(4, bytes.len()))
}

fn width_error(expected: usize, got: usize) -> ProtoError {
    ProtoError::RegisterWidth { expected, got }
}

// ── Tests ────────────────────────────────────────────────────────────
