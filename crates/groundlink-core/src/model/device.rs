use serde::{Deserialize, Serialize};

/// Lifecycle code a node reports for itself.
///
/// Entries appear in the cache lazily as nodes report in; the client
/// never invents one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceLifecycle {
    Off,
    Standby,
    Ready,
    Operating,
}

impl DeviceLifecycle {
    /// Map a wire code to a lifecycle state. Unknown codes return `None`
    /// and the update is dropped.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::Standby),
            2 => Some(Self::Ready),
            3 => Some(Self::Operating),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Standby => 1,
            Self::Ready => 2,
            Self::Operating => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Standby => "Standby",
            Self::Ready => "Ready",
            Self::Operating => "Operating",
        }
    }
}

impl std::fmt::Display for DeviceLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
