// ── Domain model ──

mod descriptor;
mod device;
mod system;

pub use descriptor::{DescriptorTable, DeviceDescriptor, RegisterDescriptor};
pub use device::DeviceLifecycle;
pub use system::{SystemMode, SystemState, SystemStatus};

use chrono::{DateTime, Utc};

/// One replayed log line from the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub node: String,
    pub message: String,
    pub received_at: DateTime<Utc>,
}
