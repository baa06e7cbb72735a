// groundlink-core: Session management and reactive state for the
// telemetry bridge link. Sits between groundlink-proto (pure wire data)
// and consumers (the CLI).

pub mod bridge;
pub mod config;
pub mod correlator;
pub mod error;
mod handlers;
pub mod model;
pub mod queue;
pub mod router;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use correlator::Correlator;
pub use error::CoreError;
pub use queue::SendQueue;
pub use router::TopicRouter;
pub use session::{LinkState, Notice, TopicUpdate};
pub use store::SessionCache;

pub use model::{
    DescriptorTable, DeviceDescriptor, DeviceLifecycle, LogEntry, RegisterDescriptor, SystemMode,
    SystemState, SystemStatus,
};
