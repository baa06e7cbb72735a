// ── Topic constants ──
//
// Topics are exact-match, case-sensitive strings. The router does no
// wildcard expansion, so these constants are the whole contract.

/// System state: `{state, mode, mobility}`.
pub const SYSTEM_STATE: &str = "/scr/state/system";

/// Per-node lifecycle transitions: `{device, state}`.
pub const DEVICE_STATE: &str = "/scr/state/device";

/// Configuration pushes from the bridge: `{device, json}`.
pub const CONFIGURATION: &str = "/scr/configuration";

/// Log lines replayed by the bridge: `{node, data}`.
pub const LOGGING: &str = "autonav/autonav_playback";

/// GPS fix: `{latitude, longitude, gps_fix, is_locked, satellites}`.
pub const GPS: &str = "/autonav/gps";

/// Fused position estimate: `{x, y, theta, latitude, longitude}`.
pub const POSITION: &str = "/autonav/position";

/// IMU sample: accelerations, angular rates, orientation.
pub const IMU: &str = "/autonav/imu";

/// Commanded velocities: `{forward_velocity, angular_velocity}`.
pub const MOTOR_INPUT: &str = "/autonav/MotorInput";

/// Odometry deltas: `{delta_x, delta_y, delta_theta}`.
pub const MOTOR_FEEDBACK: &str = "/autonav/MotorFeedback";

/// Register bus traffic: `{id, data}`.
pub const CONBUS: &str = "/autonav/conbus";

// Compressed image streams. Payload is `{format, data}` with data as a
// JPEG byte list; content is opaque to this layer.
pub const CAMERA_LEFT: &str = "/autonav/camera/compressed/left";
pub const CAMERA_RIGHT: &str = "/autonav/camera/compressed/right";
pub const FILTERED_LEFT: &str = "/autonav/cfg_space/raw/image/left_small";
pub const FILTERED_RIGHT: &str = "/autonav/cfg_space/raw/image/right_small";
pub const FILTERED_COMBINED: &str = "/autonav/cfg_space/combined/image";
