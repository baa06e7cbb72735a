// ── Runtime connection configuration ──
//
// Describes *how* to reach the bridge and how the session paces itself.
// Never touches disk -- the CLI builds one of these from preferences and
// hands it in.

use std::time::Duration;

use uuid::Uuid;

use crate::error::CoreError;
use crate::model::DescriptorTable;

/// Configuration for one bridge link.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bridge hostname or IP.
    pub host: String,

    /// Bridge port.
    pub port: u16,

    /// Fixed delay between a close and the next connection attempt.
    /// The link retries forever; there is no backoff growth and no cap.
    pub reconnect_delay: Duration,

    /// Send-queue drain cadence. One queued frame leaves per tick.
    pub drain_interval: Duration,

    /// Delay before the follow-up presets refresh after connect.
    pub preset_refresh_delay: Duration,

    /// Poll cadence while waiting for the CAN bridge node to come up
    /// before the register sweep starts.
    pub conbus_poll_interval: Duration,

    /// Gap between successive per-device read-all instructions in the
    /// register sweep.
    pub conbus_stagger: Duration,

    /// Static register-bus device descriptor table.
    pub descriptors: DescriptorTable,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8023,
            reconnect_delay: Duration::from_secs(1),
            drain_interval: Duration::from_millis(10),
            preset_refresh_delay: Duration::from_secs(3),
            conbus_poll_interval: Duration::from_millis(500),
            conbus_stagger: Duration::from_millis(250),
            descriptors: DescriptorTable::builtin(),
        }
    }
}

impl BridgeConfig {
    /// WebSocket URL for one connection attempt. Each attempt carries a
    /// fresh client id so the bridge can tell sessions apart.
    pub fn url(&self, client_id: Uuid) -> Result<url::Url, CoreError> {
        let raw = format!("ws://{}:{}/?id={}", self.host, self.port, client_id);
        raw.parse()
            .map_err(|e: url::ParseError| CoreError::InvalidAddress(format!("{raw}: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn url_carries_client_id() {
        let config = BridgeConfig::default();
        let id = Uuid::new_v4();
        let url = config.url(id).unwrap();
        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.port(), Some(8023));
        assert_eq!(url.query(), Some(format!("id={id}").as_str()));
    }
}
