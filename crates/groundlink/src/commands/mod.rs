//! Command handlers and shared connection helpers.

pub mod conbus;
pub mod config_cmd;
pub mod presets;
pub mod state;
pub mod watch;

use std::time::Duration;

use tokio::time::timeout;

use groundlink_config::Preferences;
use groundlink_core::{Bridge, BridgeConfig, LinkState};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn dispatch(
    command: Command,
    prefs: &Preferences,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match command {
        Command::Watch(args) => watch::handle(args, prefs, global).await,
        Command::Presets(args) => presets::handle(args, prefs, global).await,
        Command::State(args) => state::handle(args, prefs, global).await,
        Command::Conbus(args) => conbus::handle(args, prefs, global).await,
        Command::Config(args) => config_cmd::handle(args),
    }
}

// ── Shared helpers ──────────────────────────────────────────────────

pub(crate) fn bridge_config(prefs: &Preferences, global: &GlobalOpts) -> BridgeConfig {
    BridgeConfig {
        host: global.host.clone().unwrap_or_else(|| prefs.host.clone()),
        port: global.port.unwrap_or(prefs.port),
        ..BridgeConfig::default()
    }
}

/// Spawn a bridge link and wait for it to open.
pub(crate) async fn connect(
    prefs: &Preferences,
    global: &GlobalOpts,
) -> Result<Bridge, CliError> {
    let config = bridge_config(prefs, global);
    let host = config.host.clone();
    let port = config.port;

    let bridge = Bridge::new(config);
    bridge.connect();

    let mut link = bridge.link_state();
    let opened = timeout(CONNECT_TIMEOUT, async {
        loop {
            if *link.borrow_and_update() == LinkState::Open {
                return;
            }
            if link.changed().await.is_err() {
                return;
            }
        }
    })
    .await;

    if opened.is_err() || *bridge.link_state().borrow() != LinkState::Open {
        bridge.shutdown().await;
        return Err(CliError::Connection { host, port });
    }
    Ok(bridge)
}

/// Poll until `predicate` holds, or fail with a timeout naming `what`.
pub(crate) async fn wait_until(
    what: &str,
    mut predicate: impl FnMut() -> bool,
) -> Result<(), CliError> {
    timeout(REPLY_TIMEOUT, async {
        while !predicate() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .map_err(|_| CliError::Timeout { what: what.into() })
}

/// Wait for the send queue to empty so queued commands actually left.
pub(crate) async fn drain(bridge: &Bridge) -> Result<(), CliError> {
    wait_until("send queue to drain", || bridge.pending_sends() == 0).await
}
