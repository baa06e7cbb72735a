//! System state command handlers.

use groundlink_config::Preferences;
use groundlink_core::SystemStatus;

use crate::cli::{GlobalOpts, StateArgs, StateCommand};
use crate::error::CliError;

use super::{connect, drain, wait_until};

pub async fn handle(
    args: StateArgs,
    prefs: &Preferences,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let bridge = connect(prefs, global).await?;
    let cache = bridge.cache().clone();

    let result = match args.command {
        StateCommand::Show => {
            // The handshake's node report carries the system tuple.
            wait_until("system state report", || cache.system().is_some())
                .await
                .map(|()| {
                    if let Some(status) = cache.system() {
                        println!("{status}");
                    }
                })
        }

        StateCommand::Set {
            state,
            mode,
            mobility,
        } => {
            let status = SystemStatus {
                state: state.into(),
                mode: mode.into(),
                mobility,
            };
            bridge.set_system_state(status);
            drain(&bridge).await.map(|()| {
                println!("pushed: {status}");
            })
        }
    };

    bridge.shutdown().await;
    result
}
