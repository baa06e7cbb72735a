//! Live telemetry stream.
//!
//! Unlike the one-shot commands, `watch` never gives up on the link: it
//! rides the session's own reconnect loop and just narrates what
//! happens, the way the dashboard does.

use owo_colors::OwoColorize;
use tokio::sync::broadcast::error::RecvError;

use groundlink_config::Preferences;
use groundlink_core::{Bridge, Notice};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::bridge_config;

pub async fn handle(
    args: WatchArgs,
    prefs: &Preferences,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let config = bridge_config(prefs, global);
    println!(
        "watching {}:{} (ctrl-c to quit)",
        config.host, config.port
    );

    let bridge = Bridge::new(config);
    let mut notices = bridge.notices();
    let mut updates = bridge.updates();
    bridge.connect();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            notice = notices.recv() => match notice {
                Ok(notice) => print_notice(notice),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },

            update = updates.recv() => match update {
                Ok(update) => {
                    if let Some(ref topic) = args.topic {
                        if update.topic != *topic {
                            continue;
                        }
                    }
                    println!("{}", output::render_update(&update, prefs.gps_format));
                }
                Err(RecvError::Lagged(missed)) => {
                    eprintln!("{}", format!("(display fell behind, skipped {missed} frames)").dimmed());
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    bridge.shutdown().await;
    Ok(())
}

fn print_notice(notice: Notice) {
    match notice {
        Notice::Connected => println!("{}", "connected to the bridge".green()),
        Notice::UpdatingData => println!("{}", "updating data...".yellow()),
        Notice::Disconnected => println!("{}", "disconnected from the bridge".red()),
    }
}
