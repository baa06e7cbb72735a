//! Preset command handlers.

use tabled::{Table, Tabled, settings::Style};

use groundlink_config::Preferences;
use groundlink_core::Bridge;

use crate::cli::{GlobalOpts, PresetsArgs, PresetsCommand};
use crate::error::CliError;

use super::{connect, wait_until};

#[derive(Tabled)]
struct PresetRow {
    #[tabled(rename = "Preset")]
    name: String,
    #[tabled(rename = "Active")]
    active: &'static str,
}

pub async fn handle(
    args: PresetsArgs,
    prefs: &Preferences,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let bridge = connect(prefs, global).await?;
    let result = run(&bridge, args).await;
    bridge.shutdown().await;
    result
}

async fn run(bridge: &Bridge, args: PresetsArgs) -> Result<(), CliError> {
    let cache = bridge.cache().clone();

    match args.command {
        PresetsCommand::List => {
            // The handshake already asked; just wait for the reply.
            wait_until("preset list", || cache.presets().is_some()).await?;
        }

        PresetsCommand::Set { name } => {
            bridge.set_active_preset(name.as_str());
            wait_until("preset switch to confirm", || {
                cache
                    .presets()
                    .is_some_and(|report| report.active_preset == name)
            })
            .await?;
        }

        PresetsCommand::Save => {
            let rx = cache.subscribe();
            let version = *rx.borrow();
            bridge.save_preset_mode();
            wait_until("save to confirm", || {
                *rx.borrow() > version && cache.presets().is_some()
            })
            .await?;
        }

        PresetsCommand::SaveAs { name } => {
            bridge.save_preset_as(name.as_str());
            wait_until("new preset to appear", || {
                cache
                    .presets()
                    .is_some_and(|report| report.presets.contains(&name))
            })
            .await?;
        }

        PresetsCommand::Delete { name } => {
            bridge.delete_preset(name.as_str());
            wait_until("preset removal to confirm", || {
                cache
                    .presets()
                    .is_some_and(|report| !report.presets.contains(&name))
            })
            .await?;
        }
    }

    print_presets(bridge)
}

fn print_presets(bridge: &Bridge) -> Result<(), CliError> {
    let report = bridge.cache().presets().ok_or(CliError::NotFound {
        what: "preset list".into(),
    })?;

    let rows: Vec<PresetRow> = report
        .presets
        .iter()
        .map(|name| PresetRow {
            name: name.clone(),
            active: if *name == report.active_preset {
                "*"
            } else {
                ""
            },
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}
