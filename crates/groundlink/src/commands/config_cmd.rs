//! Preferences command handlers. These never touch the bridge.

use groundlink_config::{Preferences, config_path};

use crate::cli::{ConfigArgs, ConfigCommand};
use crate::error::CliError;

pub fn handle(args: ConfigArgs) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let prefs = Preferences::load()?;
            println!("host:       {}", prefs.host);
            println!("port:       {}", prefs.port);
            println!("theme:      {:?}", prefs.theme);
            println!("gps_format: {:?}", prefs.gps_format);
            println!();
            println!("file: {}", config_path()?.display());
            Ok(())
        }

        ConfigCommand::Set {
            host,
            port,
            theme,
            gps_format,
        } => {
            let mut prefs = Preferences::load()?;
            if let Some(host) = host {
                prefs.host = host;
            }
            if let Some(port) = port {
                prefs.port = port;
            }
            if let Some(theme) = theme {
                prefs.theme = theme.into();
            }
            if let Some(gps_format) = gps_format {
                prefs.gps_format = gps_format.into();
            }

            // The record is always rewritten whole.
            prefs.save()?;
            println!("saved to {}", config_path()?.display());
            Ok(())
        }
    }
}
