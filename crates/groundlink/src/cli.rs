//! Command-line interface definition.

use clap::{Args, Parser, Subcommand, ValueEnum};

use groundlink_core::{SystemMode, SystemState};

#[derive(Debug, Parser)]
#[command(
    name = "groundlink",
    about = "Terminal client for the robot telemetry bridge",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Bridge host (overrides preferences).
    #[arg(long, global = true, env = "GROUNDLINK_HOST")]
    pub host: Option<String>,

    /// Bridge port (overrides preferences).
    #[arg(long, global = true, env = "GROUNDLINK_PORT")]
    pub port: Option<u16>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect and stream telemetry until interrupted.
    Watch(WatchArgs),

    /// Inspect or switch configuration presets.
    Presets(PresetsArgs),

    /// Show or push the robot system state.
    State(StateArgs),

    /// Read or write register-bus values.
    Conbus(ConbusArgs),

    /// Show or edit persisted preferences.
    Config(ConfigArgs),
}

// ── watch ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Only show frames for this exact topic.
    #[arg(long)]
    pub topic: Option<String>,
}

// ── presets ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PresetsArgs {
    #[command(subcommand)]
    pub command: PresetsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PresetsCommand {
    /// List presets and mark the active one.
    List,

    /// Make a preset active.
    Set { name: String },

    /// Save the active preset in place.
    Save,

    /// Save the active preset under a new name.
    SaveAs { name: String },

    /// Delete a preset.
    Delete { name: String },
}

// ── state ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StateArgs {
    #[command(subcommand)]
    pub command: StateCommand,
}

#[derive(Debug, Subcommand)]
pub enum StateCommand {
    /// Show the last reported system state.
    Show,

    /// Push a new system state to the robot.
    Set {
        #[arg(long, value_enum)]
        state: StateArg,

        #[arg(long, value_enum)]
        mode: ModeArg,

        #[arg(long)]
        mobility: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StateArg {
    Disabled,
    Autonomous,
    Manual,
    Shutdown,
}

impl From<StateArg> for SystemState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Disabled => Self::Disabled,
            StateArg::Autonomous => Self::Autonomous,
            StateArg::Manual => Self::Manual,
            StateArg::Shutdown => Self::Shutdown,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Competition,
    Simulation,
    Practice,
}

impl From<ModeArg> for SystemMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Competition => Self::Competition,
            ModeArg::Simulation => Self::Simulation,
            ModeArg::Practice => Self::Practice,
        }
    }
}

// ── conbus ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConbusArgs {
    #[command(subcommand)]
    pub command: ConbusCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConbusCommand {
    /// Read one register, or every register with address 255.
    Read {
        device: u8,

        #[arg(default_value_t = 0xFF)]
        address: u8,
    },

    /// Write a register. The value is parsed per the descriptor table
    /// (bool/int/uint/float).
    Write {
        device: u8,
        address: u8,
        value: String,
    },
}

// ── config ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the persisted preferences and their file path.
    Show,

    /// Update preferences. Only the given fields change; the whole
    /// record is rewritten.
    Set {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        #[arg(long, value_enum)]
        theme: Option<ThemeArg>,

        #[arg(long, value_enum)]
        gps_format: Option<GpsFormatArg>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ThemeArg {
    Dark,
    Light,
}

impl From<ThemeArg> for groundlink_config::Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Dark => Self::Dark,
            ThemeArg::Light => Self::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GpsFormatArg {
    Decimal,
    Dms,
}

impl From<GpsFormatArg> for groundlink_config::GpsFormat {
    fn from(arg: GpsFormatArg) -> Self {
        match arg {
            GpsFormatArg::Decimal => Self::Decimal,
            GpsFormatArg::Dms => Self::Dms,
        }
    }
}
