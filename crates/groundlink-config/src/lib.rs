//! Persisted dashboard preferences.
//!
//! One TOML record (`host`, `port`, `theme`, `gps_format`) under the
//! platform config directory, created with defaults on first run and
//! overwritten wholesale on every change. Values load through figment
//! so `GROUNDLINK_*` environment variables override the file.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default bridge port.
const DEFAULT_PORT: u16 = 8023;

const FILE_NAME: &str = "preferences.toml";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no usable config directory on this platform")]
    NoConfigDir,

    #[error("failed to serialize preferences: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("preferences loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Preference values ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// How latitude/longitude pairs are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpsFormat {
    /// Decimal degrees, e.g. `35.210716, -97.441692`.
    #[default]
    Decimal,
    /// Degrees/minutes/seconds, e.g. `35°12'38.6"N 97°26'30.1"W`.
    Dms,
}

/// The persisted preference record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub gps_format: GpsFormat,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: DEFAULT_PORT,
            theme: Theme::default(),
            gps_format: GpsFormat::default(),
        }
    }
}

impl Preferences {
    /// Load from the standard path. A missing file yields defaults; a
    /// present file is merged over them, and `GROUNDLINK_*` environment
    /// variables win over both.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let prefs = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("GROUNDLINK_"))
            .extract()?;
        Ok(prefs)
    }

    /// Write the whole record to the standard path, creating parent
    /// directories on first run.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Platform config path for the preferences file.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from("", "soro-robotics", "groundlink")
        .ok_or(ConfigError::NoConfigDir)?;
    Ok(dirs.config_dir().join(FILE_NAME))
}

// ── Tests ───────────────────────────────────────────────────────────
