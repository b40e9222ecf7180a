//! Configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use chrono::Duration;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory scanned for timesheet files.
    pub input_dir: PathBuf,

    /// Directory chart images are written to.
    pub output_dir: PathBuf,

    /// File name suffix identifying timesheets; stripped when deriving labels.
    pub file_suffix: String,

    /// Entries longer than this many minutes produce a warning.
    pub long_interval_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("timesheets"),
            output_dir: PathBuf::from("charts"),
            file_suffix: ".csv".to_string(),
            long_interval_minutes: 5 * 60,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (TALLY_*)
        figment = figment.merge(Env::prefixed("TALLY_"));

        figment.extract()
    }

    /// The long-interval threshold. Fails for negative values and values
    /// too large for a duration.
    pub fn long_interval(&self) -> Result<Duration> {
        let minutes = self.long_interval_minutes;
        ensure!(minutes >= 0, "long_interval_minutes must not be negative, got {minutes}");
        Duration::try_minutes(minutes)
            .with_context(|| format!("long_interval_minutes is too large: {minutes}"))
    }
}

/// Returns the platform-specific config directory for tally.
///
/// On Linux: `~/.config/tally`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tally"))
}
