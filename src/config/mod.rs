//! Configuration parsing and resolution.
//!
//! Two inputs feed a run: tracker description files (one per tracker, in the
//! plugins directory, see [`trackers`]) and the user configuration file
//! described here, which holds global settings and the per-tracker user
//! records (credentials, enablement, listing overrides). The [`resolve`]
//! module combines both into the immutable trackers the engine consumes.

/// Load-time resolution of tracker descriptions against user records.
pub mod resolve;

/// Tracker description files and their discovery.
pub mod trackers;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The user configuration file: global settings plus per-tracker records.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,

    /// Per-tracker user records, keyed by tracker name.
    #[serde(default)]
    pub trackers: HashMap<String, UserRecord>,
}

/// Global settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Overrides the tracker description directory.
    #[serde(default)]
    pub plugins_dir: Option<PathBuf>,

    /// Default destination for the sync phase.
    #[serde(default)]
    pub watch_folder: Option<PathBuf>,

    /// User agent handed to the fetcher.
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Explicit path of the wget binary; otherwise looked up on PATH.
    #[serde(default)]
    pub wget_path: Option<PathBuf>,

    /// Mail command used for notifications.
    #[serde(default = "default_mailer")]
    pub mailer: String,
}

/// One user's record for a tracker: enablement, credentials, and an
/// optional listing override used when the tracker description defers its
/// listing to the user configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Listing entries used by trackers that declare `listing = "config"`.
    #[serde(default)]
    pub listings: Vec<trackers::ListingEntry>,

    /// Free-form string credentials (`user`, `password`, ...), referenced
    /// by name from login field descriptions.
    #[serde(flatten)]
    pub credentials: HashMap<String, String>,
}

fn default_mailer() -> String {
    "msmtp".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            plugins_dir: None,
            watch_folder: None,
            user_agent: None,
            wget_path: None,
            mailer: default_mailer(),
        }
    }
}

impl Config {
    /// Loads the user configuration.
    ///
    /// Returns `Ok(None)` when the file does not exist; the caller decides
    /// how loudly to complain.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        Ok(Some(config))
    }

    /// User record for a tracker name, if any.
    #[must_use]
    pub fn record(&self, name: &str) -> Option<&UserRecord> {
        self.trackers.get(name)
    }
}
