//! # Torwatch - Tracker Watcher
//!
//! Torwatch polls a set of configured torrent trackers: it logs in where
//! required, scans listing pages for download links matching per-tracker
//! patterns, fetches the matched torrent files into a local cache, and can
//! sync the cache into a watch folder consumed by a download client.
//!
//! ## Architecture
//!
//! The codebase is organized into several key modules:
//!
//! - [`config`]: Tracker descriptions, user configuration, and load-time resolution
//! - [`auth`]: Login state detection and form authentication
//! - [`extract`]: Link extraction from fetched listing pages
//! - [`fetcher`]: The external URL fetcher contract and the wget implementation
//! - [`reconcile`]: Per-link fetch-or-notify processing
//! - [`sync`]: Cache-to-watch-folder reconciliation
//! - [`runner`]: Per-tracker orchestration
//! - [`commands`]: CLI command implementations (run, sync, clean, list)
//! - [`output`]: Console output formatting and verbosity control

/// Login state detection and form-POST authentication.
pub mod auth;

/// Charset sniffing and best-effort line transcoding for fetched pages.
pub mod charset;

/// Commands module containing all CLI command implementations.
pub mod commands;

/// Tracker descriptions, user configuration, and resolution.
pub mod config;

/// Torrent file signature detection.
pub mod detect;

/// Link extraction from listing pages.
pub mod extract;

/// External URL fetcher contract and wget implementation.
pub mod fetcher;

/// Response header parsing (attachment filenames, content encoding).
pub mod headers;

/// Single-instance lock management.
pub mod lock;

/// Mail notification composition and dispatch.
pub mod notify;

/// Console output formatting and verbosity control.
pub mod output;

/// Per-link fetch-or-notify processing.
pub mod reconcile;

/// Per-tracker orchestration.
pub mod runner;

/// Cache-to-watch-folder synchronization.
pub mod sync;

/// Utility functions and helpers.
pub mod utils;

#[cfg(test)]
pub mod test_utils;

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Current version of the torwatch binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration directory name within the home directory.
pub const DEFAULT_CONFIG_DIR: &str = ".torwatch";

/// User configuration file name within the configuration directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Cache directory name within the configuration directory.
pub const CACHE_DIR: &str = "cache";

/// Tracker description directory name within the configuration directory.
pub const PLUGINS_DIR: &str = "trackers.d";

/// Lock file name within the cache directory.
pub const LOCK_FILE: &str = ".torwatch.lock";

/// Extension of finished artifacts in the cache.
pub const TORRENT_EXT: &str = "torrent";

/// Extension of notification marker files in the cache.
pub const NOTIFY_EXT: &str = "notify";

/// Central context for a torwatch run.
///
/// Holds the resolved directory layout, the loaded user configuration and
/// the run flags. Built once from the command line and held immutably for
/// the duration of the run.
#[derive(Debug, Clone)]
pub struct WatcherContext {
    /// Directory holding the user configuration and the cache.
    pub config_dir: PathBuf,

    /// Path to the user configuration file.
    pub config_path: PathBuf,

    /// Cache directory for cookies, scratch pages and finished artifacts.
    pub cache_dir: PathBuf,

    /// Directory scanned for tracker description files.
    pub plugins_dir: PathBuf,

    /// Loaded user configuration.
    pub config: config::Config,

    /// Whether to suppress copies, deletions and mail dispatch.
    pub dry_run: bool,

    /// Whether to drop session cookies before each tracker runs.
    pub relogin: bool,
}

impl WatcherContext {
    /// Creates a context from command-line overrides.
    ///
    /// A missing or unreadable user configuration is reported and replaced
    /// by the defaults; trackers without a user record end up disabled, so
    /// the run degrades gracefully instead of aborting.
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined when no
    /// explicit configuration directory was given.
    pub fn new(
        dir: Option<PathBuf>,
        config_file: Option<PathBuf>,
        dry_run: bool,
        relogin: bool,
    ) -> Result<Self> {
        let config_dir = match dir {
            Some(d) => utils::expand_tilde_path(&d),
            None => dirs::home_dir()
                .context("Could not find home directory")?
                .join(DEFAULT_CONFIG_DIR),
        };

        let config_path = match config_file {
            Some(p) => utils::expand_tilde_path(&p),
            None => config_dir.join(CONFIG_FILE),
        };

        let config = match config::Config::load(&config_path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                output::warning(&format!("Config {} is absent", config_path.display()));
                config::Config::default()
            }
            Err(e) => {
                output::warning(&format!(
                    "WARNING! Config {} is not valid: {e:#}",
                    config_path.display()
                ));
                config::Config::default()
            }
        };

        let plugins_dir = config
            .core
            .plugins_dir
            .clone()
            .map(|p| utils::expand_tilde_path(&p))
            .unwrap_or_else(|| config_dir.join(PLUGINS_DIR));

        Ok(Self {
            cache_dir: config_dir.join(CACHE_DIR),
            config_dir,
            config_path,
            config,
            plugins_dir,
            dry_run,
            relogin,
        })
    }

    /// Path of the single-instance lock file.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.cache_dir.join(LOCK_FILE)
    }

    /// Ensures the cache directory exists.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn ensure_cache_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.cache_dir).with_context(|| {
            format!("Failed to create cache directory: {}", self.cache_dir.display())
        })
    }
}
