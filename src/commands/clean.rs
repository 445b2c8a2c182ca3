//! Cache cleanup: remove finished artifacts and notification markers.

use crate::output;
use crate::{NOTIFY_EXT, TORRENT_EXT, WatcherContext};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Removes `*.torrent` and `*.notify` files from the cache, in sorted
/// order, honoring dry-run mode.
///
/// # Errors
/// Returns an error if the cache cannot be enumerated or a file cannot be
/// removed.
pub fn execute(ctx: &WatcherContext) -> Result<()> {
    output::separator(Some("CLEANUP: BEGIN"), '>');
    for path in removable_files(ctx)? {
        output::info(&format!(
            "{}Removing {}",
            output::dry_run_prefix(ctx.dry_run),
            path.display()
        ));
        if !ctx.dry_run {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    output::separator(Some("CLEANUP: END"), '<');
    Ok(())
}

fn removable_files(ctx: &WatcherContext) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for ext in [TORRENT_EXT, NOTIFY_EXT] {
        let pattern = format!("{}/*.{ext}", ctx.cache_dir.display());
        files.extend(
            glob::glob(&pattern)
                .with_context(|| format!("Bad cache directory: {}", ctx.cache_dir.display()))?
                .filter_map(std::result::Result::ok),
        );
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(dir: &std::path::Path, dry_run: bool) -> WatcherContext {
        WatcherContext {
            config_dir: dir.to_path_buf(),
            config_path: dir.join("config.toml"),
            cache_dir: dir.join("cache"),
            plugins_dir: dir.join("trackers.d"),
            config: crate::config::Config::default(),
            dry_run,
            relogin: false,
        }
    }

    #[test]
    fn test_removes_artifacts_and_markers_only() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path(), false);
        fs::create_dir_all(&ctx.cache_dir).unwrap();
        fs::write(ctx.cache_dir.join("a.torrent"), b"a").unwrap();
        fs::write(ctx.cache_dir.join("b.notify"), b"b").unwrap();
        fs::write(ctx.cache_dir.join("example.cookies"), b"c").unwrap();

        execute(&ctx).unwrap();

        assert!(!ctx.cache_dir.join("a.torrent").exists());
        assert!(!ctx.cache_dir.join("b.notify").exists());
        assert!(ctx.cache_dir.join("example.cookies").exists());
    }

    #[test]
    fn test_dry_run_removes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path(), true);
        fs::create_dir_all(&ctx.cache_dir).unwrap();
        fs::write(ctx.cache_dir.join("a.torrent"), b"a").unwrap();

        execute(&ctx).unwrap();
        assert!(ctx.cache_dir.join("a.torrent").exists());
    }

    #[test]
    fn test_missing_cache_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        execute(&ctx(dir.path(), false)).unwrap();
    }
}
