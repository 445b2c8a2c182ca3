//! The sync phase: reconcile the cache against the watch folder.

use crate::WatcherContext;
use crate::utils;
use anyhow::Result;
use std::path::Path;

/// Syncs cached artifacts into the watch folder.
///
/// An unreachable destination is reported inside the reconciler and leaves
/// the exit code untouched; fetch and sync stay independent phases.
///
/// # Errors
/// Returns an error on unexpected I/O during the reconciliation.
pub fn execute(ctx: &WatcherContext, folder: &Path) -> Result<()> {
    let folder = folder
        .to_str()
        .map(|s| Path::new(utils::strip_trailing_separator(s)).to_path_buf())
        .unwrap_or_else(|| folder.to_path_buf());
    crate::sync::sync_cache(&ctx.cache_dir, &folder, ctx.dry_run)?;
    Ok(())
}
