//! The fetch phase: resolve trackers and run the processing engine.

use crate::WatcherContext;
use crate::config::resolve;
use crate::fetcher::WgetFetcher;
use crate::notify::CommandMailer;
use crate::runner::TrackerRunner;
use anyhow::Result;

/// Runs the fetch phase over every resolved tracker.
///
/// # Errors
/// Returns an error when the external fetcher cannot be located or the
/// cache directory cannot be created. Per-tracker failures are logged
/// inside the runner and do not propagate.
pub fn execute(ctx: &WatcherContext) -> Result<()> {
    ctx.ensure_cache_dir()?;

    let fetcher = WgetFetcher::from_config(&ctx.config.core)?;
    let mailer = CommandMailer::from_config(&ctx.config.core);
    let trackers = resolve::load_all(&ctx.plugins_dir, &ctx.config);

    TrackerRunner::new(ctx, &fetcher, &mailer).run_all(&trackers);
    Ok(())
}
