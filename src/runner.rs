//! Per-tracker orchestration.
//!
//! One tracker run is: optional cookie cleanup (relogin mode) → login →
//! fetch every listing URL, extracting links into a run-local map → process
//! the accumulated links. Failures are isolated at three levels: a tracker
//! failing does not stop the batch, a listing URL failing does not stop the
//! tracker, a link failing does not stop the remaining links.

use crate::WatcherContext;
use crate::auth::AuthEngine;
use crate::config::resolve::Tracker;
use crate::extract::{self, LinkMap};
use crate::fetcher::{FetchRequest, Fetcher, SessionPaths};
use crate::notify::{Mailer, Notifier};
use crate::output;
use crate::reconcile::LinkProcessor;
use anyhow::Result;
use std::fs;

/// Drives the processing engine over resolved trackers, one at a time.
pub struct TrackerRunner<'a> {
    ctx: &'a WatcherContext,
    fetcher: &'a dyn Fetcher,
    mailer: &'a dyn Mailer,
}

impl<'a> TrackerRunner<'a> {
    #[must_use]
    pub fn new(ctx: &'a WatcherContext, fetcher: &'a dyn Fetcher, mailer: &'a dyn Mailer) -> Self {
        Self {
            ctx,
            fetcher,
            mailer,
        }
    }

    /// Runs every tracker, isolating per-tracker failures.
    pub fn run_all(&self, trackers: &[Tracker]) {
        output::separator(Some("RUN: BEGIN"), '>');
        for tracker in trackers {
            if let Err(e) = self.run_one(tracker) {
                output::error(&format!("Tracker {}: {e:#}", tracker.name));
            }
        }
        output::separator(Some("RUN: END"), '<');
    }

    /// Runs one tracker cycle.
    ///
    /// # Errors
    /// Returns an error for unexpected I/O (cache directory creation,
    /// cookie removal); ordinary login and transport failures are logged
    /// and end the cycle with `Ok`.
    pub fn run_one(&self, tracker: &Tracker) -> Result<()> {
        self.ctx.ensure_cache_dir()?;
        let paths = SessionPaths::new(&self.ctx.cache_dir, &tracker.session);

        if self.ctx.relogin && paths.cookies.exists() {
            output::info(&format!("Cleanup for {}", tracker.name));
            fs::remove_file(&paths.cookies)?;
        }

        if !tracker.enabled {
            tracing::debug!(tracker = %tracker.name, "tracker disabled, skipping");
            return Ok(());
        }

        output::separator(Some(&tracker.name), '/');
        output::info(&format!("Tracker {} is being checked", tracker.name));

        let auth = AuthEngine::new(self.fetcher);
        if !auth.ensure_logged_in(tracker, &paths)? {
            return Ok(());
        }

        let links = self.collect_links(tracker, &paths);
        self.process_links(tracker, &paths, &links);

        output::separator(Some(&tracker.name), '\\');
        Ok(())
    }

    /// Fetches every listing URL and accumulates extracted links.
    ///
    /// The map is owned by this run alone; duplicate links across listing
    /// URLs collapse with last-write-wins.
    fn collect_links(&self, tracker: &Tracker, paths: &SessionPaths) -> LinkMap {
        let mut links = LinkMap::new();
        for listing in &tracker.listings {
            output::separator(Some(&listing.url), '>');
            match self.fetcher.fetch(paths, &FetchRequest::get(&listing.url)) {
                Ok(()) => {
                    match extract::extract(&paths.page, &tracker.extract, &listing.url, &listing.rules)
                    {
                        Ok(found) => links.extend(found),
                        Err(e) => output::error(&format!("{e:#}")),
                    }
                }
                Err(e) => output::error(&format!("Error getting URL: {}: {e:#}", listing.url)),
            }
            output::separator(None, '<');
        }
        links
    }

    /// Feeds accumulated links through the fetch-or-notify reconciler.
    fn process_links(&self, tracker: &Tracker, paths: &SessionPaths, links: &LinkMap) {
        output::separator(Some("PROCESSING: BEGIN"), '>');
        let notifier = Notifier::new(self.mailer, &self.ctx.cache_dir, self.ctx.dry_run);
        let processor = LinkProcessor::new(
            self.fetcher,
            &notifier,
            &self.ctx.cache_dir,
            &tracker.name,
            tracker.post_on_fetch,
        );
        for (link, meta) in links {
            output::separator(Some(&format!("PROCESSING: {link}")), '>');
            if let Err(e) = processor.process(paths, link, meta) {
                output::error(&format!("{e:#}"));
            }
        }
        output::separator(Some("PROCESSING: END"), '>');
    }
}
