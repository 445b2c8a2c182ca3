//! Per-link fetch-or-notify processing.
//!
//! Each extracted link either routes to mail (when its rule carried a
//! notification address) or is downloaded, validated against the torrent
//! signature, and promoted from the scratch page to its server-suggested
//! filename inside the cache. Failures stay local to the link.

use crate::detect;
use crate::extract::LinkMeta;
use crate::fetcher::{FetchRequest, Fetcher, SessionPaths};
use crate::headers;
use crate::notify::Notifier;
use crate::output;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Processes extracted links for one tracker run.
pub struct LinkProcessor<'a> {
    fetcher: &'a dyn Fetcher,
    notifier: &'a Notifier<'a>,
    cache_dir: &'a Path,
    tracker: &'a str,
    post_on_fetch: bool,
}

impl<'a> LinkProcessor<'a> {
    #[must_use]
    pub fn new(
        fetcher: &'a dyn Fetcher,
        notifier: &'a Notifier<'a>,
        cache_dir: &'a Path,
        tracker: &'a str,
        post_on_fetch: bool,
    ) -> Self {
        Self {
            fetcher,
            notifier,
            cache_dir,
            tracker,
            post_on_fetch,
        }
    }

    /// Handles one extracted link.
    ///
    /// # Errors
    /// Returns an error on fetch or delivery failure; the caller logs it
    /// and moves on to the next link.
    pub fn process(&self, paths: &SessionPaths, link: &str, meta: &LinkMeta) -> Result<()> {
        if meta.notify.is_some() {
            self.notifier.notify(self.tracker, link, meta)?;
            return Ok(());
        }
        self.download(paths, link, meta)
    }

    fn download(&self, paths: &SessionPaths, link: &str, meta: &LinkMeta) -> Result<()> {
        output::info(&format!("Fetching: {}", meta.name));
        self.fetcher
            .fetch(paths, &FetchRequest::download(link, self.post_on_fetch))
            .with_context(|| format!("Error getting URL: {link}"))?;

        let filename = headers::attachment_filename(&paths.headers);
        let is_torrent = detect::is_torrent_file(&paths.page);

        match (filename, is_torrent) {
            (Some(filename), true) => {
                let target = self.cache_dir.join(&filename);
                tracing::debug!(
                    from = %paths.page.display(),
                    to = %target.display(),
                    "moving artifact"
                );
                fs::rename(&paths.page, &target).with_context(|| {
                    format!("Failed to move artifact to {}", target.display())
                })?;
            }
            (_, false) => {
                // left at the scratch path; the next fetch overwrites it
                output::verbose(&format!("{} is NOT a torrent file!", paths.page.display()));
            }
            (None, true) => {
                output::verbose(&format!("No suggested filename for {link}"));
            }
        }
        Ok(())
    }
}
