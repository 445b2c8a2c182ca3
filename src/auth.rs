//! Login state detection and form authentication.
//!
//! Trackers hide their listings behind a session cookie. The engine first
//! probes a check URL; only when the returned page looks logged-out does it
//! post the login form and re-check. The "looks logged-out" test is
//! deliberately inverted: the configured success pattern matches the login
//! banner, so a match means the session is NOT valid.

use crate::charset;
use crate::config::resolve::Tracker;
use crate::fetcher::{FetchRequest, Fetcher, SessionPaths};
use crate::output;
use anyhow::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Drives the login state machine for one tracker at a time.
pub struct AuthEngine<'a> {
    fetcher: &'a dyn Fetcher,
}

impl<'a> AuthEngine<'a> {
    #[must_use]
    pub fn new(fetcher: &'a dyn Fetcher) -> Self {
        Self { fetcher }
    }

    /// Ensures the tracker session is authenticated.
    ///
    /// Probes the check URL first and skips the credential POST when the
    /// session is still valid. A transport failure fails authentication
    /// immediately; there is no retry.
    ///
    /// # Errors
    /// Returns an error only for unexpected I/O while reading fetched
    /// pages; transport and login failures come back as `Ok(false)`.
    pub fn ensure_logged_in(&self, tracker: &Tracker, paths: &SessionPaths) -> Result<bool> {
        let Some(login) = &tracker.login else {
            tracing::debug!(tracker = %tracker.name, "no login configured");
            return Ok(true);
        };

        let check_url = login.effective_check_url();
        if let Err(e) = self.fetcher.fetch(paths, &FetchRequest::get(check_url)) {
            output::error(&format!("Error getting URL: {check_url}: {e:#}"));
            return Ok(false);
        }
        if is_logged_in(&paths.page, login.success.as_ref()) {
            output::info("Logged in successfully");
            return Ok(true);
        }

        let body = encode_form(&login.fields);
        if let Err(e) = self
            .fetcher
            .fetch(paths, &FetchRequest::post(&login.form_url, &body))
        {
            output::error(&format!("Error getting URL: {}: {e:#}", login.form_url));
            return Ok(false);
        }

        let logged_in = is_logged_in(&paths.page, login.success.as_ref());
        if logged_in {
            output::info("Logged in successfully");
        } else {
            output::info("NOT logged in");
        }
        Ok(logged_in)
    }
}

/// URL-encodes resolved login fields into a POST body.
#[must_use]
pub fn encode_form(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{}={}", urlencoding::encode(name), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Judges a fetched page for login state.
///
/// A zero-byte page counts as logged in before any scanning (some trackers
/// return empty bodies for an authenticated probe). Otherwise the page is
/// scanned line by line, charset-aware, and the result is the inversion of
/// "the success pattern matched somewhere": the pattern marks the login
/// banner, so finding it means the session is not valid. A page without a
/// success pattern to look for counts as logged in.
#[must_use]
pub fn is_logged_in(page: &Path, success: Option<&Regex>) -> bool {
    let Ok(meta) = fs::metadata(page) else {
        return false;
    };
    if meta.len() == 0 {
        return true;
    }

    let Ok(lines) = charset::decoded_lines(page) else {
        return false;
    };
    let matched = match success {
        Some(pattern) => lines.iter().any(|line| pattern.is_match(line)),
        None => false,
    };
    !matched
}
