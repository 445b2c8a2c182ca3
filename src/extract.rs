//! Link extraction from fetched listing pages.
//!
//! Scan mode walks a page line by line: every line matching the tracker's
//! link pattern yields a candidate link, and each match rule decides
//! independently whether that line contributes an entry (and whether the
//! entry routes to mail instead of download). The result map is keyed by
//! the link itself, so duplicate occurrences collapse and the last match
//! wins. Replace mode skips the page entirely and rewrites the listing URL
//! into the one synthetic link.

use crate::charset;
use crate::config::resolve::{ExtractMode, MatchRule};
use anyhow::{Context, Result};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Display name of an extracted link: one captured value or an ordered
/// tuple of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkName {
    Single(String),
    Tuple(Vec<String>),
}

impl fmt::Display for LinkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(name) => f.write_str(name),
            Self::Tuple(parts) => f.write_str(&parts.join(" - ")),
        }
    }
}

/// Metadata recorded for one extracted link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMeta {
    pub name: LinkName,
    /// Mail address (with optional parameters); set when the firing rule
    /// routes the link to notification instead of download.
    pub notify: Option<String>,
    /// Listing URL the link was found on.
    pub source_url: String,
}

/// Extracted links keyed by link value; insertion collapses duplicates.
pub type LinkMap = HashMap<String, LinkMeta>;

/// Extracts candidate links for one listing page.
///
/// `rules` are the listing entry's match rules; an empty slice means one
/// implicit always-match rule without notification.
///
/// # Errors
/// Returns an error if the page cannot be read in scan mode.
pub fn extract(
    page: &Path,
    mode: &ExtractMode,
    source_url: &str,
    rules: &[MatchRule],
) -> Result<LinkMap> {
    match mode {
        ExtractMode::Replace { pattern, template } => {
            Ok(replace_link(pattern, template, source_url))
        }
        ExtractMode::Scan {
            pattern,
            link_group,
            name_groups,
        } => scan_page(page, pattern, *link_group, name_groups, source_url, rules),
    }
}

/// Replace mode: one synthetic link from the listing URL, named after the
/// source URL so it can serve as a referer.
fn replace_link(pattern: &Regex, template: &str, source_url: &str) -> LinkMap {
    let link = pattern.replace_all(source_url, template).into_owned();
    tracing::debug!(link = %link, source = source_url, "rewrote listing url");
    let mut links = LinkMap::new();
    links.insert(
        link,
        LinkMeta {
            name: LinkName::Single(source_url.to_string()),
            notify: None,
            source_url: source_url.to_string(),
        },
    );
    links
}

fn scan_page(
    page: &Path,
    pattern: &Regex,
    link_group: usize,
    name_groups: &[usize],
    source_url: &str,
    rules: &[MatchRule],
) -> Result<LinkMap> {
    let always = [MatchRule {
        pattern: None,
        notify: None,
    }];
    let rules = if rules.is_empty() { &always[..] } else { rules };

    let lines = charset::decoded_lines(page)
        .with_context(|| format!("Failed to read listing page: {}", page.display()))?;
    tracing::debug!(page = %page.display(), pattern = %pattern, "scanning listing page");

    let mut links = LinkMap::new();
    for line in &lines {
        let Some(caps) = pattern.captures(line) else {
            continue;
        };
        let Some(link) = caps.get(link_group).map(|m| m.as_str()) else {
            continue;
        };
        tracing::debug!(link, matched = &caps[0], "found candidate link");

        for rule in rules {
            let hit = match &rule.pattern {
                None => true,
                Some(re) => re.is_match(line),
            };
            if !hit {
                continue;
            }
            links.insert(
                link.to_string(),
                LinkMeta {
                    name: capture_name(&caps, name_groups),
                    notify: rule.notify.clone(),
                    source_url: source_url.to_string(),
                },
            );
        }
    }
    Ok(links)
}

/// Builds the display name from the configured capture groups.
fn capture_name(caps: &Captures<'_>, name_groups: &[usize]) -> LinkName {
    let part = |idx: usize| {
        caps.get(idx)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    };
    match name_groups {
        [single] => LinkName::Single(part(*single)),
        groups => LinkName::Tuple(groups.iter().map(|&idx| part(idx)).collect()),
    }
}
