//! Load-time resolution of tracker descriptions.
//!
//! Resolution happens once per run and produces the immutable [`Tracker`]
//! values the engine consumes: login aliases are followed (with cycle
//! detection), credential references are flattened to plain strings,
//! patterns are compiled, listings are merged per URL, and the effective
//! enabled flag is computed. A tracker that fails any of these steps is a
//! configuration error for that tracker alone.

use super::trackers::{
    FieldValue, GroupSpec, LISTING_FROM_CONFIG, ListingEntry, ListingSpec, LoginForm, LoginSpec,
    MatchRuleSpec, TrackerSpec,
};
use super::{Config, UserRecord};
use crate::output;
use anyhow::{Context, Result, bail};
use regex::Regex;
use std::path::Path;

/// A fully resolved tracker, ready to run.
#[derive(Debug, Clone)]
pub struct Tracker {
    pub name: String,

    /// Effective flag: declared AND user record present+enabled AND at
    /// least one listing URL.
    pub enabled: bool,

    /// Basename for session files (cookies, scratch page, headers).
    /// Trackers sharing a login alias share this, and thus the cookie jar.
    pub session: String,

    /// Resolved login, or `None` for trackers needing no authentication.
    pub login: Option<LoginPlan>,

    /// Listing pages with compiled rules, merged per URL.
    pub listings: Vec<Listing>,

    /// Link extraction mode.
    pub extract: ExtractMode,

    /// Whether downloading a matched link requires an empty POST.
    pub post_on_fetch: bool,
}

/// A resolved login: URLs, compiled success pattern, flattened fields.
#[derive(Debug, Clone)]
pub struct LoginPlan {
    pub check_url: Option<String>,
    pub form_url: String,
    pub success: Option<Regex>,
    pub fields: Vec<(String, String)>,
}

impl LoginPlan {
    /// URL probed to test an existing session.
    #[must_use]
    pub fn effective_check_url(&self) -> &str {
        self.check_url.as_deref().unwrap_or(&self.form_url)
    }
}

/// One listing page with its compiled match rules.
#[derive(Debug, Clone)]
pub struct Listing {
    pub url: String,
    pub rules: Vec<MatchRule>,
}

/// A compiled match rule; `pattern: None` always matches.
#[derive(Debug, Clone)]
pub struct MatchRule {
    pub pattern: Option<Regex>,
    pub notify: Option<String>,
}

/// Link extraction mode.
#[derive(Debug, Clone)]
pub enum ExtractMode {
    /// Scan page lines for `pattern`; `link_group` locates the link,
    /// `name_groups` build the display name.
    Scan {
        pattern: Regex,
        link_group: usize,
        name_groups: Vec<usize>,
    },
    /// Rewrite the listing URL itself instead of scanning the page.
    Replace { pattern: Regex, template: String },
}

/// Discovers, parses and resolves every tracker under `plugins_dir`.
///
/// Description files that fail to parse or resolve are reported and
/// skipped; the remaining trackers proceed.
#[must_use]
pub fn load_all(plugins_dir: &Path, config: &Config) -> Vec<Tracker> {
    let files = match super::trackers::description_files(plugins_dir) {
        Ok(files) => files,
        Err(e) => {
            output::error(&format!("{e:#}"));
            return Vec::new();
        }
    };

    let mut specs = Vec::new();
    for file in files {
        tracing::debug!(file = %file.display(), "reading tracker description");
        match super::trackers::load_spec(&file) {
            Ok(spec) => specs.push(spec),
            Err(e) => output::warning(&format!(
                "WARNING! File {} is not a valid tracker description: {e:#}",
                file.display()
            )),
        }
    }
    resolve_all(&specs, config)
}

/// Resolves every spec, reporting and skipping the invalid ones.
#[must_use]
pub fn resolve_all(specs: &[TrackerSpec], config: &Config) -> Vec<Tracker> {
    let mut trackers = Vec::with_capacity(specs.len());
    for spec in specs {
        match resolve(spec, specs, config) {
            Ok(tracker) => {
                tracing::debug!(
                    tracker = %tracker.name,
                    enabled = tracker.enabled,
                    "resolved tracker"
                );
                trackers.push(tracker);
            }
            Err(e) => output::warning(&format!("WARNING! Tracker {}: {e:#}", spec.name)),
        }
    }
    trackers
}

/// Resolves one tracker description against the full spec set and the user
/// configuration.
///
/// # Errors
/// Returns a configuration error on an alias cycle or dangling alias, an
/// invalid pattern, a capture group index the pattern does not have, or an
/// unrecognized listing marker.
pub fn resolve(spec: &TrackerSpec, specs: &[TrackerSpec], config: &Config) -> Result<Tracker> {
    let (form, session) = resolve_login_form(spec, specs)?;

    // Credentials come from the alias target's record; the enabled flag
    // stays with the tracker's own record.
    let own_record = config.record(&spec.name);
    let session_record = config.record(&session);

    let login = form
        .map(|form| build_login_plan(form, session_record))
        .transpose()?;

    let listings = resolve_listings(spec, own_record)?;
    let extract = build_extract_mode(spec)?;

    let enabled =
        spec.enabled && own_record.is_some_and(|r| r.enabled) && !listings.is_empty();

    Ok(Tracker {
        name: spec.name.clone(),
        enabled,
        session,
        login,
        listings,
        extract,
        post_on_fetch: spec.links.post,
    })
}

/// Follows the login alias chain to the owning form, if any.
///
/// Returns the form and the name of the tracker owning it (the session
/// name). Cycles and references to unknown trackers are configuration
/// errors.
fn resolve_login_form<'a>(
    spec: &'a TrackerSpec,
    specs: &'a [TrackerSpec],
) -> Result<(Option<&'a LoginForm>, String)> {
    let mut current = spec;
    let mut seen: Vec<&str> = vec![spec.name.as_str()];
    loop {
        match &current.login {
            None => return Ok((None, current.name.clone())),
            Some(LoginSpec::Form(form)) => return Ok((Some(form), current.name.clone())),
            Some(LoginSpec::Alias(target)) => {
                if seen.contains(&target.as_str()) {
                    bail!("login alias cycle: {} -> {}", seen.join(" -> "), target);
                }
                current = specs
                    .iter()
                    .find(|s| s.name == *target)
                    .with_context(|| format!("login references unknown tracker '{target}'"))?;
                seen.push(&current.name);
            }
        }
    }
}

/// Flattens a login form against a user record.
fn build_login_plan(form: &LoginForm, record: Option<&UserRecord>) -> Result<LoginPlan> {
    let success = form
        .success
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("bad login success pattern")?;

    let fields = form
        .fields
        .iter()
        .map(|field| {
            let value = match &field.value {
                FieldValue::Literal { value } => value.clone(),
                FieldValue::Credential { cred } => record
                    .and_then(|r| r.credentials.get(cred))
                    .cloned()
                    .unwrap_or_default(),
            };
            (field.name.clone(), value)
        })
        .collect();

    Ok(LoginPlan {
        check_url: form.check.clone(),
        form_url: form.form.clone(),
        success,
        fields,
    })
}

/// Picks the effective listing entries and compiles their rules, merging
/// duplicate URLs so each page is fetched once.
fn resolve_listings(spec: &TrackerSpec, own_record: Option<&UserRecord>) -> Result<Vec<Listing>> {
    let from_record = || own_record.map(|r| r.listings.as_slice()).unwrap_or_default();

    let entries: &[ListingEntry] = match &spec.listing {
        Some(ListingSpec::Entries(entries)) => entries,
        Some(ListingSpec::FromUserConfig(marker)) if marker == LISTING_FROM_CONFIG => from_record(),
        Some(ListingSpec::FromUserConfig(marker)) => {
            bail!("unrecognized listing marker '{marker}' (expected \"{LISTING_FROM_CONFIG}\")")
        }
        None => from_record(),
    };

    let mut listings: Vec<Listing> = Vec::new();
    for entry in entries {
        let rules = compile_rules(&entry.rules)?;
        match listings.iter_mut().find(|l| l.url == entry.url) {
            Some(existing) => existing.rules.extend(rules),
            None => listings.push(Listing {
                url: entry.url.clone(),
                rules,
            }),
        }
    }
    Ok(listings)
}

fn compile_rules(specs: &[MatchRuleSpec]) -> Result<Vec<MatchRule>> {
    specs
        .iter()
        .map(|rule| {
            let pattern = rule
                .pattern
                .as_deref()
                .map(Regex::new)
                .transpose()
                .with_context(|| format!("bad rule pattern {:?}", rule.pattern))?;
            Ok(MatchRule {
                pattern,
                notify: rule.notify.clone(),
            })
        })
        .collect()
}

/// Compiles the link pattern and validates the capture group selection.
fn build_extract_mode(spec: &TrackerSpec) -> Result<ExtractMode> {
    if let Some(replace) = &spec.links.replace {
        let pattern = Regex::new(&replace.pattern).context("bad replace pattern")?;
        return Ok(ExtractMode::Replace {
            pattern,
            template: replace.template.clone(),
        });
    }

    let pattern = Regex::new(&spec.links.pattern).context("bad link pattern")?;
    let (link_group, name_groups) = match &spec.links.group {
        GroupSpec::Single(idx) => (*idx, vec![*idx]),
        GroupSpec::Multi(indices) => {
            if indices.len() < 2 {
                bail!("group array needs a link index and at least one name index");
            }
            (indices[0], indices[1..].to_vec())
        }
    };

    for idx in std::iter::once(link_group).chain(name_groups.iter().copied()) {
        if idx >= pattern.captures_len() {
            bail!(
                "group index {idx} exceeds the {} capture group(s) of the link pattern",
                pattern.captures_len() - 1
            );
        }
    }

    Ok(ExtractMode::Scan {
        pattern,
        link_group,
        name_groups,
    })
}
