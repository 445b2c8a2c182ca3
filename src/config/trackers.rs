//! Tracker description files.
//!
//! One TOML file per tracker in the plugins directory describes how to log
//! in and what to extract from listing pages. Parsing stays close to the
//! file shape; cross-referencing against user records, alias resolution and
//! pattern compilation happen later in [`super::resolve`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Marker value for a listing deferred to the user configuration.
pub const LISTING_FROM_CONFIG: &str = "config";

/// One tracker description file.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerSpec {
    /// Unique symbolic key; also the default basename for session files.
    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Login description, or the name of another tracker whose login this
    /// one shares. Absent for trackers that need no authentication.
    #[serde(default)]
    pub login: Option<LoginSpec>,

    /// How candidate links are located on a listing page.
    pub links: LinkRules,

    /// Listing pages to scan. `"config"` defers to the user record.
    #[serde(default)]
    pub listing: Option<ListingSpec>,
}

/// Inline login form, or an alias to another tracker's login.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LoginSpec {
    /// Name of the tracker whose login parameters are shared.
    Alias(String),
    /// Inline form description.
    Form(LoginForm),
}

/// A login form POST description.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    /// URL probed to test an existing session; the form URL when absent.
    #[serde(default)]
    pub check: Option<String>,

    /// URL the credentials are posted to.
    pub form: String,

    /// Pattern whose ABSENCE in the returned page means the login
    /// succeeded (it matches the "please sign in" banner, not a greeting).
    #[serde(default)]
    pub success: Option<String>,

    /// Ordered form fields.
    #[serde(default)]
    pub fields: Vec<LoginField>,
}

/// One form field: a name bound to a literal or to a credential reference.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginField {
    pub name: String,

    #[serde(flatten)]
    pub value: FieldValue,
}

/// A form field value.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Emitted as-is.
    Literal {
        value: String,
    },
    /// Looked up in the user record at resolution time; an unresolvable
    /// reference resolves to the empty string.
    Credential {
        cred: String,
    },
}

/// Listing pages: explicit entries or the `"config"` deferral marker.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListingSpec {
    FromUserConfig(String),
    Entries(Vec<ListingEntry>),
}

/// One listing URL with its match rules.
///
/// An entry without rules gets a single implicit always-match rule with no
/// notification address.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingEntry {
    pub url: String,

    #[serde(default)]
    pub rules: Vec<MatchRuleSpec>,
}

/// One match rule: an optional narrowing pattern tested against the same
/// line the link was found on, and an optional notification address that
/// routes the link to mail instead of download.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchRuleSpec {
    #[serde(default)]
    pub pattern: Option<String>,

    #[serde(default)]
    pub notify: Option<String>,
}

/// How links are located on a page.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkRules {
    /// Expression locating candidate links inside a listing page.
    pub pattern: String,

    /// Capture group selection: a single index names both the link and its
    /// display name; an array `[link, name...]` locates the link with the
    /// first index and builds the name from the rest.
    #[serde(default)]
    pub group: GroupSpec,

    /// Whether downloading a matched link requires an empty POST.
    #[serde(default)]
    pub post: bool,

    /// URL-rewrite mode replacing page scanning.
    #[serde(default)]
    pub replace: Option<ReplaceSpec>,
}

/// Capture group selection for [`LinkRules`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GroupSpec {
    Single(usize),
    Multi(Vec<usize>),
}

impl Default for GroupSpec {
    fn default() -> Self {
        Self::Single(0)
    }
}

/// Synthesizes the download link by rewriting the listing URL itself.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceSpec {
    pub pattern: String,
    pub template: String,
}

const fn default_true() -> bool {
    true
}

/// Loads one tracker description file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_spec(path: &Path) -> Result<TrackerSpec> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tracker description: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse tracker description: {}", path.display()))
}

/// Enumerates tracker description files in lexicographic filename order.
///
/// # Errors
/// Returns an error if the plugins directory pattern is invalid.
pub fn description_files(plugins_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.toml", plugins_dir.display());
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Bad plugins directory: {}", plugins_dir.display()))?
        .filter_map(std::result::Result::ok)
        .collect();
    files.sort();
    Ok(files)
}
