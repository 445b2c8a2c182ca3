//! Utility functions and helpers.
//!
//! Path manipulation shared across the crate: tilde expansion for
//! user-supplied paths and trailing-separator normalization.

use std::path::{Path, PathBuf};

/// Expands a path starting with `~` to the user's home directory.
///
/// A path without a leading `~/` is returned unchanged, as is any path when
/// the home directory cannot be determined.
#[must_use]
pub fn expand_tilde_path(path: &Path) -> PathBuf {
    if let Some(s) = path.to_str()
        && let Some(rest) = s.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

/// Removes a trailing path separator from a user-supplied folder string.
#[must_use]
pub fn strip_trailing_separator(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde_passthrough() {
        let p = expand_tilde_path(Path::new("/tmp/x"));
        assert_eq!(p, PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_expand_tilde_home() {
        if let Some(home) = dirs::home_dir() {
            let p = expand_tilde_path(Path::new("~/.torwatch"));
            assert_eq!(p, home.join(".torwatch"));
        }
    }

    #[test]
    fn test_strip_trailing_separator() {
        assert_eq!(strip_trailing_separator("/watch/"), "/watch");
        assert_eq!(strip_trailing_separator("/watch"), "/watch");
    }
}
