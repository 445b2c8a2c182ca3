//! Torrent file signature detection.
//!
//! A downloaded artifact is accepted when its first bytes look like a
//! bencoded dictionary whose first key is `announce`. This is an acceptance
//! test, not a full parse.

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Length-prefixed dictionary prefix: `d8:announce`, `d12:announce-list`, ...
static TORRENT_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^d\d+:announce").unwrap());

/// Number of leading bytes inspected for the signature.
const PREFIX_LEN: usize = 15;

/// Checks whether the file at `path` starts with the torrent signature.
///
/// Unreadable or short files are simply not torrents; no error is raised.
#[must_use]
pub fn is_torrent_file(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut buf = [0u8; PREFIX_LEN];
    let mut read = 0;
    while read < PREFIX_LEN {
        match file.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(_) => return false,
        }
    }
    TORRENT_PREFIX.is_match(&buf[..read])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_accepts_announce_dictionary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.torrent");
        fs::write(&path, b"d8:announce35:http://tracker.example.org/announce...").unwrap();
        assert!(is_torrent_file(&path));
    }

    #[test]
    fn test_accepts_longer_length_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.torrent");
        fs::write(&path, b"d12:announce-l").unwrap();
        assert!(is_torrent_file(&path));
    }

    #[test]
    fn test_rejects_html_error_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.torrent");
        fs::write(&path, b"<html><head><title>Not found</title>").unwrap();
        assert!(!is_torrent_file(&path));
    }

    #[test]
    fn test_rejects_missing_file() {
        assert!(!is_torrent_file(Path::new("/nonexistent/file.torrent")));
    }
}
