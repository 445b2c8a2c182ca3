//! Response header parsing.
//!
//! The fetcher captures raw response headers to a side file. This module
//! recovers the server-suggested attachment filename (undoing the octal
//! escaping wget applies to non-ASCII bytes) and detects gzip-encoded
//! bodies.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

static CONTENT_DISPOSITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)Content-Disposition:\s*attachment;\s*filename="(.+)""#).unwrap()
});

static CONTENT_ENCODING_GZIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Content-Encoding:\s*gzip").unwrap());

/// Extracts the attachment filename from a captured headers file.
///
/// Octal escapes (`\NNN`) in the header value are decoded to raw bytes
/// before the name is interpreted as UTF-8 (lossy on failure). Returns
/// `None` when the file is unreadable or carries no attachment header.
#[must_use]
pub fn attachment_filename(headers_file: &Path) -> Option<String> {
    let content = fs::read_to_string(headers_file).ok()?;
    for line in content.lines() {
        if let Some(caps) = CONTENT_DISPOSITION.captures(line) {
            let raw = decode_octal_escapes(caps.get(1)?.as_str());
            let name = match String::from_utf8(raw) {
                Ok(name) => name,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            };
            tracing::debug!(filename = %name, "recovered attachment filename");
            return Some(name);
        }
    }
    None
}

/// Decodes `\NNN` octal escape sequences into the bytes they stand for.
///
/// Anything that is not a three-digit octal escape is copied through
/// verbatim.
#[must_use]
pub fn decode_octal_escapes(value: &str) -> Vec<u8> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 4 <= bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let mut byte = 0u8;
            for &d in &bytes[i + 1..i + 4] {
                byte = byte.wrapping_mul(8).wrapping_add(d - b'0');
            }
            out.push(byte);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}

/// Checks the captured headers for a gzip content encoding.
///
/// A missing headers file means no encoding information, not an error.
#[must_use]
pub fn is_gzip_encoded(headers_file: &Path) -> bool {
    let Ok(content) = fs::read_to_string(headers_file) else {
        return false;
    };
    content.lines().any(|l| CONTENT_ENCODING_GZIP.is_match(l))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_file(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("session.headers");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_filename_lowercase_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = headers_file(
            &dir,
            "  HTTP/1.1 200 OK\n  content-disposition: attachment; filename=\"downloaded_file.torrent\"\n",
        );
        assert_eq!(
            attachment_filename(&path).as_deref(),
            Some("downloaded_file.torrent")
        );
    }

    #[test]
    fn test_filename_octal_escape() {
        let dir = tempfile::tempdir().unwrap();
        let path = headers_file(
            &dir,
            "Content-Disposition: attachment; filename=\"file\\101.torrent\"\n",
        );
        assert_eq!(attachment_filename(&path).as_deref(), Some("fileA.torrent"));
    }

    #[test]
    fn test_filename_octal_escape_utf8() {
        // "файл.torrent" as wget writes it: every UTF-8 byte octal-escaped
        let dir = tempfile::tempdir().unwrap();
        let path = headers_file(
            &dir,
            "Content-Disposition: attachment; filename=\"\\321\\204\\320\\260\\320\\271\\320\\273.torrent\"\n",
        );
        assert_eq!(attachment_filename(&path).as_deref(), Some("файл.torrent"));
    }

    #[test]
    fn test_filename_with_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = headers_file(
            &dir,
            "Content-Disposition: attachment; filename=\"My Show S01.torrent\"\n",
        );
        assert_eq!(
            attachment_filename(&path).as_deref(),
            Some("My Show S01.torrent")
        );
    }

    #[test]
    fn test_no_attachment_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = headers_file(&dir, "HTTP/1.1 200 OK\nContent-Type: text/html\n");
        assert_eq!(attachment_filename(&path), None);
    }

    #[test]
    fn test_missing_headers_file() {
        assert_eq!(attachment_filename(Path::new("/nonexistent.headers")), None);
    }

    #[test]
    fn test_decode_octal_passthrough() {
        assert_eq!(decode_octal_escapes(r"plain\x"), b"plain\\x");
        assert_eq!(decode_octal_escapes(r"short\10"), b"short\\10");
    }

    #[test]
    fn test_gzip_detection() {
        let dir = tempfile::tempdir().unwrap();
        let yes = headers_file(&dir, "  Content-Encoding: gzip\n");
        assert!(is_gzip_encoded(&yes));
        let no = dir.path().join("plain.headers");
        fs::write(&no, "Content-Type: text/html\n").unwrap();
        assert!(!is_gzip_encoded(&no));
        assert!(!is_gzip_encoded(Path::new("/nonexistent.headers")));
    }
}
