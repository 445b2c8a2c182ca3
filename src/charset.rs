//! Charset sniffing and best-effort line transcoding for fetched pages.
//!
//! Tracker pages are not reliably UTF-8; the declared charset is recovered
//! from an HTML meta tag and every scanned line is transcoded before pattern
//! matching. Transcoding is best-effort: undecodable bytes degrade to
//! replacement characters and matching proceeds on whatever came out.

use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;

/// `http-equiv` style declaration: `content="text/html; charset=X"`.
static META_CONTENT_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)content=['"]text/html;\s*charset=([^'">\s]+)['"]"#).unwrap()
});

/// HTML5 style declaration: `<meta charset="X">`.
static META_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)meta charset=["']?([^'">\s]+)"#).unwrap());

/// Scans page bytes for a meta charset declaration.
///
/// Returns `None` when no declaration is found, the label is unknown, or the
/// declared encoding is already UTF-8.
#[must_use]
pub fn sniff(bytes: &[u8]) -> Option<&'static Encoding> {
    for line in bytes.split(|&b| b == b'\n') {
        let line = String::from_utf8_lossy(line);
        let label = META_CONTENT_TYPE
            .captures(&line)
            .or_else(|| META_CHARSET.captures(&line))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        if let Some(label) = label {
            let encoding = Encoding::for_label(label.trim().as_bytes())?;
            return if encoding == UTF_8 { None } else { Some(encoding) };
        }
    }
    None
}

/// Decodes one line of page bytes with the sniffed encoding, lossy UTF-8
/// otherwise.
#[must_use]
pub fn decode_line<'a>(bytes: &'a [u8], encoding: Option<&'static Encoding>) -> Cow<'a, str> {
    match encoding {
        Some(enc) => enc.decode(bytes).0,
        None => String::from_utf8_lossy(bytes),
    }
}

/// Reads a page file and returns its lines decoded for pattern matching.
///
/// Line terminators are stripped; the charset declared by the page itself
/// governs the decoding of every line.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn decoded_lines(path: &Path) -> io::Result<Vec<String>> {
    let bytes = fs::read(path)?;
    let encoding = sniff(&bytes);
    Ok(bytes
        .split(|&b| b == b'\n')
        .map(|line| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            decode_line(line, encoding).into_owned()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_content_type() {
        let page = br#"<meta http-equiv="Content-Type" content="text/html; charset=windows-1251">"#;
        let enc = sniff(page).unwrap();
        assert_eq!(enc.name(), "windows-1251");
    }

    #[test]
    fn test_sniff_html5_charset() {
        let page = br#"<meta charset="koi8-r">"#;
        let enc = sniff(page).unwrap();
        assert_eq!(enc.name(), "KOI8-R");
    }

    #[test]
    fn test_sniff_utf8_is_none() {
        let page = br#"<meta charset="utf-8">"#;
        assert!(sniff(page).is_none());
    }

    #[test]
    fn test_sniff_absent() {
        assert!(sniff(b"<html><body>plain</body></html>").is_none());
    }

    #[test]
    fn test_decode_line_cp1251() {
        // "Тест" in windows-1251
        let bytes = [0xD2, 0xE5, 0xF1, 0xF2];
        let enc = Encoding::for_label(b"windows-1251");
        assert_eq!(decode_line(&bytes, enc), "Тест");
    }

    #[test]
    fn test_decoded_lines_strips_crlf() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let page = dir.path().join("page.html");
        fs::write(&page, b"first\r\nsecond\n")?;
        let lines = decoded_lines(&page)?;
        assert_eq!(lines[0], "first");
        assert_eq!(lines[1], "second");
        Ok(())
    }
}
