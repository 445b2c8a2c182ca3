//! External URL fetcher contract and the wget implementation.
//!
//! The engine never talks HTTP itself. A [`Fetcher`] is handed a URL plus
//! the session's file locations and leaves the page body and the raw
//! response headers on disk; the engine only reads those files afterwards.
//! The production implementation shells out to wget with a persistent
//! cookie jar, and rewrites gzip-encoded bodies decompressed so the engine
//! always scans plain text.

use crate::headers;
use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

/// On-disk locations of one tracker session.
///
/// Aliased trackers share a session basename and therefore a cookie jar.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    /// Persistent cookie jar.
    pub cookies: PathBuf,
    /// Scratch page body (listing pages, login responses, downloads).
    pub page: PathBuf,
    /// Raw response headers captured by the fetcher.
    pub headers: PathBuf,
}

impl SessionPaths {
    /// Session file locations for `session` inside `cache_dir`.
    #[must_use]
    pub fn new(cache_dir: &Path, session: &str) -> Self {
        Self {
            cookies: cache_dir.join(format!("{session}.cookies")),
            page: cache_dir.join(format!("{session}.html")),
            headers: cache_dir.join(format!("{session}.headers")),
        }
    }
}

/// One fetch: a URL, an optional POST body, and whether this is an
/// artifact download (server-suggested filenames requested).
#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    /// `Some("")` performs an empty POST.
    pub post_body: Option<&'a str>,
    pub download: bool,
}

impl<'a> FetchRequest<'a> {
    /// Plain GET of a page.
    #[must_use]
    pub fn get(url: &'a str) -> Self {
        Self {
            url,
            post_body: None,
            download: false,
        }
    }

    /// Form POST of a page.
    #[must_use]
    pub fn post(url: &'a str, body: &'a str) -> Self {
        Self {
            url,
            post_body: Some(body),
            download: false,
        }
    }

    /// Artifact download, optionally via empty POST.
    #[must_use]
    pub fn download(url: &'a str, empty_post: bool) -> Self {
        Self {
            url,
            post_body: if empty_post { Some("") } else { None },
            download: true,
        }
    }
}

/// The external fetcher contract.
///
/// On success the page body is at `paths.page` (already decompressed) and
/// the raw response headers at `paths.headers`. A failed retrieval is an
/// error; callers decide how far the failure spreads.
pub trait Fetcher {
    /// Performs one fetch.
    ///
    /// # Errors
    /// Returns an error when the retrieval fails; no retry is attempted.
    fn fetch(&self, paths: &SessionPaths, req: &FetchRequest<'_>) -> Result<()>;
}

/// Production fetcher shelling out to wget.
pub struct WgetFetcher {
    program: PathBuf,
    user_agent: Option<String>,
}

impl WgetFetcher {
    /// Builds a fetcher from the user configuration, locating the wget
    /// binary on PATH unless an explicit path is configured.
    ///
    /// # Errors
    /// Returns an error if the binary cannot be found.
    pub fn from_config(core: &crate::config::CoreConfig) -> Result<Self> {
        let program = match &core.wget_path {
            Some(path) => path.clone(),
            None => which::which("wget").context("wget not found in PATH")?,
        };
        Ok(Self {
            program,
            user_agent: core.user_agent.clone(),
        })
    }
}

impl Fetcher for WgetFetcher {
    fn fetch(&self, paths: &SessionPaths, req: &FetchRequest<'_>) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-q")
            .arg("--convert-links")
            .arg("--keep-session-cookies")
            .arg("--save-cookies")
            .arg(&paths.cookies)
            .arg("--load-cookies")
            .arg(&paths.cookies)
            .arg("--server-response")
            .arg("--output-file")
            .arg(&paths.headers)
            .arg("-O")
            .arg(&paths.page);
        if let Some(agent) = &self.user_agent {
            cmd.arg("--user-agent").arg(agent);
        }
        if req.download {
            cmd.arg("--content-disposition").arg("--timestamping");
        }
        if let Some(body) = req.post_body {
            cmd.arg("--post-data").arg(body);
        }
        cmd.arg(req.url);

        tracing::debug!(url = req.url, command = ?cmd, "running wget");
        let status = cmd
            .status()
            .with_context(|| format!("Failed to run {}", self.program.display()))?;
        if !status.success() {
            bail!("wget exited with {status} for {}", req.url);
        }

        resave_gzipped_page(paths)
    }
}

/// Rewrites the page body decompressed when the captured headers declare a
/// gzip content encoding.
fn resave_gzipped_page(paths: &SessionPaths) -> Result<()> {
    if !headers::is_gzip_encoded(&paths.headers) {
        return Ok(());
    }
    tracing::debug!(page = %paths.page.display(), "content is gzipped");
    let compressed = fs::read(&paths.page)
        .with_context(|| format!("Failed to read fetched page: {}", paths.page.display()))?;
    let mut decoder = GzDecoder::new(compressed.as_slice());
    let mut body = Vec::new();
    decoder
        .read_to_end(&mut body)
        .context("Failed to decompress gzipped page")?;
    fs::write(&paths.page, body)
        .with_context(|| format!("Failed to rewrite page: {}", paths.page.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_session_paths_layout() {
        let paths = SessionPaths::new(Path::new("/cache"), "example");
        assert_eq!(paths.cookies, Path::new("/cache/example.cookies"));
        assert_eq!(paths.page, Path::new("/cache/example.html"));
        assert_eq!(paths.headers, Path::new("/cache/example.headers"));
    }

    #[test]
    fn test_request_constructors() {
        let get = FetchRequest::get("http://x/");
        assert!(get.post_body.is_none() && !get.download);

        let post = FetchRequest::post("http://x/", "a=b");
        assert_eq!(post.post_body, Some("a=b"));

        let plain = FetchRequest::download("http://x/", false);
        assert!(plain.download && plain.post_body.is_none());

        let posted = FetchRequest::download("http://x/", true);
        assert_eq!(posted.post_body, Some(""));
    }

    #[test]
    fn test_resave_gzipped_page() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SessionPaths::new(dir.path(), "example");

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<html>hello</html>").unwrap();
        fs::write(&paths.page, encoder.finish().unwrap()).unwrap();
        fs::write(&paths.headers, "  Content-Encoding: gzip\n").unwrap();

        resave_gzipped_page(&paths).unwrap();
        assert_eq!(fs::read(&paths.page).unwrap(), b"<html>hello</html>");
    }

    #[test]
    fn test_resave_leaves_plain_page_alone() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SessionPaths::new(dir.path(), "example");
        fs::write(&paths.page, b"<html>plain</html>").unwrap();
        fs::write(&paths.headers, "Content-Type: text/html\n").unwrap();

        resave_gzipped_page(&paths).unwrap();
        assert_eq!(fs::read(&paths.page).unwrap(), b"<html>plain</html>");
    }
}
