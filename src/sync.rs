//! Cache-to-watch-folder synchronization.
//!
//! Download clients watching a folder rename torrent files on ingestion
//! (`x.torrent` becomes `x.torrent.loaded` or `.added`). Sync therefore
//! probes the consumed variants before the bare name, compares byte sizes
//! against whichever variant exists, and copies only what is missing or
//! changed, always under the bare name and never over a consumed variant.

use crate::TORRENT_EXT;
use crate::output;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Suffixes a consuming client may have appended, probed in order; the
/// empty suffix (the bare name) comes last.
const CONSUMED_SUFFIXES: [&str; 3] = [".loaded", ".added", ""];

/// Copies new or changed cache artifacts into the destination folder.
///
/// Returns `false` (after logging) when the destination does not exist; no
/// directory is created. Artifacts are visited in lexicographic filename
/// order for reproducible runs. In dry-run mode every copy is suppressed
/// but still logged.
///
/// # Errors
/// Returns an error on unexpected I/O while enumerating or copying.
pub fn sync_cache(cache_dir: &Path, folder: &Path, dry_run: bool) -> Result<bool> {
    output::separator(Some("SYNC: BEGIN"), '>');
    if !folder.exists() {
        output::error(&format!("Folder {} DOES NOT exist!", folder.display()));
        return Ok(false);
    }

    for artifact in cached_artifacts(cache_dir)? {
        let name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let up_to_date = match existing_variant(folder, &name) {
            Some(existing) => {
                output::verbose(&format!("File {} exists", existing.display()));
                let source_size = fs::metadata(&artifact)?.len();
                let dest_size = fs::metadata(&existing)?.len();
                if source_size == dest_size {
                    output::verbose(&format!("And size ({source_size}) matches"));
                    true
                } else {
                    output::verbose(&format!(
                        "But size ({dest_size}) does not match ({source_size})"
                    ));
                    false
                }
            }
            None => false,
        };

        if !up_to_date {
            let target = folder.join(&name);
            output::info(&format!(
                "{}Copy {} -> {}",
                output::dry_run_prefix(dry_run),
                artifact.display(),
                target.display()
            ));
            if !dry_run {
                fs::copy(&artifact, &target).with_context(|| {
                    format!("Failed to copy {} -> {}", artifact.display(), target.display())
                })?;
            }
        }
    }
    output::separator(Some("SYNC: END"), '<');
    Ok(true)
}

/// Enumerates finished artifacts in the cache, sorted by filename.
///
/// # Errors
/// Never fails today; unreadable entries are skipped.
pub fn cached_artifacts(cache_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut artifacts: Vec<PathBuf> = WalkDir::new(cache_dir)
        .max_depth(1)
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == TORRENT_EXT))
        .collect();
    artifacts.sort();
    Ok(artifacts)
}

/// First destination variant that exists, probing consumed suffixes before
/// the bare name.
fn existing_variant(folder: &Path, name: &str) -> Option<PathBuf> {
    for suffix in CONSUMED_SUFFIXES {
        let candidate = folder.join(format!("{name}{suffix}"));
        if candidate.exists() {
            return Some(candidate);
        }
        output::verbose(&format!("File {} DOES NOT exist", candidate.display()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        _tmp: tempfile::TempDir,
        cache: PathBuf,
        watch: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let cache = tmp.path().join("cache");
            let watch = tmp.path().join("watch");
            fs::create_dir_all(&cache).unwrap();
            fs::create_dir_all(&watch).unwrap();
            Self {
                _tmp: tmp,
                cache,
                watch,
            }
        }
    }

    #[test]
    fn test_missing_destination_fails_fast() {
        let fx = Fixture::new();
        fs::remove_dir(&fx.watch).unwrap();
        assert!(!sync_cache(&fx.cache, &fx.watch, false).unwrap());
    }

    #[test]
    fn test_new_artifact_is_copied() {
        let fx = Fixture::new();
        fs::write(fx.cache.join("x.torrent"), b"0123456789").unwrap();

        assert!(sync_cache(&fx.cache, &fx.watch, false).unwrap());
        assert_eq!(fs::read(fx.watch.join("x.torrent")).unwrap(), b"0123456789");
    }

    #[test]
    fn test_consumed_variant_with_equal_size_skips_copy() {
        let fx = Fixture::new();
        fs::write(fx.cache.join("x.torrent"), b"0123456789").unwrap();
        fs::write(fx.watch.join("x.torrent.loaded"), b"9876543210").unwrap();

        assert!(sync_cache(&fx.cache, &fx.watch, false).unwrap());
        assert!(!fx.watch.join("x.torrent").exists());
    }

    #[test]
    fn test_size_mismatch_recopies_under_bare_name() {
        let fx = Fixture::new();
        fs::write(fx.cache.join("x.torrent"), b"0123456789").unwrap();
        fs::write(fx.watch.join("x.torrent.loaded"), b"01234567").unwrap();

        assert!(sync_cache(&fx.cache, &fx.watch, false).unwrap());
        // re-copied under the bare name; the consumed variant is untouched
        assert_eq!(fs::read(fx.watch.join("x.torrent")).unwrap(), b"0123456789");
        assert_eq!(fs::read(fx.watch.join("x.torrent.loaded")).unwrap(), b"01234567");
    }

    #[test]
    fn test_dry_run_copies_nothing() {
        let fx = Fixture::new();
        fs::write(fx.cache.join("x.torrent"), b"0123456789").unwrap();

        assert!(sync_cache(&fx.cache, &fx.watch, true).unwrap());
        assert!(!fx.watch.join("x.torrent").exists());
    }

    #[test]
    fn test_artifacts_sorted_and_filtered() {
        let fx = Fixture::new();
        fs::write(fx.cache.join("b.torrent"), b"b").unwrap();
        fs::write(fx.cache.join("a.torrent"), b"a").unwrap();
        fs::write(fx.cache.join("session.cookies"), b"c").unwrap();
        fs::write(fx.cache.join("name.notify"), b"n").unwrap();

        let names: Vec<String> = cached_artifacts(&fx.cache)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.torrent", "b.torrent"]);
    }
}
