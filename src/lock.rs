//! Single-instance lock management.
//!
//! Two watcher runs sharing one cache would fight over scratch pages and
//! cookie jars, so a run holds an advisory pid lock file in the cache
//! directory. A second instance reads the recorded pid, probes it with a
//! null signal, and declines to run while the holder is alive; a stale
//! file left by a crash is simply taken over. The lock is released when
//! dropped.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Holds the single-instance lock for the duration of a run.
pub struct InstanceLock {
    lock_file: File,
    lock_path: PathBuf,
}

impl InstanceLock {
    /// Acquires the instance lock.
    ///
    /// Returns `Ok(None)` when another live instance holds it; the caller
    /// reports and exits gracefully.
    ///
    /// # Errors
    /// Returns an error if the lock file cannot be created or written.
    pub fn acquire(path: &Path) -> Result<Option<Self>> {
        if let Some(pid) = read_holder(path) {
            tracing::debug!(pid, "lock file exists");
            if process_alive(pid) {
                return Ok(None);
            }
            tracing::debug!(pid, "lock holder is gone, taking over stale lock");
        }

        let mut lock_file = File::create(path)
            .with_context(|| format!("Failed to create lock file: {}", path.display()))?;
        match lock_file.try_lock_exclusive() {
            Ok(true) => {}
            Ok(false) | Err(_) => return Ok(None),
        }

        writeln!(
            lock_file,
            "{}\ntime={}",
            std::process::id(),
            humantime::format_rfc3339(SystemTime::now())
        )
        .with_context(|| format!("Failed to write lock file: {}", path.display()))?;

        Ok(Some(Self {
            lock_file,
            lock_path: path.to_path_buf(),
        }))
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
        if let Err(e) = fs::remove_file(&self.lock_path) {
            eprintln!(
                "Warning: Failed to remove lock file {}: {}",
                self.lock_path.display(),
                e
            );
        }
    }
}

/// Pid recorded in an existing lock file, if readable.
fn read_holder(path: &Path) -> Option<i32> {
    let content = fs::read_to_string(path).ok()?;
    let pid: i32 = content.lines().next()?.trim().parse().ok()?;
    (pid > 0).then_some(pid)
}

/// Non-destructive liveness probe: null signal delivery.
fn process_alive(pid: i32) -> bool {
    let result = unsafe { libc::kill(pid as libc::pid_t, 0) };
    if result == 0 {
        return true;
    }
    // EPERM still proves the pid exists, just under another user
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}
