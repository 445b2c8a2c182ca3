//! Console output formatting and verbosity control.
//!
//! Run output mimics the classic watcher log: phase separators made of
//! repeated marker characters, dimmed routine messages, bold warnings and
//! errors, and a global verbosity switch (quiet, normal, verbose).

use colored::Colorize;
use std::sync::atomic::{AtomicU8, Ordering};

/// Verbosity level for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Suppress informational messages, show only warnings and errors.
    Quiet = 0,
    /// Default verbosity level, show all standard messages.
    Normal = 1,
    /// Show verbose debug messages in addition to standard output.
    Verbose = 2,
}

/// Global verbosity setting (default: Normal).
static VERBOSITY: AtomicU8 = AtomicU8::new(1);

/// Number of marker characters on each side of a separator header.
const SEPARATOR_WIDTH: usize = 10;

/// Sets the global verbosity level for all output functions.
pub fn set_verbosity(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

/// Gets the current global verbosity level.
pub fn get_verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        2 => Verbosity::Verbose,
        _ => Verbosity::Normal,
    }
}

/// Prints an error message in bold red (always shown).
pub fn error(message: &str) {
    eprintln!("{}", message.red().bold());
}

/// Prints a warning message in bold yellow (always shown).
pub fn warning(message: &str) {
    eprintln!("{}", message.yellow().bold());
}

/// Prints an informational message (respects quiet mode).
pub fn info(message: &str) {
    if get_verbosity() == Verbosity::Quiet {
        return;
    }
    eprintln!("{message}");
}

/// Prints a verbose debug message (only in verbose mode).
pub fn verbose(message: &str) {
    if get_verbosity() != Verbosity::Verbose {
        return;
    }
    eprintln!("{}", message.dimmed());
}

/// Prints a phase separator line built from `ch`, optionally framing a header.
pub fn separator(header: Option<&str>, ch: char) {
    let bar: String = std::iter::repeat(ch).take(SEPARATOR_WIDTH).collect();
    match header {
        Some(h) => info(&format!("{bar} {h} {bar}")),
        None => info(&bar),
    }
}

/// Prefix for actions suppressed by dry-run mode.
#[must_use]
pub fn dry_run_prefix(dry_run: bool) -> &'static str {
    if dry_run { "Dry run. " } else { "" }
}
