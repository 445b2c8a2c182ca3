//! Mail notification composition and dispatch.
//!
//! A matched link can route to mail instead of download. The engine
//! composes the message and drops an idempotency marker in the cache named
//! after the link's display name; the marker both carries the message and
//! guarantees at most one notification per distinct name per cache
//! lifetime. Actual delivery is an external concern behind [`Mailer`].

use crate::extract::LinkMeta;
use crate::output;
use crate::NOTIFY_EXT;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// External mail-sending mechanism.
pub trait Mailer {
    /// Delivers the composed message file to the recipient.
    ///
    /// # Errors
    /// Returns an error when the delivery mechanism fails.
    fn send(&self, recipient: &str, message: &Path) -> Result<()>;
}

/// Production mailer piping the message to a sendmail-compatible command
/// (`msmtp -t` by default).
///
/// The command is looked up on PATH at send time, so a missing mail setup
/// only hurts trackers that actually notify.
pub struct CommandMailer {
    command: String,
}

impl CommandMailer {
    #[must_use]
    pub fn from_config(core: &crate::config::CoreConfig) -> Self {
        Self {
            command: core.mailer.clone(),
        }
    }
}

impl Mailer for CommandMailer {
    fn send(&self, recipient: &str, message: &Path) -> Result<()> {
        let program: PathBuf = which::which(&self.command)
            .with_context(|| format!("mail command '{}' not found in PATH", self.command))?;
        let file = File::open(message)
            .with_context(|| format!("Failed to open message file: {}", message.display()))?;
        tracing::debug!(
            recipient,
            message = %message.display(),
            program = %program.display(),
            "dispatching notification mail"
        );
        let status = Command::new(&program)
            .arg("-t")
            .arg(recipient)
            .stdin(Stdio::from(file))
            .status()
            .with_context(|| format!("Failed to run {}", program.display()))?;
        anyhow::ensure!(status.success(), "mail command exited with {status}");
        Ok(())
    }
}

/// Composes and dispatches notifications with marker-file idempotency.
pub struct Notifier<'a> {
    mailer: &'a dyn Mailer,
    cache_dir: &'a Path,
    dry_run: bool,
}

impl<'a> Notifier<'a> {
    #[must_use]
    pub fn new(mailer: &'a dyn Mailer, cache_dir: &'a Path, dry_run: bool) -> Self {
        Self {
            mailer,
            cache_dir,
            dry_run,
        }
    }

    /// Notifies for one link, at most once per display name.
    ///
    /// The notify address splits on `?` into recipient and parameters, the
    /// parameters on `|` into extra header lines. Returns whether a message
    /// was actually handed to the mailer.
    ///
    /// # Errors
    /// Returns an error if the marker cannot be written or delivery fails.
    pub fn notify(&self, tracker: &str, link: &str, meta: &LinkMeta) -> Result<bool> {
        let Some(address) = meta.notify.as_deref() else {
            return Ok(false);
        };
        let name = meta.name.to_string();
        let marker = self.cache_dir.join(format!("{name}.{NOTIFY_EXT}"));
        if marker.exists() {
            tracing::debug!(name = %name, "notification marker already exists, skipping");
            return Ok(false);
        }

        let (recipient, params) = split_address(address);
        output::info(&format!("Notifying for {name}"));

        let mut file = File::create(&marker)
            .with_context(|| format!("Failed to write marker: {}", marker.display()))?;
        writeln!(file, "To: {recipient}")?;
        for param in &params {
            writeln!(file, "{param}")?;
        }
        writeln!(file)?;
        writeln!(file, "Notification mail for {name}.")?;
        writeln!(file, "Tracker: {tracker}.")?;
        writeln!(file, "URL: {}.", meta.source_url)?;
        writeln!(file, "Link: {link}.")?;
        drop(file);

        if self.dry_run {
            output::info(&format!(
                "{}Mail to {recipient} for {name}",
                output::dry_run_prefix(true)
            ));
            return Ok(false);
        }
        self.mailer.send(recipient, &marker)?;
        Ok(true)
    }
}

/// Splits `user@host?p1|p2` into the recipient and its parameter lines.
#[must_use]
pub fn split_address(address: &str) -> (&str, Vec<&str>) {
    match address.split_once('?') {
        Some((recipient, params)) => (recipient, params.split('|').collect()),
        None => (address, Vec::new()),
    }
}
