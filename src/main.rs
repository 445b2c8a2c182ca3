use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::Colorize;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use torwatch::lock::InstanceLock;
use torwatch::{WatcherContext, commands, output};

#[derive(Parser)]
#[command(
    name = "torwatch",
    version = torwatch::VERSION,
    about = "Watch torrent trackers and fetch new torrent files into a local cache",
    long_about = "Logs in to configured trackers, scans their listing pages for links \
                  matching per-tracker patterns, downloads the matched torrent files into \
                  a local cache and optionally syncs them into a watch folder."
)]
struct Cli {
    /// Run fetching
    #[arg(short = 'r', long)]
    run: bool,

    /// Sync with the download client watch folder (defaults to core.watch_folder)
    #[arg(short = 's', long, value_name = "FOLDER", num_args = 0..=1)]
    sync: Option<Option<PathBuf>>,

    /// Clean up cache (remove *.torrent and *.notify files)
    #[arg(short = 'C', long)]
    clean: bool,

    /// List supported trackers
    #[arg(short = 'l', long)]
    list_trackers: bool,

    /// Relogin (clean cookies)
    #[arg(short = 'L', long)]
    relogin: bool,

    /// Dry run: do not copy, remove or mail, only report
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Use configuration file CONFIG instead of <dir>/config.toml
    #[arg(short = 'c', long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Directory of config and cache (default ~/.torwatch)
    #[arg(short = 'D', long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Quiet mode
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e:#}", "Error:".red().bold());
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if !(cli.run || cli.sync.is_some() || cli.clean || cli.list_trackers) {
        Cli::command().print_help()?;
        process::exit(1);
    }

    init_tracing(cli.verbose);
    if cli.quiet || cli.list_trackers {
        output::set_verbosity(output::Verbosity::Quiet);
    } else if cli.verbose {
        output::set_verbosity(output::Verbosity::Verbose);
    }

    let ctx = WatcherContext::new(cli.dir.clone(), cli.config.clone(), cli.dry_run, cli.relogin)?;
    output::separator(Some(&format!("torwatch version {}", torwatch::VERSION)), '>');
    output::separator(Some("BEGIN"), '-');

    if cli.list_trackers {
        commands::list::execute(&ctx);
        output::separator(Some("END"), '-');
        return Ok(());
    }

    ctx.ensure_cache_dir()?;
    let Some(_lock) = InstanceLock::acquire(&ctx.lock_path())? else {
        output::error(&format!(
            "{} exists. Remove it if you`re sure another instance is not running. Exiting",
            ctx.lock_path().display()
        ));
        output::separator(Some("END"), '-');
        return Ok(());
    };
    install_hup_handler();

    let result = dispatch(&cli, &ctx);
    output::separator(Some("END"), '-');
    result
}

fn dispatch(cli: &Cli, ctx: &WatcherContext) -> Result<()> {
    if cli.clean {
        return commands::clean::execute(ctx);
    }
    if cli.run {
        commands::run::execute(ctx)?;
    }
    if let Some(folder) = &cli.sync {
        let folder = folder
            .clone()
            .or_else(|| ctx.config.core.watch_folder.clone())
            .context("no sync folder given and core.watch_folder is not configured")?;
        commands::sync::execute(ctx, &folder)?;
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "torwatch=debug" } else { "torwatch=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Message emitted by the SIGHUP liveness trap.
static HUP_MESSAGE: OnceLock<String> = OnceLock::new();

/// Installs a SIGHUP trap that reports liveness without aborting work.
fn install_hup_handler() {
    let _ = HUP_MESSAGE.set(format!("{}: I'm working\n", process::id()));
    unsafe {
        libc::signal(libc::SIGHUP, hup_handler as libc::sighandler_t);
    }
}

extern "C" fn hup_handler(_signal: libc::c_int) {
    if let Some(message) = HUP_MESSAGE.get() {
        unsafe {
            libc::write(
                libc::STDERR_FILENO,
                message.as_ptr().cast(),
                message.len(),
            );
        }
    }
}
