//! List the names of all discovered trackers.

use crate::WatcherContext;
use crate::config::resolve;

/// Prints one tracker name per line.
pub fn execute(ctx: &WatcherContext) {
    for tracker in resolve::load_all(&ctx.plugins_dir, &ctx.config) {
        println!("{}", tracker.name);
    }
}
