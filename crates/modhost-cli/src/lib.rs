//! modhost command line library
//!
//! Exposes the command handlers so they can be exercised from tests.

pub mod commands;
pub mod common;

pub use common::GlobalOpts;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding a `tracing` filter that overrides `-v`/`-q`
pub const LOG_ENV: &str = "MODHOST_LOG";

/// Route `tracing` events from the host crates to stderr.
pub fn init_tracing(opts: &GlobalOpts) {
    let default_filter = if opts.quiet {
        "error"
    } else {
        match opts.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}
