//! Diagnostic stream setup.
//!
//! Everything goes to stderr through a `tracing` fmt subscriber. Verbosity
//! picks the level; `PCPURGE_LOG` overrides it with an `EnvFilter` directive.
//! Daemonized runs install nothing, so diagnostics are dropped.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::DaemonConfig;

pub const LOG_ENV: &str = "PCPURGE_LOG";

/// 0 → warn, 1 → info, 2 → debug, 3+ → trace.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

pub fn init(config: &DaemonConfig) {
    if config.background {
        return;
    }

    let filter = EnvFilter::builder()
        .with_default_directive(level_for(config.verbosity).into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
