//! Startup sequence.
//!
//! Order matters: every watch is installed while the terminal is still
//! attached so fatal errors are visible, then the process detaches, and only
//! then are threads started, since forking keeps just the calling thread.

use std::io;
use std::time::Instant;

use anyhow::{Context, Result};
use inotify::Inotify;
use tracing::info;

use crate::config::DaemonConfig;
use crate::dispatcher::Dispatcher;
use crate::evict::FadviseEvictor;
use crate::index::EvictionIndex;
use crate::limits::MAX_WATCHES;
use crate::path_table::PathTable;
use crate::signals::{self, DumpRequests};
use crate::sweeper::SweepWorker;
use crate::watch::{InotifyBackend, WatchSet};

/// Run the daemon. Returns only on a fatal error.
pub fn run(config: DaemonConfig) -> Result<()> {
    info!("debug     = {}", config.verbosity);
    info!("lifespan  = {}s", config.ttl.as_secs());
    info!("watchpath = <{}>", config.root.display());

    let table = PathTable::with_capacity(MAX_WATCHES)
        .with_context(|| format!("unable to alloc mem for dir table ({})", MAX_WATCHES))?;

    let inotify = Inotify::init().context("unable to create inotify descriptor")?;
    let mut watches = WatchSet::new(InotifyBackend::new(&inotify), table);
    let watched = watches.install_tree(&config.root)?;
    info!("watching {} directories", watched);

    if config.background {
        daemonize().context("unable to become daemon")?;
    }

    let index = EvictionIndex::new();
    SweepWorker::new(index.clone(), FadviseEvictor, config.ttl)
        .spawn()
        .context("unable to spawn worker thread")?;

    let requests = DumpRequests::new();
    signals::install(&requests, !config.background).context("unable to install signal handlers")?;

    let dispatcher = Dispatcher::new(watches, index, requests, &config, Instant::now());
    dispatcher.run(inotify).context("event loop failed")
}

/// Detach from the controlling terminal, chdir to `/` and point the standard
/// streams at `/dev/null`.
fn daemonize() -> io::Result<()> {
    // SAFETY: called before this process has spawned any thread.
    if unsafe { libc::daemon(0, 0) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
