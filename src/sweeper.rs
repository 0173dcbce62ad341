//! Periodic TTL sweep over the eviction index.
//!
//! Runs on its own thread, independent of the dispatcher. Expiry is noticed
//! at most one sweep interval late, never early.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::evict::CacheEvictor;
use crate::index::EvictionIndex;
use crate::limits::{SWEEPER_STACK_SIZE, SWEEP_INTERVAL};

pub struct SweepWorker<E> {
    index: EvictionIndex,
    evictor: E,
    ttl: Duration,
    interval: Duration,
}

impl<E: CacheEvictor + 'static> SweepWorker<E> {
    pub fn new(index: EvictionIndex, evictor: E, ttl: Duration) -> Self {
        Self {
            index,
            evictor,
            ttl,
            interval: SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Purge every entry due at `now`. Returns how many were purged.
    ///
    /// Entries are marked purged even when the cache drop fails, so a file
    /// that vanished is not retried on every pass.
    pub fn sweep_once(&self, now: Instant) -> usize {
        let due = match self.index.expire(now, self.ttl) {
            Ok(due) => due,
            Err(e) => {
                error!("sweep skipped: {}", e);
                return 0;
            }
        };

        for path in &due {
            debug!("purging <{}> from page cache ...", path.display());
            if let Err(e) = self.evictor.evict(path) {
                info!("unable to purge <{}>: {}", path.display(), e);
            }
        }
        due.len()
    }

    /// Sweep forever at the configured interval.
    pub fn run(self) {
        loop {
            self.sweep_once(Instant::now());
            thread::sleep(self.interval);
        }
    }

    /// Start the sweep loop on a named thread with a small fixed stack.
    ///
    /// The handle is never joined; the thread lives until the process exits.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("pcpurge-sweeper".to_string())
            .stack_size(SWEEPER_STACK_SIZE)
            .spawn(move || self.run())
    }
}
