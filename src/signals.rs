//! Signal handling.
//!
//! - INT, QUIT, TERM: exit immediately, nothing is flushed or persisted
//! - USR1: request an entry-count dump of the index
//! - USR2: request a full per-entry dump
//! - HUP: ignored, so losing the controlling terminal does not stop the daemon
//!
//! Dump signals only store into an atomic; the dispatcher performs the I/O.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM, SIGUSR1, SIGUSR2};
use signal_hook::iterator::Signals;

/// Kind of index dump requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpRequest {
    /// Entry count only
    Count = 1,
    /// Every entry with its state, then the count
    Full = 2,
}

/// Pending dump request shared between signal handlers and the dispatcher.
#[derive(Debug, Clone, Default)]
pub struct DumpRequests {
    pending: Arc<AtomicUsize>,
}

impl DumpRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self, kind: DumpRequest) {
        self.pending.store(kind as usize, Ordering::SeqCst);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) != 0
    }

    /// Consume the pending request, if any.
    pub fn take(&self) -> Option<DumpRequest> {
        match self.pending.swap(0, Ordering::SeqCst) {
            1 => Some(DumpRequest::Count),
            2 => Some(DumpRequest::Full),
            _ => None,
        }
    }
}

/// Route USR1/USR2 into `requests`.
pub fn register_dump_signals(requests: &DumpRequests) -> io::Result<()> {
    signal_hook::flag::register_usize(SIGUSR1, requests.pending.clone(), DumpRequest::Count as usize)?;
    signal_hook::flag::register_usize(SIGUSR2, requests.pending.clone(), DumpRequest::Full as usize)?;
    Ok(())
}

/// Keep SIGHUP from terminating the process. The flag is never read.
fn absorb_hangup() -> io::Result<()> {
    signal_hook::flag::register(SIGHUP, Arc::new(AtomicBool::new(false)))?;
    Ok(())
}

/// Install every handler the daemon needs.
///
/// Termination signals are consumed on a dedicated thread which exits the
/// process; `announce` prints the signal number first.
pub fn install(requests: &DumpRequests, announce: bool) -> io::Result<()> {
    register_dump_signals(requests)?;

    absorb_hangup()?;

    let mut signals = Signals::new([SIGINT, SIGQUIT, SIGTERM])?;
    thread::Builder::new()
        .name("pcpurge-signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                if announce {
                    eprintln!("\nexiting on signal {} ...\n", signal);
                }
                std::process::exit(0);
            }
        })?;

    Ok(())
}
