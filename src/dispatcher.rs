//! Event dispatch loop.
//!
//! Waits briefly for inotify readiness, drains every pending notification in
//! one read and applies them in delivery order: a directory must be watched
//! before a later event in the same batch can be attributed to it. Between
//! waits the loop reclaims tombstones every `2 * ttl` and services dump
//! requests raised by signals.

use std::ffi::{OsStr, OsString};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use inotify::{EventMask, Inotify};
use tracing::{debug, error, info, trace, warn};

use crate::config::DaemonConfig;
use crate::index::{CloseOutcome, EvictionIndex};
use crate::limits::{EVENT_BUFFER_LEN, READY_TIMEOUT_MS};
use crate::path_table::join_bounded;
use crate::report::write_dump;
use crate::signals::DumpRequests;
use crate::watch::{WatchBackend, WatchError, WatchSet};

/// A filesystem notification copied out of the read buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub watch_id: i32,
    pub mask: EventMask,
    pub name: Option<OsString>,
}

impl Notification {
    pub fn new(watch_id: i32, mask: EventMask, name: Option<&str>) -> Self {
        Self {
            watch_id,
            mask,
            name: name.map(OsString::from),
        }
    }
}

impl<'a> From<inotify::Event<&'a OsStr>> for Notification {
    fn from(event: inotify::Event<&'a OsStr>) -> Self {
        Self {
            watch_id: event.wd.get_watch_descriptor_id(),
            mask: event.mask,
            name: event.name.map(OsStr::to_os_string),
        }
    }
}

/// What the dispatcher did with one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing applicable: no name, unknown watch, or an uninteresting mask
    Ignored,
    /// The kernel queue overflowed and events were lost
    Overflow,
    /// Joined path would exceed the length limit
    PathTooLong,
    /// New directory is now watched under `id`
    Watched { id: i32, path: PathBuf },
    /// New directory could not be watched; its subtree stays unmonitored
    WatchFailed { path: PathBuf },
    /// Close or moved-in applied to the index
    Closed { path: PathBuf, outcome: CloseOutcome },
    /// Delete applied; `tracked` tells whether a record existed
    Deleted { path: PathBuf, tracked: bool },
    /// Index update failed; the notification is dropped
    Dropped { path: PathBuf },
}

pub struct Dispatcher<B> {
    watches: WatchSet<B>,
    index: EvictionIndex,
    requests: DumpRequests,
    reclaim_interval: Duration,
    last_reclaim: Instant,
    report_dumps: bool,
}

impl<B: WatchBackend> Dispatcher<B> {
    pub fn new(
        watches: WatchSet<B>,
        index: EvictionIndex,
        requests: DumpRequests,
        config: &DaemonConfig,
        now: Instant,
    ) -> Self {
        Self {
            watches,
            index,
            requests,
            reclaim_interval: config.reclaim_interval(),
            last_reclaim: now,
            report_dumps: !config.background,
        }
    }

    pub fn index(&self) -> &EvictionIndex {
        &self.index
    }

    pub fn watches(&self) -> &WatchSet<B> {
        &self.watches
    }

    /// Apply a drained batch in order.
    pub fn handle_batch<'n, I>(&mut self, batch: I, now: Instant) -> Vec<Action>
    where
        I: IntoIterator<Item = &'n Notification>,
    {
        batch.into_iter().map(|n| self.handle(n, now)).collect()
    }

    pub fn handle(&mut self, notification: &Notification, now: Instant) -> Action {
        let mask = notification.mask;
        if mask.contains(EventMask::Q_OVERFLOW) {
            warn!("notification queue overflowed, events were lost");
            return Action::Overflow;
        }

        let Some(name) = notification.name.as_deref().filter(|name| !name.is_empty()) else {
            return Action::Ignored;
        };
        let Some(dir) = self.watches.resolve(notification.watch_id) else {
            debug!("event for unknown watch {}", notification.watch_id);
            return Action::Ignored;
        };
        let path = match join_bounded(dir, name) {
            Ok(path) => path,
            Err(e) => {
                warn!("event skipped under <{}>, {}", dir.display(), e);
                return Action::PathTooLong;
            }
        };

        let is_dir = mask.contains(EventMask::ISDIR);
        if is_dir && mask.contains(EventMask::CREATE) {
            self.watch_new_dir(path)
        } else if !is_dir
            && mask.intersects(EventMask::CLOSE_WRITE | EventMask::CLOSE_NOWRITE | EventMask::MOVED_TO)
        {
            self.record_close(path, now)
        } else if !is_dir && mask.contains(EventMask::DELETE) {
            self.record_delete(path)
        } else {
            Action::Ignored
        }
    }

    fn watch_new_dir(&mut self, path: PathBuf) -> Action {
        match self.watches.install_one(&path) {
            Ok(id) => {
                debug!("{} adding new dir <{}> to watchpath", id, path.display());
                Action::Watched { id, path }
            }
            Err(e @ WatchError::CapacityExceeded { .. }) => {
                error!("{}", e);
                Action::WatchFailed { path }
            }
            Err(e) => {
                warn!("unable to add new dir: {}", e);
                Action::WatchFailed { path }
            }
        }
    }

    fn record_close(&mut self, path: PathBuf, now: Instant) -> Action {
        match self.index.record_close(&path, now) {
            Ok(outcome) => {
                match outcome {
                    CloseOutcome::Tracked => debug!("adding file <{}>", path.display()),
                    CloseOutcome::Refreshed => trace!("updating file time <{}>", path.display()),
                    CloseOutcome::Released => debug!("releasing purged file <{}>", path.display()),
                }
                Action::Closed { path, outcome }
            }
            Err(e) => {
                warn!("dropped event for <{}>: {}", path.display(), e);
                Action::Dropped { path }
            }
        }
    }

    fn record_delete(&mut self, path: PathBuf) -> Action {
        match self.index.remove(&path) {
            Ok(previous) => {
                if previous.is_some() {
                    debug!("deleting file <{}>", path.display());
                }
                Action::Deleted {
                    path,
                    tracked: previous.is_some(),
                }
            }
            Err(e) => {
                warn!("dropped delete for <{}>: {}", path.display(), e);
                Action::Dropped { path }
            }
        }
    }

    /// Drop all tombstones if a reclamation interval has passed since the last
    /// pass. Returns the number removed when a pass ran.
    pub fn reclaim_if_due(&mut self, now: Instant) -> Option<usize> {
        if now.saturating_duration_since(self.last_reclaim) < self.reclaim_interval {
            return None;
        }
        self.last_reclaim = now;

        match self.index.reclaim_tombstones() {
            Ok(removed) => {
                if removed > 0 {
                    debug!("reclaimed {} purged entries", removed);
                }
                Some(removed)
            }
            Err(e) => {
                error!("tombstone reclamation skipped: {}", e);
                None
            }
        }
    }

    /// Write a dump if one was requested. The request is consumed even when
    /// dumps are suppressed. Returns whether anything was written.
    pub fn service_dump<W: Write>(&self, out: &mut W, now: Instant) -> io::Result<bool> {
        let Some(kind) = self.requests.take() else {
            return Ok(false);
        };
        if !self.report_dumps {
            return Ok(false);
        }

        let entries = self.index.snapshot().map_err(io::Error::other)?;
        write_dump(out, &entries, kind, now)?;
        Ok(true)
    }

    /// Run until the process exits.
    pub fn run(mut self, mut inotify: Inotify) -> io::Result<()> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(EVENT_BUFFER_LEN)
            .map_err(io::Error::other)?;
        buffer.resize(EVENT_BUFFER_LEN, 0u8);
        let fd = inotify.as_raw_fd();

        loop {
            let ready = wait_readable(fd, READY_TIMEOUT_MS);
            self.turn(&mut inotify, &mut buffer, ready);
        }
    }

    /// One pass of the event loop after a readiness wait.
    ///
    /// A failed wait is logged and the pass still reclaims and services dumps.
    fn turn(&mut self, inotify: &mut Inotify, buffer: &mut [u8], ready: io::Result<bool>) {
        match ready {
            Ok(true) => match inotify.read_events(buffer) {
                Ok(events) => {
                    let batch: Vec<Notification> = events.map(Notification::from).collect();
                    self.handle_batch(&batch, Instant::now());
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => info!("bad inotify event read: {}", e),
            },
            Ok(false) => {}
            Err(e) => warn!("waiting for notifications failed: {}", e),
        }

        let now = Instant::now();
        self.reclaim_if_due(now);
        if self.requests.is_pending() {
            if let Err(e) = self.service_dump(&mut io::stderr().lock(), now) {
                info!("unable to write index dump: {}", e);
            }
        }
    }
}

/// Wait up to `timeout_ms` for `fd` to become readable.
///
/// A wait interrupted by a signal reports not-ready so the caller can service
/// any request the signal raised.
fn wait_readable(fd: RawFd, timeout_ms: i32) -> io::Result<bool> {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    // SAFETY: `pollfd` is a single valid entry that outlives the call.
    let rc = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(rc > 0 && pollfd.revents & libc::POLLIN != 0)
}
