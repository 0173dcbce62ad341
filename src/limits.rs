//! Hard resource caps.
//!
//! These are enforced, not advisory: exceeding one produces a logged warning or
//! a fatal startup error, never a silent truncation.

use std::time::Duration;

/// Number of slots in the watch table. Watch identifiers at or above this
/// value cannot be recorded.
pub const MAX_WATCHES: usize = 10_000;

/// Maximum length in bytes of any directory or file path the daemon handles.
///
/// A joined path is rejected once its length reaches `MAX_PATH_LEN - 1`.
pub const MAX_PATH_LEN: usize = 300;

/// Worst-case number of notifications drained in a single read.
pub const MAX_BATCH_EVENTS: usize = 100_000;

/// Size of the fixed inotify header preceding each event's name.
const EVENT_HEADER_LEN: usize = 16;

/// Largest file name a notification can carry (`NAME_MAX`).
const NAME_MAX: usize = 255;

/// Size of the notification read buffer, allocated once at startup.
pub const EVENT_BUFFER_LEN: usize = MAX_BATCH_EVENTS * EVENT_HEADER_LEN + NAME_MAX + 1;

/// Default time-to-live for a closed file before its pages are dropped.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Pause between two sweeps of the eviction index.
pub const SWEEP_INTERVAL: Duration = Duration::from_millis(50);

/// How long the dispatcher waits for notification readiness before servicing
/// its periodic work.
pub const READY_TIMEOUT_MS: i32 = 10;

/// Stack size of the sweep worker thread.
pub const SWEEPER_STACK_SIZE: usize = 256 * 1024;
