//! pcpurge: drop recently written files from the page cache after a TTL.
//!
//! The daemon watches a directory tree with inotify. A file that is closed or
//! moved into the tree is tracked; once it has gone `ttl` without another
//! close, a sweep thread advises the kernel to drop its cached pages. Large
//! write bursts therefore stop pinning memory long after they are done.
//!
//! # Threads
//!
//! - the dispatcher (main thread) turns notifications into index updates,
//!   watches new directories, reclaims tombstones and writes dumps
//! - the sweeper expires entries every 50 ms
//! - a signal thread exits the process on INT/QUIT/TERM
//!
//! The dispatcher and the sweeper share only the [`EvictionIndex`].

pub mod config;
pub mod daemon;
pub mod dispatcher;
pub mod evict;
pub mod index;
pub mod limits;
pub mod logging;
pub mod path_table;
pub mod report;
pub mod signals;
pub mod sweeper;
pub mod version;
pub mod watch;

pub use config::{validate_root, ConfigError, DaemonConfig};
pub use dispatcher::{Action, Dispatcher, Notification};
pub use evict::{CacheEvictor, FadviseEvictor};
pub use index::{CloseOutcome, EvictionIndex, FileState, IndexError};
pub use path_table::{join_bounded, CapacityExceeded, PathTable, PathTooLong};
pub use signals::{DumpRequest, DumpRequests};
pub use sweeper::SweepWorker;
pub use watch::{InotifyBackend, WatchBackend, WatchError, WatchScope, WatchSet};
