//! Recursive watch installation.
//!
//! At startup the whole tree under the root gets one watch per directory.
//! Directories created later are watched one at a time as the dispatcher
//! sees their creation events, with a narrower event set that omits deletes.

use std::fs;
use std::io;
use std::os::unix::fs::DirEntryExt;
use std::path::{Path, PathBuf};

use inotify::{Inotify, WatchMask, Watches};
use tracing::{debug, warn};

use crate::path_table::{join_bounded, CapacityExceeded, PathTable};

/// Which event set a watch subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchScope {
    /// Directories found by the startup scan
    Tree,
    /// Directories created while running; no delete events
    NewDirectory,
}

impl WatchScope {
    pub fn mask(self) -> WatchMask {
        match self {
            WatchScope::Tree => {
                WatchMask::CREATE | WatchMask::CLOSE | WatchMask::MOVED_TO | WatchMask::DELETE
            }
            WatchScope::NewDirectory => WatchMask::CREATE | WatchMask::CLOSE | WatchMask::MOVED_TO,
        }
    }
}

/// Registers OS watches and reports the identifier assigned to each.
pub trait WatchBackend {
    fn add_watch(&mut self, path: &Path, scope: WatchScope) -> io::Result<i32>;
}

/// inotify-backed watch registration.
pub struct InotifyBackend {
    watches: Watches,
}

impl InotifyBackend {
    pub fn new(inotify: &Inotify) -> Self {
        Self {
            watches: inotify.watches(),
        }
    }
}

impl WatchBackend for InotifyBackend {
    fn add_watch(&mut self, path: &Path, scope: WatchScope) -> io::Result<i32> {
        let wd = self.watches.add(path, scope.mask())?;
        Ok(wd.get_watch_descriptor_id())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("unable to open watch root <{path}>: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to add watch <{path}>: {source}")]
    OsWatchFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{source} while adding <{path}>")]
    CapacityExceeded {
        path: PathBuf,
        #[source]
        source: CapacityExceeded,
    },
}

/// The watch backend together with the table of what it watches.
pub struct WatchSet<B> {
    backend: B,
    table: PathTable,
}

impl<B: WatchBackend> WatchSet<B> {
    pub fn new(backend: B, table: PathTable) -> Self {
        Self { backend, table }
    }

    pub fn table(&self) -> &PathTable {
        &self.table
    }

    /// Directory watched under `id`, if any.
    pub fn resolve(&self, id: i32) -> Option<&Path> {
        self.table.lookup(id)
    }

    /// Watch `root` and every directory below it.
    ///
    /// Any error is fatal to startup. A subdirectory whose path would reach
    /// the length limit is skipped with a warning, and the remaining entries
    /// of its parent are not enumerated. Returns the number of directories
    /// watched.
    pub fn install_tree(&mut self, root: &Path) -> Result<usize, WatchError> {
        let mut watched = 0;
        self.install_dir(root, true, &mut watched)?;
        Ok(watched)
    }

    fn install_dir(&mut self, dir: &Path, is_root: bool, watched: &mut usize) -> Result<(), WatchError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(source) if is_root => {
                return Err(WatchError::RootUnreadable {
                    path: dir.to_path_buf(),
                    source,
                })
            }
            Err(e) => {
                debug!("skipping unreadable dir <{}>: {}", dir.display(), e);
                return Ok(());
            }
        };

        let id = self.register(dir, WatchScope::Tree)?;
        debug!("{} adding dir <{}> to watchpath", id, dir.display());
        *watched += 1;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("stopped reading <{}>: {}", dir.display(), e);
                    break;
                }
            };

            if entry.ino() == 0 {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }

            let child = match join_bounded(dir, &entry.file_name()) {
                Ok(child) => child,
                Err(e) => {
                    warn!("dir skipped under <{}>, {}", dir.display(), e);
                    break;
                }
            };
            self.install_dir(&child, false, watched)?;
        }

        Ok(())
    }

    /// Watch a single directory discovered at runtime.
    ///
    /// Errors are for the caller to log; the rest of the daemon keeps running
    /// and the directory stays unwatched.
    pub fn install_one(&mut self, path: &Path) -> Result<i32, WatchError> {
        self.register(path, WatchScope::NewDirectory)
    }

    fn register(&mut self, path: &Path, scope: WatchScope) -> Result<i32, WatchError> {
        let id = self
            .backend
            .add_watch(path, scope)
            .map_err(|source| WatchError::OsWatchFailure {
                path: path.to_path_buf(),
                source,
            })?;

        let previous = self
            .table
            .register(id, path.to_path_buf())
            .map_err(|source| WatchError::CapacityExceeded {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(previous) = previous.filter(|p| p != path) {
            debug!(
                "watch {} moved from <{}> to <{}>",
                id,
                previous.display(),
                path.display()
            );
        }
        Ok(id)
    }
}
