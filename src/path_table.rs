//! Dense lookup from watch identifier to watched directory.
//!
//! The table is a fixed array indexed directly by the identifier the kernel
//! hands back from `inotify_add_watch`. Slots are never cleared: a directory
//! that disappears keeps its entry for the life of the process.

use std::collections::TryReserveError;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::limits::MAX_PATH_LEN;

/// A watch identifier fell outside the table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("exceeded watch table capacity ({capacity}), watch id {id}")]
pub struct CapacityExceeded {
    pub id: i32,
    pub capacity: usize,
}

/// A joined path would not fit in [`MAX_PATH_LEN`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("path len ({len}) exceeds limit ({limit})")]
pub struct PathTooLong {
    pub len: usize,
    pub limit: usize,
}

/// Build `dir/name`, refusing results that reach the path length limit.
pub fn join_bounded(dir: &Path, name: &OsStr) -> Result<PathBuf, PathTooLong> {
    let len = dir.as_os_str().len() + 1 + name.len();
    if len >= MAX_PATH_LEN - 1 {
        return Err(PathTooLong {
            len,
            limit: MAX_PATH_LEN,
        });
    }

    let mut joined = OsString::with_capacity(len);
    joined.push(dir.as_os_str());
    joined.push("/");
    joined.push(name);
    Ok(PathBuf::from(joined))
}

/// Watch identifier → directory path.
#[derive(Debug)]
pub struct PathTable {
    slots: Box<[Option<PathBuf>]>,
    occupied: usize,
}

impl PathTable {
    /// Allocate a table with `capacity` slots.
    ///
    /// Allocation failure is reported rather than aborting so startup can
    /// fail with a diagnostic.
    pub fn with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)?;
        slots.resize(capacity, None);
        Ok(Self {
            slots: slots.into_boxed_slice(),
            occupied: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of identifiers that have a directory recorded.
    pub fn len(&self) -> usize {
        self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Record `path` under `id`.
    ///
    /// The kernel hands back the same identifier when a directory is watched
    /// twice; in that case the slot is overwritten and the previous path is
    /// returned.
    pub fn register(&mut self, id: i32, path: PathBuf) -> Result<Option<PathBuf>, CapacityExceeded> {
        let capacity = self.capacity();
        let slot = usize::try_from(id)
            .ok()
            .and_then(|index| self.slots.get_mut(index))
            .ok_or(CapacityExceeded { id, capacity })?;

        let previous = slot.replace(path);
        if previous.is_none() {
            self.occupied += 1;
        }
        Ok(previous)
    }

    pub fn lookup(&self, id: i32) -> Option<&Path> {
        let index = usize::try_from(id).ok()?;
        self.slots.get(index)?.as_deref()
    }
}
