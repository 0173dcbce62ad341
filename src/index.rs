//! Concurrent index of recently closed files awaiting eviction.
//!
//! # State machine
//!
//! A path is either absent from the index, `Active` (closed at some instant,
//! eviction pending) or `Purged` (pages already dropped, kept as a
//! tombstone). Transitions:
//!
//! | Trigger | From | To |
//! |---|---|---|
//! | close / moved-in | absent | `Active(now)` |
//! | close / moved-in | `Active(t)` | `Active(now)` |
//! | close / moved-in | `Purged` | absent |
//! | delete | any | absent |
//! | sweep, `now - t >= ttl` | `Active(t)` | `Purged` |
//! | reclamation pass | `Purged` | absent |
//!
//! A purged file that is closed again is dropped from the index rather than
//! re-armed; a later close starts it over from absent.
//!
//! # Locking
//!
//! One `RwLock` guards the whole map. Lookups and iteration take the read
//! side; every find-then-mutate sequence runs entirely under the write side
//! so the dispatcher and the sweeper never interleave on the same key.

use std::collections::{HashMap, TryReserveError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Lifecycle of a tracked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Closed at the given instant; eviction pending
    Active(Instant),
    /// Pages dropped; retained as a tombstone until reclaimed
    Purged,
}

impl FileState {
    /// Whether an `Active` entry has outlived `ttl` at `now`.
    pub fn is_due(&self, now: Instant, ttl: Duration) -> bool {
        match self {
            FileState::Active(since) => now.saturating_duration_since(*since) >= ttl,
            FileState::Purged => false,
        }
    }
}

/// Effect of a close or moved-in notification on the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Path was absent and is now active
    Tracked,
    /// Path was active; its deadline moved to `now + ttl`
    Refreshed,
    /// Path was a tombstone and has been removed
    Released,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("unable to alloc mem for new index entry: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("eviction index lock poisoned")]
    Poisoned,
}

/// Shared handle to the eviction index. Clones refer to the same map.
#[derive(Debug, Clone, Default)]
pub struct EvictionIndex {
    entries: Arc<RwLock<HashMap<PathBuf, FileState>>>,
}

impl EvictionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<PathBuf, FileState>>, IndexError> {
        self.entries.read().map_err(|_| IndexError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<PathBuf, FileState>>, IndexError> {
        self.entries.write().map_err(|_| IndexError::Poisoned)
    }

    /// Apply a close or moved-in notification for `path`.
    pub fn record_close(&self, path: &Path, now: Instant) -> Result<CloseOutcome, IndexError> {
        let mut entries = self.write()?;

        if let Some(state) = entries.get_mut(path) {
            if let FileState::Active(since) = state {
                *since = now;
                return Ok(CloseOutcome::Refreshed);
            }
            entries.remove(path);
            return Ok(CloseOutcome::Released);
        }

        entries.try_reserve(1)?;
        entries.insert(path.to_path_buf(), FileState::Active(now));
        Ok(CloseOutcome::Tracked)
    }

    /// Drop `path` regardless of its state. Returns the state it had, if any.
    pub fn remove(&self, path: &Path) -> Result<Option<FileState>, IndexError> {
        Ok(self.write()?.remove(path))
    }

    pub fn get(&self, path: &Path) -> Result<Option<FileState>, IndexError> {
        Ok(self.read()?.get(path).copied())
    }

    pub fn len(&self) -> Result<usize, IndexError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.read()?.is_empty())
    }

    /// Move every due `Active` entry to `Purged` and return their paths.
    ///
    /// Candidates are collected under the read lock; the write lock is only
    /// taken when something is due, and each candidate is re-checked under it
    /// because the dispatcher may have refreshed or removed it in between.
    pub fn expire(&self, now: Instant, ttl: Duration) -> Result<Vec<PathBuf>, IndexError> {
        let mut due: Vec<PathBuf> = {
            let entries = self.read()?;
            entries
                .iter()
                .filter(|(_, state)| state.is_due(now, ttl))
                .map(|(path, _)| path.clone())
                .collect()
        };

        if due.is_empty() {
            return Ok(due);
        }

        let mut entries = self.write()?;
        due.retain(|path| match entries.get_mut(path) {
            Some(state) if state.is_due(now, ttl) => {
                *state = FileState::Purged;
                true
            }
            _ => false,
        });
        Ok(due)
    }

    /// Delete every tombstone. Returns how many were removed.
    pub fn reclaim_tombstones(&self) -> Result<usize, IndexError> {
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|_, state| *state != FileState::Purged);
        Ok(before - entries.len())
    }

    /// Copy of all entries, ordered by path.
    pub fn snapshot(&self) -> Result<Vec<(PathBuf, FileState)>, IndexError> {
        let entries = self.read()?;
        let mut snapshot: Vec<(PathBuf, FileState)> = entries
            .iter()
            .map(|(path, state)| (path.clone(), *state))
            .collect();
        drop(entries);
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(snapshot)
    }
}
