//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pcpurge::{WatchBackend, WatchScope};

/// Hands out sequential watch ids and records every registration.
#[derive(Clone)]
pub struct FakeBackend {
    next_id: Arc<Mutex<i32>>,
    pub calls: Arc<Mutex<Vec<(PathBuf, WatchScope)>>>,
    fail_on: Option<PathBuf>,
}

impl FakeBackend {
    pub fn starting_at(first_id: i32) -> Self {
        Self {
            next_id: Arc::new(Mutex::new(first_id)),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_on: None,
        }
    }

    /// Make `add_watch` fail for `path`.
    pub fn failing_on(mut self, path: &Path) -> Self {
        self.fail_on = Some(path.to_path_buf());
        self
    }

    pub fn registered(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }
}

impl WatchBackend for FakeBackend {
    fn add_watch(&mut self, path: &Path, scope: WatchScope) -> io::Result<i32> {
        if self.fail_on.as_deref() == Some(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "watch refused"));
        }
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        self.calls.lock().unwrap().push((path.to_path_buf(), scope));
        Ok(id)
    }
}
