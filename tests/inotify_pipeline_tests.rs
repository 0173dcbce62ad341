//! Real inotify notifications driven through the dispatcher in-process.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant};

use inotify::Inotify;
use pcpurge::limits::{EVENT_BUFFER_LEN, MAX_WATCHES};
use pcpurge::{
    Action, CloseOutcome, DaemonConfig, Dispatcher, DumpRequests, EvictionIndex, FadviseEvictor,
    FileState, InotifyBackend, Notification, PathTable, SweepWorker, WatchSet,
};
use tempfile::TempDir;

struct Harness {
    inotify: Inotify,
    dispatcher: Dispatcher<InotifyBackend>,
    buffer: Vec<u8>,
}

impl Harness {
    fn start(root: &Path) -> Self {
        let inotify = Inotify::init().unwrap();
        let mut watches = WatchSet::new(
            InotifyBackend::new(&inotify),
            PathTable::with_capacity(MAX_WATCHES).unwrap(),
        );
        watches.install_tree(root).unwrap();

        let config = DaemonConfig::new(root.to_path_buf(), 1, 0, false);
        let dispatcher = Dispatcher::new(
            watches,
            EvictionIndex::new(),
            DumpRequests::new(),
            &config,
            Instant::now(),
        );
        Self {
            inotify,
            dispatcher,
            buffer: vec![0u8; EVENT_BUFFER_LEN],
        }
    }

    /// Feed notifications to the dispatcher until `done` sees the action it
    /// waits for, or two seconds pass.
    fn pump_until<F>(&mut self, done: F) -> Vec<Action>
    where
        F: Fn(&Action) -> bool,
    {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut seen = Vec::new();
        while Instant::now() < deadline {
            match self.inotify.read_events(&mut self.buffer) {
                Ok(events) => {
                    let batch: Vec<Notification> = events.map(Notification::from).collect();
                    let actions = self.dispatcher.handle_batch(&batch, Instant::now());
                    let finished = actions.iter().any(&done);
                    seen.extend(actions);
                    if finished {
                        return seen;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => panic!("inotify read failed: {}", e),
            }
            sleep(Duration::from_millis(10));
        }
        panic!("timed out; saw {:?}", seen);
    }

    /// Drain whatever is pending for a short while.
    fn settle(&mut self) -> Vec<Action> {
        let mut seen = Vec::new();
        let deadline = Instant::now() + Duration::from_millis(300);
        while Instant::now() < deadline {
            if let Ok(events) = self.inotify.read_events(&mut self.buffer) {
                let batch: Vec<Notification> = events.map(Notification::from).collect();
                seen.extend(self.dispatcher.handle_batch(&batch, Instant::now()));
            }
            sleep(Duration::from_millis(10));
        }
        seen
    }

    fn state(&self, path: &Path) -> Option<FileState> {
        self.dispatcher.index().get(path).unwrap()
    }
}

fn write_file(path: &Path) {
    let mut file = fs::File::create(path).unwrap();
    file.write_all(b"payload").unwrap();
}

fn closed(path: &Path, outcome: CloseOutcome) -> impl Fn(&Action) -> bool {
    let path = path.to_path_buf();
    move |action| {
        matches!(action, Action::Closed { path: p, outcome: o } if *p == path && *o == outcome)
    }
}

#[test]
fn test_written_file_is_tracked() {
    let temp = TempDir::new().unwrap();
    let mut harness = Harness::start(temp.path());

    let file = temp.path().join("f.bin");
    write_file(&file);
    harness.pump_until(closed(&file, CloseOutcome::Tracked));

    assert!(matches!(harness.state(&file), Some(FileState::Active(_))));
}

#[test]
fn test_new_directory_contents_are_tracked() {
    let temp = TempDir::new().unwrap();
    let mut harness = Harness::start(temp.path());

    let dir = temp.path().join("a");
    fs::create_dir(&dir).unwrap();
    harness.pump_until(|a| matches!(a, Action::Watched { path, .. } if *path == dir));

    let file = dir.join("f");
    write_file(&file);
    harness.pump_until(closed(&file, CloseOutcome::Tracked));
}

#[test]
fn test_moved_in_file_is_tracked() {
    let temp = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    let source = outside.path().join("m");
    write_file(&source);

    let mut harness = Harness::start(temp.path());
    let target = temp.path().join("m");
    fs::rename(&source, &target).unwrap();
    harness.pump_until(closed(&target, CloseOutcome::Tracked));
}

#[test]
fn test_delete_in_startup_directory_removes_record() {
    let temp = TempDir::new().unwrap();
    let sub = temp.path().join("pre");
    fs::create_dir(&sub).unwrap();
    let mut harness = Harness::start(temp.path());

    let file = sub.join("f");
    write_file(&file);
    harness.pump_until(closed(&file, CloseOutcome::Tracked));

    fs::remove_file(&file).unwrap();
    harness.pump_until(|a| *a == Action::Deleted { path: file.clone(), tracked: true });
    assert_eq!(harness.state(&file), None);
}

#[test]
fn test_delete_in_runtime_directory_is_not_observed() {
    // directories created after startup are watched without delete events
    let temp = TempDir::new().unwrap();
    let mut harness = Harness::start(temp.path());

    let dir = temp.path().join("late");
    fs::create_dir(&dir).unwrap();
    harness.pump_until(|a| matches!(a, Action::Watched { .. }));

    let file = dir.join("f");
    write_file(&file);
    harness.pump_until(closed(&file, CloseOutcome::Tracked));

    fs::remove_file(&file).unwrap();
    let actions = harness.settle();
    assert!(!actions.iter().any(|a| matches!(a, Action::Deleted { .. })));
    assert!(harness.state(&file).is_some());
}

#[test]
fn test_eviction_close_releases_tombstone() {
    let temp = TempDir::new().unwrap();
    let mut harness = Harness::start(temp.path());

    let file = temp.path().join("evicted");
    write_file(&file);
    harness.pump_until(closed(&file, CloseOutcome::Tracked));

    let ttl = Duration::from_secs(1);
    let sweeper = SweepWorker::new(harness.dispatcher.index().clone(), FadviseEvictor, ttl);
    assert_eq!(sweeper.sweep_once(Instant::now() + ttl), 1);
    assert_eq!(harness.state(&file), Some(FileState::Purged));

    // fadvise opens the file read-only; its close comes back as a notification
    let actions = harness.pump_until(closed(&file, CloseOutcome::Released));
    assert!(!actions.iter().any(|a| matches!(a, Action::Deleted { .. })));
    assert_eq!(harness.state(&file), None);

    // the release does not feed back into another purge
    assert_eq!(sweeper.sweep_once(Instant::now() + ttl * 2), 0);
    assert!(harness.settle().is_empty());
}

#[test]
fn test_batch_order_is_preserved() {
    let temp = TempDir::new().unwrap();
    let mut harness = Harness::start(temp.path());

    let file = temp.path().join("ordered");
    write_file(&file);
    fs::remove_file(&file).unwrap();

    let actions = harness.pump_until(|a| matches!(a, Action::Deleted { .. }));
    let close_at = actions
        .iter()
        .position(closed(&file, CloseOutcome::Tracked))
        .unwrap();
    let delete_at = actions
        .iter()
        .position(|a| *a == Action::Deleted { path: file.clone(), tracked: true })
        .unwrap();
    assert!(close_at < delete_at);
    assert_eq!(harness.state(&file), None);
}

#[test]
fn test_paths_are_rooted_under_watch_root() {
    let temp = TempDir::new().unwrap();
    let mut harness = Harness::start(temp.path());

    let file = temp.path().join("rooted");
    write_file(&file);
    let actions = harness.pump_until(closed(&file, CloseOutcome::Tracked));

    let paths: Vec<&PathBuf> = actions
        .iter()
        .filter_map(|a| match a {
            Action::Closed { path, .. } => Some(path),
            _ => None,
        })
        .collect();
    assert!(paths.iter().all(|p| p.starts_with(temp.path())));
}
