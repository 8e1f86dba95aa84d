//! Event-driven directory verification.
//!
//! The verifier maintains an expected-state snapshot (path existence) for
//! the directories it watches, mutated only by event delivery. It never
//! rescans the filesystem during steady state - that independence is what
//! makes it a meaningful cross-check of the pipeline's own bookkeeping.
//! Health and size fields carried on events are intentionally ignored.
//!
//! Watched roots are compared by prefix against raw event paths, so callers
//! must hand the verifier the same directory paths they hand the pipeline.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::bus::{EventBus, SubscriberId};
use super::types::{Event, EventKind};

struct WatchedDir {
    root: PathBuf,
    initial_count: usize,
    expected: HashSet<PathBuf>,
}

#[derive(Default)]
struct VerifierState {
    watched: Vec<WatchedDir>,
    adds_tracked: usize,
    removals_tracked: usize,
}

impl VerifierState {
    fn add(&mut self, path: &Path) {
        for dir in &mut self.watched {
            if path.starts_with(&dir.root) {
                if dir.expected.insert(path.to_path_buf()) {
                    self.adds_tracked += 1;
                }
                return;
            }
        }
    }

    fn remove(&mut self, path: &Path) {
        for dir in &mut self.watched {
            if dir.expected.remove(path) {
                self.removals_tracked += 1;
            }
        }
    }
}

/// Snapshot of verifier bookkeeping counters
#[derive(Debug, Clone)]
pub struct VerifierStats {
    pub watched_dirs: usize,
    pub initial_count: usize,
    pub expected_count: usize,
    pub adds_tracked: usize,
    pub removals_tracked: usize,
}

/// Subscribes to file-lifecycle events and tracks expected directory state.
pub struct DirectoryVerifier {
    bus: Arc<EventBus>,
    state: Arc<Mutex<VerifierState>>,
    subscriptions: Vec<(EventKind, SubscriberId)>,
}

impl DirectoryVerifier {
    /// Watch the given directories, taking an initial snapshot of each.
    ///
    /// Missing directories are created empty so a run into a fresh
    /// destination starts from a known state.
    pub fn new(directories: &[&Path], bus: Arc<EventBus>) -> std::io::Result<Self> {
        let mut watched = Vec::with_capacity(directories.len());
        for dir in directories {
            let expected = scan_directory(dir)?;
            watched.push(WatchedDir {
                root: dir.to_path_buf(),
                initial_count: expected.len(),
                expected,
            });
        }

        let state = Arc::new(Mutex::new(VerifierState {
            watched,
            ..Default::default()
        }));

        let subscriptions = vec![
            {
                let state = state.clone();
                let id = bus.subscribe(EventKind::Copied, move |event| {
                    if let Event::Copied(e) = event {
                        // The source keeps existing after a copy; only the
                        // destination side changes expected state.
                        let mut state = state.lock().expect("verifier lock poisoned");
                        state.add(&e.destination_path);
                        debug!(dest = %e.destination_path.display(), "copy event tracked");
                    }
                });
                (EventKind::Copied, id)
            },
            {
                let state = state.clone();
                let id = bus.subscribe(EventKind::Renamed, move |event| {
                    if let Event::Renamed(e) = event {
                        let mut state = state.lock().expect("verifier lock poisoned");
                        state.remove(&e.old_path);
                        state.add(&e.new_path);
                        debug!(
                            old = %e.old_path.display(),
                            new = %e.new_path.display(),
                            "rename event tracked"
                        );
                    }
                });
                (EventKind::Renamed, id)
            },
            {
                let state = state.clone();
                let id = bus.subscribe(EventKind::Deleted, move |event| {
                    if let Event::Deleted(e) = event {
                        let mut state = state.lock().expect("verifier lock poisoned");
                        state.remove(&e.file_path);
                        debug!(path = %e.file_path.display(), "delete event tracked");
                    }
                });
                (EventKind::Deleted, id)
            },
        ];

        let total: usize = {
            let state = state.lock().expect("verifier lock poisoned");
            state.watched.iter().map(|d| d.expected.len()).sum()
        };
        info!(
            dirs = directories.len(),
            files = total,
            "directory verifier initialized"
        );

        Ok(Self {
            bus,
            state,
            subscriptions,
        })
    }

    /// Check whether a path is currently expected to exist.
    pub fn expects(&self, path: &Path) -> bool {
        let state = self.state.lock().expect("verifier lock poisoned");
        state
            .watched
            .iter()
            .any(|dir| dir.expected.contains(path))
    }

    /// Compare expected state against the actual filesystem.
    ///
    /// The only rescan the verifier ever performs: one final snapshot per
    /// watched directory, diffed against what the events declared.
    /// Returns true when every directory matches.
    pub fn report(&self) -> bool {
        let state = self.state.lock().expect("verifier lock poisoned");
        let mut passed = true;

        for dir in &state.watched {
            let actual = match scan_directory(&dir.root) {
                Ok(actual) => actual,
                Err(e) => {
                    warn!(dir = %dir.root.display(), error = %e, "verification scan failed");
                    passed = false;
                    continue;
                }
            };

            let missing: Vec<_> = dir.expected.difference(&actual).collect();
            let unexpected: Vec<_> = actual.difference(&dir.expected).collect();

            if missing.is_empty() && unexpected.is_empty() {
                debug!(dir = %dir.root.display(), files = actual.len(), "verification passed");
                continue;
            }

            passed = false;
            for path in missing {
                warn!(dir = %dir.root.display(), path = %path.display(), "expected file missing");
            }
            for path in unexpected {
                warn!(dir = %dir.root.display(), path = %path.display(), "unexpected file present");
            }
        }

        if passed {
            info!("directory verification passed");
        } else {
            warn!("directory verification failed");
        }
        passed
    }

    /// Current bookkeeping counters
    pub fn stats(&self) -> VerifierStats {
        let state = self.state.lock().expect("verifier lock poisoned");
        VerifierStats {
            watched_dirs: state.watched.len(),
            initial_count: state.watched.iter().map(|d| d.initial_count).sum(),
            expected_count: state.watched.iter().map(|d| d.expected.len()).sum(),
            adds_tracked: state.adds_tracked,
            removals_tracked: state.removals_tracked,
        }
    }

    /// Unsubscribe from the bus. Called automatically on drop.
    pub fn cleanup(&mut self) {
        for (kind, id) in self.subscriptions.drain(..) {
            self.bus.unsubscribe(kind, id);
        }
    }
}

impl Drop for DirectoryVerifier {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Recursively list all files under a directory, creating it if missing.
fn scan_directory(root: &Path) -> std::io::Result<HashSet<PathBuf>> {
    if !root.exists() {
        fs::create_dir_all(root)?;
        return Ok(HashSet::new());
    }

    let mut files = HashSet::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .unwrap_or_else(|| std::io::Error::other("walkdir loop"))
        })?;
        if entry.file_type().is_file() {
            files.insert(entry.path().to_path_buf());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{FileCopiedEvent, FileDeletedEvent, FileRenamedEvent};
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    fn publish_copy(bus: &EventBus, source: &Path, dest: &Path, size: u64) {
        bus.publish(&Event::Copied(
            FileCopiedEvent::new(source, dest, size, size, true, true).unwrap(),
        ));
    }

    #[test]
    fn copy_event_adds_destination_to_expected_state() {
        let dest = TempDir::new().unwrap();
        let bus = Arc::new(EventBus::new());
        let verifier = DirectoryVerifier::new(&[dest.path()], bus.clone()).unwrap();

        let staged = dest.path().join("tmp_0001.HEIC");
        publish_copy(&bus, Path::new("/src/IMG_1.HEIC"), &staged, 4);

        assert!(verifier.expects(&staged));
    }

    #[test]
    fn rename_event_swaps_paths() {
        let dest = TempDir::new().unwrap();
        let bus = Arc::new(EventBus::new());
        let verifier = DirectoryVerifier::new(&[dest.path()], bus.clone()).unwrap();

        let old = dest.path().join("tmp_0001.jpg");
        let new = dest.path().join("20250101 120000.jpg");
        publish_copy(&bus, Path::new("/src/IMG_1.HEIC"), &old, 4);
        bus.publish(&Event::Renamed(
            FileRenamedEvent::new(&old, &new, 4, true).unwrap(),
        ));

        assert!(!verifier.expects(&old));
        assert!(verifier.expects(&new));
    }

    #[test]
    fn delete_event_removes_path() {
        let source = TempDir::new().unwrap();
        let bus = Arc::new(EventBus::new());
        let tracked = write_file(&source, "IMG_1.HEIC", b"data");
        let verifier = DirectoryVerifier::new(&[source.path()], bus.clone()).unwrap();

        assert!(verifier.expects(&tracked));
        bus.publish(&Event::Deleted(
            FileDeletedEvent::new(&tracked, 4).unwrap(),
        ));
        assert!(!verifier.expects(&tracked));
    }

    #[test]
    fn events_outside_watched_dirs_are_ignored() {
        let dest = TempDir::new().unwrap();
        let bus = Arc::new(EventBus::new());
        let verifier = DirectoryVerifier::new(&[dest.path()], bus.clone()).unwrap();

        let elsewhere = Path::new("/somewhere/else/file.jpg");
        publish_copy(&bus, Path::new("/src/a.jpg"), elsewhere, 1);

        assert!(!verifier.expects(elsewhere));
        assert_eq!(verifier.stats().adds_tracked, 0);
    }

    #[test]
    fn report_passes_when_events_match_filesystem() {
        let dest = TempDir::new().unwrap();
        let bus = Arc::new(EventBus::new());
        let verifier = DirectoryVerifier::new(&[dest.path()], bus.clone()).unwrap();

        // Simulate a real copy: the file appears on disk and an event declares it
        let staged = write_file(&dest, "tmp_0001.HEIC", b"data");
        publish_copy(&bus, Path::new("/src/IMG_1.HEIC"), &staged, 4);

        assert!(verifier.report());
    }

    #[test]
    fn report_fails_on_undeclared_file() {
        let dest = TempDir::new().unwrap();
        let bus = Arc::new(EventBus::new());
        let verifier = DirectoryVerifier::new(&[dest.path()], bus).unwrap();

        // A file appears with no corresponding event
        write_file(&dest, "sneaky.jpg", b"data");

        assert!(!verifier.report());
    }

    #[test]
    fn report_fails_on_missing_expected_file() {
        let dest = TempDir::new().unwrap();
        let bus = Arc::new(EventBus::new());
        let verifier = DirectoryVerifier::new(&[dest.path()], bus.clone()).unwrap();

        // Event declares a copy that never landed on disk
        publish_copy(
            &bus,
            Path::new("/src/IMG_1.HEIC"),
            &dest.path().join("tmp_0001.HEIC"),
            4,
        );

        assert!(!verifier.report());
    }

    #[test]
    fn cleanup_unsubscribes_from_bus() {
        let dest = TempDir::new().unwrap();
        let bus = Arc::new(EventBus::new());
        let verifier = DirectoryVerifier::new(&[dest.path()], bus.clone()).unwrap();

        assert_eq!(bus.subscriber_count(EventKind::Copied), 1);
        drop(verifier);
        assert_eq!(bus.subscriber_count(EventKind::Copied), 0);
    }
}
