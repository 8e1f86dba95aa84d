//! Validated event types for file lifecycle operations.
//!
//! Constructors enforce the event invariants: a `FileCopiedEvent` can only
//! exist once both sides of the copy are confirmed equal-sized and healthy,
//! so no subscriber ever observes a partial copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::EventError;

/// All file-lifecycle events published by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// A file was copied and verified at its destination
    Copied(FileCopiedEvent),
    /// A file was renamed to its final name
    Renamed(FileRenamedEvent),
    /// A file was deleted
    Deleted(FileDeletedEvent),
}

/// Event kinds, used as subscription keys on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Copied,
    Renamed,
    Deleted,
}

impl Event {
    /// The kind this event is dispatched under
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Copied(_) => EventKind::Copied,
            Event::Renamed(_) => EventKind::Renamed,
            Event::Deleted(_) => EventKind::Deleted,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Copied => write!(f, "copied"),
            EventKind::Renamed => write!(f, "renamed"),
            EventKind::Deleted => write!(f, "deleted"),
        }
    }
}

/// Published after a copy succeeded and both post-checks passed.
///
/// Invariant: both paths exist, both sizes are equal, both health checks
/// passed. The constructor rejects anything else; callers confirm existence
/// before constructing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCopiedEvent {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub source_size: u64,
    pub destination_size: u64,
    pub source_healthy: bool,
    pub destination_healthy: bool,
    pub timestamp: DateTime<Utc>,
}

impl FileCopiedEvent {
    /// Build a copy event, validating the copy invariants.
    pub fn new(
        source_path: &Path,
        destination_path: &Path,
        source_size: u64,
        destination_size: u64,
        source_healthy: bool,
        destination_healthy: bool,
    ) -> Result<Self, EventError> {
        if source_path.as_os_str().is_empty() || destination_path.as_os_str().is_empty() {
            return Err(EventError::EmptyPath);
        }
        if source_size != destination_size {
            return Err(EventError::SizeMismatch {
                source_size,
                destination_size,
            });
        }
        if !source_healthy {
            return Err(EventError::Unhealthy { side: "source" });
        }
        if !destination_healthy {
            return Err(EventError::Unhealthy {
                side: "destination",
            });
        }

        Ok(Self {
            source_path: source_path.to_path_buf(),
            destination_path: destination_path.to_path_buf(),
            source_size,
            destination_size,
            source_healthy,
            destination_healthy,
            timestamp: Utc::now(),
        })
    }

    /// Filename component of the destination path
    pub fn destination_name(&self) -> String {
        self.destination_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Published after a staged file was renamed to its final name.
///
/// Invariant: the new path exists and passed its health check; the old path
/// may no longer exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRenamedEvent {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    pub file_size: u64,
    pub is_healthy: bool,
    pub timestamp: DateTime<Utc>,
}

impl FileRenamedEvent {
    pub fn new(
        old_path: &Path,
        new_path: &Path,
        file_size: u64,
        is_healthy: bool,
    ) -> Result<Self, EventError> {
        if old_path.as_os_str().is_empty() || new_path.as_os_str().is_empty() {
            return Err(EventError::EmptyPath);
        }
        if !is_healthy {
            return Err(EventError::Unhealthy { side: "renamed" });
        }

        Ok(Self {
            old_path: old_path.to_path_buf(),
            new_path: new_path.to_path_buf(),
            file_size,
            is_healthy,
            timestamp: Utc::now(),
        })
    }
}

/// Published after a file was deleted, with its pre-deletion size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDeletedEvent {
    pub file_path: PathBuf,
    pub file_size: u64,
    pub timestamp: DateTime<Utc>,
}

impl FileDeletedEvent {
    pub fn new(file_path: &Path, file_size: u64) -> Result<Self, EventError> {
        if file_path.as_os_str().is_empty() {
            return Err(EventError::EmptyPath);
        }

        Ok(Self {
            file_path: file_path.to_path_buf(),
            file_size,
            timestamp: Utc::now(),
        })
    }
}
