//! Deduplication phase: remove staged files whose content already exists
//! at the destination.
//!
//! A confirmed duplicate loses its staged copy (primary + sidecars, with
//! deletion events); its source file is deliberately NOT deleted here -
//! source cleanup only happens after successful processing, so a later
//! failure for a sibling file can never strand data.
//!
//! Read errors during comparison err on the side of preserving data: the
//! pair is treated as "not a duplicate" and the error is recorded.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::types::{PushResult, StagedFile};
use crate::core::dedup::Deduplicator;
use crate::core::sidecar::SidecarResolver;
use crate::events::{Event, EventBus, FileDeletedEvent};

/// Phase 2a: delete staged files that duplicate existing destination content.
///
/// Returns the surviving staged files.
pub(crate) fn remove_duplicates(
    staged: Vec<StagedFile>,
    destination: &Path,
    deduplicator: &dyn Deduplicator,
    bus: &EventBus,
    result: &mut PushResult,
) -> Vec<StagedFile> {
    if staged.is_empty() {
        return staged;
    }

    let existing = existing_files(destination, &staged);
    let mut survivors = Vec::with_capacity(staged.len());

    for staged_file in staged {
        match find_duplicate(&staged_file, &existing, deduplicator, result) {
            Some(original) => {
                info!(
                    "duplicate content: {} matches {}",
                    staged_file.temp_path.display(),
                    original.display()
                );
                match SidecarResolver::delete_with_sidecars(&staged_file.temp_path) {
                    Ok(deleted) => {
                        for file in &deleted {
                            publish_deleted(bus, &file.path, file.size);
                        }
                        result.duplicates_removed += 1;
                    }
                    Err(e) => {
                        warn!(
                            path = %staged_file.temp_path.display(),
                            error = %e,
                            "failed to delete duplicate"
                        );
                        result.record_failure(staged_file.temp_path.clone(), e.to_string());
                    }
                }
            }
            None => survivors.push(staged_file),
        }
    }

    if result.duplicates_removed > 0 {
        info!("removed {} duplicate(s)", result.duplicates_removed);
    }

    survivors
}

/// Files already present at the destination, excluding anything this run
/// staged (temp primaries and temp sidecars).
fn existing_files(destination: &Path, staged: &[StagedFile]) -> Vec<PathBuf> {
    let ours: HashSet<&PathBuf> = staged
        .iter()
        .flat_map(|s| std::iter::once(&s.temp_path).chain(s.temp_sidecars.iter()))
        .collect();

    let Ok(entries) = fs::read_dir(destination) else {
        return Vec::new();
    };

    let mut existing: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && !ours.contains(path))
        .collect();
    existing.sort();
    existing
}

fn find_duplicate<'a>(
    staged_file: &StagedFile,
    existing: &'a [PathBuf],
    deduplicator: &dyn Deduplicator,
    result: &mut PushResult,
) -> Option<&'a PathBuf> {
    for candidate in existing {
        match deduplicator.is_duplicate(&staged_file.temp_path, candidate) {
            Ok(true) => return Some(candidate),
            Ok(false) => {}
            Err(e) => {
                // Preserve data on read failure: record and keep comparing
                warn!(
                    candidate = %candidate.display(),
                    error = %e,
                    "duplicate comparison failed"
                );
                result.note_error(staged_file.temp_path.clone(), e.to_string());
            }
        }
    }
    None
}

fn publish_deleted(bus: &EventBus, path: &Path, size: u64) {
    match FileDeletedEvent::new(path, size) {
        Ok(event) => bus.publish(&Event::Deleted(event)),
        Err(e) => warn!(path = %path.display(), error = %e, "deletion event rejected"),
    }
}
