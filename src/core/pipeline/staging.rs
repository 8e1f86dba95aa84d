//! Staging phase: copy source units to the destination under
//! collision-safe temporary names.
//!
//! Copies are verified (size equality plus a health check on both sides)
//! before their `FileCopiedEvent` is constructed, so subscribers never see
//! a partial copy. Failures are isolated per unit: the source is left
//! untouched, the error is recorded, and staging continues with the next
//! unit.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use super::types::{PushResult, StagedFile};
use crate::core::health;
use crate::core::scanner::ImageUnit;
use crate::core::sidecar::SidecarResolver;
use crate::error::{IngestError, StageError};
use crate::events::{Event, EventBus, FileCopiedEvent};

/// Upper bound on temp-name probing before giving up
const MAX_TEMP_ATTEMPTS: u32 = 10_000;

/// Allocates collision-safe temporary stems from a monotonic counter.
///
/// Names already present at the destination are skipped, so re-running
/// over the same directories never overwrites a previously staged file.
pub(crate) struct TempNamer {
    next: u32,
}

impl TempNamer {
    pub(crate) fn new() -> Self {
        Self { next: 1 }
    }

    /// Next free stem of the form `tmp_0001` for the given extension.
    pub(crate) fn allocate(
        &mut self,
        destination: &Path,
        extension: &str,
    ) -> Result<String, StageError> {
        for _ in 0..MAX_TEMP_ATTEMPTS {
            let stem = format!("tmp_{:04}", self.next);
            self.next += 1;
            if !destination.join(format!("{stem}.{extension}")).exists() {
                return Ok(stem);
            }
        }
        Err(StageError::TempNamesExhausted {
            directory: destination.to_path_buf(),
            attempts: MAX_TEMP_ATTEMPTS,
        })
    }
}

/// Phase 1: copy units into the destination under temp names.
///
/// Returns the staged files; in dry-run mode returns an empty list after
/// reporting (and counting) what would have been staged.
pub(crate) fn stage_units(
    units: &[ImageUnit],
    destination: &Path,
    migrate_sidecars: bool,
    dry_run: bool,
    bus: &EventBus,
    result: &mut PushResult,
) -> Vec<StagedFile> {
    let mut namer = TempNamer::new();
    let mut staged = Vec::with_capacity(units.len());

    for unit in units {
        let temp_stem = match namer.allocate(destination, unit.extension()) {
            Ok(stem) => stem,
            Err(e) => {
                warn!(path = %unit.primary.display(), error = %e, "staging failed");
                result.record_failure(unit.primary.clone(), e.to_string());
                continue;
            }
        };

        if dry_run {
            info!(
                "[DRY RUN] would stage: {} -> {}.{} (+ {} sidecars)",
                unit.primary.display(),
                temp_stem,
                unit.extension(),
                unit.sidecars.len()
            );
            result.staged += 1;
            continue;
        }

        match stage_unit(unit, destination, &temp_stem, migrate_sidecars, bus) {
            Ok(staged_file) => {
                info!(
                    "staged: {} -> {} (+ {} sidecars)",
                    unit.primary.display(),
                    staged_file.temp_path.display(),
                    staged_file.temp_sidecars.len()
                );
                result.staged += 1;
                staged.push(staged_file);
            }
            Err(e) => {
                warn!(path = %unit.primary.display(), error = %e, "staging failed");
                result.record_failure(unit.primary.clone(), e.to_string());
            }
        }
    }

    staged
}

/// Stage one unit: sidecars first, then the primary.
fn stage_unit(
    unit: &ImageUnit,
    destination: &Path,
    temp_stem: &str,
    migrate_sidecars: bool,
    bus: &EventBus,
) -> Result<StagedFile, IngestError> {
    let mut temp_sidecars = Vec::new();

    if migrate_sidecars {
        let renames = SidecarResolver::renamed_sidecars(&unit.primary, temp_stem)?;
        for rename in renames {
            let target = destination.join(&rename.new_name);
            copy_verified(&rename.original, &target, bus)?;
            debug!(
                "staged sidecar: {} -> {}",
                rename.original.display(),
                target.display()
            );
            temp_sidecars.push(target);
        }
    }

    let temp_path = destination.join(format!("{temp_stem}.{}", unit.extension()));
    copy_verified(&unit.primary, &temp_path, bus)?;

    Ok(StagedFile {
        source: unit.clone(),
        temp_path,
        temp_sidecars,
        capture: None,
    })
}

/// Copy one file, verify the result, and only then publish a copy event.
fn copy_verified(source: &Path, destination: &Path, bus: &EventBus) -> Result<(), IngestError> {
    fs::copy(source, destination).map_err(|e| StageError::CopyFailed {
        path: source.to_path_buf(),
        source: e,
    })?;

    let source_size = size_of(source)?;
    let destination_size = size_of(destination)?;
    if source_size != destination_size {
        return Err(StageError::SizeMismatch {
            path: destination.to_path_buf(),
            source_size,
            destination_size,
        }
        .into());
    }

    let source_healthy = health::is_healthy(source);
    let destination_healthy = health::is_healthy(destination);
    if !source_healthy || !destination_healthy {
        return Err(StageError::UnhealthyCopy {
            path: if source_healthy {
                destination.to_path_buf()
            } else {
                source.to_path_buf()
            },
        }
        .into());
    }

    // Verification passed; the event constructor re-checks the invariants.
    let event = FileCopiedEvent::new(
        source,
        destination,
        source_size,
        destination_size,
        source_healthy,
        destination_healthy,
    )?;
    bus.publish(&Event::Copied(event));

    Ok(())
}

fn size_of(path: &Path) -> Result<u64, StageError> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| StageError::CopyFailed {
            path: path.to_path_buf(),
            source: e,
        })
}
