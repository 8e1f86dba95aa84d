//! Processing phase: convert staged files, move them to their final names,
//! and only then clean up the corresponding sources.
//!
//! A unit's source (primary + sidecars) is deleted strictly after its
//! processed output exists under a verified final name. If processing
//! fails or reports an unhealthy result, both the staged temp and the
//! source are preserved untouched for manual inspection.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use super::types::{PushResult, StagedFile};
use crate::core::naming::NamingStrategy;
use crate::core::processor::FileProcessor;
use crate::core::sidecar::SidecarResolver;
use crate::error::{IngestError, ProcessError};
use crate::events::{Event, EventBus, FileDeletedEvent, FileRenamedEvent};

/// Phase 3: process survivors and clean up their sources.
///
/// With no processor injected, files legitimately remain staged under
/// their temporary names - a valid terminal state, not an error.
pub(crate) fn process_and_cleanup(
    staged: Vec<StagedFile>,
    processor: Option<&dyn FileProcessor>,
    destination: &Path,
    bus: &EventBus,
    result: &mut PushResult,
) {
    let Some(processor) = processor else {
        info!(
            "no processor provided, {} file(s) remain staged with temp names",
            staged.len()
        );
        return;
    };

    if staged.is_empty() {
        info!("no files to process");
        return;
    }

    info!("processing {} staged image(s)", staged.len());

    for staged_file in staged {
        match finalize_unit(&staged_file, processor, destination, bus) {
            Ok(final_name) => {
                info!(
                    "processed: {} -> {}",
                    staged_file.source.primary.display(),
                    final_name
                );
                result.processed += 1;
            }
            Err(e) => {
                warn!(
                    path = %staged_file.temp_path.display(),
                    error = %e,
                    "processing failed; temp and source preserved"
                );
                result.record_failure(staged_file.temp_path.clone(), e.to_string());
            }
        }
    }

    if result.failed > 0 {
        warn!("processing completed with {} failure(s)", result.failed);
    }
}

/// Process one staged file end to end: convert, rename, clean up source.
fn finalize_unit(
    staged_file: &StagedFile,
    processor: &dyn FileProcessor,
    destination: &Path,
    bus: &EventBus,
) -> Result<String, IngestError> {
    let temp_path = &staged_file.temp_path;

    let outcome = processor.process(temp_path);
    if !outcome.success {
        return Err(ProcessError::Failed {
            path: temp_path.clone(),
            reason: outcome
                .error_message
                .unwrap_or_else(|| "unknown error".to_string()),
        }
        .into());
    }
    if !outcome.is_healthy {
        return Err(ProcessError::Unhealthy {
            path: temp_path.clone(),
        }
        .into());
    }
    if !outcome.target_path.exists() {
        return Err(ProcessError::OutputMissing {
            path: outcome.target_path.clone(),
        }
        .into());
    }

    // Final name: timestamp-derived stem, processor output's extension,
    // bounded conflict suffixes for anything still colliding.
    let extension = outcome
        .target_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpg");
    let desired = NamingStrategy::target_path(
        destination,
        staged_file.capture,
        staged_file.source.stem(),
        extension,
    );
    let final_path = NamingStrategy::resolve_conflict(&desired)?;

    let size = fs::metadata(&outcome.target_path)
        .map(|m| m.len())
        .map_err(|e| ProcessError::RenameFailed {
            from: outcome.target_path.clone(),
            to: final_path.clone(),
            source: e,
        })?;

    fs::rename(&outcome.target_path, &final_path).map_err(|e| ProcessError::RenameFailed {
        from: outcome.target_path.clone(),
        to: final_path.clone(),
        source: e,
    })?;

    // The rename event's old path is the staged temp the verifier knows;
    // intermediate processor output never outlives this function.
    let event = FileRenamedEvent::new(temp_path, &final_path, size, true)?;
    bus.publish(&Event::Renamed(event));

    rename_staged_sidecars(staged_file, &final_path, destination, bus)?;

    // Output is safe under its final name: now, and only now, the source
    // unit can go.
    let deleted = SidecarResolver::delete_with_sidecars(&staged_file.source.primary)?;
    for file in &deleted {
        match FileDeletedEvent::new(&file.path, file.size) {
            Ok(event) => bus.publish(&Event::Deleted(event)),
            Err(e) => warn!(path = %file.path.display(), error = %e, "deletion event rejected"),
        }
    }

    Ok(final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default())
}

/// Rename the staged sidecars to the final stem, preserving each variant's
/// prefix convention, and publish a rename event per file.
fn rename_staged_sidecars(
    staged_file: &StagedFile,
    final_path: &Path,
    destination: &Path,
    bus: &EventBus,
) -> Result<(), IngestError> {
    if staged_file.temp_sidecars.is_empty() {
        return Ok(());
    }

    let final_stem = final_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let renames = SidecarResolver::renamed_sidecars(&staged_file.temp_path, final_stem)?;
    for rename in renames {
        let new_path = destination.join(&rename.new_name);
        let size = fs::metadata(&rename.original)
            .map(|m| m.len())
            .unwrap_or_default();
        fs::rename(&rename.original, &new_path).map_err(|e| ProcessError::RenameFailed {
            from: rename.original.clone(),
            to: new_path.clone(),
            source: e,
        })?;

        let event = FileRenamedEvent::new(&rename.original, &new_path, size, true)?;
        bus.publish(&Event::Renamed(event));
    }

    Ok(())
}
