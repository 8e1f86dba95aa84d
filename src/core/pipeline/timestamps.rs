//! Timestamp disambiguation phase: guarantee that no two survivors derive
//! the same target filename.
//!
//! Capture instants are adjusted by whole seconds, in discovery order, so
//! the result is deterministic and reproducible. The adjusted instant is
//! carried on the `StagedFile` and consumed by the naming strategy; the
//! staged file's own metadata is left untouched.

use std::collections::HashSet;

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info, warn};

use super::types::{PushResult, StagedFile};
use crate::core::metadata::MetadataReader;

/// Phase 2b: read capture metadata and separate colliding timestamps.
pub(crate) fn fix_overlapping_timestamps(
    staged: &mut [StagedFile],
    reader: &dyn MetadataReader,
    result: &mut PushResult,
) {
    if staged.is_empty() {
        return;
    }

    let mut used: HashSet<NaiveDateTime> = HashSet::new();
    let mut adjustments = 0usize;

    for staged_file in staged.iter_mut() {
        let metadata = match reader.read(&staged_file.temp_path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(
                    path = %staged_file.temp_path.display(),
                    error = %e,
                    "failed to read capture metadata"
                );
                result.note_error(staged_file.temp_path.clone(), e.to_string());
                continue;
            }
        };

        let Some(creation) = metadata.creation_date else {
            debug!(
                path = %staged_file.temp_path.display(),
                "no capture date, keeping original name"
            );
            continue;
        };

        // Apply the UTC offset once; everything downstream uses this instant
        let mut effective = match metadata.utc_offset_hours {
            Some(hours) => creation + Duration::hours(hours as i64),
            None => creation,
        };

        let original = effective;
        // Bump by one second until the instant is unique within the batch
        while used.contains(&effective) {
            effective += Duration::seconds(1);
        }
        if effective != original {
            info!(
                "adjusted capture time: {} -> {}",
                staged_file.temp_path.display(),
                effective.format("%Y-%m-%d %H:%M:%S")
            );
            adjustments += 1;
        }

        used.insert(effective);
        staged_file.capture = Some(effective);
    }

    if adjustments > 0 {
        info!("adjusted {} timestamp collision(s)", adjustments);
    } else {
        debug!("no timestamp collisions detected");
    }
}
