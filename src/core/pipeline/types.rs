//! Types shared across the pipeline phases.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::scanner::ImageUnit;

/// A unit staged at a temporary destination path.
///
/// Exists only during a pipeline run; by the end of the run every staged
/// file has been renamed, deleted, or left in place as a recorded failure.
#[derive(Debug, Clone)]
pub struct StagedFile {
    /// The source unit this was staged from
    pub source: ImageUnit,
    /// Temporary path of the staged primary
    pub temp_path: PathBuf,
    /// Temporary paths of the staged sidecars
    pub temp_sidecars: Vec<PathBuf>,
    /// Name-determining capture instant: UTC offset applied, collision
    /// perturbation included. None when the image has no capture date.
    pub capture: Option<NaiveDateTime>,
}

/// A per-unit failure: originating path plus a human-readable reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitError {
    pub path: PathBuf,
    pub reason: String,
}

/// Aggregate result of one pipeline run.
///
/// Counters are never capped; only the `Display` rendering truncates the
/// error listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResult {
    pub run_id: String,
    pub staged: usize,
    pub duplicates_removed: usize,
    pub processed: usize,
    pub failed: usize,
    pub errors: Vec<UnitError>,
}

/// How many errors the summary rendering shows before eliding
const DISPLAY_ERROR_CAP: usize = 5;

impl PushResult {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            staged: 0,
            duplicates_removed: 0,
            processed: 0,
            failed: 0,
            errors: Vec::new(),
        }
    }

    /// Record a terminal failure for a unit.
    pub fn record_failure(&mut self, path: PathBuf, reason: impl Into<String>) {
        self.failed += 1;
        self.errors.push(UnitError {
            path,
            reason: reason.into(),
        });
    }

    /// Record a non-terminal error (the unit continues through the run).
    pub fn note_error(&mut self, path: PathBuf, reason: impl Into<String>) {
        self.errors.push(UnitError {
            path,
            reason: reason.into(),
        });
    }
}

impl Default for PushResult {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PushResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "staged: {}, duplicates removed: {}, processed: {}, failed: {}",
            self.staged, self.duplicates_removed, self.processed, self.failed
        )?;

        for error in self.errors.iter().take(DISPLAY_ERROR_CAP) {
            write!(f, "\n  - {}: {}", error.path.display(), error.reason)?;
        }
        if self.errors.len() > DISPLAY_ERROR_CAP {
            write!(f, "\n  ... and {} more", self.errors.len() - DISPLAY_ERROR_CAP)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_failure_bumps_counter_and_list() {
        let mut result = PushResult::new();
        result.record_failure(PathBuf::from("/src/a.jpg"), "copy failed");

        assert_eq!(result.failed, 1);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn note_error_does_not_mark_unit_failed() {
        let mut result = PushResult::new();
        result.note_error(PathBuf::from("/dst/tmp_0001.jpg"), "read error during compare");

        assert_eq!(result.failed, 0);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn display_caps_error_listing_but_not_counts() {
        let mut result = PushResult::new();
        for i in 0..8 {
            result.record_failure(PathBuf::from(format!("/src/{i}.jpg")), "boom");
        }

        let rendered = result.to_string();
        assert!(rendered.contains("failed: 8"));
        assert!(rendered.contains("... and 3 more"));
        assert_eq!(result.errors.len(), 8);
    }

    #[test]
    fn result_is_serializable() {
        let mut result = PushResult::new();
        result.record_failure(PathBuf::from("/src/a.jpg"), "boom");

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("run_id"));
        assert!(json.contains("boom"));
    }
}
