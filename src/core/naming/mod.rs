//! # Naming Module
//!
//! Derives timestamp-based target filenames for processed images and
//! resolves residual collisions with bounded `(1)`, `(2)`, ... suffixes.
//!
//! Stateless - all methods are pure functions over the filesystem view
//! they are handed.

use chrono::{Duration, NaiveDateTime};
use std::path::{Path, PathBuf};

use crate::error::NamingError;

/// Target filename timestamp format, e.g. "20250101 120000"
const TIMESTAMP_FORMAT: &str = "%Y%m%d %H%M%S";

/// Upper bound on conflict suffix probing before giving up
const MAX_SUFFIX_ATTEMPTS: u32 = 1000;

/// Determines target filenames for processed images.
pub struct NamingStrategy;

impl NamingStrategy {
    /// Derive the timestamp stem for a capture date, applying the UTC
    /// offset when present.
    ///
    /// # Example
    /// `2024-03-15 14:30:00` with offset `-5` -> `"20240315 093000"`
    pub fn derive_name(creation_date: NaiveDateTime, utc_offset_hours: Option<i32>) -> String {
        let adjusted = match utc_offset_hours {
            Some(hours) => creation_date + Duration::hours(hours as i64),
            None => creation_date,
        };
        adjusted.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Full target path for a processed file.
    ///
    /// Uses the timestamp stem when a capture date is known, otherwise
    /// keeps the fallback stem (the original filename's stem). The
    /// extension comes from the processed output.
    pub fn target_path(
        directory: &Path,
        creation_date: Option<NaiveDateTime>,
        fallback_stem: &str,
        extension: &str,
    ) -> PathBuf {
        let stem = match creation_date {
            Some(date) => Self::derive_name(date, None),
            None => fallback_stem.to_string(),
        };
        directory.join(format!("{stem}.{extension}"))
    }

    /// Resolve filename conflicts by appending `(1)`, `(2)`, ...
    ///
    /// Returns the first free path; fails rather than probing forever.
    pub fn resolve_conflict(target: &Path) -> Result<PathBuf, NamingError> {
        if !target.exists() {
            return Ok(target.to_path_buf());
        }

        let directory = target.parent().unwrap_or_else(|| Path::new("."));
        let stem = target
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let extension = target
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        for counter in 1..=MAX_SUFFIX_ATTEMPTS {
            let candidate = if extension.is_empty() {
                directory.join(format!("{stem}({counter})"))
            } else {
                directory.join(format!("{stem}({counter}).{extension}"))
            };
            if !candidate.exists() {
                return Ok(candidate);
            }
        }

        Err(NamingError::SuffixesExhausted {
            target: target.to_path_buf(),
            attempts: MAX_SUFFIX_ATTEMPTS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn derive_name_formats_timestamp() {
        assert_eq!(
            NamingStrategy::derive_name(date("2025-01-01 12:00:00"), None),
            "20250101 120000"
        );
    }

    #[test]
    fn derive_name_applies_utc_offset() {
        assert_eq!(
            NamingStrategy::derive_name(date("2024-03-15 14:30:00"), Some(-5)),
            "20240315 093000"
        );
    }

    #[test]
    fn target_path_falls_back_to_original_stem() {
        let target =
            NamingStrategy::target_path(Path::new("/dst"), None, "IMG_1234", "jpg");
        assert_eq!(target, PathBuf::from("/dst/IMG_1234.jpg"));
    }

    #[test]
    fn resolve_conflict_returns_target_when_free() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("20250101 120000.jpg");

        assert_eq!(NamingStrategy::resolve_conflict(&target).unwrap(), target);
    }

    #[test]
    fn resolve_conflict_appends_counter() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("20250101 120000.jpg");
        File::create(&target).unwrap();
        File::create(dir.path().join("20250101 120000(1).jpg")).unwrap();

        let resolved = NamingStrategy::resolve_conflict(&target).unwrap();
        assert_eq!(resolved, dir.path().join("20250101 120000(2).jpg"));
    }
}
