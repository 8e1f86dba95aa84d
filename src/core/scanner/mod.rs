//! # Scanner Module
//!
//! Discovers image units (primary photo + owned sidecars) in the source
//! directory. Discovery order is name-sorted so downstream timestamp
//! perturbation is reproducible run to run.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::sidecar::SidecarResolver;
use crate::error::StageError;

/// Image extensions the pipeline ingests
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "heic", "heif", "png"];

/// A primary image file plus the sidecar files it owns.
///
/// Identity is the primary path at discovery time. Sidecars always travel
/// and are deleted together with the unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUnit {
    pub primary: PathBuf,
    pub sidecars: Vec<PathBuf>,
}

impl ImageUnit {
    /// Stem of the primary file (e.g. "IMG_1234")
    pub fn stem(&self) -> &str {
        self.primary
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }

    /// Extension of the primary file with original casing (e.g. "HEIC")
    pub fn extension(&self) -> &str {
        self.primary
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
    }
}

/// Check if a file is a primary image asset (not a system file or sidecar).
pub fn is_valid_image(path: &Path) -> bool {
    // `._` resource forks are sidecars, never primaries
    if path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("._"))
    {
        return false;
    }

    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Discover all image units directly inside the source directory.
///
/// Non-recursive by design: the source is an ingestion inbox, not a
/// library tree.
pub fn discover_units(source: &Path) -> Result<Vec<ImageUnit>, StageError> {
    if !source.is_dir() {
        return Err(StageError::SourceNotFound {
            path: source.to_path_buf(),
        });
    }

    let entries = fs::read_dir(source).map_err(|source_err| StageError::ReadDirectory {
        path: source.to_path_buf(),
        source: source_err,
    })?;

    let mut primaries: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source_err| StageError::ReadDirectory {
            path: source.to_path_buf(),
            source: source_err,
        })?;
        let path = entry.path();
        if path.is_file() && is_valid_image(&path) {
            primaries.push(path);
        }
    }
    primaries.sort();

    Ok(primaries
        .into_iter()
        .map(|primary| {
            let sidecars = SidecarResolver::find_sidecars(&primary);
            ImageUnit { primary, sidecars }
        })
        .collect())
}
