//! # Sidecar Module
//!
//! Apple companion files that travel with photos:
//! - `.aae` / `.mov` / `.xmp` sidecars sharing the primary's stem
//! - `._` prefixed resource forks (hidden copies on non-Mac filesystems)
//! - `_O` edited variants (`IMG_1234` -> `IMG_O1234.aae`)
//! - hidden `_O` combinations (`._IMG_O1234.aae`)
//!
//! A primary image and its sidecars form one unit: they are renamed and
//! deleted together, each keeping its own variant prefix convention.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::SidecarError;

/// Known Apple sidecar extensions (matched case-insensitively)
const SIDECAR_EXTENSIONS: [&str; 3] = ["aae", "mov", "xmp"];

/// A sidecar file and its correctly renamed target filename.
///
/// `new_name` is just the filename (e.g. `._tmp_0001.HEIC`), not a full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarRename {
    pub original: PathBuf,
    pub new_name: String,
}

/// A file removed by `delete_with_sidecars`, with its pre-deletion size
/// so callers can publish accurate deletion events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Stateless resolver for Apple sidecar discovery, renaming and deletion.
pub struct SidecarResolver;

impl SidecarResolver {
    /// Discover all sidecar files associated with the given primary image.
    ///
    /// Read-only and tolerant of missing variants: absence is not an error.
    /// Results are deterministic (hidden variants sorted by name).
    pub fn find_sidecars(primary: &Path) -> Vec<PathBuf> {
        let Some(stem) = file_stem(primary) else {
            return Vec::new();
        };
        let parent = primary.parent().unwrap_or_else(|| Path::new("."));
        let mut sidecars: Vec<PathBuf> = Vec::new();

        // 1. Regular sidecars sharing the primary stem
        for ext in SIDECAR_EXTENSIONS {
            for variant in [ext.to_lowercase(), ext.to_uppercase()] {
                let candidate = parent.join(format!("{stem}.{variant}"));
                if candidate.exists() && candidate != primary {
                    sidecars.push(candidate);
                }
            }
        }

        // 2. _O edited AAE files
        let o_stem = edited_stem(&stem);
        if let Some(ref o_stem) = o_stem {
            for variant in ["aae", "AAE"] {
                let candidate = parent.join(format!("{o_stem}.{variant}"));
                if candidate.exists() {
                    sidecars.push(candidate);
                }
            }
        }

        // 3. + 4. Hidden resource forks for both stems (._IMG_1234.*, ._IMG_O1234.*)
        let mut hidden_stems = vec![stem.clone()];
        if let Some(ref o_stem) = o_stem {
            hidden_stems.push(o_stem.clone());
        }
        let mut hidden: Vec<PathBuf> = Vec::new();
        for hidden_stem in hidden_stems {
            let pattern = Regex::new(&format!(r"^\._{}\..+$", regex::escape(&hidden_stem)))
                .expect("hidden sidecar pattern is valid");
            let Ok(entries) = fs::read_dir(parent) else {
                continue;
            };
            for entry in entries.flatten() {
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                let path = entry.path();
                if pattern.is_match(name) && path != primary && !sidecars.contains(&path) {
                    hidden.push(path);
                }
            }
        }
        hidden.sort();
        hidden.dedup();
        sidecars.extend(hidden);

        sidecars
    }

    /// Compute renamed filenames for all sidecars of a primary image.
    ///
    /// Renaming preserves Apple's conventions per variant:
    /// - `IMG_1234.mov`    -> `new_stem.mov`
    /// - `._IMG_1234.HEIC` -> `._new_stem.HEIC`
    /// - `IMG_O1234.aae`   -> `new_o_stem.aae`
    /// - `._IMG_O1234.aae` -> `._new_o_stem.aae`
    pub fn renamed_sidecars(
        primary: &Path,
        new_stem: &str,
    ) -> Result<Vec<SidecarRename>, SidecarError> {
        let stem = file_stem(primary).ok_or_else(|| SidecarError::InvalidPrimary {
            path: primary.to_path_buf(),
        })?;
        let sidecars = Self::find_sidecars(primary);

        let o_stem = edited_stem(&stem);
        let new_o_stem = o_stem
            .as_ref()
            .map(|_| edited_stem(new_stem).unwrap_or_else(|| new_stem.to_string()));

        let mut renames = Vec::with_capacity(sidecars.len());
        for sidecar in sidecars {
            let name = sidecar
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| SidecarError::UnrecognizedPattern {
                    name: sidecar.display().to_string(),
                    stem: stem.clone(),
                })?
                .to_string();

            let hidden_stem = format!("._{stem}");
            let hidden_o_stem = o_stem.as_ref().map(|o| format!("._{o}"));
            let new_o = new_o_stem
                .clone()
                .unwrap_or_else(|| new_stem.to_string());

            let new_name = if let Some(rest) = name.strip_prefix(&hidden_stem) {
                format!("._{new_stem}{rest}")
            } else if let Some(rest) = hidden_o_stem
                .as_ref()
                .and_then(|h| name.strip_prefix(h.as_str()))
            {
                format!("._{new_o}{rest}")
            } else if let Some(rest) = o_stem.as_ref().and_then(|o| name.strip_prefix(o.as_str()))
            {
                format!("{new_o}{rest}")
            } else if let Some(rest) = name.strip_prefix(stem.as_str()) {
                format!("{new_stem}{rest}")
            } else {
                // Guard against future Apple surprises
                return Err(SidecarError::UnrecognizedPattern { name, stem });
            };

            renames.push(SidecarRename {
                original: sidecar,
                new_name,
            });
        }

        Ok(renames)
    }

    /// Rename a primary image and every present sidecar to a new stem.
    ///
    /// Returns the (old, new) path pairs in rename order, primary first.
    pub fn rename_with_sidecars(
        primary: &Path,
        new_primary: &Path,
    ) -> Result<Vec<(PathBuf, PathBuf)>, SidecarError> {
        let new_stem = file_stem(new_primary).ok_or_else(|| SidecarError::InvalidPrimary {
            path: new_primary.to_path_buf(),
        })?;
        let parent = new_primary.parent().unwrap_or_else(|| Path::new("."));
        let renames = Self::renamed_sidecars(primary, &new_stem)?;

        let mut performed = Vec::with_capacity(renames.len() + 1);

        fs::rename(primary, new_primary).map_err(|source| SidecarError::RenameFailed {
            from: primary.to_path_buf(),
            to: new_primary.to_path_buf(),
            source,
        })?;
        performed.push((primary.to_path_buf(), new_primary.to_path_buf()));

        for rename in renames {
            let target = parent.join(&rename.new_name);
            fs::rename(&rename.original, &target).map_err(|source| {
                SidecarError::RenameFailed {
                    from: rename.original.clone(),
                    to: target.clone(),
                    source,
                }
            })?;
            performed.push((rename.original, target));
        }

        Ok(performed)
    }

    /// Delete a primary image plus every discovered sidecar as one logical
    /// operation.
    ///
    /// Returns the full list of deleted paths with their pre-deletion sizes.
    pub fn delete_with_sidecars(primary: &Path) -> Result<Vec<DeletedFile>, SidecarError> {
        let mut targets = vec![primary.to_path_buf()];
        targets.extend(Self::find_sidecars(primary));

        let mut deleted = Vec::with_capacity(targets.len());
        for path in targets {
            let size = fs::metadata(&path)
                .map_err(|source| SidecarError::DeleteFailed {
                    path: path.clone(),
                    source,
                })?
                .len();
            fs::remove_file(&path).map_err(|source| SidecarError::DeleteFailed {
                path: path.clone(),
                source,
            })?;
            deleted.push(DeletedFile { path, size });
        }

        Ok(deleted)
    }
}

/// First `_` in the stem becomes `_O` (Apple's edited-variant convention)
fn edited_stem(stem: &str) -> Option<String> {
    stem.find('_')
        .map(|idx| format!("{}_O{}", &stem[..idx], &stem[idx + 1..]))
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}
