//! # Health Module
//!
//! Lightweight integrity checks for copied and converted files.
//!
//! A health check confirms a file is present, non-empty, and - where a
//! format-aware probe is cheap - structurally plausible. It is not a full
//! decode: the goal is to catch truncated or misidentified copies before
//! a source file is trusted to be deletable.

use std::path::Path;

/// Check whether a file passes its format's integrity probe.
///
/// - JPEG/PNG: header parse via the `image` crate (dimensions readable)
/// - HEIC/HEIF: existence and non-zero size only
///   TODO: wire a real ISO-BMFF box parse for HEIC once a decoder
///   dependency lands; size-only is a placeholder check
/// - anything else: existence and non-zero size
pub fn is_healthy(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() || metadata.len() == 0 {
        return false;
    }

    match extension_of(path).as_deref() {
        Some("jpg") | Some("jpeg") | Some("png") => image::image_dimensions(path).is_ok(),
        _ => true,
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}
