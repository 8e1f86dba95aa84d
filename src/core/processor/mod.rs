//! # Processor Module
//!
//! The injected format-conversion capability. The pipeline treats the
//! processor as a black box: it hands over a staged temp file and receives
//! a `ProcessResult` describing what happened. Processors must be
//! side-effect-complete before returning - when conversion produces a new
//! file, the processor owns removal of its input.

use std::path::{Path, PathBuf};

/// Outcome of external processing, produced once per staged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// Whether processing completed
    pub success: bool,
    /// The processed output (unchanged input path on failure)
    pub target_path: PathBuf,
    /// Whether the output passed the processor's own health check
    pub is_healthy: bool,
    /// Failure detail, if any
    pub error_message: Option<String>,
}

impl ProcessResult {
    /// A successful, healthy result pointing at the processed output.
    pub fn ok(target_path: PathBuf) -> Self {
        Self {
            success: true,
            target_path,
            is_healthy: true,
            error_message: None,
        }
    }

    /// A failed result; the input path is reported unchanged.
    pub fn failure(input_path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            target_path: input_path,
            is_healthy: false,
            error_message: Some(reason.into()),
        }
    }
}

/// Capability interface for file processors (e.g. a HEIC-to-JPEG converter).
pub trait FileProcessor: Send + Sync {
    /// Process one staged file. Side effects must be complete on return.
    fn process(&self, staged_path: &Path) -> ProcessResult;
}
