//! # Error Module
//!
//! User-friendly error types for the photo ingestion pipeline.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Isolation-friendly** - phase errors carry enough detail to be
//!   recorded against a single unit without aborting the batch

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Staging error: {0}")]
    Stage(#[from] StageError),

    #[error("Deduplication error: {0}")]
    Dedupe(#[from] DedupeError),

    #[error("Sidecar error: {0}")]
    Sidecar(#[from] SidecarError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Naming error: {0}")]
    Naming(#[from] NamingError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors that occur while staging files to the destination
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Source directory not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {path}: {source}")]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copy verification failed for {path}: source {source_size} bytes, destination {destination_size} bytes")]
    SizeMismatch {
        path: PathBuf,
        source_size: u64,
        destination_size: u64,
    },

    #[error("Health check failed after copy: {path}")]
    UnhealthyCopy { path: PathBuf },

    #[error("Could not allocate a free temporary name in {directory} after {attempts} attempts")]
    TempNamesExhausted { directory: PathBuf, attempts: u32 },

    #[error("Failed to create destination directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur during duplicate detection
#[derive(Error, Debug)]
pub enum DedupeError {
    #[error("Failed to read {path} while comparing content: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from Apple sidecar discovery and unit operations
#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("Unrecognized sidecar pattern: {name} (primary stem: {stem})")]
    UnrecognizedPattern { name: String, stem: String },

    #[error("Failed to delete {path}: {source}")]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to rename {from} -> {to}: {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Primary file has no valid stem: {path}")]
    InvalidPrimary { path: PathBuf },
}

/// Errors from reading image metadata
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from target filename derivation
#[derive(Error, Debug)]
pub enum NamingError {
    #[error("No free name for {target} after {attempts} conflict suffixes")]
    SuffixesExhausted { target: PathBuf, attempts: u32 },
}

/// Errors surfaced by the processing phase
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Processor reported failure for {path}: {reason}")]
    Failed { path: PathBuf, reason: String },

    #[error("Processor output failed its health check: {path}")]
    Unhealthy { path: PathBuf },

    #[error("Processor output missing: {path}")]
    OutputMissing { path: PathBuf },

    #[error("Failed to rename {from} -> {to}: {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Rejections from event constructors
///
/// Events are only constructible when their invariants hold, so a partial
/// copy can never masquerade as a completed one.
#[derive(Error, Debug)]
pub enum EventError {
    #[error("Event paths cannot be empty")]
    EmptyPath,

    #[error("Copy event rejected: source {source_size} bytes, destination {destination_size} bytes")]
    SizeMismatch {
        source_size: u64,
        destination_size: u64,
    },

    #[error("Copy event rejected: {side} file failed its health check")]
    Unhealthy { side: &'static str },
}

/// Errors loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Source and destination must be provided via arguments or config")]
    MissingPaths,
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, IngestError>;
