//! # Photo Porter
//!
//! A safety-first photo ingestion pipeline: stage, deduplicate, process.
//!
//! ## Core Philosophy
//! - **Never lose a source file** - originals are deleted only after a
//!   verified, healthy copy exists at the destination
//! - **Every mutation is observable** - copies, renames and deletions are
//!   published as events so an independent verifier can cross-check the run
//! - **One bad file never aborts the batch** - failures are isolated per unit
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - The three-phase ingestion pipeline and its collaborators
//! - `events` - Synchronous event bus, validated event types, directory verifier
//! - `error` - User-friendly error types
//! - `config` - JSON configuration loading

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{IngestError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
