//! # Pipeline Module
//!
//! The three-phase ingestion pipeline and its orchestrator.
//!
//! ## Phases
//! 1. **Staging** - copy source units to the destination under
//!    collision-safe temp names, verified before events are published
//! 2. **Deduplication + timestamps** - drop staged files whose content
//!    already exists at the destination; separate colliding capture times
//! 3. **Processing + cleanup** - convert, rename to the final
//!    timestamp-derived name, then delete the source unit
//!
//! Phases run strictly in order; each pass refines the list of still-alive
//! units and appends to a shared result. A unit failure never aborts the
//! batch, and every unit ends in exactly one of:
//! staged-only, deduplicated, finalized, or failed.

mod dedupe;
mod processing;
pub(crate) mod staging;
mod timestamps;
mod types;

pub use types::{PushResult, StagedFile, UnitError};

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::core::dedup::{DedupeMode, Deduplicator};
use crate::core::metadata::{ExifMetadataReader, MetadataReader};
use crate::core::processor::FileProcessor;
use crate::core::scanner;
use crate::error::{Result, StageError};
use crate::events::EventBus;

/// The photo ingestion pipeline.
///
/// Construct through [`Pipeline::builder`]; a pipeline assumes exclusive
/// ownership of its source and destination directories for the duration
/// of a run.
pub struct Pipeline {
    source: PathBuf,
    destination: PathBuf,
    dry_run: bool,
    migrate_sidecars: bool,
    ensure_unique_timestamps: bool,
    deduplicator: Option<Box<dyn Deduplicator>>,
    metadata_reader: Box<dyn MetadataReader>,
    processor: Option<Box<dyn FileProcessor>>,
    bus: Arc<EventBus>,
}

/// Builder for the ingestion pipeline
pub struct PipelineBuilder {
    source: PathBuf,
    destination: PathBuf,
    dry_run: bool,
    migrate_sidecars: bool,
    ensure_unique_timestamps: bool,
    dedupe: DedupeMode,
    metadata_reader: Option<Box<dyn MetadataReader>>,
    processor: Option<Box<dyn FileProcessor>>,
    bus: Option<Arc<EventBus>>,
}

impl PipelineBuilder {
    /// Start a builder for the given source and destination directories.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            dry_run: false,
            migrate_sidecars: true,
            ensure_unique_timestamps: true,
            dedupe: DedupeMode::Default,
            metadata_reader: None,
            processor: None,
            bus: None,
        }
    }

    /// Simulate the run: no copies, no events, report-only.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Whether sidecar files travel with their primaries (default: true)
    pub fn migrate_sidecars(mut self, migrate: bool) -> Self {
        self.migrate_sidecars = migrate;
        self
    }

    /// Whether colliding capture times are separated (default: true)
    pub fn ensure_unique_timestamps(mut self, ensure: bool) -> Self {
        self.ensure_unique_timestamps = ensure;
        self
    }

    /// Deduplicator selection: default, disabled, or custom
    pub fn dedupe(mut self, mode: DedupeMode) -> Self {
        self.dedupe = mode;
        self
    }

    /// Inject the metadata reader (default: EXIF)
    pub fn metadata_reader(mut self, reader: Box<dyn MetadataReader>) -> Self {
        self.metadata_reader = Some(reader);
        self
    }

    /// Inject the file processor. Without one, files remain staged under
    /// temp names - a valid terminal state.
    pub fn processor(mut self, processor: Box<dyn FileProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Inject the event bus shared with verifiers and UI bridges
    pub fn bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            source: self.source,
            destination: self.destination,
            dry_run: self.dry_run,
            migrate_sidecars: self.migrate_sidecars,
            ensure_unique_timestamps: self.ensure_unique_timestamps,
            deduplicator: self.dedupe.into_deduplicator(),
            metadata_reader: self
                .metadata_reader
                .unwrap_or_else(|| Box::new(ExifMetadataReader::new())),
            processor: self.processor,
            bus: self.bus.unwrap_or_else(|| Arc::new(EventBus::new())),
        }
    }
}

impl Pipeline {
    /// Create a pipeline builder
    pub fn builder(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> PipelineBuilder {
        PipelineBuilder::new(source, destination)
    }

    /// The event bus this pipeline publishes on
    pub fn bus(&self) -> Arc<EventBus> {
        self.bus.clone()
    }

    /// Run the full pipeline: stage, deduplicate, process.
    pub fn run(&self) -> Result<PushResult> {
        let action = if self.dry_run { "[DRY RUN]" } else { "[ACTION]" };

        if !self.source.exists() {
            return Err(StageError::SourceNotFound {
                path: self.source.clone(),
            }
            .into());
        }

        info!(
            "{action} pushing photos from '{}' to '{}'",
            self.source.display(),
            self.destination.display()
        );

        if !self.dry_run {
            fs::create_dir_all(&self.destination).map_err(|e| StageError::CreateDirectory {
                path: self.destination.clone(),
                source: e,
            })?;
        }

        let units = scanner::discover_units(&self.source)?;
        let mut result = PushResult::new();

        // Phase 1: copy with temp names
        let mut staged = staging::stage_units(
            &units,
            &self.destination,
            self.migrate_sidecars,
            self.dry_run,
            &self.bus,
            &mut result,
        );

        if self.dry_run {
            // Nothing was staged, so there is nothing for later phases to
            // operate on
            info!("{action} later phases skipped; {} unit(s) would be staged", result.staged);
            self.log_summary(action, &result);
            return Ok(result);
        }

        // Phase 2a: deduplication (if enabled)
        if let Some(deduplicator) = self.deduplicator.as_deref() {
            staged = dedupe::remove_duplicates(
                staged,
                &self.destination,
                deduplicator,
                &self.bus,
                &mut result,
            );
        }

        // Phase 2b: timestamp uniqueness (if enabled)
        if self.ensure_unique_timestamps {
            timestamps::fix_overlapping_timestamps(
                &mut staged,
                self.metadata_reader.as_ref(),
                &mut result,
            );
        }

        // Phase 3: process and clean up sources
        processing::process_and_cleanup(
            staged,
            self.processor.as_deref(),
            &self.destination,
            &self.bus,
            &mut result,
        );

        self.log_summary(action, &result);
        Ok(result)
    }

    fn log_summary(&self, action: &str, result: &PushResult) {
        info!("{action} summary: {result}");
        if result.failed > 0 {
            warn!("{} error(s) occurred during the run", result.failed);
        }
        if self.dry_run {
            info!("run without dry_run to apply changes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, contents: &[u8]) {
        File::create(dir.join(name))
            .unwrap()
            .write_all(contents)
            .unwrap();
    }

    #[test]
    fn run_fails_on_missing_source() {
        let dest = TempDir::new().unwrap();
        let pipeline = Pipeline::builder("/nonexistent/inbox", dest.path()).build();

        assert!(pipeline.run().is_err());
    }

    #[test]
    fn run_on_empty_source_is_a_noop() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let pipeline = Pipeline::builder(source.path(), dest.path()).build();

        let result = pipeline.run().unwrap();

        assert_eq!(result.staged, 0);
        assert_eq!(result.failed, 0);
    }

    #[test]
    fn run_without_processor_leaves_files_staged() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        touch(source.path(), "IMG_1.HEIC", b"bytes");

        let pipeline = Pipeline::builder(source.path(), dest.path()).build();
        let result = pipeline.run().unwrap();

        assert_eq!(result.staged, 1);
        assert_eq!(result.processed, 0);
        assert!(dest.path().join("tmp_0001.HEIC").exists());
        assert!(source.path().join("IMG_1.HEIC").exists());
    }

    #[test]
    fn dry_run_touches_nothing() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        touch(source.path(), "IMG_1.HEIC", b"bytes");

        let pipeline = Pipeline::builder(source.path(), dest.path())
            .dry_run(true)
            .build();
        let result = pipeline.run().unwrap();

        assert_eq!(result.staged, 1);
        assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
    }

    #[test]
    fn dedupe_can_be_disabled() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        touch(source.path(), "IMG_1.HEIC", b"identical");
        touch(dest.path(), "existing.jpg", b"identical");

        let pipeline = Pipeline::builder(source.path(), dest.path())
            .dedupe(DedupeMode::Disabled)
            .build();
        let result = pipeline.run().unwrap();

        assert_eq!(result.duplicates_removed, 0);
        assert!(dest.path().join("tmp_0001.HEIC").exists());
    }
}
