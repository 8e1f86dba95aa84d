//! Integration tests for the event subsystem against a real pipeline run:
//! ordering of published events and the directory verifier as an
//! independent cross-check.

use chrono::NaiveDateTime;
use photo_porter::core::metadata::{ImageMetadata, MetadataReader};
use photo_porter::core::pipeline::Pipeline;
use photo_porter::core::processor::{FileProcessor, ProcessResult};
use photo_porter::error::MetadataError;
use photo_porter::events::{DirectoryVerifier, Event, EventBus, EventKind};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct StubConverter;

impl FileProcessor for StubConverter {
    fn process(&self, staged_path: &Path) -> ProcessResult {
        let output = staged_path.with_extension("jpg");
        if fs::copy(staged_path, &output).is_err() {
            return ProcessResult::failure(staged_path.to_path_buf(), "copy failed");
        }
        if fs::remove_file(staged_path).is_err() {
            return ProcessResult::failure(staged_path.to_path_buf(), "input cleanup failed");
        }
        ProcessResult::ok(output)
    }
}

struct FixedCapture;

impl MetadataReader for FixedCapture {
    fn read(&self, _path: &Path) -> Result<ImageMetadata, MetadataError> {
        Ok(ImageMetadata {
            creation_date: NaiveDateTime::parse_from_str(
                "2025-01-01 12:00:00",
                "%Y-%m-%d %H:%M:%S",
            )
            .ok(),
            ..Default::default()
        })
    }
}

fn touch(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    File::create(&path).unwrap().write_all(contents).unwrap();
    path
}

/// Record every event kind in delivery order.
fn record_kinds(bus: &EventBus) -> Arc<Mutex<Vec<EventKind>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for kind in [EventKind::Copied, EventKind::Renamed, EventKind::Deleted] {
        let log = log.clone();
        bus.subscribe(kind, move |event: &Event| {
            log.lock().unwrap().push(event.kind());
        });
    }
    log
}

#[test]
fn events_arrive_in_lifecycle_order() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    touch(source.path(), "IMG_1.HEIC", b"heic-bytes");

    let bus = Arc::new(EventBus::new());
    let log = record_kinds(&bus);

    let pipeline = Pipeline::builder(source.path(), dest.path())
        .metadata_reader(Box::new(FixedCapture))
        .processor(Box::new(StubConverter))
        .bus(bus)
        .build();
    pipeline.run().unwrap();

    let kinds = log.lock().unwrap().clone();
    // One copy (stage), one rename (finalize), one delete (source cleanup)
    assert_eq!(
        kinds,
        vec![EventKind::Copied, EventKind::Renamed, EventKind::Deleted]
    );
}

#[test]
fn verifier_tracks_a_full_run_through_events_alone() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    touch(source.path(), "IMG_1.HEIC", b"heic-bytes");
    touch(source.path(), "._IMG_1.HEIC", b"fork");

    let bus = Arc::new(EventBus::new());
    let verifier =
        DirectoryVerifier::new(&[source.path(), dest.path()], bus.clone()).unwrap();

    let pipeline = Pipeline::builder(source.path(), dest.path())
        .metadata_reader(Box::new(FixedCapture))
        .processor(Box::new(StubConverter))
        .bus(bus)
        .build();
    let result = pipeline.run().unwrap();
    assert_eq!(result.processed, 1);

    // The expected set holds the final name and none of the temp names
    assert!(verifier.expects(&dest.path().join("20250101 120000.jpg")));
    assert!(verifier.expects(&dest.path().join("._20250101 120000.HEIC")));
    assert!(!verifier.expects(&dest.path().join("tmp_0001.HEIC")));
    assert!(!verifier.expects(&source.path().join("IMG_1.HEIC")));

    // And it matches the filesystem
    assert!(verifier.report());
}

#[test]
fn verifier_catches_mutations_nobody_declared() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    touch(source.path(), "IMG_1.HEIC", b"heic-bytes");

    let bus = Arc::new(EventBus::new());
    let verifier =
        DirectoryVerifier::new(&[source.path(), dest.path()], bus.clone()).unwrap();

    let pipeline = Pipeline::builder(source.path(), dest.path()).bus(bus).build();
    pipeline.run().unwrap();

    // Someone drops a file behind the pipeline's back
    touch(dest.path(), "intruder.jpg", b"not from this run");

    assert!(!verifier.report());
}

#[test]
fn verifier_stats_reflect_tracked_operations() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    touch(source.path(), "IMG_1.HEIC", b"heic-bytes");

    let bus = Arc::new(EventBus::new());
    let verifier =
        DirectoryVerifier::new(&[source.path(), dest.path()], bus.clone()).unwrap();

    let pipeline = Pipeline::builder(source.path(), dest.path())
        .metadata_reader(Box::new(FixedCapture))
        .processor(Box::new(StubConverter))
        .bus(bus)
        .build();
    pipeline.run().unwrap();

    let stats = verifier.stats();
    assert_eq!(stats.watched_dirs, 2);
    // copy + rename each add a path; rename + source delete each remove one
    assert_eq!(stats.adds_tracked, 2);
    assert_eq!(stats.removals_tracked, 2);
}
