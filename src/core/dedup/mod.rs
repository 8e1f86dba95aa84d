//! # Dedup Module
//!
//! Byte-identity duplicate detection between a staged candidate and a file
//! already present at the destination.
//!
//! ## Strategy
//! The default implementation layers three checks, cheapest first:
//! 1. File size - different sizes can never be identical
//! 2. xxh3 hash of the first 4 KiB - catches most non-duplicates without
//!    reading whole files
//! 3. Full SHA-256 digest - collision probability treated as negligible
//!
//! Full digests use memory-mapped I/O for large files and chunked reads
//! otherwise, and are cached per instance (staged files do not change
//! during a run).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use memmap2::Mmap;
use sha2::{Digest, Sha256};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::DedupeError;

/// Size of prefix to hash for preliminary filtering (4KB)
const PREFIX_SIZE: usize = 4096;

/// Minimum file size to use memory-mapped I/O
const MMAP_THRESHOLD: u64 = 1024 * 1024; // 1MB

/// Chunk size for streaming reads of smaller files
const CHUNK_SIZE: usize = 8192;

/// Capability interface for duplicate detection.
///
/// Implementations decide whether two files carry identical content. Errors
/// are surfaced to the caller, which treats them as "not a duplicate" so an
/// unreadable file is preserved rather than deleted.
pub trait Deduplicator: Send + Sync {
    fn is_duplicate(&self, candidate: &Path, existing: &Path) -> Result<bool, DedupeError>;
}

/// Deduplicator selection: documented default, explicit disable, or a
/// caller-provided implementation.
pub enum DedupeMode {
    /// SHA-256 content comparison (`HashDeduplicator`)
    Default,
    /// Never reports duplicates; deduplication is skipped entirely
    Disabled,
    /// Caller-provided strategy
    Custom(Box<dyn Deduplicator>),
}

impl DedupeMode {
    /// Resolve the selection into an optional strategy instance.
    pub fn into_deduplicator(self) -> Option<Box<dyn Deduplicator>> {
        match self {
            DedupeMode::Default => Some(Box::new(HashDeduplicator::new())),
            DedupeMode::Disabled => None,
            DedupeMode::Custom(deduplicator) => Some(deduplicator),
        }
    }
}

impl std::fmt::Debug for DedupeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DedupeMode::Default => write!(f, "DedupeMode::Default"),
            DedupeMode::Disabled => write!(f, "DedupeMode::Disabled"),
            DedupeMode::Custom(_) => write!(f, "DedupeMode::Custom"),
        }
    }
}

/// Content-based deduplicator using SHA-256 with fast pre-filters.
#[derive(Default)]
pub struct HashDeduplicator {
    digests: Mutex<HashMap<PathBuf, [u8; 32]>>,
}

impl HashDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full SHA-256 digest of a file, cached per instance.
    fn digest(&self, path: &Path) -> Result<[u8; 32], DedupeError> {
        if let Some(digest) = self
            .digests
            .lock()
            .expect("digest cache lock poisoned")
            .get(path)
        {
            return Ok(*digest);
        }

        let digest = hash_file(path)?;
        self.digests
            .lock()
            .expect("digest cache lock poisoned")
            .insert(path.to_path_buf(), digest);
        Ok(digest)
    }
}

impl Deduplicator for HashDeduplicator {
    fn is_duplicate(&self, candidate: &Path, existing: &Path) -> Result<bool, DedupeError> {
        let candidate_size = size_of(candidate)?;
        let existing_size = size_of(existing)?;
        if candidate_size != existing_size {
            return Ok(false);
        }

        if prefix_hash(candidate)? != prefix_hash(existing)? {
            return Ok(false);
        }

        Ok(self.digest(candidate)? == self.digest(existing)?)
    }
}

/// Deduplicator stub that never matches. Useful when deduplication is
/// disabled but call sites should stay unchanged.
pub struct DisabledDeduplicator;

impl Deduplicator for DisabledDeduplicator {
    fn is_duplicate(&self, _candidate: &Path, _existing: &Path) -> Result<bool, DedupeError> {
        Ok(false)
    }
}

fn size_of(path: &Path) -> Result<u64, DedupeError> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| DedupeError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })
}

/// xxh3 hash of the first 4KB of a file.
fn prefix_hash(path: &Path) -> Result<u64, DedupeError> {
    let mut file = File::open(path).map_err(|source| DedupeError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let mut buffer = [0u8; PREFIX_SIZE];
    let bytes_read = file
        .read(&mut buffer)
        .map_err(|source| DedupeError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(xxh3_64(&buffer[..bytes_read]))
}

fn hash_file(path: &Path) -> Result<[u8; 32], DedupeError> {
    let read_failed = |source| DedupeError::ReadFailed {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_failed)?;
    let size = file.metadata().map_err(read_failed)?.len();

    let mut hasher = Sha256::new();
    if size >= MMAP_THRESHOLD {
        // Safety: staged and destination files are not mutated while a run
        // holds them; the map lives only for the duration of this hash.
        let mmap = unsafe { Mmap::map(&file) }.map_err(read_failed)?;
        hasher.update(&mmap[..]);
    } else {
        let mut reader = file;
        let mut buffer = [0u8; CHUNK_SIZE];
        loop {
            let count = reader.read(&mut buffer).map_err(read_failed)?;
            if count == 0 {
                break;
            }
            hasher.update(&buffer[..count]);
        }
    }

    Ok(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn identical_content_is_duplicate() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.jpg", b"same bytes");
        let b = write_file(&dir, "b.jpg", b"same bytes");

        let dedup = HashDeduplicator::new();
        assert!(dedup.is_duplicate(&a, &b).unwrap());
    }

    #[test]
    fn different_sizes_are_not_duplicates() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.jpg", b"short");
        let b = write_file(&dir, "b.jpg", b"much longer content");

        let dedup = HashDeduplicator::new();
        assert!(!dedup.is_duplicate(&a, &b).unwrap());
    }

    #[test]
    fn same_size_different_content_is_not_duplicate() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.jpg", b"aaaaaaaa");
        let b = write_file(&dir, "b.jpg", b"bbbbbbbb");

        let dedup = HashDeduplicator::new();
        assert!(!dedup.is_duplicate(&a, &b).unwrap());
    }

    #[test]
    fn same_prefix_different_tail_is_not_duplicate() {
        let dir = TempDir::new().unwrap();
        // Identical first 4KB, divergence after
        let mut base = vec![0xAB; PREFIX_SIZE + 16];
        let a = write_file(&dir, "a.jpg", &base);
        base[PREFIX_SIZE + 8] = 0xCD;
        let b = write_file(&dir, "b.jpg", &base);

        let dedup = HashDeduplicator::new();
        assert!(!dedup.is_duplicate(&a, &b).unwrap());
    }

    #[test]
    fn missing_file_surfaces_read_error() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.jpg", b"data");
        let ghost = dir.path().join("ghost.jpg");

        let dedup = HashDeduplicator::new();
        assert!(dedup.is_duplicate(&a, &ghost).is_err());
    }

    #[test]
    fn disabled_stub_never_matches() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.jpg", b"same bytes");
        let b = write_file(&dir, "b.jpg", b"same bytes");

        let dedup = DisabledDeduplicator;
        assert!(!dedup.is_duplicate(&a, &b).unwrap());
    }

    #[test]
    fn mode_resolution() {
        assert!(DedupeMode::Default.into_deduplicator().is_some());
        assert!(DedupeMode::Disabled.into_deduplicator().is_none());
        assert!(DedupeMode::Custom(Box::new(DisabledDeduplicator))
            .into_deduplicator()
            .is_some());
    }
}
