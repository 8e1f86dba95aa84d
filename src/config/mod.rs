//! # Config Module
//!
//! JSON configuration for the ingestion pipeline. Configuration supplies
//! defaults; command-line flags always win.
//!
//! ## Lookup order
//! 1. An explicit `--config` path
//! 2. `photo-porter.json` in the current directory
//! 3. `photo-porter/config.json` under the platform config directory

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Deduplicator selection as expressed in configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DedupeSelection {
    /// SHA-256 content comparison
    #[default]
    Default,
    /// Deduplication switched off
    Disabled,
}

/// Pipeline configuration, loaded before pipeline construction
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestConfig {
    /// Directory photos are ingested from
    pub source_dir: Option<PathBuf>,
    /// Managed destination directory
    pub destination_dir: Option<PathBuf>,
    /// Simulate without touching files
    #[serde(default)]
    pub dry_run: bool,
    /// Duplicate detection selection
    #[serde(default)]
    pub dedupe: DedupeSelection,
    /// Whether sidecars travel with their primaries
    #[serde(default = "default_true")]
    pub migrate_sidecars: bool,
    /// Whether colliding capture times are separated
    #[serde(default = "default_true")]
    pub ensure_unique_timestamps: bool,
}

fn default_true() -> bool {
    true
}

impl IngestConfig {
    /// Load configuration from an explicit path or the default locations.
    ///
    /// With no explicit path and no config file present, returns defaults -
    /// a config file is optional when paths come from the command line.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            return Self::from_file(path);
        }

        for candidate in Self::default_locations() {
            if candidate.exists() {
                return Self::from_file(&candidate);
            }
        }

        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from("photo-porter.json")];
        if let Some(config_dir) = dirs::config_dir() {
            locations.push(config_dir.join("photo-porter").join("config.json"));
        }
        locations
    }

    /// Resolve source and destination, requiring both to be present.
    pub fn resolved_paths(
        &self,
        source_override: Option<PathBuf>,
        destination_override: Option<PathBuf>,
    ) -> Result<(PathBuf, PathBuf), ConfigError> {
        let source = source_override.or_else(|| self.source_dir.clone());
        let destination = destination_override.or_else(|| self.destination_dir.clone());
        match (source, destination) {
            (Some(source), Some(destination)) => Ok((source, destination)),
            _ => Err(ConfigError::MissingPaths),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn missing_explicit_config_is_an_error() {
        let result = IngestConfig::load(Some(Path::new("/nonexistent/config.json")));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn parses_a_full_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(
            br#"{
                "source_dir": "/photos/inbox",
                "destination_dir": "/photos/library",
                "dry_run": true,
                "dedupe": "disabled"
            }"#,
        )
        .unwrap();

        let config = IngestConfig::load(Some(&path)).unwrap();

        assert_eq!(config.source_dir, Some(PathBuf::from("/photos/inbox")));
        assert!(config.dry_run);
        assert_eq!(config.dedupe, DedupeSelection::Disabled);
        assert!(config.migrate_sidecars);
    }

    #[test]
    fn invalid_json_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, b"{ not json").unwrap();

        assert!(matches!(
            IngestConfig::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn overrides_beat_config_paths() {
        let config = IngestConfig {
            source_dir: Some(PathBuf::from("/config/src")),
            destination_dir: Some(PathBuf::from("/config/dst")),
            ..Default::default()
        };

        let (source, destination) = config
            .resolved_paths(Some(PathBuf::from("/cli/src")), None)
            .unwrap();

        assert_eq!(source, PathBuf::from("/cli/src"));
        assert_eq!(destination, PathBuf::from("/config/dst"));
    }

    #[test]
    fn missing_paths_are_rejected() {
        let config = IngestConfig::default();
        assert!(matches!(
            config.resolved_paths(None, None),
            Err(ConfigError::MissingPaths)
        ));
    }
}
