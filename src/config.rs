/// Archiver configuration.
///
/// Non-secret settings come from `archiver.toml` next to the binary; every
/// field has a default, and a missing file simply means "all defaults".
/// Secrets (AWS keys, the Firestore bearer token) come from the
/// environment, loaded from `.env` at startup.

use std::fs;
use std::path::Path;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config read failed: {}", e),
            ConfigError::Parse(e) => write!(f, "config parse failed: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Object storage bucket identity. Storage keys and public URLs derive
/// from this, so the builder takes it as an explicit input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    pub name: String,
    pub region: String,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            name: "craam-files-bucket".to_string(),
            region: "sa-east-1".to_string(),
        }
    }
}

/// Names of the four derived-index collections.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CollectionsConfig {
    pub files_by_day: String,
    pub years_stations: String,
    pub available_dates: String,
    pub matrix: String,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            files_by_day: "files_by_day".to_string(),
            years_stations: "years_stations".to_string(),
            available_dates: "available_dates".to_string(),
            matrix: "matrix".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArchiverConfig {
    /// Directory tree to scan for recordings.
    pub root: String,
    /// Queue/upload checkpoint file.
    pub checkpoint_file: String,
    pub bucket: BucketConfig,
    pub collections: CollectionsConfig,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            root: "./".to_string(),
            checkpoint_file: "db.json".to_string(),
            bucket: BucketConfig::default(),
            collections: CollectionsConfig::default(),
        }
    }
}

impl ArchiverConfig {
    /// Loads configuration from `path`. A missing file is not an error;
    /// a present-but-malformed file is.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };
        toml::from_str(&raw).map_err(ConfigError::Parse)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ArchiverConfig::load(&dir.path().join("archiver.toml")).unwrap();
        assert_eq!(cfg, ArchiverConfig::default());
        assert_eq!(cfg.bucket.region, "sa-east-1");
        assert_eq!(cfg.collections.matrix, "matrix");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archiver.toml");
        fs::write(
            &path,
            "root = \"/mnt/vlf\"\n\n[bucket]\nname = \"test-bucket\"\n",
        )
        .unwrap();
        let cfg = ArchiverConfig::load(&path).unwrap();
        assert_eq!(cfg.root, "/mnt/vlf");
        assert_eq!(cfg.bucket.name, "test-bucket");
        // unspecified fields keep their defaults
        assert_eq!(cfg.bucket.region, "sa-east-1");
        assert_eq!(cfg.checkpoint_file, "db.json");
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archiver.toml");
        fs::write(&path, "root = [unclosed").unwrap();
        assert!(matches!(
            ArchiverConfig::load(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
