/// Local JSON checkpoint persistence.
///
/// The checkpoint is a single document with the three queue lists. It is
/// read once at startup and rewritten in full after every mutating batch
/// and after every successful upload, so a crash loses at most the
/// in-flight file (which a later run re-discovers and retries).
///
/// A missing or malformed checkpoint is recovered as empty state, never
/// surfaced as an error: the worst outcome is a duplicate upload attempt.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::logging::{self, Subsystem};
use crate::queue::QueueState;

// ---------------------------------------------------------------------------
// Document format
// ---------------------------------------------------------------------------

/// On-disk shape of the checkpoint. Field names match the historical
/// `db.json` layout so existing checkpoints keep loading.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CheckpointDocument {
    #[serde(default)]
    pub uploaded_files: Vec<String>,
    #[serde(default)]
    pub narrowband_queue: Vec<String>,
    #[serde(default)]
    pub broadband_queue: Vec<String>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors writing the checkpoint. Reads never fail (see `load`).
#[derive(Debug)]
pub enum CheckpointError {
    Io(std::io::Error),
    Serialize(serde_json::Error),
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointError::Io(e) => write!(f, "checkpoint write failed: {}", e),
            CheckpointError::Serialize(e) => {
                write!(f, "checkpoint serialization failed: {}", e)
            }
        }
    }
}

impl std::error::Error for CheckpointError {}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads queue state from the checkpoint. Missing or malformed files
    /// yield empty state (logged, non-fatal).
    pub fn load(&self) -> QueueState {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => {
                logging::info(Subsystem::Checkpoint, None, "No storage data found");
                return QueueState::new();
            }
        };

        match serde_json::from_str::<CheckpointDocument>(&raw) {
            Ok(doc) => {
                logging::info(Subsystem::Checkpoint, None, "Storage data found");
                QueueState::from_parts(
                    doc.uploaded_files,
                    doc.narrowband_queue,
                    doc.broadband_queue,
                )
            }
            Err(e) => {
                logging::warn(
                    Subsystem::Checkpoint,
                    Some(&self.path.to_string_lossy()),
                    &format!("Malformed checkpoint, starting from empty state: {}", e),
                );
                QueueState::new()
            }
        }
    }

    /// Full-overwrite save of the current queue state.
    pub fn save(&self, state: &QueueState) -> Result<(), CheckpointError> {
        let (uploaded, narrowband, broadband) = state.parts();
        let doc = CheckpointDocument {
            uploaded_files: uploaded.to_vec(),
            narrowband_queue: narrowband.to_vec(),
            broadband_queue: broadband.to_vec(),
        };
        let json = serde_json::to_string(&doc).map_err(CheckpointError::Serialize)?;
        fs::write(&self.path, json).map_err(CheckpointError::Io)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileKind;

    #[test]
    fn test_missing_checkpoint_loads_as_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("db.json"));
        let state = store.load();
        assert!(state.uploaded().is_empty());
        assert_eq!(state.pending_count(), 0);
    }

    #[test]
    fn test_corrupt_checkpoint_loads_as_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, "{not json at all").unwrap();
        let state = CheckpointStore::new(&path).load();
        assert!(state.uploaded().is_empty());
        assert_eq!(state.pending_count(), 0);
    }

    #[test]
    fn test_save_then_load_round_trips_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("db.json"));

        let mut state = QueueState::new();
        state.enqueue("/a/n1.mat", FileKind::Narrowband);
        state.enqueue("/a/n2.mat", FileKind::Narrowband);
        state.enqueue("/a/b1.fits", FileKind::Broadband);
        state.mark_uploaded("/a/n1.mat");

        store.save(&state).unwrap();
        let restored = store.load();

        assert_eq!(restored.uploaded(), ["/a/n1.mat"]);
        assert_eq!(restored.pending(FileKind::Narrowband), ["/a/n2.mat"]);
        assert_eq!(restored.pending(FileKind::Broadband), ["/a/b1.fits"]);
    }

    #[test]
    fn test_save_is_full_overwrite_not_append() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("db.json"));

        let mut state = QueueState::new();
        state.enqueue("/a/n1.mat", FileKind::Narrowband);
        store.save(&state).unwrap();

        state.mark_uploaded("/a/n1.mat");
        store.save(&state).unwrap();

        let restored = store.load();
        assert_eq!(restored.uploaded(), ["/a/n1.mat"]);
        assert!(restored.pending(FileKind::Narrowband).is_empty());
    }

    #[test]
    fn test_partial_document_fills_missing_lists() {
        // Older checkpoints may not carry every list.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, r#"{"uploaded_files": ["/a/x.mat"]}"#).unwrap();
        let state = CheckpointStore::new(&path).load();
        assert_eq!(state.uploaded(), ["/a/x.mat"]);
        assert_eq!(state.pending_count(), 0);
    }
}
