/// Filesystem discovery.
///
/// Walks the archive root recursively, classifies candidate names by
/// extension and exact length, and offers each supported path to the queue
/// tracker. Unsupported `.mat`/`.fits` names and already-tracked paths are
/// reported and skipped; anything else is ignored silently.
///
/// Discovery never uploads: the caller checkpoints the queue state after
/// the walk completes and before the first upload begins.

use std::path::Path;

use walkdir::WalkDir;

use crate::decode::infer_encoding;
use crate::logging::{self, Subsystem};
use crate::model::FileKind;
use crate::queue::{Enqueue, QueueState};

/// Counters from one discovery pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub discovered_narrowband: usize,
    pub discovered_broadband: usize,
    /// Paths already uploaded or queued from an earlier run.
    pub skipped_tracked: usize,
    /// `.mat`/`.fits` names whose length matches no supported encoding.
    pub unsupported: usize,
}

impl ScanReport {
    pub fn discovered(&self) -> usize {
        self.discovered_narrowband + self.discovered_broadband
    }
}

/// Recursively scans `root`, feeding supported files into `queue`.
///
/// Unreadable directory entries are logged and skipped; a partially
/// unreadable tree still yields everything that could be read.
pub fn discover_files(root: &Path, queue: &mut QueueState) -> ScanReport {
    let mut report = ScanReport::default();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                logging::warn(Subsystem::Scan, None, &format!("Unreadable entry: {}", e));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let name = match entry.file_name().to_str() {
            Some(name) => name,
            None => continue, // non-UTF-8 names cannot match an encoding
        };
        if !name.ends_with(".mat") && !name.ends_with(".fits") {
            continue;
        }

        let path = entry.path().to_string_lossy().into_owned();
        match infer_encoding(name) {
            Some(encoding) => match queue.enqueue(&path, encoding.kind()) {
                Enqueue::Added(FileKind::Narrowband) => report.discovered_narrowband += 1,
                Enqueue::Added(FileKind::Broadband) => report.discovered_broadband += 1,
                Enqueue::AlreadyTracked => {
                    logging::info(
                        Subsystem::Scan,
                        Some(&path),
                        "File is already uploaded or in queue",
                    );
                    report.skipped_tracked += 1;
                }
            },
            None => {
                logging::info(Subsystem::Scan, Some(&path), "File not supported, skipping");
                report.unsupported += 1;
            }
        }
    }

    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"data").unwrap();
    }

    #[test]
    fn test_discovery_classifies_by_length_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("2023");
        fs::create_dir(&sub).unwrap();

        touch(dir.path(), "AB230615123045NPM_A00A.mat"); // narrowband, 26
        touch(&sub, "SM221201060000_100.mat"); // broadband, 22
        touch(&sub, "ATI_20230615.fits"); // broadband fits, 17
        touch(dir.path(), "short.mat"); // unsupported length
        touch(dir.path(), "README"); // not a candidate at all

        let mut queue = QueueState::new();
        let report = discover_files(dir.path(), &mut queue);

        assert_eq!(report.discovered_narrowband, 1);
        assert_eq!(report.discovered_broadband, 2);
        assert_eq!(report.unsupported, 1);
        assert_eq!(report.skipped_tracked, 0);
        assert_eq!(queue.pending(FileKind::Narrowband).len(), 1);
        assert_eq!(queue.pending(FileKind::Broadband).len(), 2);
    }

    #[test]
    fn test_second_scan_of_unchanged_tree_discovers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "AB230615123045NPM_A00A.mat");
        touch(dir.path(), "ATI_20230615.fits");

        let mut queue = QueueState::new();
        let first = discover_files(dir.path(), &mut queue);
        assert_eq!(first.discovered(), 2);

        let second = discover_files(dir.path(), &mut queue);
        assert_eq!(second.discovered(), 0);
        assert_eq!(second.skipped_tracked, 2);
        assert_eq!(queue.pending_count(), 2);
    }

    #[test]
    fn test_uploaded_files_are_not_rediscovered() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "AB230615123045NPM_A00A.mat");

        let mut queue = QueueState::new();
        discover_files(dir.path(), &mut queue);
        let path = queue.pending(FileKind::Narrowband)[0].clone();
        queue.mark_uploaded(&path);

        let report = discover_files(dir.path(), &mut queue);
        assert_eq!(report.discovered(), 0);
        assert_eq!(report.skipped_tracked, 1);
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn test_unsupported_names_never_enter_a_queue() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "wrong_length_name.mat");
        touch(dir.path(), "also_wrong.fits");

        let mut queue = QueueState::new();
        let report = discover_files(dir.path(), &mut queue);
        assert_eq!(report.unsupported, 2);
        assert_eq!(queue.pending_count(), 0);
        assert!(queue.should_process(&dir.path().join("wrong_length_name.mat").to_string_lossy()));
    }
}
