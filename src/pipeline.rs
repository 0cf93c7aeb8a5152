/// One-shot run orchestration: scan → upload → aggregate → index → exit.
///
/// Phase ordering is strict: discovery completes and is checkpointed before
/// any upload begins; the narrowband queue drains before the broadband
/// queue; all uploads finish before aggregation; aggregation finishes
/// before any index document is written.
///
/// Failure policy per phase:
/// - per-file upload failure: path stays pending, run continues;
/// - per-file decode failure: file skipped with a warning, run continues,
///   but the run is reported failed at the end;
/// - index batch-write failure: fatal, uploads already made stay uploaded
///   and indexing retries on the next run (full rebuild).

use std::path::Path;

use crate::aggregate::build_indexes;
use crate::checkpoint::{CheckpointError, CheckpointStore};
use crate::config::ArchiverConfig;
use crate::entry::build_file_entry;
use crate::firestore::{commit_in_batches, DocumentStore, DocumentWrite, FirestoreError};
use crate::logging::{self, Subsystem};
use crate::model::FileKind;
use crate::queue::QueueState;
use crate::scan::discover_files;
use crate::storage::ObjectStore;

// ---------------------------------------------------------------------------
// Run outcome
// ---------------------------------------------------------------------------

/// Counters for one complete run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub discovered_narrowband: usize,
    pub discovered_broadband: usize,
    pub skipped_tracked: usize,
    pub unsupported: usize,
    pub uploaded: usize,
    pub upload_failures: usize,
    pub decode_errors: usize,
    pub documents_written: usize,
}

impl RunSummary {
    /// A run succeeds overall only if every classified file decoded.
    /// Upload failures are retried next run and do not fail the run.
    pub fn is_success(&self) -> bool {
        self.decode_errors == 0
    }
}

/// Fatal run errors. Everything else degrades to per-file warnings.
#[derive(Debug)]
pub enum RunError {
    Checkpoint(CheckpointError),
    Firestore(FirestoreError),
    Serialize(serde_json::Error),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Checkpoint(e) => write!(f, "checkpoint failure: {}", e),
            RunError::Firestore(e) => write!(f, "index write failure: {}", e),
            RunError::Serialize(e) => write!(f, "document serialization failure: {}", e),
        }
    }
}

impl std::error::Error for RunError {}

impl From<CheckpointError> for RunError {
    fn from(e: CheckpointError) -> Self {
        RunError::Checkpoint(e)
    }
}

impl From<FirestoreError> for RunError {
    fn from(e: FirestoreError) -> Self {
        RunError::Firestore(e)
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Executes one full archive run against the given collaborators.
pub fn run(
    config: &ArchiverConfig,
    store: &dyn ObjectStore,
    db: &dyn DocumentStore,
) -> Result<RunSummary, RunError> {
    let mut summary = RunSummary::default();
    let checkpoint = CheckpointStore::new(&config.checkpoint_file);

    println!("Loading storage data...");
    let mut queue = checkpoint.load();

    println!("Finding supported files...");
    let report = discover_files(Path::new(&config.root), &mut queue);
    checkpoint.save(&queue)?;

    summary.discovered_narrowband = report.discovered_narrowband;
    summary.discovered_broadband = report.discovered_broadband;
    summary.skipped_tracked = report.skipped_tracked;
    summary.unsupported = report.unsupported;

    println!(
        "Found {} narrowband files and {} broadband files",
        queue.pending(FileKind::Narrowband).len(),
        queue.pending(FileKind::Broadband).len()
    );

    for kind in [FileKind::Narrowband, FileKind::Broadband] {
        drain_queue(config, store, &checkpoint, &mut queue, kind, &mut summary)?;
    }
    checkpoint.save(&queue)?;

    if queue.uploaded().is_empty() {
        println!("No uploaded files found to index.");
        return Ok(summary);
    }

    println!("Building index documents from uploaded files...");
    let outcome = build_indexes(queue.uploaded(), &config.bucket);
    summary.decode_errors += outcome.decode_errors;
    summary.unsupported += outcome.unsupported;

    let mut writes = Vec::new();
    stage_documents(
        &mut writes,
        &config.collections.files_by_day,
        outcome.indexes.group_documents(),
    )?;
    stage_documents(
        &mut writes,
        &config.collections.years_stations,
        outcome.indexes.years_stations_documents(),
    )?;
    stage_documents(
        &mut writes,
        &config.collections.available_dates,
        outcome.indexes.available_dates_documents(),
    )?;
    stage_documents(
        &mut writes,
        &config.collections.matrix,
        outcome.indexes.matrix_documents(),
    )?;

    println!("Writing {} index documents...", writes.len());
    commit_in_batches(db, &writes)?;
    summary.documents_written = writes.len();

    Ok(summary)
}

/// Uploads every path pending for `kind`, in discovery order. Failed
/// uploads stay pending; each success is checkpointed immediately.
fn drain_queue(
    config: &ArchiverConfig,
    store: &dyn ObjectStore,
    checkpoint: &CheckpointStore,
    queue: &mut QueueState,
    kind: FileKind,
    summary: &mut RunSummary,
) -> Result<(), RunError> {
    let pending = queue.pending(kind).to_vec();
    if pending.is_empty() {
        return Ok(());
    }
    println!("Working on {} files...", kind.label());

    let total = pending.len();
    for (index, path) in pending.iter().enumerate() {
        let file_name = match Path::new(path).file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => {
                logging::warn(Subsystem::Storage, Some(path), "Path has no usable file name");
                summary.unsupported += 1;
                continue;
            }
        };

        let entry = match build_file_entry(file_name, &config.bucket) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                logging::info(
                    Subsystem::Storage,
                    Some(path),
                    "File not supported, skipping upload",
                );
                summary.unsupported += 1;
                continue;
            }
            Err(e) => {
                // Fatal for this file: report, leave in its pending queue,
                // and fail the run at the end.
                logging::error(
                    Subsystem::Storage,
                    Some(path),
                    &format!("Cannot decode file name: {}", e),
                );
                summary.decode_errors += 1;
                continue;
            }
        };

        println!("[{}/{}] uploading {}", index + 1, total, entry.storage_key);
        match store.put(Path::new(path), &entry.storage_key) {
            Ok(()) => {
                queue.mark_uploaded(path);
                // Queue mutation and checkpoint persist together: a crash
                // in between costs at most one duplicate upload attempt.
                checkpoint.save(queue)?;
                summary.uploaded += 1;
            }
            Err(e) => {
                logging::error(Subsystem::Storage, Some(path), &format!("Upload failed: {}", e));
                summary.upload_failures += 1;
            }
        }
    }
    Ok(())
}

fn stage_documents<T: serde::Serialize>(
    writes: &mut Vec<DocumentWrite>,
    collection: &str,
    documents: Vec<(String, T)>,
) -> Result<(), RunError> {
    for (document_id, document) in documents {
        let value = serde_json::to_value(&document).map_err(RunError::Serialize)?;
        writes.push(DocumentWrite::new(collection, document_id, value));
    }
    Ok(())
}

/// Prints the end-of-run report.
pub fn print_summary(summary: &RunSummary) {
    println!();
    println!("══════════════════════════════════════════════════");
    println!("RUN SUMMARY");
    println!("══════════════════════════════════════════════════");
    println!(
        "Discovered:        {} narrowband, {} broadband",
        summary.discovered_narrowband, summary.discovered_broadband
    );
    println!("Already tracked:   {}", summary.skipped_tracked);
    println!("Unsupported:       {}", summary.unsupported);
    println!(
        "Uploaded:          {} ({} failed, retried next run)",
        summary.uploaded, summary.upload_failures
    );
    println!("Decode errors:     {}", summary.decode_errors);
    println!("Documents written: {}", summary.documents_written);
    println!("══════════════════════════════════════════════════");
}
