//! VLF/LF recording archiver.
//!
//! One-shot batch job for a radio-science file archive: scan a local tree
//! of receiver recordings, classify each file by its fixed filename
//! encoding, upload supported files to object storage, and rebuild the
//! derived query indexes (files by day, stations by year, available dates,
//! day×station matrix) in the document database.
//!
//! Module map:
//! - `model` — shared domain types and the decode error taxonomy.
//! - `decode` — kind inference and the positional field-layout decoder.
//! - `entry` — pure builder: filename → canonical file record + group key.
//! - `queue` — three-set upload/dedup tracker.
//! - `checkpoint` — JSON checkpoint persistence across runs.
//! - `aggregate` — full-rebuild derivation of the four indexes.
//! - `scan` — recursive filesystem discovery.
//! - `storage`, `firestore` — thin upload / batched-write collaborators.
//! - `config`, `logging`, `pipeline` — run wiring.

pub mod aggregate;
pub mod checkpoint;
pub mod config;
pub mod decode;
pub mod entry;
pub mod firestore;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod queue;
pub mod scan;
pub mod storage;
