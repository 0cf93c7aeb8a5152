/// Core data types for the VLF/LF recording archiver.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O and no external collaborators — only types and the
/// error taxonomy for filename decoding.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Band labels and filename constants
// ---------------------------------------------------------------------------

/// Band label used in storage keys, group ids and index documents.
pub const NARROWBAND_LABEL: &str = "narrowband";

/// Band label used in storage keys, group ids and index documents.
pub const BROADBAND_LABEL: &str = "broadband";

/// Exact filename length of a narrowband `.mat` recording.
pub const NARROWBAND_NAME_LEN: usize = 26;

/// Exact filename length of a legacy broadband `.mat` recording.
pub const BROADBAND_NAME_LEN: usize = 22;

/// Exact filename length of a modern broadband `.fits` recording.
pub const FITS_NAME_LEN: usize = 17;

/// Value of the `endpointType` field on every emitted file record.
pub const ENDPOINT_TYPE: &str = "AWS S3";

// ---------------------------------------------------------------------------
// File classification
// ---------------------------------------------------------------------------

/// Band of a recording, inferred purely from filename length and extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Narrowband,
    Broadband,
}

impl FileKind {
    /// The lowercase band label carried on records and composite keys.
    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Narrowband => NARROWBAND_LABEL,
            FileKind::Broadband => BROADBAND_LABEL,
        }
    }
}

/// Physical filename encoding. Broadband exists in two encodings; the
/// encoding decides which field-offset layout the decoder consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// 26-character `.mat` narrowband name.
    NarrowbandMat,
    /// 22-character legacy `.mat` broadband name.
    BroadbandMat,
    /// 17-character `.fits` broadband name. Carries no time of day.
    BroadbandFits,
}

impl Encoding {
    pub fn kind(&self) -> FileKind {
        match self {
            Encoding::NarrowbandMat => FileKind::Narrowband,
            Encoding::BroadbandMat | Encoding::BroadbandFits => FileKind::Broadband,
        }
    }

    /// Extension recorded on file records and composite keys (no dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Encoding::NarrowbandMat | Encoding::BroadbandMat => "mat",
            Encoding::BroadbandFits => "fits",
        }
    }

    /// Exact filename length required for this encoding, extension included.
    pub fn name_len(&self) -> usize {
        match self {
            Encoding::NarrowbandMat => NARROWBAND_NAME_LEN,
            Encoding::BroadbandMat => BROADBAND_NAME_LEN,
            Encoding::BroadbandFits => FITS_NAME_LEN,
        }
    }
}

// ---------------------------------------------------------------------------
// File record
// ---------------------------------------------------------------------------

/// One archived recording, as it appears inside a `files_by_day` document.
///
/// All attributes are derived from the filename alone; the storage key and
/// public URL are computed, never stored independently, so they cannot
/// diverge. Serializes with the field names the index documents use.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    #[serde(rename = "fileName")]
    pub file_name: String,
    /// Bucket-relative storage key: `yyyy/mm/dd/{band}/{station}/{fileName}`.
    pub path: String,
    pub url: String,
    #[serde(rename = "stationId")]
    pub station_id: String,
    /// Three-letter transmitter code. Narrowband only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transmitter: Option<String>,
    /// Recording timestamp in the receiver's civil timezone (UTC-03:00).
    /// `.fits` names carry no time of day and truncate to midnight.
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<FixedOffset>>,
    /// Channel code: "00" for N/S, "01" for E/W. Absent for `.fits`.
    #[serde(rename = "CC", skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Narrowband measurement-type code (A/B/C/D/F).
    #[serde(rename = "typeABCDF", skip_serializing_if = "Option::is_none")]
    pub measurement_type: Option<String>,
    /// Legacy broadband sampling-rate code (0=100kHz, 1=1MHz, 2=25kHz).
    #[serde(rename = "A", skip_serializing_if = "Option::is_none")]
    pub sampling_rate: Option<String>,
    #[serde(rename = "endpointType")]
    pub endpoint_type: String,
    #[serde(rename = "type")]
    pub band: String,
    pub extension: String,
}

// ---------------------------------------------------------------------------
// Group key
// ---------------------------------------------------------------------------

/// Identity of one logical "day of recordings" document: all uploaded files
/// sharing date, station, band label and extension fold into one group.
///
/// Orders by (date, station, band, extension), which makes `BTreeMap`
/// iteration over groups deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    /// ISO date, `yyyy-mm-dd`. String ordering equals chronological ordering.
    pub date: String,
    pub station_id: String,
    pub band: String,
    pub extension: String,
}

impl GroupKey {
    /// Document id, e.g. `2023-06-15_AB_narrowband_mat`.
    ///
    /// Plain `_` concatenation: band labels and extensions are a closed
    /// delimiter-free vocabulary and station ids come from fixed filename
    /// prefixes, so the id cannot collide.
    pub fn document_id(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.date, self.station_id, self.band, self.extension
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when decoding a classified filename.
///
/// A decode error is fatal for that file: it is reported and skipped, never
/// silently coerced to a default date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The filename contains non-ASCII bytes; positional slicing is
    /// defined over the ASCII encoding only.
    NotAscii(String),
    /// A positional field that must be decimal digits failed to parse.
    BadDigits { field: &'static str, value: String },
    /// Digit fields parsed but do not form a legal calendar date.
    InvalidDate { year: i32, month: u32, day: u32 },
    /// Digit fields parsed but do not form a legal time of day.
    InvalidTime { hour: u32, minute: u32, second: u32 },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::NotAscii(name) => {
                write!(f, "filename is not ASCII: {:?}", name)
            }
            DecodeError::BadDigits { field, value } => {
                write!(f, "field {} is not numeric: {:?}", field, value)
            }
            DecodeError::InvalidDate { year, month, day } => {
                write!(f, "invalid calendar date: {:04}-{:02}-{:02}", year, month, day)
            }
            DecodeError::InvalidTime { hour, minute, second } => {
                write!(f, "invalid time of day: {:02}:{:02}:{:02}", hour, minute, second)
            }
        }
    }
}

impl std::error::Error for DecodeError {}
