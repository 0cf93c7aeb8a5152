/// File entry builder.
///
/// Combines kind inference and the positional decoder into a canonical
/// `FileRecord` plus its group key. Pure and deterministic: the same
/// filename always yields the same entry, so the aggregation phase can
/// safely re-derive entries for every uploaded path instead of persisting
/// them.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};

use crate::config::BucketConfig;
use crate::decode::{decode, infer_encoding, Field};
use crate::model::{
    DecodeError, Encoding, FileKind, FileRecord, GroupKey, ENDPOINT_TYPE,
};

// ---------------------------------------------------------------------------
// Civil timezone
// ---------------------------------------------------------------------------

/// Fixed civil timezone the receivers record in (UTC-03:00).
///
/// The original archive pins America/Sao_Paulo, which has observed no DST
/// since 2019; a fixed offset keeps timestamps deterministic without a tz
/// database.
pub fn recording_zone() -> FixedOffset {
    // -3 hours; in-range by construction
    FixedOffset::west_opt(3 * 3600).expect("UTC-03:00 is a valid offset")
}

// ---------------------------------------------------------------------------
// File entry
// ---------------------------------------------------------------------------

/// A decoded file ready for upload and indexing: the record that goes into
/// a group document, plus the grouping attributes and the storage key.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub group: GroupKey,
    pub kind: FileKind,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub record: FileRecord,
    /// Bucket-relative storage key, identical to `record.path`.
    pub storage_key: String,
}

impl FileEntry {
    /// ISO date shared by every file in the entry's group.
    pub fn date(&self) -> &str {
        &self.group.date
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds the canonical entry for `file_name`.
///
/// Returns `Ok(None)` when the name matches no supported encoding
/// (unsupported files are skipped, not errors) and `Err` when a classified
/// name fails to decode into a legal calendar date.
pub fn build_file_entry(
    file_name: &str,
    bucket: &BucketConfig,
) -> Result<Option<FileEntry>, DecodeError> {
    match infer_encoding(file_name) {
        Some(encoding) => build_with_encoding(encoding, file_name, bucket).map(Some),
        None => Ok(None),
    }
}

/// Builds the entry for a name whose encoding is already known (e.g. from
/// the queue the path was discovered into).
pub fn build_with_encoding(
    encoding: Encoding,
    file_name: &str,
    bucket: &BucketConfig,
) -> Result<FileEntry, DecodeError> {
    let fields = decode(encoding, file_name)?;

    let year = match encoding {
        // Two-digit years are 2000-based across the .mat encodings.
        Encoding::NarrowbandMat | Encoding::BroadbandMat => {
            2000 + fields.digits(Field::Year2)? as i32
        }
        Encoding::BroadbandFits => fields.digits(Field::Year4)? as i32,
    };
    let month = fields.digits(Field::Month)?;
    let day = fields.digits(Field::Day)?;

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or(DecodeError::InvalidDate { year, month, day })?;

    // FITS names carry no time of day; the timestamp truncates to midnight.
    let date_time = match encoding {
        Encoding::NarrowbandMat | Encoding::BroadbandMat => {
            let hour = fields.digits(Field::Hour)?;
            let minute = fields.digits(Field::Minute)?;
            let second = fields.digits(Field::Second)?;
            let naive = date.and_hms_opt(hour, minute, second).ok_or(
                DecodeError::InvalidTime { hour, minute, second },
            )?;
            local_timestamp(naive, year, month, day)?
        }
        Encoding::BroadbandFits => {
            let naive = date
                .and_hms_opt(0, 0, 0)
                .ok_or(DecodeError::InvalidTime { hour: 0, minute: 0, second: 0 })?;
            local_timestamp(naive, year, month, day)?
        }
    };

    let station_id = fields.get(Field::Station).unwrap_or_default().to_string();
    let kind = encoding.kind();
    let band = kind.label();
    let extension = encoding.extension();

    let storage_key = format!(
        "{:04}/{:02}/{:02}/{}/{}/{}",
        year, month, day, band, station_id, file_name
    );
    let url = format!(
        "https://{}.s3.{}.amazonaws.com/{}",
        bucket.name, bucket.region, storage_key
    );

    let record = FileRecord {
        file_name: file_name.to_string(),
        path: storage_key.clone(),
        url,
        station_id: station_id.clone(),
        transmitter: fields.get(Field::Transmitter).map(str::to_string),
        date_time: Some(date_time),
        channel: fields.get(Field::Channel).map(str::to_string),
        measurement_type: fields.get(Field::MeasurementType).map(str::to_string),
        sampling_rate: fields.get(Field::SamplingRate).map(str::to_string),
        endpoint_type: ENDPOINT_TYPE.to_string(),
        band: band.to_string(),
        extension: extension.to_string(),
    };

    let group = GroupKey {
        date: format!("{:04}-{:02}-{:02}", year, month, day),
        station_id,
        band: band.to_string(),
        extension: extension.to_string(),
    };

    Ok(FileEntry {
        group,
        kind,
        year,
        month,
        day,
        record,
        storage_key,
    })
}

fn local_timestamp(
    naive: chrono::NaiveDateTime,
    year: i32,
    month: u32,
    day: u32,
) -> Result<DateTime<FixedOffset>, DecodeError> {
    recording_zone()
        .from_local_datetime(&naive)
        .single()
        .ok_or(DecodeError::InvalidDate { year, month, day })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
