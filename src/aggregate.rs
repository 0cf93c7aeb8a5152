/// Metadata aggregation over the uploaded-file history.
///
/// Every run folds the full `uploaded` set into four derived indexes and
/// overwrites the persisted documents — a full rebuild, never incremental.
/// The file-entry builder is pure, so re-deriving entries from paths cannot
/// drift from what was uploaded.
///
/// All maps and sets are B-tree ordered, so document emission is
/// deterministic: station sets come out lexicographic, matrix dates come
/// out chronological (ISO date strings order chronologically).

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::config::BucketConfig;
use crate::entry::build_file_entry;
use crate::logging::{self, Subsystem};
use crate::model::{FileKind, FileRecord, GroupKey};

// ---------------------------------------------------------------------------
// Index value types
// ---------------------------------------------------------------------------

/// One per-day/per-station/per-band group of uploaded files.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub files: Vec<FileRecord>,
}

/// Available (month, day) pairs of a station-year, split by band.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandDates {
    pub narrowband: BTreeSet<(u32, u32)>,
    pub broadband: BTreeSet<(u32, u32)>,
}

/// One cell of the day×station matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixCell {
    /// Raw file count for this (extension, year, date) — counts every file,
    /// independent of station.
    pub count: u64,
    pub stations: BTreeSet<String>,
}

/// The four derived indexes, keyed by explicit composite key tuples.
#[derive(Debug, Default)]
pub struct AggregateIndexes {
    pub groups: BTreeMap<GroupKey, Group>,
    /// (extension, year) → station ids.
    pub years_stations: BTreeMap<(String, i32), BTreeSet<String>>,
    /// (extension, station, year) → per-band dates.
    pub available_dates: BTreeMap<(String, String, i32), BandDates>,
    /// (extension, year) → date → cell.
    pub matrix: BTreeMap<(String, i32), BTreeMap<String, MatrixCell>>,
}

/// Result of one aggregation pass.
#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub indexes: AggregateIndexes,
    /// Uploaded paths whose names no longer match a supported encoding.
    pub unsupported: usize,
    /// Uploaded paths whose names failed to decode.
    pub decode_errors: usize,
}

// ---------------------------------------------------------------------------
// Fold
// ---------------------------------------------------------------------------

/// Rebuilds all four indexes from the uploaded path list.
///
/// Paths that no longer classify or decode are skipped with a warning;
/// they cannot fail the rebuild of everything else.
pub fn build_indexes(uploaded: &[String], bucket: &BucketConfig) -> BuildOutcome {
    let mut outcome = BuildOutcome::default();

    for path in uploaded {
        let file_name = match Path::new(path).file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => {
                logging::warn(Subsystem::System, Some(path), "Path has no usable file name");
                outcome.unsupported += 1;
                continue;
            }
        };

        let entry = match build_file_entry(file_name, bucket) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                logging::warn(Subsystem::System, Some(path), "Unsupported file name, skipping");
                outcome.unsupported += 1;
                continue;
            }
            Err(e) => {
                logging::warn(
                    Subsystem::System,
                    Some(path),
                    &format!("Failed to decode uploaded file name: {}", e),
                );
                outcome.decode_errors += 1;
                continue;
            }
        };

        let indexes = &mut outcome.indexes;
        let extension = entry.group.extension.clone();
        let station = entry.group.station_id.clone();
        let date = entry.group.date.clone();

        indexes
            .groups
            .entry(entry.group.clone())
            .or_insert_with(|| Group {
                year: entry.year,
                month: entry.month,
                day: entry.day,
                files: Vec::new(),
            })
            .files
            .push(entry.record.clone());

        indexes
            .years_stations
            .entry((extension.clone(), entry.year))
            .or_default()
            .insert(station.clone());

        let dates = indexes
            .available_dates
            .entry((extension.clone(), station.clone(), entry.year))
            .or_default();
        match entry.kind {
            FileKind::Narrowband => dates.narrowband.insert((entry.month, entry.day)),
            FileKind::Broadband => dates.broadband.insert((entry.month, entry.day)),
        };

        let cell = indexes
            .matrix
            .entry((extension, entry.year))
            .or_default()
            .entry(date)
            .or_default();
        cell.count += 1;
        cell.stations.insert(station);
    }

    // Within each group, files sort by timestamp ascending. A record
    // without a parseable timestamp sorts first (minimum instant): that is
    // a defined tie-break, not an error.
    for group in outcome.indexes.groups.values_mut() {
        group
            .files
            .sort_by_key(|record| record.date_time.map(|ts| ts.with_timezone(&Utc)));
    }

    outcome
}

// ---------------------------------------------------------------------------
// Document payloads
// ---------------------------------------------------------------------------

/// `files_by_day` document: one group of recordings.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GroupDocument {
    pub date: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    #[serde(rename = "stationId")]
    pub station_id: String,
    #[serde(rename = "type")]
    pub band: String,
    pub extension: String,
    pub files: Vec<FileRecord>,
    #[serde(rename = "fileCount")]
    pub file_count: usize,
}

/// `years_stations` document: stations active in one (extension, year).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct YearStationsDocument {
    pub year: i32,
    /// Lexicographically sorted, duplicates collapsed.
    pub stations: Vec<String>,
    pub extension: String,
}

/// Zero-padded month/day pair inside an `available_dates` document.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthDay {
    pub day: String,
    pub month: String,
}

impl MonthDay {
    fn from_pair(&(month, day): &(u32, u32)) -> Self {
        MonthDay {
            day: format!("{:02}", day),
            month: format!("{:02}", month),
        }
    }
}

/// `available_dates` document: which dates a station recorded, per band.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AvailableDatesDocument {
    #[serde(rename = "stationId")]
    pub station_id: String,
    pub year: i32,
    pub narrowband: Vec<MonthDay>,
    pub broadband: Vec<MonthDay>,
    pub extension: String,
}

/// One dated row of a `matrix` document.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatrixItem {
    pub date: String,
    pub stations: Vec<String>,
    pub count: u64,
}

/// `matrix` document: day×station occurrence matrix for one
/// (extension, year).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatrixDocument {
    pub year: i32,
    /// Sorted by date ascending.
    pub items: Vec<MatrixItem>,
    pub extension: String,
}

impl AggregateIndexes {
    /// `files_by_day` payloads, one per group, keyed by group id.
    pub fn group_documents(&self) -> Vec<(String, GroupDocument)> {
        self.groups
            .iter()
            .map(|(key, group)| {
                let doc = GroupDocument {
                    date: key.date.clone(),
                    year: group.year,
                    month: group.month,
                    day: group.day,
                    station_id: key.station_id.clone(),
                    band: key.band.clone(),
                    extension: key.extension.clone(),
                    files: group.files.clone(),
                    file_count: group.files.len(),
                };
                (key.document_id(), doc)
            })
            .collect()
    }

    /// `years_stations` payloads keyed by `{ext}_{year}`.
    pub fn years_stations_documents(&self) -> Vec<(String, YearStationsDocument)> {
        self.years_stations
            .iter()
            .map(|((extension, year), stations)| {
                let doc = YearStationsDocument {
                    year: *year,
                    stations: stations.iter().cloned().collect(),
                    extension: extension.clone(),
                };
                (format!("{}_{}", extension, year), doc)
            })
            .collect()
    }

    /// `available_dates` payloads keyed by `{ext}_{station}_{year}`.
    pub fn available_dates_documents(&self) -> Vec<(String, AvailableDatesDocument)> {
        self.available_dates
            .iter()
            .map(|((extension, station, year), dates)| {
                let doc = AvailableDatesDocument {
                    station_id: station.clone(),
                    year: *year,
                    narrowband: dates.narrowband.iter().map(MonthDay::from_pair).collect(),
                    broadband: dates.broadband.iter().map(MonthDay::from_pair).collect(),
                    extension: extension.clone(),
                };
                (format!("{}_{}_{}", extension, station, year), doc)
            })
            .collect()
    }

    /// `matrix` payloads keyed by `{ext}_{year}`.
    pub fn matrix_documents(&self) -> Vec<(String, MatrixDocument)> {
        self.matrix
            .iter()
            .map(|((extension, year), dates)| {
                let items = dates
                    .iter()
                    .map(|(date, cell)| MatrixItem {
                        date: date.clone(),
                        stations: cell.stations.iter().cloned().collect(),
                        count: cell.count,
                    })
                    .collect();
                let doc = MatrixDocument {
                    year: *year,
                    items,
                    extension: extension.clone(),
                };
                (format!("{}_{}", extension, year), doc)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket() -> BucketConfig {
        BucketConfig {
            name: "craam-files-bucket".to_string(),
            region: "sa-east-1".to_string(),
        }
    }

    fn paths(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| format!("/data/{}", n)).collect()
    }

    #[test]
    fn test_same_group_key_accumulates_one_group_sorted_by_time() {
        // Two narrowband files: same day, station, band and extension, but
        // the later one is listed first.
        let uploaded = paths(&[
            "AB230615183045NPM_A00A.mat",
            "AB230615063045NPM_A00A.mat",
        ]);
        let outcome = build_indexes(&uploaded, &bucket());
        assert_eq!(outcome.indexes.groups.len(), 1);

        let docs = outcome.indexes.group_documents();
        let (id, doc) = &docs[0];
        assert_eq!(id, "2023-06-15_AB_narrowband_mat");
        assert_eq!(doc.file_count, 2);
        // 06:30 sorts before 18:30
        assert_eq!(doc.files[0].file_name, "AB230615063045NPM_A00A.mat");
        assert_eq!(doc.files[1].file_name, "AB230615183045NPM_A00A.mat");
    }

    #[test]
    fn test_year_stations_collapses_duplicates_and_sorts() {
        let uploaded = paths(&[
            "ZZ230615063045NPM_A00A.mat",
            "AB230615063045NPM_A00A.mat",
            "AB230616063045NPM_A00A.mat", // AB again, next day
        ]);
        let outcome = build_indexes(&uploaded, &bucket());
        let docs = outcome.indexes.years_stations_documents();
        assert_eq!(docs.len(), 1);
        let (id, doc) = &docs[0];
        assert_eq!(id, "mat_2023");
        assert_eq!(doc.stations, ["AB", "ZZ"]);
    }

    #[test]
    fn test_available_dates_split_by_band() {
        // Same station id in both bands: narrowband 26-char name and a
        // legacy broadband 22-char name on different days.
        let uploaded = paths(&[
            "AB230615063045NPM_A00A.mat",
            "AB230720060000_100.mat",
        ]);
        let outcome = build_indexes(&uploaded, &bucket());
        let docs = outcome.indexes.available_dates_documents();
        assert_eq!(docs.len(), 1);
        let (id, doc) = &docs[0];
        assert_eq!(id, "mat_AB_2023");
        assert_eq!(
            doc.narrowband,
            vec![MonthDay { day: "15".into(), month: "06".into() }]
        );
        assert_eq!(
            doc.broadband,
            vec![MonthDay { day: "20".into(), month: "07".into() }]
        );
    }

    #[test]
    fn test_matrix_count_is_per_file_not_per_station() {
        // Three files on the same date: two from AB, one from ZZ.
        let uploaded = paths(&[
            "AB230615063045NPM_A00A.mat",
            "AB230615073045NPM_A00A.mat",
            "ZZ230615063045NPM_A00A.mat",
        ]);
        let outcome = build_indexes(&uploaded, &bucket());
        let docs = outcome.indexes.matrix_documents();
        assert_eq!(docs.len(), 1);
        let (id, doc) = &docs[0];
        assert_eq!(id, "mat_2023");
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.items[0].date, "2023-06-15");
        assert_eq!(doc.items[0].count, 3);
        assert_eq!(doc.items[0].stations, ["AB", "ZZ"]);
    }

    #[test]
    fn test_matrix_dates_emit_in_chronological_order() {
        let uploaded = paths(&[
            "AB231105063045NPM_A00A.mat",
            "AB230102063045NPM_A00A.mat",
            "AB230615063045NPM_A00A.mat",
        ]);
        let outcome = build_indexes(&uploaded, &bucket());
        let docs = outcome.indexes.matrix_documents();
        let dates: Vec<_> = docs[0].1.items.iter().map(|i| i.date.as_str()).collect();
        assert_eq!(dates, ["2023-01-02", "2023-06-15", "2023-11-05"]);
    }

    #[test]
    fn test_extensions_partition_the_indexes() {
        // A .mat and a .fits broadband file in the same year end up in
        // separate (extension, year) buckets.
        let uploaded = paths(&["SM230615060000_100.mat", "ATI_20230615.fits"]);
        let outcome = build_indexes(&uploaded, &bucket());

        let ids: Vec<_> = outcome
            .indexes
            .matrix_documents()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, ["fits_2023", "mat_2023"]);
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let uploaded = paths(&[
            "ZZ230615063045NPM_A00A.mat",
            "AB230615063045NPM_A00A.mat",
            "AB230720060000_100.mat",
            "ATI_20230615.fits",
        ]);
        let a = build_indexes(&uploaded, &bucket());
        let b = build_indexes(&uploaded, &bucket());

        let json_a = serde_json::to_string(&a.indexes.matrix_documents()).unwrap();
        let json_b = serde_json::to_string(&b.indexes.matrix_documents()).unwrap();
        assert_eq!(json_a, json_b);

        let groups_a = serde_json::to_string(&a.indexes.group_documents()).unwrap();
        let groups_b = serde_json::to_string(&b.indexes.group_documents()).unwrap();
        assert_eq!(groups_a, groups_b);
    }

    #[test]
    fn test_undecodable_uploaded_paths_are_skipped_with_counts() {
        let uploaded = paths(&[
            "AB230615063045NPM_A00A.mat", // fine
            "AB23XX15123045NPM_A00A.mat", // bad month digits
            "notes.txt",                  // unsupported
        ]);
        let outcome = build_indexes(&uploaded, &bucket());
        assert_eq!(outcome.indexes.groups.len(), 1);
        assert_eq!(outcome.decode_errors, 1);
        assert_eq!(outcome.unsupported, 1);
    }
}
