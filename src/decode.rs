/// Kind inference and positional filename decoding.
///
/// Classification is purely a function of filename length and extension —
/// file contents are never inspected. Each supported encoding has a fixed
/// field layout declared in a static table; one generic decode routine
/// consults the table, so the three encodings cannot drift apart.
///
/// Layout invariant: the field spans of an encoding never overlap and
/// exactly cover the filename (`test_layouts_are_contiguous_and_span_name`).

use crate::model::{DecodeError, Encoding, FileKind};

// ---------------------------------------------------------------------------
// Field layout tables
// ---------------------------------------------------------------------------

/// Positional fields a filename can carry. Not every encoding carries every
/// field; the layout table decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Station,
    /// Two-digit year, interpreted as `2000 + yy`.
    Year2,
    /// Four-digit year, taken verbatim.
    Year4,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    /// Three-letter transmitter code (narrowband).
    Transmitter,
    /// Channel code: "00" N/S, "01" E/W.
    Channel,
    /// Narrowband measurement-type code (A/B/C/D/F).
    MeasurementType,
    /// Legacy broadband sampling-rate code (0=100kHz, 1=1MHz, 2=25kHz).
    SamplingRate,
    /// Positions with no assigned meaning.
    Reserved,
    /// Fixed extension suffix, `.mat` or `.fits`.
    Suffix,
}

impl Field {
    fn name(&self) -> &'static str {
        match self {
            Field::Station => "Station",
            Field::Year2 | Field::Year4 => "Year",
            Field::Month => "Month",
            Field::Day => "Day",
            Field::Hour => "Hour",
            Field::Minute => "Minute",
            Field::Second => "Second",
            Field::Transmitter => "Transmitter",
            Field::Channel => "Channel",
            Field::MeasurementType => "MeasurementType",
            Field::SamplingRate => "SamplingRate",
            Field::Reserved => "Reserved",
            Field::Suffix => "Suffix",
        }
    }
}

/// One entry in a layout: which field occupies `[start, end)`.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: Field,
    pub start: usize,
    pub end: usize,
}

const fn spec(field: Field, start: usize, end: usize) -> FieldSpec {
    FieldSpec { field, start, end }
}

/// Field layout of one filename encoding.
pub struct Layout {
    pub encoding: Encoding,
    pub fields: &'static [FieldSpec],
}

/// Narrowband `.mat`, 26 characters.
/// `AByymmddhhmmssTTT??CCX.mat` — station, timestamp, transmitter,
/// channel, measurement type.
static NARROWBAND_MAT_LAYOUT: Layout = Layout {
    encoding: Encoding::NarrowbandMat,
    fields: &[
        spec(Field::Station, 0, 2),
        spec(Field::Year2, 2, 4),
        spec(Field::Month, 4, 6),
        spec(Field::Day, 6, 8),
        spec(Field::Hour, 8, 10),
        spec(Field::Minute, 10, 12),
        spec(Field::Second, 12, 14),
        spec(Field::Transmitter, 14, 17),
        spec(Field::Reserved, 17, 18),
        spec(Field::Reserved, 18, 19),
        spec(Field::Channel, 19, 21),
        spec(Field::MeasurementType, 21, 22),
        spec(Field::Suffix, 22, 26),
    ],
};

/// Legacy broadband `.mat`, 22 characters.
/// `AByymmddhhmmss?ACC.mat` — station, timestamp, sampling rate, channel.
static BROADBAND_MAT_LAYOUT: Layout = Layout {
    encoding: Encoding::BroadbandMat,
    fields: &[
        spec(Field::Station, 0, 2),
        spec(Field::Year2, 2, 4),
        spec(Field::Month, 4, 6),
        spec(Field::Day, 6, 8),
        spec(Field::Hour, 8, 10),
        spec(Field::Minute, 10, 12),
        spec(Field::Second, 12, 14),
        spec(Field::Reserved, 14, 15),
        spec(Field::SamplingRate, 15, 16),
        spec(Field::Channel, 16, 18),
        spec(Field::Suffix, 18, 22),
    ],
};

/// Modern broadband `.fits`, 17 characters.
/// `ABC?yyyymmdd.fits` — station, date only; timestamp truncates to
/// midnight.
static BROADBAND_FITS_LAYOUT: Layout = Layout {
    encoding: Encoding::BroadbandFits,
    fields: &[
        spec(Field::Station, 0, 3),
        spec(Field::Reserved, 3, 4),
        spec(Field::Year4, 4, 8),
        spec(Field::Month, 8, 10),
        spec(Field::Day, 10, 12),
        spec(Field::Suffix, 12, 17),
    ],
};

/// All supported layouts, consulted by `layout_for`.
pub static LAYOUTS: &[&Layout] = &[
    &NARROWBAND_MAT_LAYOUT,
    &BROADBAND_MAT_LAYOUT,
    &BROADBAND_FITS_LAYOUT,
];

pub fn layout_for(encoding: Encoding) -> &'static Layout {
    match encoding {
        Encoding::NarrowbandMat => &NARROWBAND_MAT_LAYOUT,
        Encoding::BroadbandMat => &BROADBAND_MAT_LAYOUT,
        Encoding::BroadbandFits => &BROADBAND_FITS_LAYOUT,
    }
}

// ---------------------------------------------------------------------------
// Kind inference
// ---------------------------------------------------------------------------

/// Determines the encoding of a filename from its extension and exact
/// length. Returns `None` for any other combination — the caller logs and
/// skips, the file never enters a queue.
pub fn infer_encoding(file_name: &str) -> Option<Encoding> {
    if file_name.ends_with(".fits") && file_name.len() == Encoding::BroadbandFits.name_len() {
        return Some(Encoding::BroadbandFits);
    }
    if file_name.ends_with(".mat") && file_name.len() == Encoding::NarrowbandMat.name_len() {
        return Some(Encoding::NarrowbandMat);
    }
    if file_name.ends_with(".mat") && file_name.len() == Encoding::BroadbandMat.name_len() {
        return Some(Encoding::BroadbandMat);
    }
    None
}

/// Band of a filename, or `None` if it is unsupported.
pub fn infer_file_kind(file_name: &str) -> Option<FileKind> {
    infer_encoding(file_name).map(|encoding| encoding.kind())
}

// ---------------------------------------------------------------------------
// Generic decoder
// ---------------------------------------------------------------------------

/// Raw positional decomposition of a filename, before calendar validation.
#[derive(Debug, Clone)]
pub struct RawFields {
    pub encoding: Encoding,
    values: Vec<(Field, String)>,
}

impl RawFields {
    /// First occurrence of `field`, if the encoding carries it.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Parses `field` as a decimal integer. Errors if the encoding carries
    /// the field but its characters are not digits; a missing field is
    /// reported the same way (empty value).
    pub fn digits(&self, field: Field) -> Result<u32, DecodeError> {
        let value = self.get(field).unwrap_or("");
        value.parse::<u32>().map_err(|_| DecodeError::BadDigits {
            field: field.name(),
            value: value.to_string(),
        })
    }
}

/// Slices `file_name` according to the layout of `encoding`.
///
/// The filename must be ASCII (positional offsets are byte offsets) and must
/// have the encoding's exact length; `infer_encoding` guarantees the latter
/// for inferred encodings.
pub fn decode(encoding: Encoding, file_name: &str) -> Result<RawFields, DecodeError> {
    if !file_name.is_ascii() {
        return Err(DecodeError::NotAscii(file_name.to_string()));
    }
    if file_name.len() != encoding.name_len() {
        return Err(DecodeError::BadDigits {
            field: "Length",
            value: file_name.to_string(),
        });
    }

    let layout = layout_for(encoding);
    let values = layout
        .fields
        .iter()
        .map(|spec| (spec.field, file_name[spec.start..spec.end].to_string()))
        .collect();

    Ok(RawFields { encoding, values })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts_are_contiguous_and_span_name() {
        // Field offsets must never overlap and must exactly cover the
        // filename, otherwise decode would silently drop characters.
        for layout in LAYOUTS {
            let mut cursor = 0;
            for spec in layout.fields {
                assert_eq!(
                    spec.start, cursor,
                    "{:?}: field {:?} leaves a gap or overlaps",
                    layout.encoding, spec.field
                );
                assert!(spec.end > spec.start);
                cursor = spec.end;
            }
            assert_eq!(
                cursor,
                layout.encoding.name_len(),
                "{:?}: layout does not span the filename",
                layout.encoding
            );
        }
    }

    #[test]
    fn test_infer_encoding_table() {
        // .mat, 26 chars -> narrowband
        assert_eq!(
            infer_encoding("AB230615123045NPM_A00A.mat"),
            Some(Encoding::NarrowbandMat)
        );
        // .mat, 22 chars -> legacy broadband
        assert_eq!(
            infer_encoding("SM221201060000_100.mat"),
            Some(Encoding::BroadbandMat)
        );
        // .fits, 17 chars -> FITS broadband
        assert_eq!(
            infer_encoding("ATI_20230615.fits"),
            Some(Encoding::BroadbandFits)
        );
    }

    #[test]
    fn test_infer_encoding_rejects_unknown_combinations() {
        // Right extension, wrong length
        assert_eq!(infer_encoding("AB2306151230.mat"), None);
        assert_eq!(infer_encoding("AT20230615.fits"), None);
        // Wrong extension entirely
        assert_eq!(infer_encoding("AB230615123045NPM_A00A.dat"), None);
        assert_eq!(infer_encoding("readme.txt"), None);
        assert_eq!(infer_encoding(""), None);
    }

    #[test]
    fn test_infer_file_kind_maps_to_band() {
        assert_eq!(
            infer_file_kind("AB230615123045NPM_A00A.mat"),
            Some(FileKind::Narrowband)
        );
        assert_eq!(
            infer_file_kind("SM221201060000_100.mat"),
            Some(FileKind::Broadband)
        );
        assert_eq!(
            infer_file_kind("ATI_20230615.fits"),
            Some(FileKind::Broadband)
        );
        assert_eq!(infer_file_kind("notes.mat.bak"), None);
    }

    #[test]
    fn test_decode_narrowband_fields() {
        let fields = decode(Encoding::NarrowbandMat, "AB230615123045NPM_A00A.mat")
            .expect("valid narrowband name");
        assert_eq!(fields.get(Field::Station), Some("AB"));
        assert_eq!(fields.get(Field::Year2), Some("23"));
        assert_eq!(fields.get(Field::Month), Some("06"));
        assert_eq!(fields.get(Field::Day), Some("15"));
        assert_eq!(fields.get(Field::Hour), Some("12"));
        assert_eq!(fields.get(Field::Minute), Some("30"));
        assert_eq!(fields.get(Field::Second), Some("45"));
        assert_eq!(fields.get(Field::Transmitter), Some("NPM"));
        assert_eq!(fields.get(Field::Channel), Some("00"));
        assert_eq!(fields.get(Field::MeasurementType), Some("A"));
        assert_eq!(fields.get(Field::Suffix), Some(".mat"));
        assert_eq!(fields.get(Field::SamplingRate), None);
    }

    #[test]
    fn test_decode_broadband_mat_fields() {
        let fields = decode(Encoding::BroadbandMat, "SM221201060000_100.mat")
            .expect("valid broadband name");
        assert_eq!(fields.get(Field::Station), Some("SM"));
        assert_eq!(fields.get(Field::Year2), Some("22"));
        assert_eq!(fields.get(Field::Month), Some("12"));
        assert_eq!(fields.get(Field::Day), Some("01"));
        assert_eq!(fields.get(Field::Hour), Some("06"));
        assert_eq!(fields.get(Field::SamplingRate), Some("1"));
        assert_eq!(fields.get(Field::Channel), Some("00"));
        assert_eq!(fields.get(Field::Transmitter), None);
    }

    #[test]
    fn test_decode_fits_fields() {
        let fields = decode(Encoding::BroadbandFits, "ATI_20230615.fits")
            .expect("valid fits name");
        assert_eq!(fields.get(Field::Station), Some("ATI"));
        assert_eq!(fields.get(Field::Year4), Some("2023"));
        assert_eq!(fields.get(Field::Month), Some("06"));
        assert_eq!(fields.get(Field::Day), Some("15"));
        assert_eq!(fields.get(Field::Suffix), Some(".fits"));
        // FITS names carry no time of day
        assert_eq!(fields.get(Field::Hour), None);
    }

    #[test]
    fn test_digits_rejects_non_numeric_field() {
        let fields = decode(Encoding::NarrowbandMat, "AB23XX15123045NPM_A00A.mat")
            .expect("slicing itself succeeds");
        let err = fields.digits(Field::Month).unwrap_err();
        assert_eq!(
            err,
            DecodeError::BadDigits {
                field: "Month",
                value: "XX".to_string()
            }
        );
    }

    #[test]
    fn test_decode_rejects_non_ascii_without_panicking() {
        // Same byte length as a narrowband name but multi-byte characters;
        // byte-offset slicing must refuse it rather than split a codepoint.
        let name = "ÅB230615123045NPM_A00.mat"; // 26 bytes, 25 chars
        assert_eq!(name.len(), 26);
        let err = decode(Encoding::NarrowbandMat, name).unwrap_err();
        assert!(matches!(err, DecodeError::NotAscii(_)));
    }

    #[test]
    fn test_decode_is_deterministic() {
        let a = decode(Encoding::NarrowbandMat, "AB230615123045NPM_A00A.mat").unwrap();
        let b = decode(Encoding::NarrowbandMat, "AB230615123045NPM_A00A.mat").unwrap();
        for spec in layout_for(Encoding::NarrowbandMat).fields {
            assert_eq!(a.get(spec.field), b.get(spec.field));
        }
    }
}
