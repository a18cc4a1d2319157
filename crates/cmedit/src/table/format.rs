//! Line codec for the cm flat file.
//!
//! Integer columns (`id`, `source_id`, `flag`) are written as integers, every
//! other defined column in the shortest form that parses back to the same
//! `f64`. Metadata columns are kept verbatim.

use shared::{columns, RowId, FLAG_UNSET};

use super::CmRecord;
use crate::error::FormatError;

pub(crate) const COLUMN_NAMES: [&str; columns::DEFINED] = [
    "id",
    "lon",
    "lat",
    "depth",
    "sig_h",
    "sig_d",
    "source_id",
    "predicted_depth",
    "ml_score",
    "flag",
];

fn parse_float(field: &str, col: usize, line: usize) -> Result<f64, FormatError> {
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(FormatError::new(
            line,
            format!("column {} ({}) is not a number: {field:?}", col + 1, COLUMN_NAMES[col]),
        )),
    }
}

/// Integer value of a field, accepting float spellings such as "12.000000"
/// that numpy writes for integer columns.
fn integral(field: &str) -> Option<i64> {
    if let Ok(v) = field.parse::<i64>() {
        return Some(v);
    }
    let v = field.parse::<f64>().ok()?;
    (v.is_finite() && v.fract() == 0.0 && v.abs() <= i64::MAX as f64).then_some(v as i64)
}

fn parse_int(field: &str, col: usize, line: usize) -> Result<i64, FormatError> {
    match integral(field) {
        Some(v) => Ok(v),
        None => {
            parse_float(field, col, line)?;
            Err(FormatError::new(
                line,
                format!("column {} ({}) is not an integer: {field:?}", col + 1, COLUMN_NAMES[col]),
            ))
        }
    }
}

/// Whether the 10th field of a row can be read as a flag value.
pub(crate) fn has_flag_field(fields: &[&str]) -> bool {
    fields.get(columns::FLAG).and_then(|f| integral(f)).is_some()
}

/// Split a raw line into fields, rejecting non-ASCII input.
pub(crate) fn split_fields(raw: &str, line: usize) -> Result<Vec<&str>, FormatError> {
    if !raw.is_ascii() {
        return Err(FormatError::new(line, "non-ASCII characters"));
    }
    Ok(raw.split_whitespace().collect())
}

/// Parse one data row. `line` is the 1-based source line used in errors.
///
/// With `flag_column` set, the 10th field is the flag and metadata starts at
/// the 11th. Otherwise the flag is unset and everything past the 9th field is
/// metadata.
pub(crate) fn parse_record(
    fields: &[&str],
    row_id: RowId,
    line: usize,
    flag_column: bool,
) -> Result<CmRecord, FormatError> {
    if fields.len() < columns::REQUIRED {
        return Err(FormatError::new(
            line,
            format!(
                "expected at least {} columns, found {}",
                columns::REQUIRED,
                fields.len()
            ),
        ));
    }
    let f = |col: usize| parse_float(fields[col], col, line);

    let (flag, meta_start) = match fields.get(columns::FLAG) {
        Some(field) if flag_column => (parse_int(field, columns::FLAG, line)?, columns::DEFINED),
        _ => (FLAG_UNSET, columns::REQUIRED),
    };

    Ok(CmRecord {
        row_id,
        cm_id: parse_int(fields[columns::ID], columns::ID, line)?,
        lon: f(columns::LON)?,
        lat: f(columns::LAT)?,
        depth: f(columns::DEPTH)?,
        sig_h: f(columns::SIG_H)?,
        sig_d: f(columns::SIG_D)?,
        source_id: parse_int(fields[columns::SOURCE_ID], columns::SOURCE_ID, line)?,
        predicted_depth: f(columns::PREDICTED_DEPTH)?,
        ml_score: f(columns::ML_SCORE)?,
        flag,
        metadata: fields
            .iter()
            .skip(meta_start)
            .map(|s| s.to_string())
            .collect(),
    })
}

/// Serialize one row in the fixed column order.
pub(crate) fn format_record(r: &CmRecord) -> String {
    // `{:?}` is the shortest exact form and keeps the decimal point on whole values
    let mut line = format!(
        "{} {:?} {:?} {:?} {:?} {:?} {} {:?} {:?} {}",
        r.cm_id,
        r.lon,
        r.lat,
        r.depth,
        r.sig_h,
        r.sig_d,
        r.source_id,
        r.predicted_depth,
        r.ml_score,
        r.flag,
    );
    for meta in &r.metadata {
        line.push(' ');
        line.push_str(meta);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nine_columns_defaults_flag() {
        let fields = split_fields("7 10.5 -20.25 -4500 1 2 3 -4490 0.75", 1).unwrap();
        let r = parse_record(&fields, RowId(0), 1, false).unwrap();
        assert_eq!(r.cm_id, 7);
        assert_eq!(r.lat, -20.25);
        assert_eq!(r.source_id, 3);
        assert_eq!(r.flag, FLAG_UNSET);
        assert!(r.metadata.is_empty());
    }

    #[test]
    fn test_parse_float_encoded_integers() {
        let fields = split_fields("7.000000 1 2 3 4 5 6.0 8 0.5 -9999.0", 1).unwrap();
        assert!(has_flag_field(&fields));
        let r = parse_record(&fields, RowId(0), 1, true).unwrap();
        assert_eq!(r.cm_id, 7);
        assert_eq!(r.source_id, 6);
        assert!(r.is_flagged());
    }

    #[test]
    fn test_fractional_integer_rejected() {
        let fields = split_fields("7.5 1 2 3 4 5 6 8 0.5", 3).unwrap();
        let err = parse_record(&fields, RowId(0), 3, false).unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.reason.contains("id"));
    }

    #[test]
    fn test_non_numeric_field_names_column() {
        let fields = split_fields("1 1 2 deep 4 5 6 8 0.5", 2).unwrap();
        let err = parse_record(&fields, RowId(0), 2, false).unwrap_err();
        assert!(err.reason.contains("depth"), "{}", err.reason);
    }

    #[test]
    fn test_non_ascii_rejected() {
        assert!(split_fields("1 2 3 ü", 1).is_err());
    }

    #[test]
    fn test_format_keeps_metadata_verbatim() {
        let fields = split_fields("1 1 2 3 4 5 6 8 0.5 0 cruiseA 2019-03-01", 1).unwrap();
        let r = parse_record(&fields, RowId(0), 1, true).unwrap();
        assert_eq!(
            format_record(&r),
            "1 1.0 2.0 3.0 4.0 5.0 6 8.0 0.5 0 cruiseA 2019-03-01"
        );
    }

    #[test]
    fn test_format_keeps_full_precision() {
        let raw = "1 10.1234567 -5.0 -4000 0.000000001 2.5 100 -3990.123456789 0.1";
        let r = parse_record(&split_fields(raw, 1).unwrap(), RowId(0), 1, false).unwrap();
        let line = format_record(&r);
        assert_eq!(line, "1 10.1234567 -5.0 -4000.0 1e-9 2.5 100 -3990.123456789 0.1 0");
        let again = parse_record(&split_fields(&line, 1).unwrap(), RowId(0), 1, true).unwrap();
        assert_eq!(again, r);
    }

    #[test]
    fn test_fractional_tenth_column_is_metadata() {
        let fields = split_fields("1 10.0 -5.0 -4000 1.5 2.5 100 -3990 0.1 3.75 7", 1).unwrap();
        assert!(!has_flag_field(&fields));
        let r = parse_record(&fields, RowId(0), 1, false).unwrap();
        assert_eq!(r.flag, FLAG_UNSET);
        assert_eq!(r.metadata, vec!["3.75", "7"]);
        assert!(format_record(&r).ends_with(" 0.1 0 3.75 7"));
    }
}
