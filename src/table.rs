//! CSV table parsing for `nvidia-smi --format=csv` output.
//!
//! The tool prints a header line followed by zero or more data lines. Header
//! names may carry a bracketed unit (`power.draw [W]`); cells of such fields
//! are numeric once the unit suffix is stripped. Any cell mentioning `N/A`
//! (the tool prints both `N/A` and `[N/A]`) is "not available".
//!
//! The tool does not quote cells. A free-text column such as `process_name`
//! may therefore contain commas; [`parse_table_with`] lets that one column
//! absorb the surplus cells of a row.

use ahash::AHashMap as HashMap;
use std::fmt;

use crate::error::MalformedTableError;

/// Marker the tool prints for values it cannot report.
const NA_MARKER: &str = "N/A";

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    NotAvailable,
}

impl FieldValue {
    /// Returns the numeric value, `None` for text and N/A.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_na(&self) -> bool {
        matches!(self, FieldValue::NotAvailable)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(v) => write!(f, "{v}"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::NotAvailable => f.write_str(NA_MARKER),
        }
    }
}

/// One parsed row: trimmed header name → value.
#[derive(Debug, Clone, Default)]
pub struct MetricRecord {
    fields: HashMap<String, FieldValue>,
}

impl MetricRecord {
    /// Looks up a field by its verbatim header key (`power.draw [W]`) or by
    /// its bare name (`power.draw`).
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field).or_else(|| {
            self.fields
                .iter()
                .find(|(key, _)| bare_name(key) == field)
                .map(|(_, value)| value)
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Strips the unit annotation from a header key.
fn bare_name(key: &str) -> &str {
    key.split_once('[').map_or(key, |(name, _)| name).trim()
}

fn has_unit(header: &str) -> bool {
    header.contains('[')
}

/// Converts one data row into a record, given the header it belongs to.
///
/// `line` is only used for error reporting.
pub fn parse_row(
    header: &[&str],
    row: &[&str],
    line: usize,
) -> Result<MetricRecord, MalformedTableError> {
    if header.len() != row.len() {
        return Err(MalformedTableError::ArityMismatch {
            line,
            expected: header.len(),
            found: row.len(),
        });
    }

    let mut fields = HashMap::with_capacity(header.len());
    for (name, cell) in header.iter().zip(row) {
        let key = name.trim();
        let value = if cell.contains(NA_MARKER) {
            FieldValue::NotAvailable
        } else if has_unit(key) {
            FieldValue::Number(parse_unit_number(key, cell)?)
        } else {
            FieldValue::Text(cell.trim().to_string())
        };
        fields.insert(key.to_string(), value);
    }

    Ok(MetricRecord { fields })
}

/// Keeps only digits and dots, e.g. `"45.50 W"` → `45.5`.
fn parse_unit_number(field: &str, cell: &str) -> Result<f64, MalformedTableError> {
    let digits: String = cell
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let invalid = || MalformedTableError::InvalidNumber {
        field: field.to_string(),
        cell: cell.trim().to_string(),
    };

    if digits.is_empty() {
        return Err(invalid());
    }
    digits.parse::<f64>().map_err(|_| invalid())
}

/// Parses a whole CSV document. Blank lines are ignored; the first remaining
/// line is the header. Empty or header-only text yields no records.
pub fn parse_table(text: &str) -> Result<Vec<MetricRecord>, MalformedTableError> {
    parse_table_with(text, None)
}

/// Like [`parse_table`], but a row with more cells than the header is
/// recovered by joining the surplus into `free_column`.
pub fn parse_table_with(
    text: &str,
    free_column: Option<&str>,
) -> Result<Vec<MetricRecord>, MalformedTableError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty());

    let header: Vec<&str> = match lines.next() {
        Some((_, l)) => l.split(',').collect(),
        None => return Ok(Vec::new()),
    };
    let free = free_column.and_then(|name| {
        header
            .iter()
            .position(|h| h.trim() == name || bare_name(h.trim()) == name)
    });

    lines
        .map(|(idx, l)| {
            let row = split_row(l, header.len(), free);
            parse_row(&header, &row, idx + 1)
        })
        .collect()
}

/// Splits `line` into `width` cells, letting column `free` keep any commas.
/// Rows that are too short are split plainly so the arity error reports them.
fn split_row(line: &str, width: usize, free: Option<usize>) -> Vec<&str> {
    let Some(col) = free.filter(|&c| c < width) else {
        return line.split(',').collect();
    };

    let left: Vec<&str> = line.splitn(col + 1, ',').collect();
    if left.len() < col + 1 {
        return line.split(',').collect();
    }

    let trailing = width - col - 1;
    let mut right: Vec<&str> = left[col].rsplitn(trailing + 1, ',').collect();
    if right.len() < trailing + 1 {
        return line.split(',').collect();
    }
    right.reverse();

    let mut cells = left[..col].to_vec();
    cells.extend(right);
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_field_is_trimmed_text() {
        let rec = parse_row(&["name"], &[" abc "], 2).unwrap();
        assert_eq!(rec.get("name"), Some(&FieldValue::Text("abc".into())));
    }

    #[test]
    fn test_unit_field_is_numeric() {
        let rec = parse_row(&["power.draw [W]"], &["45.50 W"], 2).unwrap();
        assert_eq!(rec.get("power.draw [W]"), Some(&FieldValue::Number(45.5)));
        // Bare name lookup resolves the annotated key.
        assert_eq!(rec.get("power.draw"), Some(&FieldValue::Number(45.5)));
    }

    #[test]
    fn test_na_wins_over_annotation() {
        let rec = parse_row(
            &["power.draw [W]", "name", "utilization.gpu [%]"],
            &["[N/A]", "N/A", " [N/A]"],
            2,
        )
        .unwrap();
        assert!(rec.get("power.draw").unwrap().is_na());
        assert!(rec.get("name").unwrap().is_na());
        assert!(rec.get("utilization.gpu").unwrap().is_na());
    }

    #[test]
    fn test_arity_mismatch() {
        let err = parse_row(&["a", "b"], &["1"], 7).unwrap_err();
        assert_eq!(
            err,
            MalformedTableError::ArityMismatch {
                line: 7,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_unit_field_without_digits_is_an_error() {
        let err = parse_row(&["power.draw [W]"], &[" W"], 2).unwrap_err();
        assert!(matches!(err, MalformedTableError::InvalidNumber { .. }));
    }

    #[test]
    fn test_unit_field_with_two_dots_is_an_error() {
        let err = parse_row(&["clocks [MHz]"], &["1.2.3 MHz"], 2).unwrap_err();
        assert!(matches!(err, MalformedTableError::InvalidNumber { .. }));
    }

    #[test]
    fn test_well_formed_rows_of_any_width_parse() {
        for width in 0..8 {
            let header: Vec<String> = (0..width).map(|i| format!("f{i}")).collect();
            let header: Vec<&str> = header.iter().map(String::as_str).collect();
            let row: Vec<&str> = vec!["x"; width];
            let rec = parse_row(&header, &row, 2).unwrap();
            assert_eq!(rec.len(), width);
        }
    }

    #[test]
    fn test_parse_table_gpu_query() {
        let text = "index, utilization.gpu [%], power.draw [W], power.max_limit [W]\n\
                    0, 45 %, 100.00 W, 200.00 W\n\
                    1, [N/A], 50.25 W, 100.00 W\n";
        let records = parse_table(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("index"), Some(&FieldValue::Text("0".into())));
        assert_eq!(
            records[0].get("utilization.gpu").and_then(FieldValue::as_number),
            Some(45.0)
        );
        assert!(records[1].get("utilization.gpu").unwrap().is_na());
        assert_eq!(
            records[1].get("power.draw").and_then(FieldValue::as_number),
            Some(50.25)
        );
    }

    #[test]
    fn test_parse_table_header_only_and_empty() {
        assert!(parse_table("pid, process_name, gpu_uuid\n").unwrap().is_empty());
        assert!(parse_table("").unwrap().is_empty());
        assert!(parse_table("\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_table_reports_line_of_bad_row() {
        let text = "a, b\n1, 2\n3\n";
        let err = parse_table(text).unwrap_err();
        assert_eq!(
            err,
            MalformedTableError::ArityMismatch {
                line: 3,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_free_column_keeps_commas() {
        let text = "pid, process_name, gpu_uuid\n\
                    42, python train.py --tags a,b, GPU-1\n\
                    43, ollama, GPU-2\n";
        let records = parse_table_with(text, Some("process_name")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].get("process_name"),
            Some(&FieldValue::Text("python train.py --tags a,b".into()))
        );
        assert_eq!(records[0].get("gpu_uuid"), Some(&FieldValue::Text("GPU-1".into())));
        assert_eq!(records[1].get("process_name"), Some(&FieldValue::Text("ollama".into())));

        // Without a free column the same row is rejected.
        assert!(matches!(
            parse_table(text).unwrap_err(),
            MalformedTableError::ArityMismatch { line: 2, expected: 3, found: 4 }
        ));
    }

    #[test]
    fn test_free_column_short_row_is_still_an_error() {
        let text = "pid, process_name, gpu_uuid\n1, python\n";
        assert_eq!(
            parse_table_with(text, Some("process_name")).unwrap_err(),
            MalformedTableError::ArityMismatch {
                line: 2,
                expected: 3,
                found: 2
            }
        );
    }
}
