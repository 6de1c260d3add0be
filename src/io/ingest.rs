//! CSV ingest and validation.
//!
//! This module turns a two-column `(x, y)` CSV into validated `Observations`.
//!
//! Design goals:
//! - **Strict schema**: `x` and `y` header columns (case-insensitive), or a
//!   headerless file whose first two columns are numeric
//! - **Row-level validation** with line numbers in the error report
//! - **No silent drops**: t is assigned by row position, so skipping a bad
//!   row would shift every later point; any row error rejects the file
//! - **Separation of concerns**: no fitting logic here

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{DatasetStats, Observations};
use crate::error::AppError;

/// How many row errors to spell out before summarizing the rest.
const MAX_REPORTED_ROW_ERRORS: usize = 5;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Raw columns read from a CSV, before the t grid is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct XyColumns {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub row_errors: Vec<RowError>,
}

/// Ingest output: validated observations + summary stats.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub observations: Observations,
    pub stats: DatasetStats,
}

/// Load `(x, y)` points from `path` and pair them with `linspace(t_min, t_max, n)`.
pub fn load_observations(path: &Path, t_min: f64, t_max: f64) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;
    let columns = read_xy_columns(file)?;
    let ingested = into_observations(columns, t_min, t_max)?;

    tracing::info!(
        path = %path.display(),
        n_points = ingested.stats.n_points,
        t_min,
        t_max,
        "loaded observations"
    );
    Ok(ingested)
}

/// Validate parsed columns and attach the t grid.
pub fn into_observations(columns: XyColumns, t_min: f64, t_max: f64) -> Result<IngestedData, AppError> {
    if !columns.row_errors.is_empty() {
        return Err(AppError::input(format_row_errors(&columns.row_errors)));
    }
    let observations = Observations::from_xy(columns.x, columns.y, t_min, t_max)?;
    let stats = DatasetStats::from_observations(&observations);
    Ok(IngestedData { observations, stats })
}

/// Parse the `x` / `y` columns of a CSV stream.
pub fn read_xy_columns<R: Read>(reader: R) -> Result<XyColumns, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = reader.records();
    let Some(first) = records.next() else {
        return Err(AppError::no_data("CSV file is empty."));
    };
    let first = first.map_err(|e| AppError::input(format!("Failed to read CSV header: {e}")))?;

    // Either a header row naming `x` and `y`, or a headerless numeric file.
    let (x_idx, y_idx, header_is_data) = match resolve_columns(&first) {
        Some((xi, yi)) => (xi, yi, false),
        None if parse_pair(&first, 0, 1).is_ok() => (0, 1, true),
        None => {
            return Err(AppError::input(
                "CSV file must contain 'x' and 'y' columns (or two numeric columns without a header).",
            ));
        }
    };

    let mut out = XyColumns {
        x: Vec::new(),
        y: Vec::new(),
        row_errors: Vec::new(),
    };

    let mut last_line = record_line(&first, 1);
    if header_is_data {
        push_row(&mut out, &first, last_line, x_idx, y_idx);
    }

    // Blank lines are skipped by the reader and quoted fields may span lines,
    // so line numbers come from the reader's positions, not a record count.
    for result in records {
        match result {
            Ok(record) => {
                last_line = record_line(&record, last_line + 1);
                push_row(&mut out, &record, last_line, x_idx, y_idx);
            }
            Err(e) => {
                last_line = e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(last_line + 1);
                out.row_errors.push(RowError {
                    line: last_line,
                    message: format!("CSV parse error: {e}"),
                });
            }
        }
    }

    Ok(out)
}

fn record_line(record: &StringRecord, fallback: usize) -> usize {
    record.position().map(|p| p.line() as usize).unwrap_or(fallback)
}

fn push_row(out: &mut XyColumns, record: &StringRecord, line: usize, x_idx: usize, y_idx: usize) {
    match parse_pair(record, x_idx, y_idx) {
        Ok((x, y)) => {
            out.x.push(x);
            out.y.push(y);
        }
        Err(message) => out.row_errors.push(RowError { line, message }),
    }
}

fn resolve_columns(headers: &StringRecord) -> Option<(usize, usize)> {
    let names: Vec<String> = headers.iter().map(normalize_header_name).collect();
    let x = names.iter().position(|n| n == "x")?;
    let y = names.iter().position(|n| n == "y")?;
    Some((x, y))
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, `x` would not be recognized.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn parse_pair(record: &StringRecord, x_idx: usize, y_idx: usize) -> Result<(f64, f64), String> {
    let x = parse_field(record, x_idx, "x")?;
    let y = parse_field(record, y_idx, "y")?;
    Ok((x, y))
}

fn parse_field(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .ok_or_else(|| format!("missing '{name}' value"))?
        .trim_start_matches('\u{feff}');
    let v: f64 = raw
        .parse()
        .map_err(|_| format!("invalid '{name}' value '{raw}'"))?;
    if !v.is_finite() {
        return Err(format!("non-finite '{name}' value '{raw}'"));
    }
    Ok(v)
}

fn format_row_errors(errors: &[RowError]) -> String {
    let mut out = format!("CSV has {} invalid row(s):", errors.len());
    for e in errors.iter().take(MAX_REPORTED_ROW_ERRORS) {
        out.push_str(&format!("\n  line {}: {}", e.line, e.message));
    }
    if errors.len() > MAX_REPORTED_ROW_ERRORS {
        out.push_str(&format!("\n  ... and {} more", errors.len() - MAX_REPORTED_ROW_ERRORS));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EXIT_INPUT, EXIT_NO_DATA};

    #[test]
    fn reads_header_columns_in_any_order() {
        let csv = "y,x\n2.0,1.0\n4.0,3.0\n";
        let cols = read_xy_columns(csv.as_bytes()).unwrap();
        assert_eq!(cols.x, vec![1.0, 3.0]);
        assert_eq!(cols.y, vec![2.0, 4.0]);
        assert!(cols.row_errors.is_empty());
    }

    #[test]
    fn strips_bom_and_case() {
        let csv = "\u{feff}X , Y\n1,2\n";
        let cols = read_xy_columns(csv.as_bytes()).unwrap();
        assert_eq!(cols.x, vec![1.0]);
        assert_eq!(cols.y, vec![2.0]);
    }

    #[test]
    fn accepts_headerless_numeric_file() {
        let csv = "1.5,2.5\n3.5,4.5\n";
        let cols = read_xy_columns(csv.as_bytes()).unwrap();
        assert_eq!(cols.x, vec![1.5, 3.5]);
        assert_eq!(cols.y, vec![2.5, 4.5]);
    }

    #[test]
    fn rejects_unknown_header() {
        let csv = "a,b\n1,2\n";
        let err = read_xy_columns(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
    }

    #[test]
    fn empty_file_is_no_data() {
        let err = read_xy_columns("".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_NO_DATA);
    }

    #[test]
    fn header_only_is_no_data() {
        let cols = read_xy_columns("x,y\n".as_bytes()).unwrap();
        let err = into_observations(cols, 6.0, 60.0).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_NO_DATA);
    }

    #[test]
    fn bad_rows_are_reported_with_line_numbers() {
        let csv = "x,y\n1,2\nfoo,3\n4\n5,inf\n";
        let cols = read_xy_columns(csv.as_bytes()).unwrap();
        let lines: Vec<usize> = cols.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);

        let err = into_observations(cols, 6.0, 60.0).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
        assert!(err.message().contains("line 3"));
    }

    #[test]
    fn empty_field_row_is_an_error_not_skipped() {
        let csv = "x,y\n1,2\n,\n3,4\n";
        let cols = read_xy_columns(csv.as_bytes()).unwrap();
        assert_eq!(cols.x, vec![1.0, 3.0]);
        assert_eq!(cols.row_errors.len(), 1);
        assert_eq!(cols.row_errors[0].line, 3);

        let err = into_observations(cols, 6.0, 60.0).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
    }

    #[test]
    fn line_numbers_account_for_blank_lines() {
        let csv = "x,y\n1,2\n\nfoo,3\n";
        let cols = read_xy_columns(csv.as_bytes()).unwrap();
        let lines: Vec<usize> = cols.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![4]);
    }

    #[test]
    fn line_numbers_account_for_multiline_quoted_fields() {
        let csv = "x,y\n\"a\nb\",2\nbar,3\n";
        let cols = read_xy_columns(csv.as_bytes()).unwrap();
        // The quoted field spans lines 2 and 3. `bar` sits on line 4.
        let lines: Vec<usize> = cols.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 4]);
    }

    #[test]
    fn attaches_t_grid_and_stats() {
        let csv = "x,y\n1,10\n2,20\n3,30\n";
        let cols = read_xy_columns(csv.as_bytes()).unwrap();
        let data = into_observations(cols, 6.0, 60.0).unwrap();
        assert_eq!(data.observations.t(), &[6.0, 33.0, 60.0]);
        assert_eq!(data.stats.n_points, 3);
        assert_eq!(data.stats.y_range, (10.0, 30.0));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load_observations(Path::new("/definitely/not/here.csv"), 6.0, 60.0).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
    }
}
