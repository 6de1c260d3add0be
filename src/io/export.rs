//! Export per-point results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::PointResidual;
use crate::error::AppError;

/// Write per-point results to a CSV file.
pub fn write_results_csv(path: &Path, residuals: &[PointResidual]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_results(&mut out, residuals)?;
    out.flush()
        .map_err(|e| AppError::input(format!("Failed to write export CSV: {e}")))?;
    Ok(())
}

/// Write the results table to any writer.
pub fn write_results<W: Write>(out: &mut W, residuals: &[PointResidual]) -> Result<(), AppError> {
    writeln!(out, "index,t,x_obs,y_obs,x_fit,y_fit,dx,dy,l1")
        .map_err(|e| AppError::input(format!("Failed to write export CSV header: {e}")))?;

    for r in residuals {
        writeln!(
            out,
            "{},{:.10},{:.10},{:.10},{:.10},{:.10},{:.10},{:.10},{:.10}",
            r.index,
            r.t,
            r.x_obs,
            r.y_obs,
            r.x_fit,
            r.y_fit,
            r.dx(),
            r.dy(),
            r.l1(),
        )
        .map_err(|e| AppError::input(format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_rows() {
        let rows = vec![PointResidual {
            index: 0,
            t: 6.0,
            x_obs: 1.0,
            y_obs: 2.0,
            x_fit: 1.5,
            y_fit: 1.0,
        }];
        let mut buf = Vec::new();
        write_results(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "index,t,x_obs,y_obs,x_fit,y_fit,dx,dy,l1");
        assert!(lines[1].starts_with("0,6.0000000000,"));
        assert!(lines[1].ends_with(",0.5000000000,-1.0000000000,1.5000000000"));
    }
}
