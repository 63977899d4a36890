use chrono::Timelike;

use crate::model::{cell_at, Scalar};

/// Canonical comparable string for a cell. Two cells are equal for matching
/// purposes iff their normalized strings are byte-equal.
pub fn normalize(value: &Scalar) -> String {
    let raw = match value {
        Scalar::Empty => return String::new(),
        Scalar::Text(s) => return s.trim().to_string(),
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(n) => format_float(*n),
        Scalar::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Scalar::Date(d) => d.format("%Y-%m-%d").to_string(),
        Scalar::DateTime(dt) => {
            let t = dt.time();
            if t.num_seconds_from_midnight() == 0 && t.nanosecond() == 0 {
                dt.format("%Y-%m-%d").to_string()
            } else {
                dt.format("%Y-%m-%d %H:%M:%S").to_string()
            }
        }
    };
    raw.trim().to_string()
}

/// Normalize the cell at `col`; cells past the end of a short row are empty.
pub fn normalize_cell(row: &[Scalar], col: usize) -> String {
    normalize(cell_at(row, col))
}

// Integral floats print without decimals so `100.0` from a workbook equals
// the text "100" from a CSV export of the same sheet.
fn format_float(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
