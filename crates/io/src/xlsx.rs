// Excel import (xlsx, xlsm, xls, xlsb, ods): one sheet into a Dataset

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ledgermatch_recon::{Dataset, Scalar};

use crate::grid::dataset_from_grid;

/// Import `sheet`, or the first sheet when `None`.
pub fn import(path: &Path, sheet: Option<&str>) -> Result<Dataset, String> {
    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| format!("cannot open {}: {e}", path.display()))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| format!("no sheet named '{}' (available: {})", name, sheet_names.join(", ")))?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| "Excel file contains no sheets".to_string())?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    // Range start offset (data may not begin at A1). Leading columns are kept
    // so blank header names line up with spreadsheet column numbers.
    let (_, data_start_col) = range.start().unwrap_or((0, 0));
    let pad = data_start_col as usize;

    let mut grid: Vec<Vec<Scalar>> = Vec::with_capacity(range.height());
    for row in range.rows() {
        let mut cells = Vec::with_capacity(pad + row.len());
        cells.resize(pad, Scalar::Empty);
        cells.extend(row.iter().map(cell_to_scalar));
        grid.push(cells);
    }

    log::debug!(
        "{} [{}]: {} row(s) x {} column(s)",
        path.display(),
        sheet_name,
        range.height(),
        range.width()
    );
    dataset_from_grid(grid).map_err(|e| format!("sheet '{}': {}", sheet_name, e))
}

pub fn cell_to_scalar(cell: &Data) -> Scalar {
    match cell {
        Data::Empty => Scalar::Empty,
        Data::String(s) if s.is_empty() => Scalar::Empty,
        Data::String(s) => Scalar::Text(s.clone()),
        Data::Float(n) => Scalar::Float(*n),
        Data::Int(n) => Scalar::Int(*n),
        Data::Bool(b) => Scalar::Bool(*b),
        Data::Error(e) => Scalar::Text(e.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => datetime_scalar(ndt),
            // Durations and out-of-range serials keep the raw serial
            None => Scalar::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_iso(s),
        Data::DurationIso(s) => Scalar::Text(s.clone()),
    }
}

fn datetime_scalar(ndt: NaiveDateTime) -> Scalar {
    if ndt.time() == NaiveTime::MIN {
        Scalar::Date(ndt.date())
    } else {
        Scalar::DateTime(ndt)
    }
}

fn parse_iso(s: &str) -> Scalar {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Scalar::Date(d);
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return datetime_scalar(ndt);
    }
    Scalar::Text(s.to_string())
}
