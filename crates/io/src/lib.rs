// Dataset loading and report export

pub mod csv;
pub mod export;
pub mod grid;
pub mod xlsx;

use std::path::Path;

use ledgermatch_recon::Dataset;

/// Workbook extensions handed to calamine.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

pub fn is_spreadsheet(path: &Path) -> bool {
    SPREADSHEET_EXTENSIONS.contains(&extension(path).as_str())
}

/// Load a dataset, choosing the reader from the file extension.
///
/// `sheet` selects a workbook sheet (first sheet when `None`) and is ignored
/// for delimited text.
pub fn load_dataset(path: &Path, sheet: Option<&str>) -> Result<Dataset, String> {
    let ext = extension(path);
    let dataset = match ext.as_str() {
        "csv" | "txt" => {
            if let Some(s) = sheet {
                log::warn!("{}: sheet '{}' ignored for delimited text", path.display(), s);
            }
            csv::import(path)?
        }
        "tsv" | "tab" => csv::import_tsv(path)?,
        e if SPREADSHEET_EXTENSIONS.contains(&e) => xlsx::import(path, sheet)?,
        "" => return Err(format!("{}: no file extension; expected .csv, .tsv or a workbook", path.display())),
        other => return Err(format!("{}: unsupported file type '.{}'", path.display(), other)),
    };
    log::info!(
        "loaded {}: {} column(s), {} row(s)",
        path.display(),
        dataset.headers.len(),
        dataset.len()
    );
    Ok(dataset)
}
