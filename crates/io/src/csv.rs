// CSV/TSV import

use std::path::Path;

use ledgermatch_recon::{Dataset, Scalar};

use crate::grid::dataset_from_grid;

pub fn import(path: &Path) -> Result<Dataset, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    log::debug!("{}: delimiter {:?}", path.display(), delimiter as char);
    import_from_string(&content, delimiter)
}

pub fn import_tsv(path: &Path) -> Result<Dataset, String> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content, b'\t')
}

const DELIMITER_CANDIDATES: [u8; 4] = [b'\t', b';', b',', b'|'];
const SNIFF_LINES: usize = 10;

/// Guess the field delimiter from the first non-blank lines.
///
/// Each candidate parses the sample; one that splits the first record into
/// more than one field scores `records agreeing with the first width * width`.
/// Ties go to the earlier candidate. Falls back to comma.
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect::<Vec<_>>()
        .join("\n");

    let mut best = (0usize, b',');
    for delim in DELIMITER_CANDIDATES {
        let widths = record_widths(&sample, delim);
        let Some(&first) = widths.first() else { continue };
        if first <= 1 {
            continue;
        }
        let score = widths.iter().filter(|&&w| w == first).count() * first;
        if score > best.0 {
            best = (score, delim);
        }
    }
    best.1
}

fn record_widths(sample: &str, delimiter: u8) -> Vec<usize> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(sample.as_bytes())
        .records()
        .map_while(Result::ok)
        .map(|r| r.len())
        .collect()
}

/// File contents as UTF-8. Anything that is not valid UTF-8 is decoded as
/// Windows-1252, the encoding Excel uses for CSV exports.
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    String::from_utf8(bytes).or_else(|e| {
        log::debug!("{}: not UTF-8, decoding as Windows-1252", path.display());
        let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
        Ok(decoded.into_owned())
    })
}

pub fn import_from_string(content: &str, delimiter: u8) -> Result<Dataset, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid: Vec<Vec<Scalar>> = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format!("record {}: {e}", line + 1))?;
        grid.push(
            record
                .iter()
                .map(|field| if field.is_empty() { Scalar::Empty } else { Scalar::from(field) })
                .collect(),
        );
    }

    let dataset = dataset_from_grid(grid)?;
    let ragged = dataset.short_rows();
    if ragged > 0 {
        log::warn!("{ragged} record(s) have fewer fields than the header");
    }
    Ok(dataset)
}
