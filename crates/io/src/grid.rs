// Raw cell grid -> Dataset (header detection, header cleanup, blank rows)

use std::collections::HashMap;

use ledgermatch_recon::normalize::normalize;
use ledgermatch_recon::{Dataset, Scalar};

fn is_blank(row: &[Scalar]) -> bool {
    row.iter().all(|c| normalize(c).is_empty())
}

/// Turn loaded rows into a dataset.
///
/// The first row with any non-empty cell is the header row; everything above
/// it is ignored. Data rows that are entirely blank are dropped.
pub fn dataset_from_grid(grid: Vec<Vec<Scalar>>) -> Result<Dataset, String> {
    let mut rows = grid.into_iter();
    let header_row = rows
        .by_ref()
        .find(|r| !is_blank(r))
        .ok_or_else(|| "no header row: every row is empty".to_string())?;

    let headers = clean_headers(&header_row);

    let mut data = Vec::new();
    let mut blank = 0usize;
    for row in rows {
        if is_blank(&row) {
            blank += 1;
            continue;
        }
        data.push(row);
    }
    if blank > 0 {
        log::debug!("dropped {blank} blank row(s)");
    }

    Ok(Dataset::new(headers, data))
}

/// Trim header text, name blank headers `Column N` and suffix repeats ` (2)`, ` (3)`, ...
pub fn clean_headers(raw: &[Scalar]) -> Vec<String> {
    let trimmed: Vec<String> = raw
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let text = normalize(cell);
            if text.is_empty() {
                format!("Column {}", i + 1)
            } else {
                text
            }
        })
        .collect();
    dedupe_headers(trimmed)
}

fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for h in &headers {
        seen.entry(h.clone()).or_insert(0);
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(headers.len());
    for h in headers {
        let n = counts.entry(h.clone()).or_insert(0);
        *n += 1;
        if *n == 1 {
            out.push(h);
            continue;
        }
        // Skip suffixes already taken by a literal header
        let mut k = *n;
        let mut renamed = format!("{h} ({k})");
        while seen.contains_key(&renamed) {
            k += 1;
            renamed = format!("{h} ({k})");
        }
        *n = k;
        log::warn!("duplicate header '{h}' renamed to '{renamed}'");
        seen.insert(renamed.clone(), 0);
        out.push(renamed);
    }
    out
}
