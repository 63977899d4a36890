// Reconciliation report export: xlsx workbook and JSON

use std::collections::HashSet;
use std::path::Path;

use ledgermatch_recon::key::display_key;
use ledgermatch_recon::normalize::normalize;
use ledgermatch_recon::result::ReconReport;
use ledgermatch_recon::{PairRole, Scalar, UnmatchedEntry};
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet, XlsxError};

/// Excel's hard sheet-name limit.
const MAX_SHEET_NAME: usize = 31;

/// Excel's row limit, header included.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportResult {
    /// Sheet names in workbook order.
    pub sheets: Vec<String>,
    /// Data rows written across all sheets (headers excluded).
    pub rows_written: usize,
}

struct Styles {
    header: Format,
    mismatch: Format,
}

impl Styles {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            mismatch: Format::new().set_background_color(Color::RGB(0xFFC7CE)),
        }
    }
}

fn xe(e: XlsxError) -> String {
    format!("Failed to write XLSX: {}", e)
}

/// Make `name` a legal sheet name: no `[]:*?/\`, no leading/trailing quote, at most 31 chars.
pub fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let truncated: String = cleaned.chars().take(MAX_SHEET_NAME).collect();
    if truncated.is_empty() {
        "Sheet".to_string()
    } else {
        truncated
    }
}

/// Sheet names are case-insensitively unique; disambiguate with ` (2)`, ` (3)`, ...
fn unique_sheet_name(name: &str, taken: &mut HashSet<String>) -> String {
    let base = sheet_name(name);
    let mut candidate = base.clone();
    let mut n = 2;
    while taken.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({n})");
        let room = MAX_SHEET_NAME - suffix.chars().count();
        candidate = format!("{}{}", base.chars().take(room).collect::<String>(), suffix);
        n += 1;
    }
    taken.insert(candidate.to_lowercase());
    candidate
}

fn write_scalar(ws: &mut Worksheet, row: u32, col: u16, value: &Scalar, format: Option<&Format>) -> Result<(), String> {
    let result = match (value, format) {
        (Scalar::Empty, None) => return Ok(()),
        (Scalar::Empty, Some(f)) => ws.write_blank(row, col, f),
        (Scalar::Int(n), None) => ws.write_number(row, col, *n as f64),
        (Scalar::Int(n), Some(f)) => ws.write_number_with_format(row, col, *n as f64, f),
        (Scalar::Float(n), None) => ws.write_number(row, col, *n),
        (Scalar::Float(n), Some(f)) => ws.write_number_with_format(row, col, *n, f),
        (Scalar::Bool(b), None) => ws.write_boolean(row, col, *b),
        (Scalar::Bool(b), Some(f)) => ws.write_boolean_with_format(row, col, *b, f),
        // Text and dates go out in their normalized text form
        (other, None) => ws.write_string(row, col, normalize(other)),
        (other, Some(f)) => ws.write_string_with_format(row, col, normalize(other), f),
    };
    result.map(|_| ()).map_err(xe)
}

fn write_header(ws: &mut Worksheet, headers: &[String], styles: &Styles) -> Result<(), String> {
    for (col, h) in headers.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, h, &styles.header)
            .map_err(xe)?;
    }
    ws.set_freeze_panes(1, 0).map_err(xe)?;
    Ok(())
}

fn check_rows(sheet: &str, rows: usize) -> Result<(), String> {
    if rows + 1 > MAX_ROWS {
        return Err(format!(
            "sheet '{}' needs {} rows; Excel allows {}",
            sheet,
            rows + 1,
            MAX_ROWS
        ));
    }
    Ok(())
}

/// Every later `as u16` column cast relies on this check.
fn check_cols(sheet: &str, cols: usize) -> Result<(), String> {
    if cols > MAX_COLS {
        return Err(format!(
            "sheet '{}' needs {} columns; Excel allows {}",
            sheet, cols, MAX_COLS
        ));
    }
    Ok(())
}

/// Write the report as an xlsx workbook: Summary, Matched, one "Only in" sheet
/// per side and Mismatches.
pub fn export_xlsx(report: &ReconReport<'_>, path: &Path) -> Result<ExportResult, String> {
    let meta = &report.meta;
    let result = report.result;
    let styles = Styles::new();
    let mut taken = HashSet::new();
    let mut out = ExportResult::default();
    let mut workbook = Workbook::new();

    // Summary
    {
        let name = unique_sheet_name("Summary", &mut taken);
        let ws = workbook.add_worksheet();
        ws.set_name(&name).map_err(xe)?;
        write_summary(ws, report, &styles)?;
        ws.autofit();
        out.sheets.push(name);
    }

    // Matched: A columns then B columns, each prefixed by its side label
    {
        let name = unique_sheet_name("Matched", &mut taken);
        check_rows(&name, result.matched_count())?;
        check_cols(&name, 1 + meta.headers_a.len() + meta.headers_b.len())?;
        let ws = workbook.add_worksheet();
        ws.set_name(&name).map_err(xe)?;

        let mut headers = vec!["Key".to_string()];
        headers.extend(meta.headers_a.iter().map(|h| format!("{}: {}", meta.label_a, h)));
        headers.extend(meta.headers_b.iter().map(|h| format!("{}: {}", meta.label_b, h)));
        write_header(ws, &headers, &styles)?;

        let a_width = meta.headers_a.len();
        let b_width = meta.headers_b.len();
        for (i, m) in result.matched().iter().enumerate() {
            let row = i as u32 + 1;
            ws.write_string(row, 0, display_key(&m.composite_key)).map_err(xe)?;

            let flagged_a: HashSet<usize> = m
                .mismatches
                .iter()
                .filter_map(|f| meta.headers_a.iter().position(|h| *h == f.source_key))
                .collect();
            let flagged_b: HashSet<usize> = m
                .mismatches
                .iter()
                .filter_map(|f| meta.headers_b.iter().position(|h| *h == f.target_key))
                .collect();

            for c in 0..a_width {
                let value = m.row_a.get(c).unwrap_or(&Scalar::Empty);
                let format = flagged_a.contains(&c).then_some(&styles.mismatch);
                write_scalar(ws, row, (1 + c) as u16, value, format)?;
            }
            for c in 0..b_width {
                let value = m.row_b.get(c).unwrap_or(&Scalar::Empty);
                let format = flagged_b.contains(&c).then_some(&styles.mismatch);
                write_scalar(ws, row, (1 + a_width + c) as u16, value, format)?;
            }
        }
        ws.autofit();
        out.rows_written += result.matched_count();
        out.sheets.push(name);
    }

    // Only in A / Only in B
    for (label, headers, entries) in [
        (&meta.label_a, &meta.headers_a, result.only_in_a()),
        (&meta.label_b, &meta.headers_b, result.only_in_b()),
    ] {
        let name = unique_sheet_name(&format!("Only in {}", label), &mut taken);
        check_rows(&name, entries.len())?;
        check_cols(&name, 2 + headers.len())?;
        let ws = workbook.add_worksheet();
        ws.set_name(&name).map_err(xe)?;
        write_unmatched(ws, headers, entries, &styles)?;
        ws.autofit();
        out.rows_written += entries.len();
        out.sheets.push(name);
    }

    // Mismatches: one row per field
    {
        let name = unique_sheet_name("Mismatches", &mut taken);
        let ws = workbook.add_worksheet();
        ws.set_name(&name).map_err(xe)?;
        let headers = vec![
            "Key".to_string(),
            format!("{} row", meta.label_a),
            format!("{} row", meta.label_b),
            format!("{} column", meta.label_a),
            format!("{} column", meta.label_b),
            format!("{} value", meta.label_a),
            format!("{} value", meta.label_b),
        ];
        write_header(ws, &headers, &styles)?;

        let mut row = 1u32;
        for m in result.mismatched() {
            for f in &m.mismatches {
                check_rows(&name, row as usize)?;
                ws.write_string(row, 0, display_key(&m.composite_key)).map_err(xe)?;
                ws.write_number(row, 1, (m.index_a + 1) as f64).map_err(xe)?;
                ws.write_number(row, 2, (m.index_b + 1) as f64).map_err(xe)?;
                ws.write_string(row, 3, &f.source_key).map_err(xe)?;
                ws.write_string(row, 4, &f.target_key).map_err(xe)?;
                ws.write_string(row, 5, &f.value_a).map_err(xe)?;
                ws.write_string(row, 6, &f.value_b).map_err(xe)?;
                row += 1;
            }
        }
        ws.autofit();
        out.rows_written += (row - 1) as usize;
        out.sheets.push(name);
    }

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;

    log::debug!(
        "{}: {} sheet(s), {} row(s)",
        path.display(),
        out.sheets.len(),
        out.rows_written
    );
    Ok(out)
}

fn write_summary(ws: &mut Worksheet, report: &ReconReport<'_>, styles: &Styles) -> Result<(), String> {
    let meta = &report.meta;
    let s = &report.summary;

    let text_rows: [(&str, String); 5] = [
        ("Reconciliation", meta.name.clone()),
        ("Dataset A", meta.label_a.clone()),
        ("Dataset B", meta.label_b.clone()),
        ("Run at", meta.run_at.clone()),
        ("Engine version", meta.engine_version.clone()),
    ];
    let count_rows: [(String, usize); 12] = [
        (format!("Rows in {}", meta.label_a), s.stats.a.rows),
        (format!("Keyable rows in {}", meta.label_a), s.stats.a.keyable),
        (format!("Unkeyable rows in {}", meta.label_a), s.stats.a.unkeyable),
        (format!("Rows in {}", meta.label_b), s.stats.b.rows),
        (format!("Keyable rows in {}", meta.label_b), s.stats.b.keyable),
        (format!("Unkeyable rows in {}", meta.label_b), s.stats.b.unkeyable),
        ("Matched".to_string(), s.matched),
        (format!("Only in {}", meta.label_a), s.only_in_a),
        (format!("Only in {}", meta.label_b), s.only_in_b),
        ("Total entries".to_string(), s.total),
        ("Matched rows with mismatches".to_string(), s.mismatched_rows),
        ("Field mismatches".to_string(), s.field_mismatches),
    ];

    let mut row = 0u32;
    for (label, value) in &text_rows {
        ws.write_string_with_format(row, 0, *label, &styles.header).map_err(xe)?;
        ws.write_string(row, 1, value).map_err(xe)?;
        row += 1;
    }
    row += 1;
    for (label, value) in &count_rows {
        ws.write_string_with_format(row, 0, label, &styles.header).map_err(xe)?;
        ws.write_number(row, 1, *value as f64).map_err(xe)?;
        row += 1;
    }

    // Mapping, with per-pair mismatch counts
    row += 1;
    let mapping_headers = [
        "Pair".to_string(),
        format!("{} column", meta.label_a),
        format!("{} column", meta.label_b),
        "Role".to_string(),
        "Mismatches".to_string(),
    ];
    for (col, h) in mapping_headers.iter().enumerate() {
        ws.write_string_with_format(row, col as u16, h, &styles.header).map_err(xe)?;
    }
    row += 1;
    for pair in report.mapping.pairs() {
        let mismatches = s
            .mismatches_by_pair
            .iter()
            .find(|p| p.pair_id == pair.id)
            .map_or(0, |p| p.count);
        let role = match pair.role {
            PairRole::Key => "key",
            PairRole::Compare => "compare",
        };
        ws.write_number(row, 0, pair.id.0 as f64).map_err(xe)?;
        ws.write_string(row, 1, &pair.source_key).map_err(xe)?;
        ws.write_string(row, 2, &pair.target_key).map_err(xe)?;
        ws.write_string(row, 3, role).map_err(xe)?;
        ws.write_number(row, 4, mismatches as f64).map_err(xe)?;
        row += 1;
    }
    Ok(())
}

fn write_unmatched(
    ws: &mut Worksheet,
    headers: &[String],
    entries: &[UnmatchedEntry],
    styles: &Styles,
) -> Result<(), String> {
    let mut sheet_headers = vec!["Key".to_string(), "Row".to_string()];
    sheet_headers.extend(headers.iter().cloned());
    write_header(ws, &sheet_headers, styles)?;

    for (i, e) in entries.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_string(row, 0, display_key(&e.composite_key)).map_err(xe)?;
        ws.write_number(row, 1, (e.index + 1) as f64).map_err(xe)?;
        for c in 0..headers.len() {
            let value = e.row.get(c).unwrap_or(&Scalar::Empty);
            write_scalar(ws, row, (2 + c) as u16, value, None)?;
        }
    }
    Ok(())
}

/// Write the report as pretty-printed JSON.
pub fn export_json(report: &ReconReport<'_>, path: &Path) -> Result<(), String> {
    let json = report
        .to_json_pretty()
        .map_err(|e| format!("Failed to serialize report: {}", e))?;
    std::fs::write(path, json + "\n").map_err(|e| format!("cannot write {}: {}", path.display(), e))
}
