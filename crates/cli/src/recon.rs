//! `lmatch run | compare | suggest | validate`: load, reconcile, report.

use std::path::{Path, PathBuf};

use ledgermatch_io::export::{export_json, export_xlsx};
use ledgermatch_recon::config::default_label;
use ledgermatch_recon::mapper::{HeuristicMapper, MappingStrategy};
use ledgermatch_recon::result::{ReconMeta, ReconReport};
use ledgermatch_recon::{reconcile_with_progress, Dataset, Mapping, PairRole, ReconConfig, ReconError, Side, Stage};
use serde::Serialize;

use crate::exit_codes::EXIT_DIFFS;
use crate::CliError;

/// Output flags shared by `run` and `compare`.
pub struct OutputArgs {
    pub json: bool,
    pub output: Option<PathBuf>,
    pub xlsx: Option<PathBuf>,
    pub strict: bool,
    pub quiet: bool,
}

pub struct CompareArgs {
    pub a: PathBuf,
    pub b: PathBuf,
    pub key: Vec<String>,
    pub compare: Vec<String>,
    pub auto: bool,
    pub sheet_a: Option<String>,
    pub sheet_b: Option<String>,
    pub label_a: Option<String>,
    pub label_b: Option<String>,
}

/// Everything a run needs once inputs are loaded and the mapping is settled.
struct Prepared {
    name: String,
    label_a: String,
    label_b: String,
    a: Dataset,
    b: Dataset,
    mapping: Mapping,
}

fn recon_err(e: ReconError) -> CliError {
    let hint = match &e {
        ReconError::EmptyMapping => Some("map at least one key column pair, or let headers be auto-mapped"),
        ReconError::MissingHeader { .. } => Some("`lmatch suggest A B` lists a mapping built from the actual headers"),
        ReconError::AmbiguousHeader { .. } => Some("rename the repeated column so it can be mapped"),
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => None,
    };
    let err = CliError::config(e.to_string());
    match hint {
        Some(h) => err.with_hint(h),
        None => err,
    }
}

fn load(path: &Path, sheet: Option<&str>) -> Result<Dataset, CliError> {
    ledgermatch_io::load_dataset(path, sheet).map_err(CliError::input)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

fn read_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| CliError::config(format!("cannot read config {}: {e}", config_path.display())))?;
    ReconConfig::from_toml(&config_str).map_err(recon_err)
}

fn config_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new("."))
}

pub fn cmd_run(config_path: PathBuf, mut out: OutputArgs) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let base_dir = config_dir(&config_path);

    let load_side = |side: Side| {
        let side_config = config.side(side);
        let path = base_dir.join(&side_config.file);
        load(&path, side_config.sheet.as_deref())
            .map_err(|e| e.with_hint(format!("check sides.{side}.file in {}", config_path.display())))
    };
    let a = load_side(Side::A)?;
    let b = load_side(Side::B)?;

    let mapping = config
        .resolve_mapping(&a.headers, &b.headers)
        .map_err(|e| match e {
            ReconError::EmptyMapping => {
                recon_err(ReconError::EmptyMapping).with_hint("add a [[pairs]] entry, or set auto_map = true")
            }
            other => recon_err(other),
        })?;

    if out.xlsx.is_none() {
        out.xlsx = config.output.xlsx.as_ref().map(|p| base_dir.join(p));
    }
    if out.output.is_none() {
        out.output = config.output.json.as_ref().map(|p| base_dir.join(p));
    }

    let prepared = Prepared {
        name: config.name.clone(),
        label_a: config.label(Side::A).to_string(),
        label_b: config.label(Side::B).to_string(),
        a,
        b,
        mapping,
    };
    execute(&prepared, &out)
}

// ---------------------------------------------------------------------------
// compare
// ---------------------------------------------------------------------------

fn parse_pair(spec: &str, flag: &str) -> Result<(String, String), CliError> {
    let (source, target) = spec
        .split_once('=')
        .map(|(s, t)| (s.trim(), t.trim()))
        .filter(|(s, t)| !s.is_empty() && !t.is_empty())
        .ok_or_else(|| CliError::args(format!("{flag} expects SOURCE=TARGET, got '{spec}'")))?;
    Ok((source.to_string(), target.to_string()))
}

pub fn cmd_compare(args: CompareArgs, out: OutputArgs) -> Result<(), CliError> {
    let label_a = args.label_a.unwrap_or_else(|| default_label(Side::A).to_string());
    let label_b = args.label_b.unwrap_or_else(|| default_label(Side::B).to_string());
    if label_a == label_b {
        return Err(CliError::args(format!("both sides are labelled '{label_a}'")));
    }

    let mut mapping = Mapping::new();
    for spec in &args.key {
        let (source, target) = parse_pair(spec, "--key")?;
        mapping.push_with_role(source, target, PairRole::Key);
    }
    for spec in &args.compare {
        let (source, target) = parse_pair(spec, "--compare")?;
        mapping.push_with_role(source, target, PairRole::Compare);
    }
    if !mapping.has_key_pair() && !args.auto {
        return Err(CliError::args("no key columns given")
            .with_hint("pass --key SOURCE=TARGET, or --auto to pair columns by header"));
    }

    let a = load(&args.a, args.sheet_a.as_deref())?;
    let b = load(&args.b, args.sheet_b.as_deref())?;

    if args.auto {
        let added = HeuristicMapper::default().fill_key_pairs(&mut mapping, &a.headers, &b.headers);
        if added > 0 {
            log::info!("auto-mapped {added} key pair(s)");
        } else if !mapping.has_key_pair() {
            return Err(CliError::config("no key columns could be paired from the headers")
                .with_hint("name the key columns with --key SOURCE=TARGET"));
        }
    }

    let prepared = Prepared {
        name: format!("{} vs {}", file_label(&args.a), file_label(&args.b)),
        label_a,
        label_b,
        a,
        b,
        mapping,
    };
    execute(&prepared, &out)
}

// ---------------------------------------------------------------------------
// Shared run + report
// ---------------------------------------------------------------------------

fn execute(p: &Prepared, out: &OutputArgs) -> Result<(), CliError> {
    let result = reconcile_with_progress(&p.a, &p.b, &p.mapping, |stage: Stage| {
        log::info!("step {}/{}: {}", stage.ordinal(), Stage::ALL.len(), stage);
    })
    .map_err(recon_err)?;

    let meta = ReconMeta::now(
        p.name.clone(),
        p.label_a.clone(),
        p.label_b.clone(),
        &p.a.headers,
        &p.b.headers,
    );
    let report = ReconReport::new(meta, &p.mapping, &result);

    if let Some(ref path) = out.xlsx {
        let written = export_xlsx(&report, path).map_err(CliError::export)?;
        if !out.quiet {
            eprintln!("wrote {} ({} sheets)", path.display(), written.sheets.len());
        }
    }

    if let Some(ref path) = out.output {
        export_json(&report, path).map_err(CliError::export)?;
        if !out.quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    if out.json {
        let json_str = report
            .to_json_pretty()
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    if !out.quiet {
        print_summary(&report);
    }

    if out.strict && !result.is_clean() {
        let s = &report.summary;
        return Err(CliError {
            code: EXIT_DIFFS,
            message: format!(
                "{} unmatched row(s), {} matched row(s) with mismatches",
                s.only_in_a + s.only_in_b,
                s.mismatched_rows
            ),
            hint: None,
        });
    }

    Ok(())
}

/// Human summary to stderr.
fn print_summary(report: &ReconReport<'_>) {
    let meta = &report.meta;
    let s = &report.summary;

    eprintln!("{}", meta.name);
    for (label, stats) in [(&meta.label_a, s.stats.a), (&meta.label_b, s.stats.b)] {
        eprint!("  {label}: {} rows, {} keyable", stats.rows, stats.keyable);
        if stats.unkeyable > 0 {
            eprint!(", {} skipped with an empty key field", stats.unkeyable);
        }
        eprintln!();
    }
    eprintln!(
        "  {} matched ({} with mismatches), {} only in {}, {} only in {}",
        s.matched, s.mismatched_rows, s.only_in_a, meta.label_a, s.only_in_b, meta.label_b,
    );
    for p in &s.mismatches_by_pair {
        eprintln!("  {} / {}: {} mismatch(es)", p.source_key, p.target_key, p.count);
    }
}

// ---------------------------------------------------------------------------
// suggest
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SuggestedPairs {
    pairs: Vec<SuggestedPair>,
}

#[derive(Serialize)]
struct SuggestedPair {
    source: String,
    target: String,
}

pub fn cmd_suggest(
    a: PathBuf,
    b: PathBuf,
    sheet_a: Option<String>,
    sheet_b: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    let da = load(&a, sheet_a.as_deref())?;
    let db = load(&b, sheet_b.as_deref())?;

    let mapping = HeuristicMapper::default().suggest(&da.headers, &db.headers);
    if mapping.is_empty() {
        return Err(CliError::general("no column pairs could be suggested").with_hint(format!(
            "headers are [{}] and [{}]",
            da.headers.join(", "),
            db.headers.join(", ")
        )));
    }

    if json {
        let json_str = serde_json::to_string_pretty(&mapping)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        let doc = SuggestedPairs {
            pairs: mapping
                .pairs()
                .iter()
                .map(|p| SuggestedPair {
                    source: p.source_key.clone(),
                    target: p.target_key.clone(),
                })
                .collect(),
        };
        let toml_str =
            toml::to_string(&doc).map_err(|e| CliError::general(format!("TOML serialization error: {e}")))?;
        print!("{toml_str}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

pub fn cmd_validate(config_path: PathBuf, quiet: bool) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let base_dir = config_dir(&config_path);

    for side in [Side::A, Side::B] {
        let path = base_dir.join(&config.side(side).file);
        if !path.is_file() {
            return Err(CliError::input(format!("sides.{side}.file: {} not found", path.display())));
        }
    }

    if !quiet {
        let keys = config.pairs.iter().filter(|p| p.role == PairRole::Key).count();
        eprintln!(
            "{}: ok ({} key pair(s), {} compare pair(s){})",
            config.name,
            keys,
            config.pairs.len() - keys,
            if config.auto_map { ", auto_map" } else { "" }
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::{EXIT_CONFIG, EXIT_USAGE};

    #[test]
    fn parse_pair_trims_both_sides() {
        let (s, t) = parse_pair(" Invoice No = Bill No ", "--key").unwrap();
        assert_eq!((s.as_str(), t.as_str()), ("Invoice No", "Bill No"));
    }

    #[test]
    fn parse_pair_splits_on_first_equals() {
        let (s, t) = parse_pair("a=b=c", "--key").unwrap();
        assert_eq!((s.as_str(), t.as_str()), ("a", "b=c"));
    }

    #[test]
    fn parse_pair_rejects_malformed() {
        for spec in ["Invoice No", "=Bill No", "Invoice No=", " = "] {
            let err = parse_pair(spec, "--compare").unwrap_err();
            assert_eq!(err.code, EXIT_USAGE);
            assert!(err.message.starts_with("--compare"), "{}", err.message);
        }
    }

    #[test]
    fn engine_errors_map_to_config_exit_code() {
        let err = recon_err(ReconError::MissingHeader {
            side: Side::B,
            header: "Bill No".into(),
        });
        assert_eq!(err.code, EXIT_CONFIG);
        assert!(err.message.contains("Bill No"));
        assert!(err.hint.is_some());
    }
}
