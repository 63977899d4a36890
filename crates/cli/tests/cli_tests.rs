// End-to-end tests for the `lmatch` binary: exit codes, stdout/stderr contract,
// report files.
//
// Run with: cargo test -p ledgermatch-cli --test cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use calamine::{open_workbook_auto, Reader};
use tempfile::TempDir;

const GSTR2B: &str = "\
GSTIN of Supplier,Trade Name,Invoice Number,Invoice Date,Taxable Value,Integrated Tax
29ABCDE1234F1Z5,Acme Traders,INV-001,2024-04-02,10000,1800
29ABCDE1234F1Z5,Acme Traders,INV-002,2024-04-05,5000,900
27PQRSX5678K1Z2,Bright Supplies,BS/101,2024-04-07,2500,450
27PQRSX5678K1Z2,Bright Supplies,BS/102,2024-04-09,7500,1350
33LMNOP9012Q1Z8,Coastal Foods,CF-77,2024-04-11,1200,216
,Unknown,INV-999,2024-04-12,100,18
";

const PURCHASE: &str = "\
Supplier Name;GST No;Bill No;Bill Date;Amount
Acme Traders;29ABCDE1234F1Z5;INV-001;2024-04-02;10000
Acme Traders;29ABCDE1234F1Z5;INV-002;2024-04-05;5500
Bright Supplies;27PQRSX5678K1Z2;BS/101;2024-04-07;2500
Delta Metals;24DELTA1111D1Z1;DM-5;2024-04-15;3000
Delta Metals;24DELTA1111D1Z1;DM-5;2024-04-15;3000
";

const CONFIG: &str = r#"
name = "GSTR-2B vs Purchase Register"

[sides.a]
label = "GSTR-2B"
file = "gstr2b.csv"

[sides.b]
label = "Purchase Register"
file = "purchase.csv"

[[pairs]]
source = "Invoice Number"
target = "Bill No"

[[pairs]]
source = "GSTIN of Supplier"
target = "GST No"

[[pairs]]
source = "Taxable Value"
target = "Amount"
role = "compare"
"#;

fn lmatch() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_lmatch"));
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Temp dir holding both datasets and a config file.
fn workspace(config: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("gstr2b.csv"), GSTR2B).unwrap();
    std::fs::write(dir.path().join("purchase.csv"), PURCHASE).unwrap();
    let config_path = dir.path().join("gst.recon.toml");
    std::fs::write(&config_path, config).unwrap();
    (dir, config_path)
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

fn stdout(o: &Output) -> String {
    String::from_utf8_lossy(&o.stdout).into_owned()
}

fn stderr(o: &Output) -> String {
    String::from_utf8_lossy(&o.stderr).into_owned()
}

fn json(o: &Output) -> serde_json::Value {
    serde_json::from_str(stdout(o).trim())
        .unwrap_or_else(|e| panic!("stdout must be one JSON value: {e}\n{}", stdout(o)))
}

fn code(o: &Output) -> i32 {
    o.status.code().expect("exit code")
}

// ===========================================================================
// lmatch run
// ===========================================================================

#[test]
fn run_prints_summary_and_succeeds() {
    let (_dir, config) = workspace(CONFIG);
    let out = lmatch().args(["run", path_str(&config)]).output().unwrap();

    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    assert!(stdout(&out).is_empty(), "human output goes to stderr");
    let err = stderr(&out);
    assert!(err.contains("GSTR-2B vs Purchase Register"), "{err}");
    assert!(err.contains("3 matched (1 with mismatches)"), "{err}");
    assert!(err.contains("2 only in GSTR-2B"), "{err}");
    assert!(err.contains("2 only in Purchase Register"), "{err}");
    assert!(err.contains("1 skipped with an empty key field"), "{err}");
    assert!(err.contains("Taxable Value / Amount: 1"), "{err}");
}

#[test]
fn run_json_is_a_single_document() {
    let (_dir, config) = workspace(CONFIG);
    let out = lmatch().args(["run", path_str(&config), "--json"]).output().unwrap();

    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    let v = json(&out);
    assert_eq!(v["meta"]["name"], "GSTR-2B vs Purchase Register");
    assert_eq!(v["summary"]["matched"], 3);
    assert_eq!(v["summary"]["only_in_a"], 2);
    assert_eq!(v["summary"]["only_in_b"], 2);
    assert_eq!(v["summary"]["field_mismatches"], 1);
    assert_eq!(v["mapping"]["pairs"].as_array().unwrap().len(), 3);
}

#[test]
fn run_strict_exits_5_on_differences() {
    let (_dir, config) = workspace(CONFIG);
    let out = lmatch().args(["run", path_str(&config), "--strict", "-q"]).output().unwrap();

    assert_eq!(code(&out), 5);
    let err = stderr(&out);
    assert!(err.contains("error: 4 unmatched row(s), 1 matched row(s) with mismatches"), "{err}");
}

#[test]
fn run_quiet_success_is_silent() {
    let (_dir, config) = workspace(CONFIG);
    let out = lmatch().args(["-q", "run", path_str(&config)]).output().unwrap();
    assert_eq!(code(&out), 0);
    assert!(stderr(&out).is_empty(), "{}", stderr(&out));
}

#[test]
fn run_writes_reports_named_in_config() {
    let config = format!("{CONFIG}\n[output]\nxlsx = \"out/report.xlsx\"\njson = \"report.json\"\n");
    let (dir, config_path) = workspace(&config);
    std::fs::create_dir(dir.path().join("out")).unwrap();

    let out = lmatch().args(["run", path_str(&config_path)]).output().unwrap();
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("wrote"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(report["summary"]["total"], 7);

    let wb = open_workbook_auto(dir.path().join("out/report.xlsx")).unwrap();
    assert_eq!(
        wb.sheet_names().to_vec(),
        vec![
            "Summary",
            "Matched",
            "Only in GSTR-2B",
            "Only in Purchase Register",
            "Mismatches"
        ]
    );
}

#[test]
fn run_flag_overrides_config_output() {
    let config = format!("{CONFIG}\n[output]\njson = \"from-config.json\"\n");
    let (dir, config_path) = workspace(&config);
    let flag_path = dir.path().join("from-flag.json");

    let out = lmatch()
        .args(["run", path_str(&config_path), "--output", path_str(&flag_path)])
        .output()
        .unwrap();
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    assert!(flag_path.exists());
    assert!(!dir.path().join("from-config.json").exists());
}

#[test]
fn run_missing_dataset_exits_4_with_hint() {
    let config = CONFIG.replace("purchase.csv", "missing.csv");
    let (_dir, config_path) = workspace(&config);
    let out = lmatch().args(["run", path_str(&config_path)]).output().unwrap();

    assert_eq!(code(&out), 4);
    let err = stderr(&out);
    assert!(err.contains("missing.csv"), "{err}");
    assert!(err.contains("hint:  check sides.b.file"), "{err}");
}

#[test]
fn run_unknown_header_exits_3() {
    let config = CONFIG.replace("target = \"Bill No\"", "target = \"Bill Number\"");
    let (_dir, config_path) = workspace(&config);
    let out = lmatch().args(["run", path_str(&config_path)]).output().unwrap();

    assert_eq!(code(&out), 3);
    assert!(stderr(&out).contains("'Bill Number' not found"), "{}", stderr(&out));
}

#[test]
fn run_invalid_config_exits_3() {
    let (_dir, config_path) = workspace("name = \"broken\"\n[sides.a]\nfile = \"a.csv\"\n");
    let out = lmatch().args(["run", path_str(&config_path)]).output().unwrap();
    assert_eq!(code(&out), 3);
    assert!(stderr(&out).contains("config parse error"), "{}", stderr(&out));
}

#[test]
fn run_auto_map_config() {
    let config = r#"
name = "auto"
auto_map = true
[sides.a]
file = "gstr2b.csv"
[sides.b]
file = "purchase.csv"
"#;
    let (_dir, config_path) = workspace(config);
    let out = lmatch().args(["run", path_str(&config_path), "--json"]).output().unwrap();

    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    let v = json(&out);
    // Invoice, GSTIN, date and value all become key pairs
    assert_eq!(v["mapping"]["pairs"].as_array().unwrap().len(), 4);
    assert_eq!(v["summary"]["matched"], 2);
    assert_eq!(v["meta"]["label_a"], "Dataset A");
}

#[test]
fn run_auto_map_keeps_configured_compare_pair() {
    let config = r#"
name = "auto with compare"
auto_map = true
[sides.a]
file = "gstr2b.csv"
[sides.b]
file = "purchase.csv"
[[pairs]]
source = "Taxable Value"
target = "Amount"
role = "compare"
"#;
    let (_dir, config_path) = workspace(config);
    let out = lmatch().args(["run", path_str(&config_path), "--json"]).output().unwrap();

    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    let v = json(&out);
    let pairs = v["mapping"]["pairs"].as_array().unwrap();
    assert_eq!(pairs.len(), 4);
    assert_eq!(pairs[0]["role"], "compare");
    assert_eq!(pairs.iter().filter(|p| p["role"] == "key").count(), 3);
    // Same mapping as `compare --auto --compare 'Taxable Value=Amount'`
    assert_eq!(v["summary"]["matched"], 3);
    assert_eq!(v["summary"]["field_mismatches"], 1);
}

// ===========================================================================
// lmatch compare
// ===========================================================================

#[test]
fn compare_with_explicit_pairs() {
    let (dir, _) = workspace(CONFIG);
    let out = lmatch()
        .current_dir(dir.path())
        .args([
            "compare",
            "gstr2b.csv",
            "purchase.csv",
            "--key",
            "Invoice Number=Bill No",
            "--key",
            "GSTIN of Supplier=GST No",
            "--compare",
            "Taxable Value=Amount",
            "--label-a",
            "Portal",
            "--label-b",
            "Books",
            "--json",
        ])
        .output()
        .unwrap();

    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    let v = json(&out);
    assert_eq!(v["meta"]["name"], "gstr2b.csv vs purchase.csv");
    assert_eq!(v["meta"]["label_b"], "Books");
    assert_eq!(v["summary"]["matched"], 3);
    assert_eq!(v["summary"]["mismatched_rows"], 1);
    assert!(stderr(&out).contains("2 only in Portal"));
}

#[test]
fn compare_auto_keeps_compare_columns_out_of_the_key() {
    let (dir, _) = workspace(CONFIG);
    let out = lmatch()
        .current_dir(dir.path())
        .args([
            "compare",
            "gstr2b.csv",
            "purchase.csv",
            "--auto",
            "--compare",
            "Taxable Value=Amount",
            "--json",
        ])
        .output()
        .unwrap();

    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    let v = json(&out);
    let pairs = v["mapping"]["pairs"].as_array().unwrap();
    let keys = pairs.iter().filter(|p| p["role"] == "key").count();
    assert_eq!(keys, 3);
    assert_eq!(v["summary"]["matched"], 3);
    assert_eq!(v["summary"]["field_mismatches"], 1);
}

#[test]
fn compare_without_keys_is_a_usage_error() {
    let (dir, _) = workspace(CONFIG);
    let out = lmatch()
        .current_dir(dir.path())
        .args(["compare", "gstr2b.csv", "purchase.csv", "--compare", "Taxable Value=Amount"])
        .output()
        .unwrap();
    assert_eq!(code(&out), 2);
    assert!(stderr(&out).contains("hint:"), "{}", stderr(&out));
}

#[test]
fn compare_malformed_pair_is_a_usage_error() {
    let (dir, _) = workspace(CONFIG);
    let out = lmatch()
        .current_dir(dir.path())
        .args(["compare", "gstr2b.csv", "purchase.csv", "--key", "Invoice Number"])
        .output()
        .unwrap();
    assert_eq!(code(&out), 2);
    assert!(stderr(&out).contains("--key expects SOURCE=TARGET"), "{}", stderr(&out));
}

#[test]
fn compare_xlsx_export_failure_exits_6() {
    let (dir, _) = workspace(CONFIG);
    let out = lmatch()
        .current_dir(dir.path())
        .args([
            "compare",
            "gstr2b.csv",
            "purchase.csv",
            "--key",
            "Invoice Number=Bill No",
            "--xlsx",
            "no-such-dir/report.xlsx",
        ])
        .output()
        .unwrap();
    assert_eq!(code(&out), 6, "stderr: {}", stderr(&out));
}

// ===========================================================================
// lmatch suggest
// ===========================================================================

#[test]
fn suggest_prints_pasteable_toml() {
    let (dir, _) = workspace(CONFIG);
    let out = lmatch()
        .current_dir(dir.path())
        .args(["suggest", "gstr2b.csv", "purchase.csv"])
        .output()
        .unwrap();

    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    let doc: toml::Value = toml::from_str(&stdout(&out)).unwrap();
    let pairs = doc["pairs"].as_array().unwrap();
    assert_eq!(pairs.len(), 4);
    assert_eq!(pairs[0]["source"].as_str(), Some("Invoice Number"));
    assert_eq!(pairs[0]["target"].as_str(), Some("Bill No"));
}

#[test]
fn suggest_json() {
    let (dir, _) = workspace(CONFIG);
    let out = lmatch()
        .current_dir(dir.path())
        .args(["suggest", "gstr2b.csv", "purchase.csv", "--json"])
        .output()
        .unwrap();

    assert_eq!(code(&out), 0);
    let v = json(&out);
    assert_eq!(v["pairs"][1]["source_key"], "GSTIN of Supplier");
    assert_eq!(v["pairs"][1]["id"], 2);
}

#[test]
fn suggest_with_nothing_in_common_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.csv"), "Colour,Size\nred,1\n").unwrap();
    std::fs::write(dir.path().join("b.csv"), "Shape,Weight\nsquare,2\n").unwrap();
    let out = lmatch()
        .current_dir(dir.path())
        .args(["suggest", "a.csv", "b.csv"])
        .output()
        .unwrap();
    assert_eq!(code(&out), 1);
    assert!(stdout(&out).is_empty());
    assert!(stderr(&out).contains("Colour, Size"), "{}", stderr(&out));
}

// ===========================================================================
// lmatch validate / usage
// ===========================================================================

#[test]
fn validate_ok() {
    let (_dir, config) = workspace(CONFIG);
    let out = lmatch().args(["validate", path_str(&config)]).output().unwrap();
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("ok (2 key pair(s), 1 compare pair(s))"), "{}", stderr(&out));
}

#[test]
fn validate_missing_file_exits_4() {
    let (dir, config) = workspace(CONFIG);
    std::fs::remove_file(dir.path().join("gstr2b.csv")).unwrap();
    let out = lmatch().args(["validate", path_str(&config)]).output().unwrap();
    assert_eq!(code(&out), 4);
    assert!(stderr(&out).contains("sides.a.file"), "{}", stderr(&out));
}

#[test]
fn validate_duplicate_labels_exits_3() {
    let config = CONFIG.replace("label = \"Purchase Register\"", "label = \"GSTR-2B\"");
    let (_dir, config_path) = workspace(&config);
    let out = lmatch().args(["validate", path_str(&config_path)]).output().unwrap();
    assert_eq!(code(&out), 3);
}

#[test]
fn unknown_flag_exits_2() {
    let out = lmatch().args(["run", "x.toml", "--no-such-flag"]).output().unwrap();
    assert_eq!(code(&out), 2);
}
