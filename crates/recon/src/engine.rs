use serde::Serialize;

use crate::error::ReconError;
use crate::key::{resolve_columns, KeyBuilder, KeyedRow};
use crate::matcher::{index_rows, match_first_available, KeyIndex, PairMatchOutput};
use crate::model::{
    Dataset, FieldMismatch, Mapping, MatchedEntry, RunStats, Scalar, Side, SideStats, UnmatchedEntry,
};
use crate::normalize::normalize_cell;
use crate::result::ResultSet;

/// The four stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    KeyDatasets,
    IndexCounterparty,
    Classify,
    Annotate,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::KeyDatasets, Stage::IndexCounterparty, Stage::Classify, Stage::Annotate];

    pub fn description(&self) -> &'static str {
        match self {
            Self::KeyDatasets => "Extracting key values",
            Self::IndexCounterparty => "Indexing counterparty rows",
            Self::Classify => "Finding common entries",
            Self::Annotate => "Generating reconciliation report",
        }
    }

    /// 1-based position, for "step n of 4" displays.
    pub fn ordinal(&self) -> usize {
        match self {
            Self::KeyDatasets => 1,
            Self::IndexCounterparty => 2,
            Self::Classify => 3,
            Self::Annotate => 4,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// A validated mapping bound to both datasets' header positions.
#[derive(Debug, Clone)]
pub struct RunPlan<'m> {
    mapping: &'m Mapping,
    columns_a: Vec<usize>,
    columns_b: Vec<usize>,
    keys_a: KeyBuilder,
    keys_b: KeyBuilder,
}

impl<'m> RunPlan<'m> {
    pub fn new(a: &Dataset, b: &Dataset, mapping: &'m Mapping) -> Result<Self, ReconError> {
        if !mapping.has_key_pair() {
            return Err(ReconError::EmptyMapping);
        }
        let columns_a = resolve_columns(a, mapping, Side::A)?;
        let columns_b = resolve_columns(b, mapping, Side::B)?;
        let keys_a = KeyBuilder::from_resolved(mapping, &columns_a, Side::A)?;
        let keys_b = KeyBuilder::from_resolved(mapping, &columns_b, Side::B)?;
        Ok(Self {
            mapping,
            columns_a,
            columns_b,
            keys_a,
            keys_b,
        })
    }

    pub fn mapping(&self) -> &Mapping {
        self.mapping
    }

    pub fn key_builder(&self, side: Side) -> &KeyBuilder {
        match side {
            Side::A => &self.keys_a,
            Side::B => &self.keys_b,
        }
    }

    /// Column of every mapping pair on `side`, in mapping order.
    pub fn columns(&self, side: Side) -> &[usize] {
        match side {
            Side::A => &self.columns_a,
            Side::B => &self.columns_b,
        }
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Keyable rows of one dataset plus row accounting.
#[derive(Debug, Clone)]
pub struct KeyedSide<'a> {
    pub side: Side,
    pub rows: Vec<KeyedRow<'a>>,
    pub stats: SideStats,
}

/// Stage 1: key every row, dropping unkeyable ones.
pub fn key_dataset<'a>(dataset: &'a Dataset, builder: &KeyBuilder) -> KeyedSide<'a> {
    let side = builder.side();
    let mut rows = Vec::with_capacity(dataset.rows.len());
    let mut unkeyable = 0;
    for (i, row) in dataset.rows.iter().enumerate() {
        match builder.build(row, i) {
            Some(keyed) => rows.push(keyed),
            None => unkeyable += 1,
        }
    }

    let short_rows = dataset.short_rows();
    if short_rows > 0 {
        log::warn!(
            "dataset {side}: {short_rows} row(s) shorter than the {} headers; missing cells read as empty",
            dataset.headers.len()
        );
    }
    log::debug!(
        "dataset {side}: {} rows, {} keyable, {} unkeyable",
        dataset.rows.len(),
        rows.len(),
        unkeyable
    );

    let stats = SideStats {
        rows: dataset.rows.len(),
        keyable: rows.len(),
        unkeyable,
        short_rows,
    };
    KeyedSide { side, rows, stats }
}

/// Stage 2: index the counterparty side.
pub fn index_side(keyed: &KeyedSide<'_>) -> KeyIndex {
    let index = index_rows(&keyed.rows);
    log::debug!(
        "dataset {}: {} distinct keys, {} duplicated",
        keyed.side,
        index.len(),
        index.duplicate_keys()
    );
    index
}

/// Stage 3: partition keyed rows into matched / only-in-A / only-in-B.
pub fn classify(a: &KeyedSide<'_>, b: &KeyedSide<'_>, b_index: &KeyIndex) -> PairMatchOutput {
    let out = match_first_available(&a.rows, &b.rows, b_index);
    log::debug!(
        "classified: {} matched, {} only in a, {} only in b",
        out.matched.len(),
        out.left_only.len(),
        out.right_only.len()
    );
    out
}

/// Stage 4: materialize entries and flag field mismatches on matched rows.
pub fn annotate(plan: &RunPlan<'_>, a: &KeyedSide<'_>, b: &KeyedSide<'_>, pairing: &PairMatchOutput) -> ResultSet {
    let matched = pairing
        .matched
        .iter()
        .map(|&(ai, bi)| {
            let ra = &a.rows[ai];
            let rb = &b.rows[bi];
            MatchedEntry {
                composite_key: ra.composite_key.clone(),
                index_a: ra.source_index,
                index_b: rb.source_index,
                row_a: ra.row.to_vec(),
                row_b: rb.row.to_vec(),
                mismatches: field_mismatches(plan, ra.row, rb.row),
            }
        })
        .collect();

    let only_in_a = unmatched(&a.rows, &pairing.left_only, Side::A);
    let only_in_b = unmatched(&b.rows, &pairing.right_only, Side::B);

    ResultSet::new(
        matched,
        only_in_a,
        only_in_b,
        RunStats {
            a: a.stats,
            b: b.stats,
        },
    )
}

/// Compare every mapped pair of a matched row pair by normalized value.
pub fn field_mismatches(plan: &RunPlan<'_>, row_a: &[Scalar], row_b: &[Scalar]) -> Vec<FieldMismatch> {
    plan.mapping()
        .pairs()
        .iter()
        .zip(plan.columns(Side::A).iter().zip(plan.columns(Side::B)))
        .filter_map(|(pair, (&ca, &cb))| {
            let value_a = normalize_cell(row_a, ca);
            let value_b = normalize_cell(row_b, cb);
            (value_a != value_b).then(|| FieldMismatch {
                pair_id: pair.id,
                source_key: pair.source_key.clone(),
                target_key: pair.target_key.clone(),
                value_a,
                value_b,
            })
        })
        .collect()
}

fn unmatched(rows: &[KeyedRow<'_>], positions: &[usize], origin: Side) -> Vec<UnmatchedEntry> {
    positions
        .iter()
        .map(|&i| {
            let r = &rows[i];
            UnmatchedEntry {
                composite_key: r.composite_key.clone(),
                origin,
                index: r.source_index,
                row: r.row.to_vec(),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Reconcile `a` against `b` on `mapping`. Configuration problems fail before any work.
pub fn reconcile(a: &Dataset, b: &Dataset, mapping: &Mapping) -> Result<ResultSet, ReconError> {
    reconcile_with_progress(a, b, mapping, |_| {})
}

/// As [`reconcile`], calling `progress` before each stage starts.
pub fn reconcile_with_progress(
    a: &Dataset,
    b: &Dataset,
    mapping: &Mapping,
    mut progress: impl FnMut(Stage),
) -> Result<ResultSet, ReconError> {
    let plan = RunPlan::new(a, b, mapping)?;

    progress(Stage::KeyDatasets);
    let keyed_a = key_dataset(a, plan.key_builder(Side::A));
    let keyed_b = key_dataset(b, plan.key_builder(Side::B));

    progress(Stage::IndexCounterparty);
    let b_index = index_side(&keyed_b);

    progress(Stage::Classify);
    let pairing = classify(&keyed_a, &keyed_b, &b_index);

    progress(Stage::Annotate);
    let result = annotate(&plan, &keyed_a, &keyed_b, &pairing);

    log::info!(
        "reconciled: {} matched, {} only in a, {} only in b",
        result.matched_count(),
        result.only_in_a_count(),
        result.only_in_b_count()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PairId, PairRole};

    fn dataset(headers: &[&str], rows: &[&[&str]]) -> Dataset {
        Dataset::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| Scalar::from(*c)).collect())
                .collect(),
        )
    }

    fn invoice_mapping() -> Mapping {
        let mut m = Mapping::new();
        m.push("Invoice No", "Bill No");
        m
    }

    #[test]
    fn gst_example() {
        let a = dataset(&["Invoice No", "GSTIN", "Value"], &[&["INV1", "29ABCDE1234F1Z5", "100"]]);
        let b = dataset(
            &["Bill No", "GST", "Amount"],
            &[&["INV1", "29ABCDE1234F1Z5", "100"], &["INV2", "29ABCDE1234F1Z5", "50"]],
        );
        let rs = reconcile(&a, &b, &invoice_mapping()).unwrap();
        assert_eq!(rs.matched_count(), 1);
        assert_eq!(rs.only_in_a_count(), 0);
        assert_eq!(rs.only_in_b_count(), 1);
        assert_eq!(rs.total(), 2);

        let m = &rs.matched()[0];
        assert_eq!(m.composite_key, "INV1");
        assert_eq!((m.index_a, m.index_b), (0, 0));
        assert!(m.mismatches.is_empty());

        assert_eq!(rs.only_in_b()[0].composite_key, "INV2");
        assert_eq!(rs.only_in_b()[0].origin, Side::B);
        assert_eq!(rs.only_in_b()[0].index, 1);
    }

    #[test]
    fn empty_a_makes_every_b_row_unmatched() {
        let a = dataset(&["Invoice No"], &[]);
        let b = dataset(&["Bill No"], &[&["1"], &["2"], &["3"]]);
        let rs = reconcile(&a, &b, &invoice_mapping()).unwrap();
        assert_eq!(rs.matched_count(), 0);
        assert_eq!(rs.only_in_a_count(), 0);
        assert_eq!(rs.only_in_b_count(), 3);
        let order: Vec<usize> = rs.only_in_b().iter().map(|e| e.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn empty_mapping_is_rejected_before_header_checks() {
        let a = dataset(&["x"], &[&["1"]]);
        let b = dataset(&["y"], &[&["1"]]);
        assert_eq!(reconcile(&a, &b, &Mapping::new()).unwrap_err(), ReconError::EmptyMapping);

        let mut compare_only = Mapping::new();
        compare_only.push_with_role("nope", "nope", PairRole::Compare);
        assert_eq!(reconcile(&a, &b, &compare_only).unwrap_err(), ReconError::EmptyMapping);
    }

    #[test]
    fn missing_compare_header_is_a_configuration_error() {
        let a = dataset(&["Invoice No"], &[&["1"]]);
        let b = dataset(&["Bill No"], &[&["1"]]);
        let mut m = invoice_mapping();
        m.push_with_role("Value", "Amount", PairRole::Compare);
        let err = reconcile(&a, &b, &m).unwrap_err();
        assert_eq!(
            err,
            ReconError::MissingHeader {
                side: Side::A,
                header: "Value".into()
            }
        );
    }

    #[test]
    fn unkeyable_rows_appear_nowhere() {
        let a = dataset(&["Invoice No"], &[&["INV1"], &[""], &["   "]]);
        let b = dataset(&["Bill No"], &[&[""], &["INV1"]]);
        let rs = reconcile(&a, &b, &invoice_mapping()).unwrap();
        assert_eq!(rs.total(), 1);
        assert_eq!(rs.stats().a.unkeyable, 2);
        assert_eq!(rs.stats().b.unkeyable, 1);
        assert_eq!(rs.stats().a.keyable, 1);
    }

    #[test]
    fn compare_pairs_report_mismatches() {
        let a = dataset(&["Invoice No", "Value"], &[&["INV1", "100"], &["INV2", "75"]]);
        let b = Dataset::new(
            vec!["Bill No".into(), "Amount".into()],
            vec![
                vec![Scalar::from("INV1"), Scalar::from(100.0)],
                vec![Scalar::from("INV2"), Scalar::from(70_i64)],
            ],
        );
        let mut m = invoice_mapping();
        let value = m.push_with_role("Value", "Amount", PairRole::Compare);
        let rs = reconcile(&a, &b, &m).unwrap();
        assert_eq!(rs.matched_count(), 2);
        assert!(rs.matched()[0].mismatches.is_empty(), "\"100\" vs 100.0 normalize equal");
        assert_eq!(
            rs.matched()[1].mismatches,
            vec![FieldMismatch {
                pair_id: value,
                source_key: "Value".into(),
                target_key: "Amount".into(),
                value_a: "75".into(),
                value_b: "70".into(),
            }]
        );
        assert_eq!(rs.summary().mismatches_by_pair[0].pair_id, PairId(2));
    }

    #[test]
    fn short_rows_are_padded_and_counted() {
        let a = Dataset::new(
            vec!["Invoice No".into(), "Value".into()],
            vec![vec![Scalar::from("INV1")]],
        );
        let b = dataset(&["Bill No", "Amount"], &[&["INV1", "10"]]);
        let mut m = invoice_mapping();
        m.push_with_role("Value", "Amount", PairRole::Compare);
        let rs = reconcile(&a, &b, &m).unwrap();
        assert_eq!(rs.stats().a.short_rows, 1);
        assert_eq!(rs.matched_count(), 1);
        let mm = &rs.matched()[0].mismatches[0];
        assert_eq!((mm.value_a.as_str(), mm.value_b.as_str()), ("", "10"));
    }

    #[test]
    fn duplicate_keys_pair_first_available() {
        let a = dataset(&["Invoice No", "Value"], &[&["K", "a1"], &["K", "a2"], &["K", "a3"]]);
        let b = dataset(&["Bill No", "Amount"], &[&["K", "b1"], &["K", "b2"]]);
        let rs = reconcile(&a, &b, &invoice_mapping()).unwrap();
        let pairs: Vec<(usize, usize)> = rs.matched().iter().map(|m| (m.index_a, m.index_b)).collect();
        assert_eq!(pairs, vec![(0, 0), (1, 1)]);
        assert_eq!(rs.only_in_a().len(), 1);
        assert_eq!(rs.only_in_a()[0].index, 2);
        assert!(rs.only_in_b().is_empty());
    }

    #[test]
    fn progress_reports_every_stage_in_order() {
        let a = dataset(&["Invoice No"], &[&["1"]]);
        let b = dataset(&["Bill No"], &[&["1"]]);
        let mut seen = Vec::new();
        reconcile_with_progress(&a, &b, &invoice_mapping(), |s| seen.push(s)).unwrap();
        assert_eq!(seen, Stage::ALL.to_vec());
        assert_eq!(Stage::Classify.ordinal(), 3);
        assert_eq!(Stage::Classify.to_string(), "Finding common entries");
    }

    #[test]
    fn no_progress_on_configuration_error() {
        let a = dataset(&["x"], &[]);
        let b = dataset(&["Bill No"], &[]);
        let mut seen = Vec::new();
        assert!(reconcile_with_progress(&a, &b, &invoice_mapping(), |s| seen.push(s)).is_err());
        assert!(seen.is_empty());
    }

    #[test]
    fn composite_keys_over_two_columns() {
        let a = dataset(
            &["Invoice No", "GSTIN"],
            &[&["INV1", "29AAA"], &["INV1", "27BBB"]],
        );
        let b = dataset(&["Bill No", "GST No"], &[&["INV1", "27BBB"]]);
        let mut m = Mapping::new();
        m.push("Invoice No", "Bill No");
        m.push("GSTIN", "GST No");
        let rs = reconcile(&a, &b, &m).unwrap();
        assert_eq!(rs.matched_count(), 1);
        assert_eq!(rs.matched()[0].index_a, 1);
        assert_eq!(rs.matched()[0].key_fields(), vec!["INV1", "27BBB"]);
        assert_eq!(rs.only_in_a()[0].index, 0);
    }
}
