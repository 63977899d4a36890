use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{MatchedEntry, PairId, RunStats, UnmatchedEntry};

/// Immutable outcome of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    matched: Vec<MatchedEntry>,
    only_in_a: Vec<UnmatchedEntry>,
    only_in_b: Vec<UnmatchedEntry>,
    stats: RunStats,
}

impl ResultSet {
    pub(crate) fn new(
        matched: Vec<MatchedEntry>,
        only_in_a: Vec<UnmatchedEntry>,
        only_in_b: Vec<UnmatchedEntry>,
        stats: RunStats,
    ) -> Self {
        Self {
            matched,
            only_in_a,
            only_in_b,
            stats,
        }
    }

    pub fn matched(&self) -> &[MatchedEntry] {
        &self.matched
    }

    pub fn only_in_a(&self) -> &[UnmatchedEntry] {
        &self.only_in_a
    }

    pub fn only_in_b(&self) -> &[UnmatchedEntry] {
        &self.only_in_b
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn matched_count(&self) -> usize {
        self.matched.len()
    }

    pub fn only_in_a_count(&self) -> usize {
        self.only_in_a.len()
    }

    pub fn only_in_b_count(&self) -> usize {
        self.only_in_b.len()
    }

    pub fn total(&self) -> usize {
        self.matched_count() + self.only_in_a_count() + self.only_in_b_count()
    }

    /// Matched entries carrying at least one field mismatch.
    pub fn mismatched(&self) -> impl Iterator<Item = &MatchedEntry> {
        self.matched.iter().filter(|m| m.has_mismatches())
    }

    /// Everything reconciled: nothing unmatched and no field disagrees.
    pub fn is_clean(&self) -> bool {
        self.only_in_a.is_empty() && self.only_in_b.is_empty() && self.mismatched().next().is_none()
    }

    pub fn summary(&self) -> ReconSummary {
        compute_summary(self)
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairMismatchCount {
    pub pair_id: PairId,
    pub source_key: String,
    pub target_key: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub total: usize,
    pub matched: usize,
    pub only_in_a: usize,
    pub only_in_b: usize,
    pub mismatched_rows: usize,
    pub field_mismatches: usize,
    pub mismatches_by_pair: Vec<PairMismatchCount>,
    pub stats: RunStats,
}

/// Compute summary statistics from a result set.
pub fn compute_summary(result: &ResultSet) -> ReconSummary {
    let mut by_pair: BTreeMap<PairId, PairMismatchCount> = BTreeMap::new();
    let mut mismatched_rows = 0;
    let mut field_mismatches = 0;

    for m in result.mismatched() {
        mismatched_rows += 1;
        for fm in &m.mismatches {
            field_mismatches += 1;
            by_pair
                .entry(fm.pair_id)
                .or_insert_with(|| PairMismatchCount {
                    pair_id: fm.pair_id,
                    source_key: fm.source_key.clone(),
                    target_key: fm.target_key.clone(),
                    count: 0,
                })
                .count += 1;
        }
    }

    ReconSummary {
        total: result.total(),
        matched: result.matched_count(),
        only_in_a: result.only_in_a_count(),
        only_in_b: result.only_in_b_count(),
        mismatched_rows,
        field_mismatches,
        mismatches_by_pair: by_pair.into_values().collect(),
        stats: result.stats,
    }
}

// ---------------------------------------------------------------------------
// Report (JSON envelope)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub name: String,
    pub label_a: String,
    pub label_b: String,
    pub headers_a: Vec<String>,
    pub headers_b: Vec<String>,
    pub engine_version: String,
    pub run_at: String,
}

/// What exporters and `--json` consumers receive.
#[derive(Debug, Clone, Serialize)]
pub struct ReconReport<'a> {
    pub meta: ReconMeta,
    pub mapping: &'a crate::model::Mapping,
    pub summary: ReconSummary,
    pub result: &'a ResultSet,
}

impl<'a> ReconReport<'a> {
    pub fn new(meta: ReconMeta, mapping: &'a crate::model::Mapping, result: &'a ResultSet) -> Self {
        Self {
            meta,
            mapping,
            summary: result.summary(),
            result,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl ReconMeta {
    pub fn now(
        name: impl Into<String>,
        label_a: impl Into<String>,
        label_b: impl Into<String>,
        headers_a: &[String],
        headers_b: &[String],
    ) -> Self {
        Self {
            name: name.into(),
            label_a: label_a.into(),
            label_b: label_b.into(),
            headers_a: headers_a.to_vec(),
            headers_b: headers_b.to_vec(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
