use std::borrow::Cow;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Cells + datasets
// ---------------------------------------------------------------------------

/// A single cell as delivered by a dataset loader.
///
/// Spreadsheet columns routinely mix strings, numbers and dates, so cells are
/// kept in their loaded form and only compared through [`crate::normalize`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    #[default]
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<NaiveDateTime> for Scalar {
    fn from(dt: NaiveDateTime) -> Self {
        Self::DateTime(dt)
    }
}

static EMPTY_CELL: Scalar = Scalar::Empty;

/// Cell at `col`, reading past the end of a short row as [`Scalar::Empty`].
pub fn cell_at(row: &[Scalar], col: usize) -> &Scalar {
    row.get(col).unwrap_or(&EMPTY_CELL)
}

/// A rectangular-ish table: header names plus positional rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Scalar>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows with fewer cells than there are headers.
    pub fn short_rows(&self) -> usize {
        let width = self.headers.len();
        self.rows.iter().filter(|r| r.len() < width).count()
    }
}

/// Which of the two datasets a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    A,
    B,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "a"),
            Self::B => write!(f, "b"),
        }
    }
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Identifier of a column pair, unique within its mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairId(pub u32);

impl std::fmt::Display for PairId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key pairs build the composite key; compare pairs are only checked on matched rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairRole {
    #[default]
    Key,
    Compare,
}

impl std::fmt::Display for PairRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key => write!(f, "key"),
            Self::Compare => write!(f, "compare"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnPair {
    pub id: PairId,
    /// Header in dataset A.
    pub source_key: String,
    /// Header in dataset B.
    pub target_key: String,
    pub role: PairRole,
}

impl ColumnPair {
    pub fn header(&self, side: Side) -> &str {
        match side {
            Side::A => &self.source_key,
            Side::B => &self.target_key,
        }
    }

    pub fn is_key(&self) -> bool {
        self.role == PairRole::Key
    }

    /// Both headers chosen.
    pub fn is_complete(&self) -> bool {
        !self.source_key.is_empty() && !self.target_key.is_empty()
    }
}

/// Ordered column correspondences. Key pair order is composite-key field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Mapping {
    pairs: Vec<ColumnPair>,
    #[serde(skip)]
    last_id: u32,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key pair.
    pub fn push(&mut self, source: impl Into<String>, target: impl Into<String>) -> PairId {
        self.push_with_role(source, target, PairRole::Key)
    }

    pub fn push_with_role(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        role: PairRole,
    ) -> PairId {
        self.last_id += 1;
        let id = PairId(self.last_id);
        self.pairs.push(ColumnPair {
            id,
            source_key: source.into(),
            target_key: target.into(),
            role,
        });
        id
    }

    pub fn remove(&mut self, id: PairId) -> bool {
        let before = self.pairs.len();
        self.pairs.retain(|p| p.id != id);
        self.pairs.len() != before
    }

    pub fn set_source(&mut self, id: PairId, header: impl Into<String>) -> bool {
        match self.pairs.iter_mut().find(|p| p.id == id) {
            Some(pair) => {
                pair.source_key = header.into();
                true
            }
            None => false,
        }
    }

    pub fn set_target(&mut self, id: PairId, header: impl Into<String>) -> bool {
        match self.pairs.iter_mut().find(|p| p.id == id) {
            Some(pair) => {
                pair.target_key = header.into();
                true
            }
            None => false,
        }
    }

    /// Drop pairs where either header is still unchosen.
    pub fn retain_complete(&mut self) {
        self.pairs.retain(ColumnPair::is_complete);
    }

    pub fn get(&self, id: PairId) -> Option<&ColumnPair> {
        self.pairs.iter().find(|p| p.id == id)
    }

    pub fn pairs(&self) -> &[ColumnPair] {
        &self.pairs
    }

    pub fn key_pairs(&self) -> impl Iterator<Item = &ColumnPair> {
        self.pairs.iter().filter(|p| p.is_key())
    }

    pub fn has_key_pair(&self) -> bool {
        self.key_pairs().next().is_some()
    }

    /// True once the user has chosen any header on any pair.
    pub fn has_selection(&self) -> bool {
        self.pairs
            .iter()
            .any(|p| !p.source_key.is_empty() || !p.target_key.is_empty())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Classified output
// ---------------------------------------------------------------------------

/// A mapped column whose normalized values disagree on a matched pair of rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMismatch {
    pub pair_id: PairId,
    pub source_key: String,
    pub target_key: String,
    pub value_a: String,
    pub value_b: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedEntry {
    pub composite_key: String,
    pub index_a: usize,
    pub index_b: usize,
    pub row_a: Vec<Scalar>,
    pub row_b: Vec<Scalar>,
    pub mismatches: Vec<FieldMismatch>,
}

impl MatchedEntry {
    pub fn has_mismatches(&self) -> bool {
        !self.mismatches.is_empty()
    }

    pub fn key_fields(&self) -> Vec<Cow<'_, str>> {
        crate::key::split_key(&self.composite_key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedEntry {
    pub composite_key: String,
    pub origin: Side,
    pub index: usize,
    pub row: Vec<Scalar>,
}

impl UnmatchedEntry {
    pub fn key_fields(&self) -> Vec<Cow<'_, str>> {
        crate::key::split_key(&self.composite_key)
    }
}

/// Row accounting for one side of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SideStats {
    pub rows: usize,
    pub keyable: usize,
    pub unkeyable: usize,
    pub short_rows: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub a: SideStats,
    pub b: SideStats,
}
