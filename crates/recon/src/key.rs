use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::ReconError;
use crate::model::{cell_at, Dataset, Mapping, Scalar, Side};
use crate::normalize::normalize;

/// Joins key fields.
pub const KEY_SEPARATOR: char = '\u{1f}';

/// Prefixes a literal separator or escape inside a field, so distinct field
/// lists always produce distinct keys.
pub const KEY_ESCAPE: char = '\u{1b}';

/// A row that produced a full composite key. Borrows its row for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedRow<'a> {
    pub composite_key: String,
    pub row: &'a [Scalar],
    pub source_index: usize,
}

/// Resolve every pair of `mapping` to a column position on `side`, in mapping order.
pub fn resolve_columns(dataset: &Dataset, mapping: &Mapping, side: Side) -> Result<Vec<usize>, ReconError> {
    let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, h) in dataset.headers.iter().enumerate() {
        positions.entry(h.as_str()).or_default().push(i);
    }

    mapping
        .pairs()
        .iter()
        .map(|pair| {
            let header = pair.header(side);
            match positions.get(header).map(Vec::as_slice) {
                None | Some([]) => Err(ReconError::MissingHeader {
                    side,
                    header: header.to_string(),
                }),
                Some([col]) => Ok(*col),
                Some(cols) => Err(ReconError::AmbiguousHeader {
                    side,
                    header: header.to_string(),
                    count: cols.len(),
                }),
            }
        })
        .collect()
}

/// Builds composite keys for the rows of one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    side: Side,
    key_columns: Vec<usize>,
}

impl KeyBuilder {
    /// Fails fast when the mapping has no key pair or a key header is absent.
    pub fn new(dataset: &Dataset, mapping: &Mapping, side: Side) -> Result<Self, ReconError> {
        let columns = resolve_columns(dataset, mapping, side)?;
        Self::from_resolved(mapping, &columns, side)
    }

    /// `columns` must come from [`resolve_columns`] for the same mapping.
    pub fn from_resolved(mapping: &Mapping, columns: &[usize], side: Side) -> Result<Self, ReconError> {
        let key_columns: Vec<usize> = mapping
            .pairs()
            .iter()
            .zip(columns)
            .filter(|(pair, _)| pair.is_key())
            .map(|(_, col)| *col)
            .collect();
        if key_columns.is_empty() {
            return Err(ReconError::EmptyMapping);
        }
        Ok(Self { side, key_columns })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn key_columns(&self) -> &[usize] {
        &self.key_columns
    }

    /// `None` when any key field normalizes to empty: the row is unkeyable.
    pub fn build<'a>(&self, row: &'a [Scalar], source_index: usize) -> Option<KeyedRow<'a>> {
        let mut key = String::new();
        for (i, &col) in self.key_columns.iter().enumerate() {
            let field = normalize(cell_at(row, col));
            if field.is_empty() {
                return None;
            }
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }
            push_escaped(&mut key, &field);
        }
        Some(KeyedRow {
            composite_key: key,
            row,
            source_index,
        })
    }
}

fn push_escaped(key: &mut String, field: &str) {
    for c in field.chars() {
        if c == KEY_SEPARATOR || c == KEY_ESCAPE {
            key.push(KEY_ESCAPE);
        }
        key.push(c);
    }
}

/// Split a composite key back into its fields, in key pair order.
pub fn split_key(key: &str) -> Vec<Cow<'_, str>> {
    if !key.contains(KEY_ESCAPE) {
        return key.split(KEY_SEPARATOR).map(Cow::Borrowed).collect();
    }

    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = key.chars();
    while let Some(c) = chars.next() {
        match c {
            KEY_ESCAPE => current.extend(chars.next()),
            KEY_SEPARATOR => fields.push(Cow::Owned(std::mem::take(&mut current))),
            _ => current.push(c),
        }
    }
    fields.push(Cow::Owned(current));
    fields
}

/// Human-readable form of a composite key.
pub fn display_key(key: &str) -> String {
    split_key(key).join(" | ")
}
