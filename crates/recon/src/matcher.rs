use std::collections::HashMap;

use crate::key::KeyedRow;

/// Composite key → positions (into the keyed rows of one side) in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyIndex {
    positions: HashMap<String, Vec<usize>>,
}

impl KeyIndex {
    pub fn get(&self, key: &str) -> Option<&[usize]> {
        self.positions.get(key).map(Vec::as_slice)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Keys held by more than one row.
    pub fn duplicate_keys(&self) -> usize {
        self.positions.values().filter(|v| v.len() > 1).count()
    }
}

/// Index keyed rows by composite key, preserving row order within each key.
pub fn index_rows(rows: &[KeyedRow<'_>]) -> KeyIndex {
    let mut positions: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, r) in rows.iter().enumerate() {
        positions.entry(r.composite_key.clone()).or_default().push(i);
    }
    KeyIndex { positions }
}

/// Outcome of pairing, as positions into the keyed rows of each side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairMatchOutput {
    /// (a, b) in A row order.
    pub matched: Vec<(usize, usize)>,
    pub left_only: Vec<usize>,
    pub right_only: Vec<usize>,
}

/// First-available pairing: each A row takes the earliest B row with the
/// same key that is not yet paired. Every B row is paired at most once; A
/// rows left over once a key's B rows run out are unmatched.
pub fn match_first_available(left: &[KeyedRow<'_>], right: &[KeyedRow<'_>], right_index: &KeyIndex) -> PairMatchOutput {
    let mut next_free: HashMap<&str, usize> = HashMap::new();
    let mut right_used = vec![false; right.len()];
    let mut matched = Vec::new();
    let mut left_only = Vec::new();

    for (li, l) in left.iter().enumerate() {
        let candidate = right_index.get(&l.composite_key).and_then(|queue| {
            let cursor = next_free.entry(l.composite_key.as_str()).or_insert(0);
            let ri = queue.get(*cursor).copied()?;
            *cursor += 1;
            Some(ri)
        });

        match candidate {
            Some(ri) => {
                right_used[ri] = true;
                matched.push((li, ri));
            }
            None => left_only.push(li),
        }
    }

    let right_only = right_used
        .iter()
        .enumerate()
        .filter(|(_, used)| !**used)
        .map(|(i, _)| i)
        .collect();

    PairMatchOutput {
        matched,
        left_only,
        right_only,
    }
}
