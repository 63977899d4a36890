//! Header-driven mapping suggestions.
//!
//! A [`HeuristicMapper`] walks an ordered list of field categories and pairs
//! the first unused header on each side whose lowercase text contains one of
//! the category's fragments. The vocabulary is plain constructor input, so it
//! can be localized or replaced per run.

use serde::{Deserialize, Serialize};

use crate::model::{Mapping, PairRole};

/// A semantic field (invoice number, tax id, ...) and the header fragments that identify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCategory {
    pub name: String,
    pub fragments: Vec<String>,
}

impl FieldCategory {
    /// Fragments are trimmed, lowercased and de-duplicated; empty ones are dropped
    /// since they would match every header.
    pub fn new<I, S>(name: impl Into<String>, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut clean: Vec<String> = Vec::new();
        for f in fragments {
            let f = f.as_ref().trim().to_lowercase();
            if !f.is_empty() && !clean.contains(&f) {
                clean.push(f);
            }
        }
        Self {
            name: name.into(),
            fragments: clean,
        }
    }

    fn matches(&self, header_lower: &str) -> bool {
        self.fragments.iter().any(|f| header_lower.contains(f.as_str()))
    }
}

/// Vocabulary for GSTR-2B vs purchase register reconciliation, in priority order.
pub fn default_categories() -> Vec<FieldCategory> {
    vec![
        FieldCategory::new(
            "invoice",
            ["invoice no", "invoice number", "bill no", "bill number", "document number"],
        ),
        FieldCategory::new("gstin", ["gstin", "gst no", "gst number"]),
        FieldCategory::new("date", ["invoice date", "bill date", "document date"]),
        FieldCategory::new("value", ["taxable value", "invoice value", "value", "amount"]),
        FieldCategory::new("vendor", ["vendor", "supplier", "party name", "customer"]),
    ]
}

/// Anything that can propose a mapping from two header lists.
pub trait MappingStrategy {
    /// Deterministic for fixed inputs; returns an empty mapping when nothing pairs up.
    fn suggest(&self, headers_a: &[String], headers_b: &[String]) -> Mapping;

    /// Replace `mapping` with a suggestion, unless the user has already chosen
    /// columns or nothing could be suggested. Returns whether `mapping` changed.
    fn suggest_into(&self, mapping: &mut Mapping, headers_a: &[String], headers_b: &[String]) -> bool {
        if mapping.has_selection() {
            return false;
        }
        let suggested = self.suggest(headers_a, headers_b);
        if suggested.is_empty() {
            return false;
        }
        *mapping = suggested;
        true
    }

    /// Give a mapping without key pairs its key columns from a suggestion.
    ///
    /// Pairs already in `mapping` (compare pairs) stay as they are; a suggested
    /// pair reusing one of their headers is skipped. Returns the number of key
    /// pairs added, zero when `mapping` already has one.
    fn fill_key_pairs(&self, mapping: &mut Mapping, headers_a: &[String], headers_b: &[String]) -> usize {
        if mapping.has_key_pair() {
            return 0;
        }
        let mut added = 0;
        for pair in self.suggest(headers_a, headers_b).pairs() {
            let taken = mapping
                .pairs()
                .iter()
                .any(|p| p.source_key == pair.source_key || p.target_key == pair.target_key);
            if taken {
                continue;
            }
            log::debug!("key pair '{}' = '{}'", pair.source_key, pair.target_key);
            mapping.push_with_role(pair.source_key.clone(), pair.target_key.clone(), PairRole::Key);
            added += 1;
        }
        added
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicMapper {
    categories: Vec<FieldCategory>,
}

impl HeuristicMapper {
    pub fn new(categories: Vec<FieldCategory>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &[FieldCategory] {
        &self.categories
    }
}

impl Default for HeuristicMapper {
    fn default() -> Self {
        Self::new(default_categories())
    }
}

impl MappingStrategy for HeuristicMapper {
    fn suggest(&self, headers_a: &[String], headers_b: &[String]) -> Mapping {
        let lower_a: Vec<String> = headers_a.iter().map(|h| h.to_lowercase()).collect();
        let lower_b: Vec<String> = headers_b.iter().map(|h| h.to_lowercase()).collect();
        let mut used_a = vec![false; headers_a.len()];
        let mut used_b = vec![false; headers_b.len()];

        let mut mapping = Mapping::new();
        for category in &self.categories {
            let hit_a = first_unused_match(&lower_a, &used_a, category);
            let hit_b = first_unused_match(&lower_b, &used_b, category);
            if let (Some(ia), Some(ib)) = (hit_a, hit_b) {
                used_a[ia] = true;
                used_b[ib] = true;
                log::debug!(
                    "suggest: category '{}' pairs '{}' with '{}'",
                    category.name,
                    headers_a[ia],
                    headers_b[ib]
                );
                mapping.push(headers_a[ia].clone(), headers_b[ib].clone());
            }
        }
        mapping
    }
}

fn first_unused_match(lower: &[String], used: &[bool], category: &FieldCategory) -> Option<usize> {
    lower
        .iter()
        .enumerate()
        .find(|(i, h)| !used[*i] && category.matches(h))
        .map(|(i, _)| i)
}
