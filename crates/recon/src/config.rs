use std::collections::HashSet;

use serde::Deserialize;

use crate::error::ReconError;
use crate::mapper::{default_categories, FieldCategory, HeuristicMapper, MappingStrategy};
use crate::model::{Mapping, PairRole, Side};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    /// Suggest a mapping from headers when `pairs` is empty.
    #[serde(default)]
    pub auto_map: bool,
    pub sides: SidesConfig,
    #[serde(default)]
    pub pairs: Vec<PairConfig>,
    /// Replaces the built-in mapper vocabulary when present.
    #[serde(default)]
    pub categories: Option<Vec<CategoryConfig>>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SidesConfig {
    pub a: SideConfig,
    pub b: SideConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SideConfig {
    #[serde(default)]
    pub label: Option<String>,
    /// Path relative to the config file.
    pub file: String,
    /// Workbook sheet; first sheet when absent. Ignored for CSV.
    #[serde(default)]
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairConfig {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub role: PairRole,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub fragments: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub xlsx: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
}

/// Label used when a side has none configured.
pub fn default_label(side: Side) -> &'static str {
    match side {
        Side::A => "Dataset A",
        Side::B => "Dataset B",
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        for side in [Side::A, Side::B] {
            if self.side(side).file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("sides.{side}: file is empty")));
            }
        }

        if self.label(Side::A) == self.label(Side::B) {
            return Err(ReconError::ConfigValidation(format!(
                "both sides are labelled '{}'",
                self.label(Side::A)
            )));
        }

        for (i, pair) in self.pairs.iter().enumerate() {
            if pair.source.trim().is_empty() || pair.target.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "pairs[{i}]: source and target must both be set"
                )));
            }
        }

        let has_key = self.pairs.iter().any(|p| p.role == PairRole::Key);
        if !has_key && !self.auto_map {
            return Err(ReconError::ConfigValidation(
                "at least one key pair is required (or set auto_map = true)".into(),
            ));
        }

        if let Some(ref categories) = self.categories {
            let mut seen = HashSet::new();
            for c in categories {
                if !seen.insert(c.name.as_str()) {
                    return Err(ReconError::ConfigValidation(format!(
                        "category '{}' is defined twice",
                        c.name
                    )));
                }
                if c.fragments.iter().all(|f| f.trim().is_empty()) {
                    return Err(ReconError::ConfigValidation(format!(
                        "category '{}' has no fragments",
                        c.name
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn side(&self, side: Side) -> &SideConfig {
        match side {
            Side::A => &self.sides.a,
            Side::B => &self.sides.b,
        }
    }

    pub fn label(&self, side: Side) -> &str {
        self.side(side)
            .label
            .as_deref()
            .unwrap_or_else(|| default_label(side))
    }

    /// The configured pairs, in file order.
    pub fn mapping(&self) -> Mapping {
        let mut mapping = Mapping::new();
        for p in &self.pairs {
            mapping.push_with_role(p.source.clone(), p.target.clone(), p.role);
        }
        mapping
    }

    pub fn mapper(&self) -> HeuristicMapper {
        match self.categories {
            Some(ref categories) => HeuristicMapper::new(
                categories
                    .iter()
                    .map(|c| FieldCategory::new(c.name.clone(), &c.fragments))
                    .collect(),
            ),
            None => HeuristicMapper::new(default_categories()),
        }
    }

    /// Configured mapping. With `auto_map` on and no configured key pair, key
    /// pairs are suggested from the headers; configured compare pairs are kept.
    pub fn resolve_mapping(&self, headers_a: &[String], headers_b: &[String]) -> Result<Mapping, ReconError> {
        let mut mapping = self.mapping();
        if self.auto_map {
            let added = self.mapper().fill_key_pairs(&mut mapping, headers_a, headers_b);
            if added > 0 {
                log::info!("auto-mapped {added} key pair(s)");
            }
        }
        if !mapping.has_key_pair() {
            return Err(ReconError::EmptyMapping);
        }
        Ok(mapping)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
