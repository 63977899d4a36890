use std::fmt;

use crate::model::Side;

/// Every engine failure is a configuration problem: the run never starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// Mapping has no key pair to build composite keys from.
    EmptyMapping,
    /// A mapped header does not exist in its dataset.
    MissingHeader { side: Side, header: String },
    /// A mapped header occurs more than once in its dataset.
    AmbiguousHeader { side: Side, header: String, count: usize },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (missing file, duplicate label, etc.).
    ConfigValidation(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMapping => write!(f, "mapping has no key column pair"),
            Self::MissingHeader { side, header } => {
                write!(f, "dataset {side}: mapped column '{header}' not found")
            }
            Self::AmbiguousHeader { side, header, count } => {
                write!(f, "dataset {side}: mapped column '{header}' appears {count} times")
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
