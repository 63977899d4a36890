//! `ledgermatch-recon`: two-ledger reconciliation engine.
//!
//! Pure engine crate: receives loaded datasets and a column mapping, returns
//! rows classified as matched / only in A / only in B, with per-column
//! mismatches on matched rows. No CLI or IO dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod key;
pub mod mapper;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod result;

pub use config::ReconConfig;
pub use engine::{reconcile, reconcile_with_progress, Stage};
pub use error::ReconError;
pub use mapper::{FieldCategory, HeuristicMapper, MappingStrategy};
pub use model::{ColumnPair, Dataset, Mapping, MatchedEntry, PairId, PairRole, Scalar, Side, UnmatchedEntry};
pub use normalize::normalize;
pub use result::{ReconReport, ReconSummary, ResultSet};
