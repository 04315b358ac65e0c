//! Track reconciliation library - merges an authoritative base collection of
//! track records with a freshly classified incoming collection.
//!
//! The engine (`normalize`, `scoring`, `identity`, `assign`, `resolve`,
//! `report`, driven by `reconcile`) is pure and synchronous. `dataset`,
//! `output`, `progress` and `safety` are the I/O edge used by the binaries.

pub mod assign;
pub mod config;
pub mod dataset;
pub mod error;
pub mod identity;
pub mod models;
pub mod normalize;
pub mod output;
pub mod progress;
pub mod reconcile;
pub mod report;
pub mod resolve;
pub mod safety;
pub mod scoring;

pub use config::{MatchProfile, MergeConfig, Thresholds};
pub use error::{ConfigError, Error, Result};
pub use models::{CorrectionFlags, MatchResult, MatchType, MergedRecord, Provenance, Resolved, TrackRecord};
pub use reconcile::{reconcile, Reconciler, Reconciliation};
pub use report::MergeReport;
