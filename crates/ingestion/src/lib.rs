//! Record-level analysis for the IATI flows pipeline.
//!
//! This crate handles:
//! - Country and sector percentage splits
//! - COVID-19 strictness classification
//! - Activity deduplication within a run
//! - Boundary validation of input records

pub mod dedup;
pub mod splits;
pub mod strictness;
pub mod validation;

pub use dedup::DedupContext;
pub use splits::{SplitCalculator, SplitSource, Splits};
pub use strictness::{StrictnessClassifier, StrictnessSignals};
pub use validation::validate_activity;
