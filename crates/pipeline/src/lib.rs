//! Batch driver for the IATI flows pipeline.
//!
//! This crate provides:
//! - The run loop (deduplication, secondary reporters, malformed records)
//! - Flow aggregation and output sorting
//! - Run statistics
//! - CSV and JSON writers

pub mod driver;
pub mod stats;
pub mod writer;

pub use driver::{Pipeline, PipelineOutput};
pub use stats::RunStats;
pub use writer::{write_output, write_outputs};
