//! Core types and configuration for the IATI flows pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Input records (activities, transactions) and output rows
//! - Configuration structures
//! - The lookup collaborator (names, currency conversion)
//! - Common error types

pub mod config;
pub mod error;
pub mod lookups;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use lookups::{LookupTables, Lookups};
pub use types::*;
