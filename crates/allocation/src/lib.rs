//! Value allocation for the IATI flows pipeline.
//!
//! This crate handles:
//! - Transaction valuation, month window and flag inheritance
//! - Net-new-money factoring per activity
//! - Fan-out of transactions over country and sector splits

pub mod activity;
pub mod engine;
pub mod factors;
pub mod transaction;

pub use activity::{Activity, ActivityOutput};
pub use engine::AllocationEngine;
pub use factors::{ClassTotals, NetMoneyFactors};
pub use transaction::{ActivityContext, Transaction};
