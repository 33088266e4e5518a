//! Allocation engine.
//!
//! Bundles the configuration, the lookup collaborator and the record-level
//! calculators shared by every activity of a run.

use crate::activity::{Activity, ActivityOutput};
use iati_core::{ActivityRecord, Config, Lookups, Month, Result};
use iati_ingestion::{SplitCalculator, StrictnessClassifier};

/// Allocation engine.
pub struct AllocationEngine<'a> {
    config: &'a Config,
    lookups: &'a dyn Lookups,
    /// Split calculator.
    splits: SplitCalculator,
    /// Strictness classifier.
    strictness: StrictnessClassifier,
}

impl<'a> AllocationEngine<'a> {
    /// Create a new engine from configuration and lookups.
    pub fn new(config: &'a Config, lookups: &'a dyn Lookups) -> Self {
        Self {
            config,
            lookups,
            splits: SplitCalculator::new(&config.splits),
            strictness: StrictnessClassifier::new(&config.strictness),
        }
    }

    /// Produce the transaction and flow rows of one activity.
    pub fn process_activity(&self, record: &ActivityRecord, this_month: Month) -> Result<ActivityOutput> {
        let activity = Activity::new(self, record)?;
        Ok(activity.process(self, this_month))
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub fn lookups(&self) -> &'a dyn Lookups {
        self.lookups
    }

    pub fn splits(&self) -> &SplitCalculator {
        &self.splits
    }

    pub fn strictness(&self) -> &StrictnessClassifier {
        &self.strictness
    }
}
