//! Run statistics.

use tracing::info;

/// Counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Activity records handed to the run.
    pub activities_seen: usize,
    /// Activities that produced rows (or could have).
    pub activities_processed: usize,
    /// Repeated identifiers skipped.
    pub duplicate_activities: usize,
    /// Activities from secondary reporters skipped.
    pub secondary_reporter_activities: usize,
    /// Activities rejected at the input boundary.
    pub invalid_activities: usize,
    /// Transaction rows in the output.
    pub transactions_emitted: usize,
    /// Flow rows before aggregation.
    pub flow_contributions: usize,
    /// Flow rows in the output, after aggregation.
    pub flows_emitted: usize,
    /// Transactions excluded from the output.
    pub skipped_transactions: usize,
}

impl RunStats {
    /// Log the totals.
    pub fn log(&self) {
        info!("Processed {} flows", self.flows_emitted);
        info!("Processed {} transactions", self.transactions_emitted);
        info!("Skipped {} transactions", self.skipped_transactions);
        info!(
            processed = self.activities_processed,
            duplicates = self.duplicate_activities,
            secondary = self.secondary_reporter_activities,
            invalid = self.invalid_activities,
            "activities of {}",
            self.activities_seen
        );
    }
}
