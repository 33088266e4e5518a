//! Pipeline driver.
//!
//! Runs the allocation engine over a batch of activities, skipping repeats,
//! secondary reporters and malformed records, then sorts the transaction
//! table and aggregates the flow table.

use crate::stats::RunStats;
use iati_allocation::AllocationEngine;
use iati_core::{ActivityRecord, Config, FlowKey, FlowRow, Lookups, Month, Result, TransactionRow};
use iati_ingestion::{validate_activity, DedupContext};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Output of one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    /// Transaction rows, sorted by full row.
    pub transactions: Vec<TransactionRow>,
    /// Flow rows, summed per key and sorted by key.
    pub flows: Vec<FlowRow>,
    pub stats: RunStats,
}

/// Pipeline driver.
pub struct Pipeline<'a> {
    engine: AllocationEngine<'a>,
}

impl<'a> Pipeline<'a> {
    /// Create a new pipeline.
    pub fn new(config: &'a Config, lookups: &'a dyn Lookups) -> Self {
        Self {
            engine: AllocationEngine::new(config, lookups),
        }
    }

    /// Run over `activities` with a fresh deduplication context.
    pub fn run(&self, activities: &[ActivityRecord], this_month: Month) -> Result<PipelineOutput> {
        let mut dedup = DedupContext::new();
        self.run_with(activities, this_month, &mut dedup)
    }

    /// Run over `activities`, skipping identifiers already in `dedup`.
    ///
    /// Any error from the engine aborts the run; no partial output is returned.
    pub fn run_with(
        &self,
        activities: &[ActivityRecord],
        this_month: Month,
        dedup: &mut DedupContext,
    ) -> Result<PipelineOutput> {
        let mut stats = RunStats {
            activities_seen: activities.len(),
            ..Default::default()
        };
        let mut transactions = Vec::new();
        let mut flows: BTreeMap<FlowKey, i64> = BTreeMap::new();

        for record in activities {
            if let Err(e) = validate_activity(record) {
                warn!("Skipping malformed activity: {}", e);
                stats.invalid_activities += 1;
                continue;
            }
            if !dedup.first_sighting(&record.identifier) {
                debug!(activity = %record.identifier, "duplicate activity");
                stats.duplicate_activities += 1;
                continue;
            }
            if record.secondary_reporter {
                debug!(activity = %record.identifier, "secondary reporter");
                stats.secondary_reporter_activities += 1;
                continue;
            }

            let output = self.engine.process_activity(record, this_month)?;
            stats.activities_processed += 1;
            stats.skipped_transactions += output.skipped;
            stats.flow_contributions += output.flows.len();
            transactions.extend(output.transactions);
            for flow in output.flows {
                *flows.entry(flow.key).or_insert(0) += flow.total_money;
            }
        }

        transactions.sort();
        let flows: Vec<FlowRow> = flows
            .into_iter()
            .map(|(key, total_money)| FlowRow { key, total_money })
            .collect();

        stats.transactions_emitted = transactions.len();
        stats.flows_emitted = flows.len();

        Ok(PipelineOutput {
            transactions,
            flows,
            stats,
        })
    }
}
