//! Activity processing.
//!
//! Resolves the reporting organisation, strictness, default splits and
//! net-new-money factors of an activity once, then fans every valid
//! transaction out over its country and sector splits.

use crate::engine::AllocationEngine;
use crate::factors::{ClassTotals, NetMoneyFactors};
use crate::transaction::{ActivityContext, Transaction};
use iati_core::{ActivityRecord, Direction, FlowKey, FlowRow, Month, Result, TransactionRow};
use iati_ingestion::{Splits, StrictnessSignals};
use tracing::debug;

/// Rows produced by one activity.
#[derive(Debug, Clone, Default)]
pub struct ActivityOutput {
    /// One row per non-zero (transaction, country, sector) combination.
    pub transactions: Vec<TransactionRow>,
    /// One row per (transaction, country), before aggregation.
    pub flows: Vec<FlowRow>,
    /// Transactions excluded from the output.
    pub skipped: usize,
}

/// An activity with its activity-level values resolved.
#[derive(Debug, Clone)]
pub struct Activity<'a> {
    record: &'a ActivityRecord,
    org_name: String,
    org_type: String,
    strict: bool,
    /// Default country splits for transactions that declare none.
    country_splits: Splits,
    /// Default sector splits for transactions that declare none.
    sector_splits: Splits,
    factors: NetMoneyFactors,
    /// Valued transactions.
    transactions: Vec<Transaction<'a>>,
    /// Transactions that could not be valued.
    skipped: usize,
}

impl<'a> Activity<'a> {
    /// Resolve identity, strictness, default splits and net-new-money factors.
    pub fn new(engine: &AllocationEngine<'a>, record: &'a ActivityRecord) -> Result<Self> {
        let lookups = engine.lookups();
        let org_name = lookups.org_name(&record.reporting_org);
        let org_type = lookups.org_type(&record.reporting_org);
        let strict = engine
            .strictness()
            .is_strict(&StrictnessSignals::for_activity(record));

        let country_splits = engine.splits().make_country_splits(record, None);
        let sector_splits = engine.splits().make_sector_splits(record, None);

        let mut transactions = Vec::with_capacity(record.transactions.len());
        let mut skipped = 0;
        for raw in &record.transactions {
            match Transaction::get_transaction(
                engine.config(),
                lookups,
                raw,
                record.default_currency.as_deref(),
            )? {
                Some(transaction) => transactions.push(transaction),
                None => skipped += 1,
            }
        }

        // Totals span every valued transaction, whatever its month.
        let mut totals = ClassTotals::default();
        for transaction in &transactions {
            totals.add(transaction.class(), transaction.value());
        }
        let factors = NetMoneyFactors::from_totals(&totals);

        Ok(Self {
            record,
            org_name,
            org_type,
            strict,
            country_splits,
            sector_splits,
            factors,
            transactions,
            skipped,
        })
    }

    /// Fan the transactions out into transaction and flow rows.
    pub fn process(self, engine: &AllocationEngine<'a>, this_month: Month) -> ActivityOutput {
        let lookups = engine.lookups();
        let window_start = engine.config().window.start_month;
        let context = ActivityContext {
            factors: self.factors,
            humanitarian: self.record.humanitarian,
            strict: self.strict,
        };
        let flows_allowed = self.org_name != lookups.default_org();

        let mut output = ActivityOutput {
            skipped: self.skipped,
            ..Default::default()
        };

        for mut transaction in self.transactions {
            if !transaction.process(window_start, this_month, &context, engine.strictness()) {
                output.skipped += 1;
                continue;
            }

            let value = transaction.value();
            let net_value = transaction.net_value();
            let humanitarian = u8::from(transaction.is_humanitarian());
            let strict = u8::from(transaction.is_strict());
            let classification = transaction.classification();

            let country_splits = engine
                .splits()
                .make_country_splits(transaction.record(), Some(&self.country_splits));
            let sector_splits = engine
                .splits()
                .make_sector_splits(transaction.record(), Some(&self.sector_splits));

            let (provider, receiver) = transaction.provider_receiver(lookups);
            let counterparty = match transaction.direction() {
                Direction::Incoming => &provider,
                Direction::Outgoing => &receiver,
            };
            let emit_flow = flows_allowed
                && *counterparty != self.org_name
                && counterparty != lookups.default_org();

            for (country, country_share) in country_splits.iter() {
                if emit_flow {
                    output.flows.push(FlowRow {
                        key: FlowKey {
                            org_name: self.org_name.clone(),
                            org_type: self.org_type.clone(),
                            provider: provider.clone(),
                            receiver: receiver.clone(),
                            humanitarian,
                            strict,
                            classification,
                            direction: transaction.direction(),
                        },
                        total_money: (value * country_share).round() as i64,
                    });
                }

                // Only outgoing money enters the transaction table.
                let Some(net_value) = net_value else {
                    continue;
                };
                let country_name = lookups.country_name(country);
                for (sector, sector_share) in sector_splits.iter() {
                    let share = country_share * sector_share;
                    let total_money = (value * share).round() as i64;
                    let net_money = (net_value * share).round() as i64;

                    // Suppress rows that round to nothing.
                    if total_money == 0 && net_money == 0 {
                        continue;
                    }
                    output.transactions.push(TransactionRow {
                        month: transaction.month(),
                        org_name: self.org_name.clone(),
                        org_type: self.org_type.clone(),
                        sector_name: lookups.sector_group_name(sector),
                        country_name: country_name.clone(),
                        humanitarian,
                        strict,
                        classification,
                        activity_id: self.record.identifier.clone(),
                        net_money,
                        total_money,
                    });
                }
            }
        }

        debug!(
            activity = %self.record.identifier,
            transactions = output.transactions.len(),
            flows = output.flows.len(),
            skipped = output.skipped,
            "processed activity"
        );
        output
    }

    /// Reporting organisation display name.
    pub fn org_name(&self) -> &str {
        &self.org_name
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn factors(&self) -> NetMoneyFactors {
        self.factors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use iati_core::{
        Classification, Config, Flag, LookupTables, OrgRef, SplitEntry, TransactionRecord,
    };

    fn split(code: &str, percentage: Option<f64>) -> SplitEntry {
        SplitEntry {
            code: code.to_string(),
            vocabulary: None,
            percentage,
        }
    }

    fn org(name: &str) -> OrgRef {
        OrgRef {
            ref_code: None,
            name: Some(name.to_string()),
            type_code: Some("21".to_string()),
        }
    }

    fn tx(type_code: &str, value: f64, date: &str) -> TransactionRecord {
        TransactionRecord {
            type_code: type_code.to_string(),
            value: Some(value),
            date: Some(date.to_string()),
            ..Default::default()
        }
    }

    fn activity(transactions: Vec<TransactionRecord>) -> ActivityRecord {
        ActivityRecord {
            identifier: "XM-OCHA-1".to_string(),
            reporting_org: org("Relief Org"),
            recipient_countries: vec![split("A", Some(50.0)), split("B", Some(50.0))],
            sectors: vec![split("S", Some(100.0))],
            transactions,
            ..Default::default()
        }
    }

    fn lookups() -> LookupTables {
        let mut tables = LookupTables::default();
        tables.country_names.insert("A".to_string(), "Country A".to_string());
        tables.country_names.insert("B".to_string(), "Country B".to_string());
        tables.sector_groups.insert("S".to_string(), "Sector S".to_string());
        tables
    }

    fn month(s: &str) -> Month {
        s.parse().unwrap()
    }

    #[test]
    fn test_single_spending_split_over_two_countries() {
        let config = Config::default();
        let lookups = lookups();
        let engine = AllocationEngine::new(&config, &lookups);
        let record = activity(vec![tx("3", 1000.0, "2020-04-10")]);

        let act = Activity::new(&engine, &record).unwrap();
        assert_eq!(act.factors().spending_factor, 1.0);
        let output = act.process(&engine, month("2020-12"));

        assert_eq!(output.transactions.len(), 2);
        assert_eq!(output.skipped, 0);
        let a = &output.transactions[0];
        assert_eq!(a.country_name, "Country A");
        assert_eq!(a.sector_name, "Sector S");
        assert_eq!(a.month.to_string(), "2020-04");
        assert_eq!(a.classification, Classification::Disbursements);
        assert_eq!(a.net_money, 500);
        assert_eq!(a.total_money, 500);
        assert_eq!(output.transactions[1].country_name, "Country B");
        assert_eq!(output.transactions[1].total_money, 500);
    }

    #[test]
    fn test_factors_from_incoming_funds() {
        let config = Config::default();
        let lookups = lookups();
        let engine = AllocationEngine::new(&config, &lookups);
        let record = activity(vec![
            tx("1", 600.0, "2020-02-01"),
            tx("3", 1000.0, "2020-03-01"),
            tx("2", 500.0, "2020-03-01"),
        ]);

        let act = Activity::new(&engine, &record).unwrap();
        assert_abs_diff_eq!(act.factors().spending_factor, 0.4, epsilon = 1e-12);
        assert_eq!(act.factors().commitment_factor, 0.0);

        let output = act.process(&engine, month("2020-12"));
        let spending: Vec<_> = output
            .transactions
            .iter()
            .filter(|r| r.classification == Classification::Disbursements)
            .collect();
        assert_eq!(spending.len(), 2);
        assert_eq!(spending[0].net_money, 200);
        assert_eq!(spending[0].total_money, 500);

        // Zero net money still emits while the total is non-zero.
        let commitments: Vec<_> = output
            .transactions
            .iter()
            .filter(|r| r.classification == Classification::Commitments)
            .collect();
        assert_eq!(commitments.len(), 2);
        assert_eq!(commitments[0].net_money, 0);
        assert_eq!(commitments[0].total_money, 250);

        // Incoming funds only shape the factors.
        assert_eq!(output.transactions.len(), 4);
    }

    #[test]
    fn test_incoming_only_activity_emits_flows_not_rows() {
        let config = Config::default();
        let lookups = lookups();
        let engine = AllocationEngine::new(&config, &lookups);
        let mut funds = tx("1", 1000.0, "2020-04-10");
        funds.provider_org = Some(org("Donor Gov"));
        let mut pledge = tx("11", 700.0, "2020-05-10");
        pledge.provider_org = Some(org("Donor Gov"));
        let record = activity(vec![funds, pledge]);

        let act = Activity::new(&engine, &record).unwrap();
        assert_eq!(act.org_name(), "Relief Org");
        let output = act.process(&engine, month("2020-12"));

        assert!(output.transactions.is_empty());
        assert_eq!(output.skipped, 0);
        assert_eq!(output.flows.len(), 4);
        let first = &output.flows[0];
        assert_eq!(first.key.provider, "Donor Gov");
        assert_eq!(first.key.receiver, "");
        assert_eq!(first.key.direction, Direction::Incoming);
        assert_eq!(first.key.classification, Classification::Disbursements);
        assert_eq!(first.total_money, 500);
        assert_eq!(output.flows[2].key.classification, Classification::Commitments);
        assert_eq!(output.flows[2].total_money, 350);
    }

    #[test]
    fn test_out_of_window_counted_as_skipped() {
        let config = Config::default();
        let lookups = lookups();
        let engine = AllocationEngine::new(&config, &lookups);
        let record = activity(vec![
            tx("3", 1000.0, "2019-12-31"),
            tx("3", 1000.0, "2021-01-01"),
            tx("5", 1000.0, "2020-06-01"),
            tx("3", 1000.0, "2020-06-01"),
        ]);

        let output = Activity::new(&engine, &record).unwrap().process(&engine, month("2020-12"));
        assert_eq!(output.skipped, 3);
        assert_eq!(output.transactions.len(), 2);
    }

    #[test]
    fn test_out_of_window_still_counts_towards_factors() {
        let config = Config::default();
        let lookups = lookups();
        let engine = AllocationEngine::new(&config, &lookups);
        let record = activity(vec![tx("1", 500.0, "2019-06-01"), tx("3", 1000.0, "2020-06-01")]);

        let act = Activity::new(&engine, &record).unwrap();
        assert_abs_diff_eq!(act.factors().spending_factor, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_transaction_splits_override_activity() {
        let config = Config::default();
        let lookups = lookups();
        let engine = AllocationEngine::new(&config, &lookups);
        let mut own = tx("3", 1000.0, "2020-04-10");
        own.recipient_countries = vec![split("B", None)];
        let record = activity(vec![own]);

        let output = Activity::new(&engine, &record).unwrap().process(&engine, month("2020-12"));
        assert_eq!(output.transactions.len(), 1);
        assert_eq!(output.transactions[0].country_name, "Country B");
        assert_eq!(output.transactions[0].total_money, 1000);
    }

    #[test]
    fn test_rounded_to_zero_rows_suppressed() {
        let config = Config::default();
        let lookups = lookups();
        let engine = AllocationEngine::new(&config, &lookups);
        let record = activity(vec![tx("3", 0.8, "2020-04-10")]);

        let output = Activity::new(&engine, &record).unwrap().process(&engine, month("2020-12"));
        assert!(output.transactions.is_empty());
        assert_eq!(output.skipped, 0);
    }

    #[test]
    fn test_flows_per_country_with_named_receiver() {
        let config = Config::default();
        let lookups = lookups();
        let engine = AllocationEngine::new(&config, &lookups);
        let mut spend = tx("3", 1000.0, "2020-04-10");
        spend.receiver_org = Some(org("Partner NGO"));
        let mut split_sectors = activity(vec![spend]);
        split_sectors.sectors = vec![split("S", Some(50.0)), split("T", Some(50.0))];

        let output = Activity::new(&engine, &split_sectors)
            .unwrap()
            .process(&engine, month("2020-12"));
        assert_eq!(output.transactions.len(), 4);
        assert_eq!(output.flows.len(), 2);
        let flow = &output.flows[0];
        assert_eq!(flow.key.provider, "");
        assert_eq!(flow.key.receiver, "Partner NGO");
        assert_eq!(flow.key.direction, Direction::Outgoing);
        assert_eq!(flow.total_money, 500);
    }

    #[test]
    fn test_internal_and_unknown_flows_suppressed() {
        let config = Config::default();
        let lookups = lookups();
        let engine = AllocationEngine::new(&config, &lookups);

        let mut to_self = tx("3", 1000.0, "2020-04-10");
        to_self.receiver_org = Some(org("Relief Org"));
        let unknown_receiver = tx("3", 1000.0, "2020-04-10");
        let record = activity(vec![to_self, unknown_receiver]);

        let output = Activity::new(&engine, &record).unwrap().process(&engine, month("2020-12"));
        assert!(output.flows.is_empty());
        assert_eq!(output.transactions.len(), 4);
    }

    #[test]
    fn test_unknown_reporting_org_emits_no_flows() {
        let config = Config::default();
        let lookups = lookups();
        let engine = AllocationEngine::new(&config, &lookups);

        let mut spend = tx("3", 1000.0, "2020-04-10");
        spend.receiver_org = Some(org("Partner NGO"));
        let mut record = activity(vec![spend]);
        record.reporting_org = OrgRef::default();

        let output = Activity::new(&engine, &record).unwrap().process(&engine, month("2020-12"));
        assert_eq!(output.transactions[0].org_name, "Unknown");
        assert!(output.flows.is_empty());
    }

    #[test]
    fn test_humanitarian_and_strict_flags_on_rows() {
        let config = Config::default();
        let lookups = lookups();
        let engine = AllocationEngine::new(&config, &lookups);

        let mut record = activity(vec![tx("3", 1000.0, "2020-04-10")]);
        record.humanitarian = Flag::Yes;
        record.title = vec!["COVID-19 response".to_string()];

        let act = Activity::new(&engine, &record).unwrap();
        assert!(act.is_strict());
        let output = act.process(&engine, month("2020-12"));
        assert!(output.transactions.iter().all(|r| r.humanitarian == 1 && r.strict == 1));
    }
}
