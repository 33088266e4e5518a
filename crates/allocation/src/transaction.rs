//! Transaction valuation and net-new-money processing.
//!
//! A [`Transaction`] is created only for records that carry a value, a
//! recognised type and a convertible currency. [`Transaction::process`] then
//! applies the month window and resolves the net value and flags against the
//! parent activity.

use crate::factors::NetMoneyFactors;
use iati_core::config::TransactionTypeInfo;
use iati_core::types::parse_iati_date;
use iati_core::{
    Classification, Config, Direction, Flag, Lookups, Month, OrgRef, Result, TransactionClass,
    TransactionRecord,
};
use iati_ingestion::{StrictnessClassifier, StrictnessSignals};
use tracing::debug;

/// Activity-level values a transaction inherits.
#[derive(Debug, Clone, Copy)]
pub struct ActivityContext {
    /// Net-new-money factors of the activity.
    pub factors: NetMoneyFactors,
    /// Activity humanitarian flag.
    pub humanitarian: Flag,
    /// Activity strictness.
    pub strict: bool,
}

/// A valued transaction.
#[derive(Debug, Clone)]
pub struct Transaction<'a> {
    record: &'a TransactionRecord,
    type_info: &'a TransactionTypeInfo,
    /// Reporting month.
    month: Month,
    /// Value in USD.
    value: f64,
    /// Net (new money) value in USD; `None` when not applicable.
    net_value: Option<f64>,
    is_humanitarian: bool,
    is_strict: bool,
}

impl<'a> Transaction<'a> {
    /// Build a transaction from a record, or `None` if it is excluded.
    ///
    /// Excluded: no, zero or non-finite value, unrecognised type, no usable
    /// date, or a currency the lookups cannot value. Errors from the lookups propagate.
    pub fn get_transaction(
        config: &'a Config,
        lookups: &dyn Lookups,
        record: &'a TransactionRecord,
        default_currency: Option<&str>,
    ) -> Result<Option<Self>> {
        let raw_value = match record.value {
            Some(v) if v != 0.0 && v.is_finite() => v,
            _ => {
                debug!("transaction without usable value");
                return Ok(None);
            }
        };

        let Some(type_info) = config.transaction_type(&record.type_code) else {
            debug!(type_code = %record.type_code, "unrecognised transaction type");
            return Ok(None);
        };

        // Month from the transaction date, falling back on the value date.
        let month_date = record
            .date
            .as_deref()
            .and_then(parse_iati_date)
            .or_else(|| record.value_date.as_deref().and_then(parse_iati_date));
        // Valuation from the value date, falling back on the transaction date.
        let value_date = record
            .value_date
            .as_deref()
            .and_then(parse_iati_date)
            .or_else(|| record.date.as_deref().and_then(parse_iati_date));

        let (Some(month_date), Some(value_date)) = (month_date, value_date) else {
            debug!("transaction without usable date");
            return Ok(None);
        };

        let currency = record
            .currency
            .as_deref()
            .or(default_currency)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("USD");

        let Some(value) = lookups.convert_to_usd(raw_value, currency, value_date)? else {
            debug!(%currency, %value_date, "transaction value cannot be converted to USD");
            return Ok(None);
        };

        Ok(Some(Self {
            record,
            type_info,
            month: Month::from_date(month_date),
            value,
            net_value: None,
            is_humanitarian: false,
            is_strict: false,
        }))
    }

    /// Apply the month window and resolve net value and flags.
    ///
    /// Returns `false` when the transaction is excluded: zero value, or a
    /// month outside `[window_start, this_month]`.
    pub fn process(
        &mut self,
        window_start: Month,
        this_month: Month,
        activity: &ActivityContext,
        strictness: &StrictnessClassifier,
    ) -> bool {
        if self.value == 0.0 {
            return false;
        }
        if self.month < window_start || self.month > this_month {
            debug!(month = %self.month, "transaction outside month window");
            return false;
        }

        self.net_value = self.net_value_for(&activity.factors);
        self.is_humanitarian = self.record.humanitarian.or_inherit(activity.humanitarian).is_set();
        self.is_strict =
            activity.strict || strictness.is_strict(&StrictnessSignals::for_transaction(self.record));
        true
    }

    /// Net value for the given factors; only outgoing money is new money.
    pub fn net_value_for(&self, factors: &NetMoneyFactors) -> Option<f64> {
        match (self.direction(), self.classification()) {
            (Direction::Outgoing, Classification::Commitments) => Some(self.value * factors.commitment_factor),
            (Direction::Outgoing, Classification::Disbursements) => Some(self.value * factors.spending_factor),
            (Direction::Incoming, _) => None,
        }
    }

    /// Provider and receiver display names.
    ///
    /// Incoming money names its provider, outgoing money its receiver; the
    /// other side is the reporting organisation and is left empty.
    pub fn provider_receiver(&self, lookups: &dyn Lookups) -> (String, String) {
        let resolve = |org: &Option<OrgRef>| match org {
            Some(org) => lookups.org_name(org),
            None => lookups.default_org().to_string(),
        };
        match self.direction() {
            Direction::Incoming => (resolve(&self.record.provider_org), String::new()),
            Direction::Outgoing => (String::new(), resolve(&self.record.receiver_org)),
        }
    }

    /// The underlying record.
    pub fn record(&self) -> &'a TransactionRecord {
        self.record
    }

    pub fn month(&self) -> Month {
        self.month
    }

    /// Value in USD.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Net value in USD, set by [`Transaction::process`].
    pub fn net_value(&self) -> Option<f64> {
        self.net_value
    }

    pub fn is_humanitarian(&self) -> bool {
        self.is_humanitarian
    }

    pub fn is_strict(&self) -> bool {
        self.is_strict
    }

    pub fn classification(&self) -> Classification {
        self.type_info.classification
    }

    pub fn direction(&self) -> Direction {
        self.type_info.direction
    }

    /// Factoring class of this transaction.
    pub fn class(&self) -> TransactionClass {
        TransactionClass::of(self.classification(), self.direction())
    }
}
