//! Name resolution and currency conversion.
//!
//! The pipeline only sees the [`Lookups`] trait. [`LookupTables`] is the
//! in-memory implementation used by the binary and the tests: display-name
//! tables plus a historic table of exchange rates against the US dollar.

use crate::error::{Error, Result};
use crate::types::{ActivityRecord, OrgRef};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Lookup collaborator consumed by the allocation pipeline.
///
/// Name lookups never fail: unknown codes resolve to an empty string, and
/// unknown organisations to [`Lookups::default_org`].
pub trait Lookups {
    /// Display name of an organisation.
    fn org_name(&self, org: &OrgRef) -> String;

    /// Type code of an organisation.
    fn org_type(&self, org: &OrgRef) -> String;

    /// Display name of the group a sector code belongs to.
    fn sector_group_name(&self, code: &str) -> String;

    /// Display name of a country or region code.
    fn country_name(&self, code: &str) -> String;

    /// Convert an amount to USD at the given date.
    ///
    /// `Ok(None)` means the amount cannot be valued (unknown currency, no
    /// rate); `Err` is reserved for unexpected failures.
    fn convert_to_usd(&self, amount: f64, currency: &str, date: NaiveDate) -> Result<Option<f64>>;

    /// Name used for unresolvable organisations.
    fn default_org(&self) -> &str;
}

fn default_org_name() -> String {
    "Unknown".to_string()
}

/// In-memory lookup tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupTables {
    /// Organisation ref -> display name.
    pub org_names: BTreeMap<String, String>,
    /// Organisation ref -> type code, for orgs whose records omit the type.
    pub org_types: BTreeMap<String, String>,
    /// Sector or sector-group code -> group name.
    pub sector_groups: BTreeMap<String, String>,
    /// Country or region code -> name.
    pub country_names: BTreeMap<String, String>,
    /// Currency -> date -> units of that currency per USD.
    pub usd_rates: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
    /// Name used for unresolvable organisations.
    #[serde(default = "default_org_name")]
    pub default_org: String,
}

impl Default for LookupTables {
    fn default() -> Self {
        Self {
            org_names: BTreeMap::new(),
            org_types: BTreeMap::new(),
            sector_groups: BTreeMap::new(),
            country_names: BTreeMap::new(),
            usd_rates: BTreeMap::new(),
            default_org: default_org_name(),
        }
    }
}

impl LookupTables {
    /// Create empty tables with the given default organisation name.
    pub fn new(default_org: impl Into<String>) -> Self {
        Self {
            default_org: default_org.into(),
            ..Self::default()
        }
    }

    /// Load tables from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse tables from JSON text. Currency codes are upper-cased.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let mut tables: Self = serde_json::from_str(text)?;
        let rates = std::mem::take(&mut tables.usd_rates);
        for (currency, history) in rates {
            for (date, rate) in history {
                tables.add_usd_rate(&currency, date, rate);
            }
        }
        Ok(tables)
    }

    /// Replace the default organisation name.
    pub fn with_default_org(mut self, default_org: impl Into<String>) -> Self {
        self.default_org = default_org.into();
        self
    }

    /// Add a dated rate (units of `currency` per USD).
    pub fn add_usd_rate(&mut self, currency: &str, date: NaiveDate, rate: f64) {
        self.usd_rates
            .entry(currency.trim().to_uppercase())
            .or_default()
            .insert(date, rate);
    }

    /// Register the inline name (and type) of an organisation under its ref.
    ///
    /// Names already known are kept.
    pub fn register_org(&mut self, org: &OrgRef) {
        let Some(ref_code) = org.ref_code.as_deref().map(str::trim).filter(|r| !r.is_empty()) else {
            return;
        };
        if let Some(name) = org.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            self.org_names
                .entry(ref_code.to_string())
                .or_insert_with(|| name.to_string());
        }
        if let Some(type_code) = org.type_code.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            self.org_types
                .entry(ref_code.to_string())
                .or_insert_with(|| type_code.to_string());
        }
    }

    /// Learn organisation names from a batch of activities.
    ///
    /// Reporting organisations are registered first so that the name an
    /// organisation gives itself wins over names others use for it.
    pub fn learn_org_names(&mut self, activities: &[ActivityRecord]) {
        for activity in activities {
            self.register_org(&activity.reporting_org);
        }
        for activity in activities {
            for org in &activity.participating_orgs {
                self.register_org(org);
            }
            for transaction in &activity.transactions {
                for org in [&transaction.provider_org, &transaction.receiver_org]
                    .into_iter()
                    .flatten()
                {
                    self.register_org(org);
                }
            }
        }
    }

    /// Nearest dated rate for a currency; ties prefer the earlier date.
    fn nearest_rate(&self, currency: &str, date: NaiveDate) -> Option<f64> {
        let history = self.usd_rates.get(currency)?;
        let prev = history.range(..=date).next_back();
        let next = history.range(date..).next();

        match (prev, next) {
            (Some((d1, r1)), Some((d2, r2))) => {
                let dist_prev = (date - *d1).num_days().abs();
                let dist_next = (*d2 - date).num_days().abs();
                if dist_prev <= dist_next {
                    Some(*r1)
                } else {
                    Some(*r2)
                }
            }
            (Some((_, r)), None) | (None, Some((_, r))) => Some(*r),
            (None, None) => None,
        }
    }
}

impl Lookups for LookupTables {
    fn org_name(&self, org: &OrgRef) -> String {
        let by_ref = org
            .ref_code
            .as_deref()
            .map(str::trim)
            .and_then(|r| self.org_names.get(r));
        if let Some(name) = by_ref {
            return name.clone();
        }
        match org.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.default_org.clone(),
        }
    }

    fn org_type(&self, org: &OrgRef) -> String {
        if let Some(type_code) = org.type_code.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            return type_code.to_string();
        }
        org.ref_code
            .as_deref()
            .map(str::trim)
            .and_then(|r| self.org_types.get(r))
            .cloned()
            .unwrap_or_default()
    }

    fn sector_group_name(&self, code: &str) -> String {
        let code = code.trim();
        if let Some(name) = self.sector_groups.get(code) {
            return name.clone();
        }
        // DAC 5-digit purpose codes group under their 3-digit category.
        code.get(..3)
            .and_then(|group| self.sector_groups.get(group))
            .cloned()
            .unwrap_or_default()
    }

    fn country_name(&self, code: &str) -> String {
        self.country_names
            .get(code.trim())
            .or_else(|| self.country_names.get(&code.trim().to_uppercase()))
            .cloned()
            .unwrap_or_default()
    }

    fn convert_to_usd(&self, amount: f64, currency: &str, date: NaiveDate) -> Result<Option<f64>> {
        let currency = currency.trim().to_uppercase();
        if currency == "USD" {
            return Ok(Some(amount));
        }
        let Some(rate) = self.nearest_rate(&currency, date) else {
            return Ok(None);
        };
        if !rate.is_finite() || rate <= 0.0 {
            return Err(Error::currency(format!(
                "invalid USD rate {} for {} near {}",
                rate, currency, date
            )));
        }
        Ok(Some(amount / rate))
    }

    fn default_org(&self) -> &str {
        &self.default_org
    }
}
