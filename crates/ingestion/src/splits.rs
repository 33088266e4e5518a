//! Country and sector percentage splits.
//!
//! Resolves the share of a record's value that goes to each country (or
//! region) and each sector. Transactions that declare nothing fall back to
//! the splits of their activity.

use iati_core::config::SplitsConfig;
use iati_core::{ActivityRecord, SplitEntry, TransactionRecord};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Mapping from a dimension key to its share of the value (0.0-1.0).
///
/// Shares of a non-empty mapping sum to 1.0 and are all positive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Splits {
    shares: BTreeMap<String, f64>,
}

impl Splits {
    /// A single 100% entry for `key`.
    pub fn single(key: impl Into<String>) -> Self {
        Self {
            shares: BTreeMap::from([(key.into(), 1.0)]),
        }
    }

    /// Share for a key, if present.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.shares.get(key).copied()
    }

    /// Iterate `(key, share)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.shares.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// Sum of all shares.
    pub fn total(&self) -> f64 {
        self.shares.values().sum()
    }
}

/// A record that declares country and sector splits.
pub trait SplitSource {
    /// Recipient countries followed by recipient regions.
    fn geographic_entries(&self) -> Box<dyn Iterator<Item = &SplitEntry> + '_>;

    /// Declared sectors, in any vocabulary.
    fn sector_entries(&self) -> &[SplitEntry];
}

impl SplitSource for ActivityRecord {
    fn geographic_entries(&self) -> Box<dyn Iterator<Item = &SplitEntry> + '_> {
        Box::new(self.recipient_countries.iter().chain(self.recipient_regions.iter()))
    }

    fn sector_entries(&self) -> &[SplitEntry] {
        &self.sectors
    }
}

impl SplitSource for TransactionRecord {
    fn geographic_entries(&self) -> Box<dyn Iterator<Item = &SplitEntry> + '_> {
        Box::new(self.recipient_countries.iter().chain(self.recipient_regions.iter()))
    }

    fn sector_entries(&self) -> &[SplitEntry] {
        &self.sectors
    }
}

/// Split calculator.
#[derive(Debug, Clone)]
pub struct SplitCalculator {
    /// Sector vocabularies that count towards sector splits.
    sector_vocabularies: BTreeSet<String>,
    /// Key for the implicit 100% entry.
    unknown_key: String,
}

impl SplitCalculator {
    /// Create a new split calculator.
    pub fn new(config: &SplitsConfig) -> Self {
        Self {
            sector_vocabularies: config
                .sector_vocabularies
                .iter()
                .map(|v| v.trim().to_string())
                .collect(),
            unknown_key: config.unknown_key.clone(),
        }
    }

    /// Country splits for a record, falling back to `fallback` when it declares none.
    pub fn make_country_splits<R: SplitSource>(&self, record: &R, fallback: Option<&Splits>) -> Splits {
        self.resolve(record.geographic_entries(), fallback)
    }

    /// Sector splits for a record, falling back to `fallback` when it declares none.
    pub fn make_sector_splits<R: SplitSource>(&self, record: &R, fallback: Option<&Splits>) -> Splits {
        let entries = record.sector_entries().iter().filter(|entry| {
            let vocabulary = entry.vocabulary.as_deref().map(str::trim).unwrap_or("1");
            self.sector_vocabularies.contains(vocabulary)
        });
        self.resolve(entries, fallback)
    }

    fn resolve<'a>(&self, entries: impl Iterator<Item = &'a SplitEntry>, fallback: Option<&Splits>) -> Splits {
        match compute_shares(entries) {
            Some(splits) => splits,
            None => fallback
                .cloned()
                .unwrap_or_else(|| Splits::single(self.unknown_key.clone())),
        }
    }
}

/// Turn declared entries into shares; `None` when nothing usable is declared.
///
/// Explicit percentages are kept on a 0-1 scale and the remainder up to 100%
/// is divided equally among entries without one. When the explicit
/// percentages reach 100% or more they are normalized and the others get
/// nothing.
fn compute_shares<'a>(entries: impl Iterator<Item = &'a SplitEntry>) -> Option<Splits> {
    let mut declared: BTreeMap<String, f64> = BTreeMap::new();
    let mut undeclared: BTreeSet<String> = BTreeSet::new();

    for entry in entries {
        let code = entry.code.trim();
        if code.is_empty() {
            continue;
        }
        match entry.percentage.filter(|p| p.is_finite() && *p >= 0.0) {
            Some(pct) => *declared.entry(code.to_string()).or_insert(0.0) += pct / 100.0,
            None => {
                undeclared.insert(code.to_string());
            }
        }
    }
    undeclared.retain(|code| !declared.contains_key(code));

    if declared.is_empty() && undeclared.is_empty() {
        return None;
    }

    let declared_total: f64 = declared.values().sum();
    let mut shares = BTreeMap::new();

    if !undeclared.is_empty() && declared_total < 1.0 {
        let remainder = (1.0 - declared_total) / undeclared.len() as f64;
        shares.extend(declared);
        shares.extend(undeclared.into_iter().map(|code| (code, remainder)));
    } else if declared_total > 0.0 {
        if (declared_total - 1.0).abs() > 1e-6 {
            debug!(percent = declared_total * 100.0, "normalizing declared percentages");
        }
        shares.extend(declared.into_iter().map(|(code, share)| (code, share / declared_total)));
    } else {
        // Every declared percentage is zero.
        let equal = 1.0 / declared.len() as f64;
        shares.extend(declared.into_keys().map(|code| (code, equal)));
    }

    shares.retain(|_, share| *share > 0.0);
    Some(Splits { shares })
}
