//! Configuration structures for the IATI flows pipeline.

use crate::error::{Error, Result};
use crate::types::{Classification, Direction, Month};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Main configuration for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Recognised transaction types, keyed by IATI type code.
    pub transaction_types: BTreeMap<String, TransactionTypeInfo>,
    /// Accepted month window.
    pub window: WindowConfig,
    /// COVID-19 markers for the strictness classifier.
    pub strictness: StrictnessConfig,
    /// Split calculation configuration.
    pub splits: SplitsConfig,
    /// Lookup configuration.
    pub lookups: LookupsConfig,
    /// Output files.
    pub outputs: OutputsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transaction_types: default_transaction_types(),
            window: WindowConfig::default(),
            strictness: StrictnessConfig::default(),
            splits: SplitsConfig::default(),
            lookups: LookupsConfig::default(),
            outputs: OutputsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file. Absent sections keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.transaction_types.is_empty() {
            return Err(Error::config("no transaction types configured"));
        }
        if self.outputs.transactions.headers.len() != self.outputs.transactions.hxltags.len() {
            return Err(Error::config("transactions headers and hxltags differ in length"));
        }
        if self.outputs.flows.headers.len() != self.outputs.flows.hxltags.len() {
            return Err(Error::config("flows headers and hxltags differ in length"));
        }
        Ok(())
    }

    /// Type information for a transaction type code, if recognised.
    pub fn transaction_type(&self, code: &str) -> Option<&TransactionTypeInfo> {
        self.transaction_types.get(code.trim())
    }
}

/// Classification and direction of one transaction type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionTypeInfo {
    /// Human readable label (e.g. "Expenditure").
    pub label: String,
    pub classification: Classification,
    pub direction: Direction,
}

impl TransactionTypeInfo {
    fn new(label: &str, classification: Classification, direction: Direction) -> Self {
        Self {
            label: label.to_string(),
            classification,
            direction,
        }
    }
}

/// The standard IATI transaction types the pipeline tracks.
pub fn default_transaction_types() -> BTreeMap<String, TransactionTypeInfo> {
    use Classification::*;
    use Direction::*;

    BTreeMap::from([
        ("1".to_string(), TransactionTypeInfo::new("Incoming Funds", Disbursements, Incoming)),
        ("2".to_string(), TransactionTypeInfo::new("Outgoing Commitment", Commitments, Outgoing)),
        ("3".to_string(), TransactionTypeInfo::new("Disbursement", Disbursements, Outgoing)),
        ("4".to_string(), TransactionTypeInfo::new("Expenditure", Disbursements, Outgoing)),
        ("11".to_string(), TransactionTypeInfo::new("Incoming Commitment", Commitments, Incoming)),
    ])
}

/// Accepted month window. The upper bound is the reporting month of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// First month tracked.
    pub start_month: Month,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            start_month: Month::new_unchecked(2020, 1),
        }
    }
}

/// A `(vocabulary, code)` pair that marks a record as COVID-19 related.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeMarker {
    pub vocabulary: String,
    pub code: String,
}

impl CodeMarker {
    fn new(vocabulary: &str, code: &str) -> Self {
        Self {
            vocabulary: vocabulary.to_string(),
            code: code.to_string(),
        }
    }
}

/// COVID-19 marker lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrictnessConfig {
    /// Humanitarian scope markers (emergency / appeal codes).
    pub scope_markers: Vec<CodeMarker>,
    /// Tag markers.
    pub tag_markers: Vec<CodeMarker>,
    /// Designated sector codes.
    pub sector_codes: Vec<String>,
    /// Narrative terms, matched case-insensitively as substrings.
    pub narrative_terms: Vec<String>,
}

impl Default for StrictnessConfig {
    fn default() -> Self {
        Self {
            scope_markers: vec![
                CodeMarker::new("1-2", "EP-2020-000012-001"),
                CodeMarker::new("2-1", "HCOVD20-GLO"),
                CodeMarker::new("2-1", "HCOVD20"),
            ],
            tag_markers: vec![CodeMarker::new("99", "COVID-19")],
            sector_codes: vec!["12264".to_string()],
            narrative_terms: ["COVID", "CORONAVIRUS", "SARS-COV-2", "PANDEMIC"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Split calculation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitsConfig {
    /// Sector vocabularies used for sector splits; an absent vocabulary counts as "1".
    pub sector_vocabularies: Vec<String>,
    /// Key used when a record has no splits and no fallback exists.
    pub unknown_key: String,
}

impl Default for SplitsConfig {
    fn default() -> Self {
        Self {
            sector_vocabularies: vec!["1".to_string(), "2".to_string()],
            unknown_key: String::new(),
        }
    }
}

/// Lookup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupsConfig {
    /// Name used for organisations that cannot be resolved.
    pub default_org: String,
}

impl Default for LookupsConfig {
    fn default() -> Self {
        Self {
            default_org: "Unknown".to_string(),
        }
    }
}

/// Layout of one output table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputFileConfig {
    /// CSV file name inside the output folder.
    pub csv: String,
    /// JSON file name inside the output folder.
    pub json: String,
    /// Column headers.
    pub headers: Vec<String>,
    /// HXL hashtags, one per column.
    pub hxltags: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputsConfig {
    /// Folder the files are written to.
    pub folder: String,
    pub transactions: OutputFileConfig,
    pub flows: OutputFileConfig,
}

impl Default for OutputsConfig {
    fn default() -> Self {
        Self {
            folder: "output".to_string(),
            transactions: OutputFileConfig {
                csv: "transactions.csv".to_string(),
                json: "transactions.json".to_string(),
                headers: strings(&[
                    "Month",
                    "Reporting org",
                    "Reporting org type",
                    "Sector",
                    "Recipient country",
                    "Humanitarian",
                    "Strict",
                    "Transaction type",
                    "Activity id",
                    "Net money",
                    "Total money",
                ]),
                hxltags: strings(&[
                    "#date+month",
                    "#org+name",
                    "#org+type",
                    "#sector",
                    "#country",
                    "#indicator+bool+humanitarian",
                    "#indicator+bool+strict",
                    "#x_transaction_type",
                    "#activity+code",
                    "#value+net",
                    "#value+total",
                ]),
            },
            flows: OutputFileConfig {
                csv: "flows.csv".to_string(),
                json: "flows.json".to_string(),
                headers: strings(&[
                    "Reporting org",
                    "Reporting org type",
                    "Provider org",
                    "Receiver org",
                    "Humanitarian",
                    "Strict",
                    "Transaction type",
                    "Direction",
                    "Total",
                ]),
                hxltags: strings(&[
                    "#org+name",
                    "#org+type",
                    "#org+name+provider",
                    "#org+name+receiver",
                    "#indicator+bool+humanitarian",
                    "#indicator+bool+strict",
                    "#x_transaction_type",
                    "#x_transaction_direction",
                    "#value+total",
                ]),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window.start_month.to_string(), "2020-01");
        assert_eq!(config.lookups.default_org, "Unknown");
        assert_eq!(config.outputs.transactions.headers.len(), 11);
        assert_eq!(config.outputs.flows.hxltags.len(), 9);
    }

    #[test]
    fn test_default_narrative_terms() {
        let strictness = StrictnessConfig::default();
        assert_eq!(
            strictness.narrative_terms,
            vec!["COVID", "CORONAVIRUS", "SARS-COV-2", "PANDEMIC"]
        );
    }

    #[test]
    fn test_transaction_type_lookup() {
        let config = Config::default();
        let info = config.transaction_type("4").unwrap();
        assert_eq!(info.label, "Expenditure");
        assert_eq!(info.direction, Direction::Outgoing);
        assert!(config.transaction_type("5").is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "transaction_types": {
                "3": {"label": "Disbursement", "classification": "disbursements", "direction": "outgoing"}
            },
            "window": {"start_month": "2021-06"}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.transaction_types.len(), 1);
        assert_eq!(config.window.start_month.to_string(), "2021-06");
        assert_eq!(config.strictness.sector_codes, vec!["12264".to_string()]);
    }

    #[test]
    fn test_empty_transaction_types_rejected() {
        let config = Config {
            transaction_types: BTreeMap::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
