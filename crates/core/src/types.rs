//! Core data types for the IATI flows pipeline.
//!
//! Input records mirror the parts of an IATI activity the pipeline reads;
//! output rows are the two aggregate tables it produces.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A calendar month, ordered chronologically and rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Create a month, returning `None` when `month` is not 1-12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Create a month from components already known to be valid.
    pub(crate) const fn new_unchecked(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// The month containing a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Year component.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month component (1-12).
    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("invalid month '{}': expected YYYY-MM", s))?;
        let year: i32 = year.parse().map_err(|_| format!("invalid year in '{}'", s))?;
        let month: u32 = month.parse().map_err(|_| format!("invalid month in '{}'", s))?;
        Month::new(year, month).ok_or_else(|| format!("month out of range in '{}'", s))
    }
}

impl TryFrom<String> for Month {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.to_string()
    }
}

/// Parse an IATI date attribute (`YYYY-MM-DD`, optionally followed by a time part).
pub fn parse_iati_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Tri-state flag: explicitly true, explicitly false, or left unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Flag {
    /// Not stated by the record.
    #[default]
    Unspecified,
    /// Explicitly set to true.
    Yes,
    /// Explicitly set to false.
    No,
}

impl Flag {
    /// An explicit flag wins; an unspecified one takes the parent's value.
    #[inline]
    pub fn or_inherit(self, parent: Flag) -> Flag {
        match self {
            Flag::Unspecified => parent,
            explicit => explicit,
        }
    }

    /// Whether the flag resolves to true. Unspecified counts as false.
    #[inline]
    pub fn is_set(self) -> bool {
        self == Flag::Yes
    }
}

impl From<Option<bool>> for Flag {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Flag::Yes,
            Some(false) => Flag::No,
            None => Flag::Unspecified,
        }
    }
}

impl From<Flag> for Option<bool> {
    fn from(flag: Flag) -> Self {
        match flag {
            Flag::Yes => Some(true),
            Flag::No => Some(false),
            Flag::Unspecified => None,
        }
    }
}

/// Reference to an organisation as it appears in a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgRef {
    /// Organisation identifier (e.g. `GB-GOV-1`).
    #[serde(rename = "ref", default)]
    pub ref_code: Option<String>,
    /// Narrative name given inline by the record.
    #[serde(default)]
    pub name: Option<String>,
    /// IATI organisation type code (e.g. `10` = government).
    #[serde(rename = "type", default)]
    pub type_code: Option<String>,
}

/// A coded element with an optional vocabulary (tags, humanitarian scopes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodedEntry {
    #[serde(default)]
    pub vocabulary: Option<String>,
    pub code: String,
}

/// A declared split element (sector, recipient country or region).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitEntry {
    pub code: String,
    #[serde(default)]
    pub vocabulary: Option<String>,
    /// Declared percentage on a 0-100 scale, if any.
    #[serde(default)]
    pub percentage: Option<f64>,
}

/// A transaction as reported inside an activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionRecord {
    /// IATI transaction type code.
    #[serde(rename = "type")]
    pub type_code: String,
    /// Raw value in `currency`.
    pub value: Option<f64>,
    pub currency: Option<String>,
    /// Transaction date.
    pub date: Option<String>,
    /// Value date (used for currency conversion).
    pub value_date: Option<String>,
    pub humanitarian: Flag,
    pub sectors: Vec<SplitEntry>,
    pub recipient_countries: Vec<SplitEntry>,
    pub recipient_regions: Vec<SplitEntry>,
    /// Description narratives.
    pub description: Vec<String>,
    pub provider_org: Option<OrgRef>,
    pub receiver_org: Option<OrgRef>,
}

/// An activity record with all of its transactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityRecord {
    /// Globally unique IATI identifier.
    pub identifier: String,
    pub reporting_org: OrgRef,
    /// Reported on behalf of another organisation.
    pub secondary_reporter: bool,
    pub humanitarian: Flag,
    /// Currency for transactions that do not state one.
    pub default_currency: Option<String>,
    /// Title narratives.
    pub title: Vec<String>,
    pub tags: Vec<CodedEntry>,
    pub humanitarian_scopes: Vec<CodedEntry>,
    pub sectors: Vec<SplitEntry>,
    pub recipient_countries: Vec<SplitEntry>,
    pub recipient_regions: Vec<SplitEntry>,
    pub participating_orgs: Vec<OrgRef>,
    pub transactions: Vec<TransactionRecord>,
}

/// Money classification of a transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Commitments,
    Disbursements,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Commitments => "commitments",
            Classification::Disbursements => "disbursements",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of money relative to the reporting organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four transaction classes totalled for net-new-money factoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionClass {
    /// Incoming disbursements.
    IncomingFunds,
    /// Incoming commitments.
    IncomingCommitments,
    /// Outgoing commitments.
    OutgoingCommitments,
    /// Outgoing disbursements and expenditure.
    Spending,
}

impl TransactionClass {
    /// Class of a transaction with the given classification and direction.
    pub fn of(classification: Classification, direction: Direction) -> Self {
        match (direction, classification) {
            (Direction::Incoming, Classification::Disbursements) => TransactionClass::IncomingFunds,
            (Direction::Incoming, Classification::Commitments) => TransactionClass::IncomingCommitments,
            (Direction::Outgoing, Classification::Commitments) => TransactionClass::OutgoingCommitments,
            (Direction::Outgoing, Classification::Disbursements) => TransactionClass::Spending,
        }
    }
}

/// A row that can be written to the output tables.
pub trait OutputRow {
    /// Field values in column order.
    fn values(&self) -> Vec<Value>;
}

/// One row of the per-(month, org, sector, country) transaction table.
///
/// Field order is the sort order of the table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionRow {
    pub month: Month,
    pub org_name: String,
    pub org_type: String,
    pub sector_name: String,
    pub country_name: String,
    pub humanitarian: u8,
    pub strict: u8,
    pub classification: Classification,
    pub activity_id: String,
    /// New money after net-new-money factoring.
    pub net_money: i64,
    pub total_money: i64,
}

impl OutputRow for TransactionRow {
    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.month.to_string()),
            Value::from(self.org_name.as_str()),
            Value::from(self.org_type.as_str()),
            Value::from(self.sector_name.as_str()),
            Value::from(self.country_name.as_str()),
            Value::from(self.humanitarian),
            Value::from(self.strict),
            Value::from(self.classification.as_str()),
            Value::from(self.activity_id.as_str()),
            Value::from(self.net_money),
            Value::from(self.total_money),
        ]
    }
}

/// Identity of an inter-organisation flow; rows sharing a key are summed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlowKey {
    pub org_name: String,
    pub org_type: String,
    pub provider: String,
    pub receiver: String,
    pub humanitarian: u8,
    pub strict: u8,
    pub classification: Classification,
    pub direction: Direction,
}

/// One row of the inter-organisation flow table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowRow {
    #[serde(flatten)]
    pub key: FlowKey,
    pub total_money: i64,
}

impl OutputRow for FlowRow {
    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.key.org_name.as_str()),
            Value::from(self.key.org_type.as_str()),
            Value::from(self.key.provider.as_str()),
            Value::from(self.key.receiver.as_str()),
            Value::from(self.key.humanitarian),
            Value::from(self.key.strict),
            Value::from(self.key.classification.as_str()),
            Value::from(self.key.direction.as_str()),
            Value::from(self.total_money),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_parse_and_display() {
        let month: Month = "2020-01".parse().unwrap();
        assert_eq!(month.year(), 2020);
        assert_eq!(month.month(), 1);
        assert_eq!(month.to_string(), "2020-01");
        assert!("2020-13".parse::<Month>().is_err());
        assert!("202001".parse::<Month>().is_err());
    }

    #[test]
    fn test_month_ordering() {
        let dec: Month = "2019-12".parse().unwrap();
        let jan: Month = "2020-01".parse().unwrap();
        let feb: Month = "2020-02".parse().unwrap();
        assert!(dec < jan);
        assert!(jan < feb);
    }

    #[test]
    fn test_parse_iati_date() {
        let date = parse_iati_date("2020-03-15").unwrap();
        assert_eq!(Month::from_date(date).to_string(), "2020-03");

        let with_time = parse_iati_date("2021-11-02T00:00:00Z").unwrap();
        assert_eq!(Month::from_date(with_time).to_string(), "2021-11");

        assert!(parse_iati_date("not-a-date").is_none());
        assert!(parse_iati_date("").is_none());
    }

    #[test]
    fn test_flag_inheritance() {
        assert_eq!(Flag::Unspecified.or_inherit(Flag::Yes), Flag::Yes);
        assert_eq!(Flag::No.or_inherit(Flag::Yes), Flag::No);
        assert_eq!(Flag::Yes.or_inherit(Flag::No), Flag::Yes);
        assert!(!Flag::Unspecified.or_inherit(Flag::Unspecified).is_set());
    }

    #[test]
    fn test_flag_serde() {
        let flag: Flag = serde_json::from_str("true").unwrap();
        assert_eq!(flag, Flag::Yes);
        let flag: Flag = serde_json::from_str("null").unwrap();
        assert_eq!(flag, Flag::Unspecified);
    }

    #[test]
    fn test_transaction_class() {
        assert_eq!(
            TransactionClass::of(Classification::Disbursements, Direction::Outgoing),
            TransactionClass::Spending
        );
        assert_eq!(
            TransactionClass::of(Classification::Commitments, Direction::Incoming),
            TransactionClass::IncomingCommitments
        );
    }

    #[test]
    fn test_activity_record_deserialize() {
        let json = r#"{
            "identifier": "XM-DAC-1-2",
            "reporting_org": {"ref": "XM-DAC-1", "type": "40"},
            "humanitarian": true,
            "transactions": [{"type": "3", "value": 1000.0, "date": "2020-05-01"}]
        }"#;
        let activity: ActivityRecord = serde_json::from_str(json).unwrap();
        assert_eq!(activity.identifier, "XM-DAC-1-2");
        assert_eq!(activity.reporting_org.ref_code.as_deref(), Some("XM-DAC-1"));
        assert_eq!(activity.humanitarian, Flag::Yes);
        assert_eq!(activity.transactions[0].humanitarian, Flag::Unspecified);
        assert_eq!(activity.transactions[0].type_code, "3");
    }

    #[test]
    fn test_transaction_row_values() {
        let row = TransactionRow {
            month: "2020-04".parse().unwrap(),
            org_name: "Org".to_string(),
            org_type: "10".to_string(),
            sector_name: "Health".to_string(),
            country_name: "Chad".to_string(),
            humanitarian: 1,
            strict: 0,
            classification: Classification::Disbursements,
            activity_id: "A-1".to_string(),
            net_money: 17,
            total_money: 42,
        };
        let values = row.values();
        assert_eq!(values.len(), 11);
        assert_eq!(values[0], Value::from("2020-04"));
        assert_eq!(values[9], Value::from(17));
        assert_eq!(values[10], Value::from(42));
    }
}
