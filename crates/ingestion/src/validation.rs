//! Boundary validation of input records.

use iati_core::{ActivityRecord, Error, Result};

/// Reject activities that lack the fields every later stage relies on.
///
/// Only structural problems fail; a transaction without a usable value or
/// with an unknown type is valid input that is simply excluded later.
pub fn validate_activity(activity: &ActivityRecord) -> Result<()> {
    if activity.identifier.trim().is_empty() {
        return Err(Error::data("activity without identifier"));
    }
    for (index, transaction) in activity.transactions.iter().enumerate() {
        if transaction.type_code.trim().is_empty() {
            return Err(Error::data(format!(
                "activity {}: transaction {} has no type",
                activity.identifier, index
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use iati_core::TransactionRecord;

    #[test]
    fn test_valid_activity() {
        let activity = ActivityRecord {
            identifier: "XM-1".to_string(),
            transactions: vec![TransactionRecord {
                type_code: "3".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(validate_activity(&activity).is_ok());
    }

    #[test]
    fn test_non_finite_value_left_to_transaction_stage() {
        let activity = ActivityRecord {
            identifier: "XM-1".to_string(),
            transactions: vec![TransactionRecord {
                type_code: "3".to_string(),
                value: Some(f64::NAN),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(validate_activity(&activity).is_ok());
    }

    #[test]
    fn test_missing_identifier() {
        assert!(validate_activity(&ActivityRecord::default()).is_err());
    }

    #[test]
    fn test_missing_transaction_type() {
        let activity = ActivityRecord {
            identifier: "XM-1".to_string(),
            transactions: vec![TransactionRecord::default()],
            ..Default::default()
        };
        let err = validate_activity(&activity).unwrap_err();
        assert!(err.to_string().contains("no type"));
    }
}
