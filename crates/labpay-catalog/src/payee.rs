//! Payee Field Resolution
//!
//! Payee records have accumulated several field names for the connected
//! payment account over time. The candidates live in one ordered slice so a
//! newly discovered legacy name is a one-line addition.

use serde_json::{Map, Value};

use labpay_core::is_connected_account_id;

/// Field names that may carry the connected-account id, highest priority
/// first.
pub const ACCOUNT_FIELD_CANDIDATES: &[&str] = &[
    "stripe-account-id",
    "stripe-connect-id",
    "connect-id",
    "stripe-account",
    "account-id",
];

/// First candidate field holding a validly formatted connected-account id.
///
/// `None` means the payee cannot receive funds; callers treat that as a hard
/// validation failure, never as an optional field.
pub fn first_account_id(fields: &Map<String, Value>) -> Option<String> {
    ACCOUNT_FIELD_CANDIDATES.iter().find_map(|key| {
        fields
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| is_connected_account_id(value))
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_only_valid_candidate_wins() {
        let payee = fields(json!({
            "stripe-account-id": "not-an-account",
            "connect-id": "acct_1abcdefgh"
        }));
        assert_eq!(first_account_id(&payee).as_deref(), Some("acct_1abcdefgh"));
    }

    #[test]
    fn test_priority_order_breaks_ties() {
        let payee = fields(json!({
            "account-id": "acct_lowpriority99",
            "stripe-connect-id": "acct_highpriority1"
        }));
        assert_eq!(
            first_account_id(&payee).as_deref(),
            Some("acct_highpriority1")
        );
    }

    #[test]
    fn test_no_valid_candidate_is_none() {
        let payee = fields(json!({
            "stripe-account-id": "ACCT_WRONGCASE1",
            "connect-id": "acct_short",
            "account-id": 12345
        }));
        assert_eq!(first_account_id(&payee), None);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let payee = fields(json!({ "stripe-account": "  acct_1abcdefgh  " }));
        assert_eq!(first_account_id(&payee).as_deref(), Some("acct_1abcdefgh"));
    }
}
