//! Equality filters evaluated against JSON documents.
//!
//! The console's query surface is a single optional field=value pair, so the
//! filter language stays deliberately small: everything, or one equality
//! test. Kept serializable so filters can be logged or carried in snapshots.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Matches every document.
    All,
    /// Matches documents whose field equals the given value.
    Eq(String, Value),
}

impl Filter {
    /// Equality filter on a single field.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    /// Evaluate this filter against a document.
    ///
    /// A missing field never matches; documents that are not objects never
    /// match an equality filter.
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, expected) => match doc.get(field) {
                Some(actual) => values_equal(actual, expected),
                None => false,
            },
        }
    }
}

/// Value equality with numeric normalization: `1` and `1.0` are equal.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_matches_everything() {
        assert!(Filter::All.matches(&json!({"a": 1})));
        assert!(Filter::All.matches(&json!({})));
    }

    #[test]
    fn test_eq_string_match() {
        let filter = Filter::eq("name", "Alice");
        assert!(filter.matches(&json!({"name": "Alice", "age": 30})));
        assert!(!filter.matches(&json!({"name": "Bob"})));
    }

    #[test]
    fn test_eq_missing_field_never_matches() {
        let filter = Filter::eq("name", "Alice");
        assert!(!filter.matches(&json!({"other": "Alice"})));
    }

    #[test]
    fn test_eq_numbers_compare_across_representations() {
        let filter = Filter::eq("account_id", json!(1));
        assert!(filter.matches(&json!({"account_id": 1})));
        assert!(filter.matches(&json!({"account_id": 1.0})));
        assert!(!filter.matches(&json!({"account_id": 2})));
    }

    #[test]
    fn test_eq_number_does_not_match_string() {
        let filter = Filter::eq("account_id", json!(1));
        assert!(!filter.matches(&json!({"account_id": "1"})));
    }

    #[test]
    fn test_eq_on_non_object_document() {
        let filter = Filter::eq("name", "Alice");
        assert!(!filter.matches(&json!("Alice")));
        assert!(!filter.matches(&json!(null)));
    }
}
