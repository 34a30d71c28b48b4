//! Record predicates and pagination.

use crate::types::Record;
use serde_json::{Map, Value};

/// Field name to expected value.
pub type Criteria = Map<String, Value>;

/// Which records a selection keeps.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Every record.
    All,
    /// Every listed field loosely equals its criterion.
    And(Criteria),
    /// At least one listed field loosely equals its criterion.
    Or(Criteria),
}

impl Predicate {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::All => true,
            Predicate::And(criteria) => criteria
                .iter()
                .all(|(field, expected)| loose_eq(record.get(field), expected)),
            Predicate::Or(criteria) => criteria
                .iter()
                .any(|(field, expected)| loose_eq(record.get(field), expected)),
        }
    }
}

/// Equality after normalizing scalars.
///
/// Numbers compare numerically, a number against a string parses the trimmed
/// string (empty is zero), booleans count as 1 and 0. Anything else must be
/// structurally equal. A missing field equals only `null`.
pub fn loose_eq(actual: Option<&Value>, expected: &Value) -> bool {
    let actual = match actual {
        Some(value) => value,
        None => return expected.is_null(),
    };

    match (actual, expected) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(_), _) | (_, Value::Array(_)) | (Value::Object(_), _) | (_, Value::Object(_)) => {
            actual == expected
        }
        _ => match (as_number(actual), as_number(expected)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
            }
        }
        _ => None,
    }
}

/// Case-insensitive substring match over string-valued fields.
///
/// `needle` must already be lowercased.
pub fn contains_keyword(record: &Record, fields: &[String], needle: &str) -> bool {
    fields.iter().any(|field| match record.get(field) {
        Some(Value::String(text)) => text.to_lowercase().contains(needle),
        _ => false,
    })
}

/// Window over an ordered result set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Page {
    /// Rows to skip. Ignored without a limit.
    pub start: usize,
    /// Maximum rows. `None` and `Some(0)` both mean unbounded.
    pub limit: Option<usize>,
}

impl Page {
    pub fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        match self.limit {
            Some(limit) if limit > 0 => rows.into_iter().skip(self.start).take(limit).collect(),
            _ => rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_loose_eq_coerces_scalars() {
        assert!(loose_eq(Some(&json!(1)), &json!("1")));
        assert!(loose_eq(Some(&json!("2.50")), &json!(2.5)));
        assert!(loose_eq(Some(&json!(true)), &json!(1)));
        assert!(loose_eq(Some(&json!(false)), &json!("0")));
        assert!(loose_eq(Some(&json!("")), &json!(0)));
        assert!(!loose_eq(Some(&json!("abc")), &json!(0)));
        assert!(!loose_eq(Some(&json!("true")), &json!(true)));
        assert!(!loose_eq(Some(&json!("Active")), &json!("active")));
    }

    #[test]
    fn test_loose_eq_null_and_missing() {
        assert!(loose_eq(None, &Value::Null));
        assert!(loose_eq(Some(&Value::Null), &Value::Null));
        assert!(!loose_eq(None, &json!(0)));
        assert!(!loose_eq(Some(&Value::Null), &json!(0)));
        assert!(!loose_eq(Some(&json!("")), &Value::Null));
    }

    #[test]
    fn test_predicates() {
        let row = record(json!({"status": "active", "age": 30}));

        let mut criteria = Criteria::new();
        criteria.insert("status".into(), json!("active"));
        criteria.insert("age".into(), json!("31"));

        assert!(!Predicate::And(criteria.clone()).matches(&row));
        assert!(Predicate::Or(criteria).matches(&row));
        assert!(Predicate::All.matches(&row));
        assert!(Predicate::And(Criteria::new()).matches(&row));
        assert!(!Predicate::Or(Criteria::new()).matches(&row));
    }

    #[test]
    fn test_keyword_ignores_non_strings() {
        let row = record(json!({"name": "Smith John", "phone": 5551234}));
        let fields = vec!["name".to_string(), "phone".to_string()];

        assert!(contains_keyword(&row, &fields, "smith"));
        assert!(!contains_keyword(&row, &fields, "555"));
    }

    #[test]
    fn test_page_window() {
        let rows = vec![1, 2, 3, 4];
        assert_eq!(Page { start: 1, limit: Some(2) }.apply(rows.clone()), vec![2, 3]);
        assert_eq!(Page { start: 3, limit: Some(5) }.apply(rows.clone()), vec![4]);
        assert_eq!(Page { start: 9, limit: Some(1) }.apply(rows.clone()), Vec::<i32>::new());
        assert_eq!(Page { start: 2, limit: None }.apply(rows.clone()), rows);
        assert_eq!(Page { start: 2, limit: Some(0) }.apply(rows.clone()), rows);
    }
}
