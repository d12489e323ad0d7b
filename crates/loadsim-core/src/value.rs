use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of a query result set, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A concrete query argument produced by a parameter generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer argument (primary keys, id ranges).
    Int(i64),
    /// Floating point argument.
    Float(f64),
    /// Text argument (sampled column values, formatted timestamps).
    Text(String),
    /// Explicit null argument.
    Null,
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Null => write!(f, "NULL"),
        }
    }
}

/// Successful outcome of a query execution.
///
/// A failed execution is represented as the *absence* of a result
/// (`Option<QueryResult>::None` from the adapter), so that failures flow
/// through the same classification path as successes.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// Read query: the fetched result rows.
    Rows(Vec<Row>),
    /// Write query: number of rows affected.
    Affected(u64),
}

impl QueryResult {
    /// Row count for reads, affected count for writes.
    #[must_use]
    pub fn row_count(&self) -> u64 {
        match self {
            Self::Rows(rows) => rows.len() as u64,
            Self::Affected(n) => *n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_value_serializes_untagged() {
        assert_eq!(serde_json::to_string(&ParamValue::Int(42)).unwrap(), "42");
        assert_eq!(
            serde_json::to_string(&ParamValue::Text("abc".into())).unwrap(),
            "\"abc\""
        );
        assert_eq!(serde_json::to_string(&ParamValue::Null).unwrap(), "null");
    }

    #[test]
    fn param_value_deserializes_by_shape() {
        let v: ParamValue = serde_json::from_str("7").unwrap();
        assert_eq!(v, ParamValue::Int(7));
        let v: ParamValue = serde_json::from_str("null").unwrap();
        assert_eq!(v, ParamValue::Null);
    }

    #[test]
    fn row_count_covers_both_shapes() {
        assert_eq!(QueryResult::Rows(vec![Row::new(), Row::new()]).row_count(), 2);
        assert_eq!(QueryResult::Affected(9).row_count(), 9);
    }
}
