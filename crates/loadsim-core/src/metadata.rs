use serde::{Deserialize, Serialize};

/// Cached per-table metadata used by parameter generation.
///
/// Refreshed externally between simulation phases and read-only during a run.
/// Bounds may be absent when the table has no rows yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Primary key column, when known.
    pub pk_column: Option<String>,
    /// Smallest observed primary key value.
    pub min_id: Option<i64>,
    /// Largest observed primary key value.
    pub max_id: Option<i64>,
}

impl TableMetadata {
    /// Both id bounds, when both are present.
    #[must_use]
    pub fn bounds(&self) -> Option<(i64, i64)> {
        match (self.min_id, self.max_id) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_require_both_ends() {
        let meta = TableMetadata {
            pk_column: Some("id".into()),
            min_id: Some(1),
            max_id: None,
        };
        assert_eq!(meta.bounds(), None);

        let meta = TableMetadata {
            pk_column: Some("id".into()),
            min_id: Some(1),
            max_id: Some(10),
        };
        assert_eq!(meta.bounds(), Some((1, 10)));
    }
}
