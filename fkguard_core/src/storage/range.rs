use std::cmp::Ordering;
use std::rc::Rc;

use crate::storage::engine::Index;
use crate::types::datatype::DataType;
use crate::types::value::{compare_values, value_to_string, Value};

/// Bounds on a single index column.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeColumnExpr {
    /// `lower <= v <= upper`. NULL never falls inside a closed range.
    Closed {
        lower: Value,
        upper: Value,
        dtype: DataType,
    },
    /// Any value, NULL included.
    All { dtype: DataType },
}

impl RangeColumnExpr {
    pub fn point(value: Value, dtype: DataType) -> Self {
        RangeColumnExpr::Closed {
            lower: value.clone(),
            upper: value,
            dtype,
        }
    }

    pub fn all(dtype: DataType) -> Self {
        RangeColumnExpr::All { dtype }
    }

    pub fn contains(&self, v: &Value) -> bool {
        match self {
            RangeColumnExpr::All { .. } => true,
            RangeColumnExpr::Closed { lower, upper, .. } => {
                !v.is_null()
                    && compare_values(v, lower) != Ordering::Less
                    && compare_values(v, upper) != Ordering::Greater
            }
        }
    }
}

/// One range per leading index column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexRange(pub Vec<RangeColumnExpr>);

impl IndexRange {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every column value falls inside its column range.
    pub fn matches(&self, values: &[Value]) -> bool {
        self.0.len() <= values.len() && self.0.iter().zip(values).all(|(r, v)| r.contains(v))
    }

    pub fn debug_string(&self) -> String {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|r| match r {
                RangeColumnExpr::All { .. } => "(-inf, +inf)".to_string(),
                RangeColumnExpr::Closed { lower, upper, .. } => format!(
                    "[{}, {}]",
                    value_to_string(lower),
                    value_to_string(upper)
                ),
            })
            .collect();
        format!("({})", parts.join(", "))
    }
}

/// A lookup against one index, matching rows inside any of the ranges.
#[derive(Clone)]
pub struct IndexLookup {
    pub index: Rc<dyn Index>,
    pub ranges: Vec<IndexRange>,
}

impl std::fmt::Debug for IndexLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexLookup")
            .field("index", &self.index.id())
            .field("ranges", &self.ranges)
            .finish()
    }
}
