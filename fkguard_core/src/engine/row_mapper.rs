use std::cmp::Ordering;
use std::rc::Rc;

use tracing::trace;

use crate::engine::mapping::TypeConversions;
use crate::error::{FkError, Result};
use crate::storage::engine::{Index, RowIter, UpdaterHandle, VecRowIter};
use crate::storage::range::{IndexLookup, IndexRange, RangeColumnExpr};
use crate::storage::schema::Schema;
use crate::types::Row;
use crate::types::convert::Converted;
use crate::types::datatype::DataType;
use crate::types::value::{Value, compare_values, value_to_string};

/// Turns rows of a source table into point lookups against an index on
/// another table.
///
/// Built once per statement; lookups only read from it.
pub struct ForeignKeyRowMapper {
    /// Foreign key name, used in error messages.
    pub name: String,
    /// Table that supplies the rows being mapped.
    pub source_table: String,
    pub index: Option<Rc<dyn Index>>,
    pub updater: Option<UpdaterHandle>,
    pub source_schema: Schema,
    /// Indexed by source row position.
    pub type_conversions: Option<TypeConversions>,
    /// For each leading index column, the source row position feeding it.
    pub index_positions: Vec<usize>,
    /// Types of trailing index columns matched with an open range.
    pub append_types: Vec<DataType>,
}

impl ForeignKeyRowMapper {
    pub fn is_initialized(&self) -> bool {
        self.index.is_some() && self.updater.is_some()
    }

    /// Rows on the target table whose index key matches the foreign key values
    /// in `row`. The caller owns the iterator and must close it.
    pub fn get_iter(&self, row: &Row, reference_check: bool) -> Result<Box<dyn RowIter>> {
        let (Some(index), Some(updater)) = (&self.index, &self.updater) else {
            return Err(FkError::Uninitialized {
                name: self.name.clone(),
            });
        };

        let mut columns =
            Vec::with_capacity(self.index_positions.len() + self.append_types.len());
        for &pos in &self.index_positions {
            let value = row.get(pos).ok_or_else(|| FkError::RowArity {
                table: self.source_table.clone(),
                expected: self.source_schema.column_count(),
                actual: row.len(),
            })?;
            if value.is_null() {
                return Ok(Box::new(VecRowIter::empty()));
            }
            let conversion = self
                .type_conversions
                .as_ref()
                .and_then(|convs| convs.get(pos))
                .and_then(Option::as_ref);
            let column = match conversion {
                Some(conv) => match conv.apply(value) {
                    Converted::Value(v) => RangeColumnExpr::point(v, conv.to.clone()),
                    Converted::FilterOut => {
                        trace!(fk = %self.name, value = %value, "value cannot exist on target, empty lookup");
                        return Ok(Box::new(VecRowIter::empty()));
                    }
                },
                None => {
                    RangeColumnExpr::point(value.clone(), self.source_schema.columns[pos].dtype.clone())
                }
            };
            columns.push(column);
        }
        for dtype in &self.append_types {
            columns.push(RangeColumnExpr::all(dtype.clone()));
        }

        let range = IndexRange(columns);
        if !index.can_support(&range) {
            return Err(FkError::InvalidLookup {
                index: index.id().to_string(),
                range: range.debug_string(),
            });
        }
        trace!(
            fk = %self.name,
            index = index.id(),
            range = %range.debug_string(),
            reference_check,
            "foreign key lookup"
        );

        let mut access = updater.indexed_access(IndexLookup {
            index: Rc::clone(index),
            ranges: vec![range],
        })?;
        if reference_check {
            if let Some(checker) = access.as_reference_checker() {
                checker.set_reference_check()?;
            }
        }
        access.rows()
    }

    /// The first matching row, if any. Closes the iterator.
    pub fn first_match(&self, row: &Row, reference_check: bool) -> Result<Option<Row>> {
        let rows = drain(self.get_iter(row, reference_check)?, true)?;
        Ok(rows.into_iter().next())
    }

    /// Every matching row, materialised before the caller mutates anything.
    pub fn matching_rows(&self, row: &Row, reference_check: bool) -> Result<Vec<Row>> {
        drain(self.get_iter(row, reference_check)?, false)
    }

    /// Foreign key values of `row`, rendered as `[v1,v2]`.
    pub fn key_string(&self, row: &Row) -> String {
        let parts: Vec<String> = self
            .index_positions
            .iter()
            .map(|&pos| row.get(pos).map(value_to_string).unwrap_or_default())
            .collect();
        format!("[{}]", parts.join(","))
    }

    /// Whether any mapped column differs between `old` and `new`.
    pub fn key_changed(&self, old: &Row, new: &Row) -> bool {
        self.index_positions
            .iter()
            .any(|&pos| match (old.get(pos), new.get(pos)) {
                (Some(a), Some(b)) => compare_values(a, b) != Ordering::Equal,
                (a, b) => a.is_some() != b.is_some(),
            })
    }

    pub fn has_null_key(&self, row: &Row) -> bool {
        self.index_positions
            .iter()
            .any(|&pos| row.get(pos).is_none_or(Value::is_null))
    }
}

fn drain(mut iter: Box<dyn RowIter>, first_only: bool) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    let mut failure = None;
    for next in iter.by_ref() {
        match next {
            Ok(row) => {
                rows.push(row);
                if first_only {
                    break;
                }
            }
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    let closed = iter.close();
    if let Some(e) = failure {
        return Err(e);
    }
    closed?;
    Ok(rows)
}
