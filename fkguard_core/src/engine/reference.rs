use std::cmp::Ordering;
use std::collections::HashMap;

use crate::engine::constraint::ForeignKeyConstraint;
use crate::engine::row_mapper::ForeignKeyRowMapper;
use crate::error::{FkError, Result};
use crate::storage::engine::ForeignKeyTable;
use crate::types::Row;
use crate::types::value::compare_values;

/// Verifies that child rows point at an existing parent row.
pub struct ForeignKeyReferenceHandler {
    pub foreign_key: ForeignKeyConstraint,
    /// Maps child rows onto the parent's index.
    pub row_mapper: ForeignKeyRowMapper,
    /// Column positions of the single table, filled for self-referential keys.
    pub self_cols: HashMap<String, usize>,
}

impl ForeignKeyReferenceHandler {
    pub fn new(foreign_key: ForeignKeyConstraint, row_mapper: ForeignKeyRowMapper) -> Self {
        let self_cols = if foreign_key.is_self_referential() {
            row_mapper
                .source_schema
                .columns
                .iter()
                .enumerate()
                .map(|(i, c)| (c.name.to_lowercase(), i))
                .collect()
        } else {
            HashMap::new()
        };
        Self {
            foreign_key,
            row_mapper,
            self_cols,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.row_mapper.is_initialized()
    }

    pub fn check_reference(&self, row: &Row) -> Result<()> {
        if self.row_mapper.has_null_key(row) {
            return Ok(());
        }
        if self.row_mapper.first_match(row, true)?.is_some() {
            return self.validate_column_type_constraints(row);
        }
        if self.foreign_key.is_self_referential() && self.references_itself(row) {
            return Ok(());
        }
        Err(self.violation(row))
    }

    /// Checks every row currently stored in `table`, stopping at the first
    /// violation.
    pub fn check_table(&self, table: &dyn ForeignKeyTable) -> Result<()> {
        let mut rows = table.scan()?;
        let mut outcome = Ok(());
        for next in rows.by_ref() {
            outcome = next.and_then(|row| self.check_reference(&row));
            if outcome.is_err() {
                break;
            }
        }
        let closed = rows.close();
        outcome?;
        closed
    }

    /// A matching parent row still violates the key when the declared decimal
    /// scale or fractional-second precision differs between the two columns.
    fn validate_column_type_constraints(&self, row: &Row) -> Result<()> {
        let Some(index) = &self.row_mapper.index else {
            return Ok(());
        };
        let parent_types = index.lookup_column_types();
        for (parent_col, &pos) in parent_types.iter().zip(&self.row_mapper.index_positions) {
            let child_type = &self.row_mapper.source_schema.columns[pos].dtype;
            let parent_type = &parent_col.dtype;
            if let (Some(a), Some(b)) = (child_type.decimal_scale(), parent_type.decimal_scale()) {
                if a != b {
                    return Err(self.violation(row));
                }
            }
            if child_type.is_date_time() || child_type.is_time_of_day() {
                if let (Some(a), Some(b)) = (
                    child_type.fractional_precision(),
                    parent_type.fractional_precision(),
                ) {
                    if a != b {
                        return Err(self.violation(row));
                    }
                }
            }
        }
        Ok(())
    }

    fn references_itself(&self, row: &Row) -> bool {
        self.foreign_key
            .columns
            .iter()
            .zip(&self.foreign_key.parent_columns)
            .all(|(child, parent)| {
                let child = self.self_cols.get(&child.to_lowercase()).and_then(|&i| row.get(i));
                let parent = self.self_cols.get(&parent.to_lowercase()).and_then(|&i| row.get(i));
                match (child, parent) {
                    (Some(c), Some(p)) => compare_values(c, p) == Ordering::Equal,
                    _ => false,
                }
            })
    }

    fn violation(&self, row: &Row) -> FkError {
        FkError::ChildViolation {
            name: self.foreign_key.name.clone(),
            table: self.foreign_key.table.clone(),
            parent_table: self.foreign_key.parent_table.clone(),
            key: self.row_mapper.key_string(row),
        }
    }
}
