use std::collections::HashMap;

use crate::engine::compat::foreign_key_comparable_types;
use crate::engine::constraint::ForeignKeyConstraint;
use crate::error::{FkError, Result};
use crate::storage::engine::Index;
use crate::storage::schema::Schema;
use crate::types::convert::{Converted, convert_to_type};
use crate::types::datatype::DataType;
use crate::types::value::Value;

/// For each child-schema column, the parent-schema column it maps to, or
/// `None` when the column is not part of the foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildParentMapping(Vec<Option<usize>>);

impl ChildParentMapping {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, child_pos: usize) -> Option<usize> {
        self.0.get(child_pos).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.0.iter().copied()
    }

    /// Parent positions that take part in the mapping.
    pub fn parent_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().filter_map(|p| *p)
    }
}

fn position_map(schema: &Schema) -> HashMap<String, usize> {
    schema
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.to_lowercase(), i))
        .collect()
}

pub fn get_child_parent_mapping(
    parent_schema: &Schema,
    child_schema: &Schema,
    fk: &ForeignKeyConstraint,
) -> Result<ChildParentMapping> {
    let parent_map = position_map(parent_schema);
    let child_map = position_map(child_schema);
    let mut mapping = vec![None; child_schema.column_count()];
    for (child_col, parent_col) in fk.columns.iter().zip(&fk.parent_columns) {
        let child_pos = *child_map
            .get(&child_col.to_lowercase())
            .ok_or_else(|| FkError::ColumnNotFound {
                table: fk.table.clone(),
                column: child_col.clone(),
            })?;
        let parent_pos = *parent_map
            .get(&parent_col.to_lowercase())
            .ok_or_else(|| FkError::ColumnNotFound {
                table: fk.parent_table.clone(),
                column: parent_col.clone(),
            })?;
        mapping[child_pos] = Some(parent_pos);
    }
    Ok(ChildParentMapping(mapping))
}

/// Maps the leading columns of `index` (on the destination table) back to
/// positions in rows of the local table.
///
/// Returns, per leading index column, the local row position feeding it, plus
/// the types of any trailing index columns the foreign key does not cover.
pub fn find_foreign_key_col_mapping(
    fk_name: &str,
    local_schema: &Schema,
    local_fk_cols: &[String],
    dest_fk_cols: &[String],
    index: &dyn Index,
) -> Result<(Vec<usize>, Vec<DataType>)> {
    let local_positions = position_map(local_schema);

    let mut append_types = Vec::new();
    let mut index_cols: HashMap<String, (usize, DataType)> = HashMap::new();
    for (i, col) in index.lookup_column_types().into_iter().enumerate() {
        if i >= dest_fk_cols.len() {
            append_types.push(col.dtype.clone());
        }
        index_cols.insert(col.expression.to_lowercase(), (i, col.dtype));
    }

    let mut index_positions = vec![0usize; dest_fk_cols.len()];
    for (local_col, dest_col) in local_fk_cols.iter().zip(dest_fk_cols) {
        let local_pos = *local_positions
            .get(&local_col.to_lowercase())
            .ok_or_else(|| FkError::ColumnNotFound {
                table: fk_name.to_string(),
                column: local_col.clone(),
            })?;
        let (index_pos, dest_type) = index_cols
            .get(&dest_col.to_lowercase())
            .ok_or_else(|| FkError::IndexMissingColumn {
                index: index.id().to_string(),
                column: dest_col.clone(),
            })?;
        if *index_pos >= index_positions.len() {
            return Err(FkError::IndexMissingColumn {
                index: index.id().to_string(),
                column: dest_col.clone(),
            });
        }
        let local_type = &local_schema.columns[local_pos].dtype;
        if !foreign_key_comparable_types(local_type, dest_type) {
            return Err(FkError::ColumnTypeMismatch {
                column: local_col.clone(),
                parent_column: dest_col.clone(),
            });
        }
        index_positions[*index_pos] = local_pos;
    }
    Ok((index_positions, append_types))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionDirection {
    ChildToParent,
    ParentToChild,
}

/// Converts values of one column type into another column type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeConversion {
    pub from: DataType,
    pub to: DataType,
}

impl TypeConversion {
    pub fn apply(&self, value: &Value) -> Converted {
        convert_to_type(&self.to, &self.from, value)
    }
}

/// Per-source-row-position conversions, `None` where the types already agree.
pub type TypeConversions = Vec<Option<TypeConversion>>;

/// Builds value conversions between mismatched but compatible column types.
///
/// Returns `Ok(None)` when every pair is identical, or when any mismatched
/// pair involves a type without conversion support; callers then compare raw
/// values. The returned vector is indexed by position in the source rows:
/// the child schema for `ChildToParent`, the parent schema otherwise.
pub fn get_foreign_key_type_conversions(
    parent_schema: &Schema,
    child_schema: &Schema,
    fk: &ForeignKeyConstraint,
    direction: ConversionDirection,
) -> Result<Option<TypeConversions>> {
    let mapping = get_child_parent_mapping(parent_schema, child_schema, fk)?;
    let mut conversions: Option<TypeConversions> = None;
    for (child_pos, parent_pos) in mapping.iter().enumerate() {
        let Some(parent_pos) = parent_pos else {
            continue;
        };
        let child_type = &child_schema.columns[child_pos].dtype;
        let parent_type = &parent_schema.columns[parent_pos].dtype;
        if child_type == parent_type {
            continue;
        }
        if !child_type.is_extended() || !parent_type.is_extended() {
            return Ok(None);
        }
        let (slot, len, conversion) = match direction {
            ConversionDirection::ChildToParent => (
                child_pos,
                child_schema.column_count(),
                TypeConversion {
                    from: child_type.clone(),
                    to: parent_type.clone(),
                },
            ),
            ConversionDirection::ParentToChild => (
                parent_pos,
                parent_schema.column_count(),
                TypeConversion {
                    from: parent_type.clone(),
                    to: child_type.clone(),
                },
            ),
        };
        let convs = conversions.get_or_insert_with(|| vec![None; len]);
        convs[slot] = Some(conversion);
    }
    Ok(conversions)
}
