use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::trace;

use crate::engine::constraint::ForeignKeyConstraint;
use crate::error::{FkError, Result};
use crate::storage::engine::{IndexConstraint, IndexDef};
use crate::storage::range::IndexRange;
use crate::storage::schema::Schema;
use crate::types::Row;
use crate::types::value::{Value, compare_values, value_to_string};

pub const PRIMARY_INDEX: &str = "PRIMARY";

/// Metadata and rows of one in-memory table.
#[derive(Debug, Clone)]
pub struct TableData {
    pub name: String,
    pub database: String,
    pub schema: Schema,
    pub temporary: bool,
    pub indexes: Vec<IndexDef>,
    /// Foreign keys declared on this table.
    pub foreign_keys: Vec<ForeignKeyConstraint>,
    pub rows: Vec<Row>,
    /// Indexed accesses marked as reference checks.
    pub reference_checks: usize,
    /// Mutation handles handed out for this table.
    pub opens: usize,
    /// Times a mutation handle on this table was closed.
    pub closes: usize,
}

impl TableData {
    fn index(&self, id: &str) -> Result<&IndexDef> {
        self.indexes
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(id))
            .ok_or_else(|| FkError::Storage(format!("index '{}' does not exist on '{}'", id, self.name)))
    }

    /// Schema positions of the index columns followed by any primary-key
    /// columns the index does not already cover.
    pub fn key_positions(&self, def: &IndexDef) -> Result<Vec<usize>> {
        let mut positions = Vec::with_capacity(def.columns.len());
        for col in &def.columns {
            let pos = self
                .schema
                .index_of(&col.name)
                .ok_or_else(|| FkError::ColumnNotFound {
                    table: self.name.clone(),
                    column: col.name.clone(),
                })?;
            positions.push(pos);
        }
        for (pos, col) in self.schema.columns.iter().enumerate() {
            if col.primary_key && !positions.contains(&pos) {
                positions.push(pos);
            }
        }
        Ok(positions)
    }

    /// Checks that `row` does not duplicate the key of any unique index,
    /// ignoring the row at `skip`.
    fn check_unique(&self, row: &Row, skip: Option<usize>) -> Result<()> {
        for def in self.indexes.iter().filter(|i| i.constraint == IndexConstraint::Unique) {
            let positions = self.key_positions(def)?;
            let key = &positions[..def.columns.len()];
            if key.iter().any(|&p| row[p].is_null()) {
                continue;
            }
            let clash = self.rows.iter().enumerate().any(|(i, existing)| {
                Some(i) != skip
                    && key
                        .iter()
                        .all(|&p| compare_values(&existing[p], &row[p]) == Ordering::Equal)
            });
            if clash {
                let parts: Vec<String> = key.iter().map(|&p| value_to_string(&row[p])).collect();
                return Err(FkError::UniqueViolation {
                    table: self.name.clone(),
                    index: def.name.clone(),
                    key: format!("[{}]", parts.join(",")),
                });
            }
        }
        Ok(())
    }

    fn check_arity(&self, row: &Row) -> Result<()> {
        if row.len() != self.schema.column_count() {
            return Err(FkError::RowArity {
                table: self.name.clone(),
                expected: self.schema.column_count(),
                actual: row.len(),
            });
        }
        Ok(())
    }

    fn position_of(&self, row: &Row) -> Option<usize> {
        self.rows.iter().position(|r| rows_equal(r, row))
    }
}

fn rows_equal(a: &Row, b: &Row) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| compare_values(x, y) == Ordering::Equal)
}

/// Every table of an in-memory database, keyed by lowercased name.
#[derive(Debug, Default)]
pub struct CatalogState {
    tables: HashMap<String, TableData>,
}

impl CatalogState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, table: &str) -> bool {
        self.tables.contains_key(&table.to_lowercase())
    }

    /// Creates a table. A primary key gets a unique `PRIMARY` index.
    pub fn create_table(
        &mut self,
        database: &str,
        name: &str,
        schema: Schema,
        temporary: bool,
    ) -> Result<()> {
        if self.exists(name) {
            return Err(FkError::Storage(format!("table '{}' already exists", name)));
        }
        let pk = schema.primary_key();
        let mut indexes = Vec::new();
        if !pk.is_empty() {
            let cols: Vec<&str> = pk.iter().map(String::as_str).collect();
            indexes.push(IndexDef::new(PRIMARY_INDEX, &cols).unique());
        }
        self.tables.insert(
            name.to_lowercase(),
            TableData {
                name: name.to_string(),
                database: database.to_string(),
                schema,
                temporary,
                indexes,
                foreign_keys: Vec::new(),
                rows: Vec::new(),
                reference_checks: 0,
                opens: 0,
                closes: 0,
            },
        );
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<&TableData> {
        self.tables
            .get(&name.to_lowercase())
            .ok_or_else(|| FkError::TableNotFound {
                table: name.to_string(),
            })
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut TableData> {
        self.tables
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| FkError::TableNotFound {
                table: name.to_string(),
            })
    }

    pub fn create_index(&mut self, table: &str, def: IndexDef) -> Result<()> {
        let data = self.table_mut(table)?;
        if data.indexes.iter().any(|i| i.name.eq_ignore_ascii_case(&def.name)) {
            return Err(FkError::DuplicateKey { name: def.name });
        }
        data.key_positions(&def)?;
        let unique = def.constraint == IndexConstraint::Unique;
        data.indexes.push(def);
        if unique {
            for i in 0..data.rows.len() {
                if let Err(e) = data.check_unique(&data.rows[i], Some(i)) {
                    data.indexes.pop();
                    return Err(e);
                }
            }
        }
        trace!(table, indexes = data.indexes.len(), "index created");
        Ok(())
    }

    pub fn insert(&mut self, table: &str, row: Row) -> Result<()> {
        let data = self.table_mut(table)?;
        data.check_arity(&row)?;
        data.check_unique(&row, None)?;
        data.rows.push(row);
        Ok(())
    }

    /// Replaces `old` with `new`. A row that no longer exists is skipped.
    pub fn update_row(&mut self, table: &str, old: &Row, new: &Row) -> Result<()> {
        let data = self.table_mut(table)?;
        data.check_arity(new)?;
        let Some(pos) = data.position_of(old) else {
            trace!(table, "update target already gone");
            return Ok(());
        };
        data.check_unique(new, Some(pos))?;
        data.rows[pos] = new.clone();
        Ok(())
    }

    /// Removes `row`. A row that no longer exists is skipped.
    pub fn delete_row(&mut self, table: &str, row: &Row) -> Result<()> {
        let data = self.table_mut(table)?;
        match data.position_of(row) {
            Some(pos) => {
                data.rows.remove(pos);
            }
            None => trace!(table, "delete target already gone"),
        }
        Ok(())
    }

    /// Rows whose index key falls inside any of `ranges`.
    pub fn lookup(&self, table: &str, index: &str, ranges: &[IndexRange]) -> Result<Vec<Row>> {
        let data = self.table(table)?;
        let positions = data.key_positions(data.index(index)?)?;
        let rows = data
            .rows
            .iter()
            .filter(|row| {
                let key: Vec<Value> = positions.iter().map(|&p| row[p].clone()).collect();
                ranges.iter().any(|r| r.matches(&key))
            })
            .cloned()
            .collect();
        Ok(rows)
    }

    /// Foreign keys on any table that reference `database.table`.
    pub fn referencing(&self, database: &str, table: &str) -> Vec<ForeignKeyConstraint> {
        let mut out: Vec<ForeignKeyConstraint> = self
            .tables
            .values()
            .flat_map(|t| t.foreign_keys.iter())
            .filter(|fk| {
                fk.parent_table.eq_ignore_ascii_case(table)
                    && (fk.parent_database.is_empty()
                        || fk.parent_database.eq_ignore_ascii_case(database))
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| a.table.cmp(&b.table).then_with(|| a.name.cmp(&b.name)));
        out
    }

    pub fn add_foreign_key(&mut self, table: &str, fk: ForeignKeyConstraint) -> Result<()> {
        let data = self.table_mut(table)?;
        if data.foreign_keys.iter().any(|f| f.name.eq_ignore_ascii_case(&fk.name)) {
            return Err(FkError::DuplicateName { name: fk.name });
        }
        data.foreign_keys.push(fk);
        Ok(())
    }

    pub fn update_foreign_key(
        &mut self,
        table: &str,
        name: &str,
        fk: ForeignKeyConstraint,
    ) -> Result<()> {
        let data = self.table_mut(table)?;
        let slot = data
            .foreign_keys
            .iter_mut()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| FkError::ForeignKeyNotFound {
                table: table.to_string(),
                name: name.to_string(),
            })?;
        *slot = fk;
        Ok(())
    }

    pub fn drop_foreign_key(&mut self, table: &str, name: &str) -> Result<()> {
        let data = self.table_mut(table)?;
        let before = data.foreign_keys.len();
        data.foreign_keys.retain(|f| !f.name.eq_ignore_ascii_case(name));
        if data.foreign_keys.len() == before {
            return Err(FkError::ForeignKeyNotFound {
                table: table.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }
}
