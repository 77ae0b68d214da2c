use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::engine::constraint::ForeignKeyConstraint;
use crate::error::{FkError, Result};
use crate::storage::catalog::{CatalogState, TableData};
use crate::storage::engine::{
    ExtendedIndex, ForeignKeyTable, ForeignKeyUpdater, Index, IndexColumnType, IndexConstraint,
    IndexDef, IndexedAccess, ReferenceChecker, RowIter, TableResolver, TemporaryTable,
    UpdaterHandle, VecRowIter,
};
use crate::storage::range::{IndexLookup, IndexRange};
use crate::storage::schema::Schema;
use crate::types::Row;
use crate::types::value::parse_value;

/// In-memory database implementing every table capability the foreign-key
/// engine consumes. Clones share the same tables.
#[derive(Debug, Clone)]
pub struct MemDatabase {
    name: String,
    state: Rc<RefCell<CatalogState>>,
}

impl MemDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Rc::new(RefCell::new(CatalogState::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn create_table(&self, name: &str, schema: Schema) -> Result<MemTable> {
        self.state
            .borrow_mut()
            .create_table(&self.name, name, schema, false)?;
        self.table(name)
    }

    pub fn create_temporary_table(&self, name: &str, schema: Schema) -> Result<MemTable> {
        self.state
            .borrow_mut()
            .create_table(&self.name, name, schema, true)?;
        self.table(name)
    }

    pub fn create_index(&self, table: &str, def: IndexDef) -> Result<()> {
        self.state.borrow_mut().create_index(table, def)
    }

    pub fn insert(&self, table: &str, row: Row) -> Result<()> {
        self.state.borrow_mut().insert(table, row)
    }

    /// Parses one literal per column, then inserts the row.
    pub fn insert_tokens(&self, table: &str, tokens: &[&str]) -> Result<()> {
        let schema = self.state.borrow().table(table)?.schema.clone();
        if tokens.len() != schema.column_count() {
            return Err(FkError::RowArity {
                table: table.to_string(),
                expected: schema.column_count(),
                actual: tokens.len(),
            });
        }
        let row = schema
            .columns
            .iter()
            .zip(tokens)
            .map(|(col, token)| parse_value(&col.dtype, token))
            .collect::<Result<Row>>()?;
        self.insert(table, row)
    }

    pub fn rows(&self, table: &str) -> Result<Vec<Row>> {
        Ok(self.state.borrow().table(table)?.rows.clone())
    }

    pub fn table(&self, name: &str) -> Result<MemTable> {
        let state = self.state.borrow();
        let data = state.table(name)?;
        Ok(MemTable {
            database: data.database.clone(),
            name: data.name.clone(),
            state: Rc::clone(&self.state),
        })
    }

    pub fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyConstraint>> {
        Ok(self.state.borrow().table(table)?.foreign_keys.clone())
    }

    /// Index lookups on `table` that were marked as reference checks.
    pub fn reference_check_count(&self, table: &str) -> Result<usize> {
        Ok(self.state.borrow().table(table)?.reference_checks)
    }

    /// Mutation handles handed out for `table`.
    pub fn open_count(&self, table: &str) -> Result<usize> {
        Ok(self.state.borrow().table(table)?.opens)
    }

    /// Times a mutation handle on `table` was closed.
    pub fn close_count(&self, table: &str) -> Result<usize> {
        Ok(self.state.borrow().table(table)?.closes)
    }
}

impl TableResolver for MemDatabase {
    fn resolve_table(&self, database: &str, name: &str) -> Result<Rc<dyn ForeignKeyTable>> {
        if !database.is_empty() && !database.eq_ignore_ascii_case(&self.name) {
            return Err(FkError::TableNotFound {
                table: format!("{}.{}", database, name),
            });
        }
        Ok(Rc::new(self.table(name)?))
    }
}

/// Handle on one table of a [`MemDatabase`].
#[derive(Debug, Clone)]
pub struct MemTable {
    database: String,
    name: String,
    state: Rc<RefCell<CatalogState>>,
}

impl MemTable {
    fn with_data<T>(&self, f: impl FnOnce(&TableData) -> T) -> Result<T> {
        let state = self.state.borrow();
        Ok(f(state.table(&self.name)?))
    }
}

impl TemporaryTable for MemTable {
    fn is_temporary(&self) -> bool {
        self.with_data(|d| d.temporary).unwrap_or(false)
    }
}

impl ForeignKeyTable for MemTable {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn database(&self) -> String {
        self.database.clone()
    }

    fn schema(&self) -> Schema {
        self.with_data(|d| d.schema.clone()).unwrap_or_default()
    }

    fn as_temporary(&self) -> Option<&dyn TemporaryTable> {
        Some(self)
    }

    fn indexes(&self) -> Result<Vec<Rc<dyn Index>>> {
        let state = self.state.borrow();
        let data = state.table(&self.name)?;
        let mut out: Vec<Rc<dyn Index>> = Vec::with_capacity(data.indexes.len());
        for def in &data.indexes {
            out.push(Rc::new(MemIndex::from_def(data, def)?));
        }
        Ok(out)
    }

    fn declared_foreign_keys(&self) -> Result<Vec<ForeignKeyConstraint>> {
        self.with_data(|d| d.foreign_keys.clone())
    }

    fn referenced_foreign_keys(&self) -> Result<Vec<ForeignKeyConstraint>> {
        Ok(self.state.borrow().referencing(&self.database, &self.name))
    }

    fn add_foreign_key(&self, fk: ForeignKeyConstraint) -> Result<()> {
        self.state.borrow_mut().add_foreign_key(&self.name, fk)
    }

    fn update_foreign_key(&self, name: &str, fk: ForeignKeyConstraint) -> Result<()> {
        self.state
            .borrow_mut()
            .update_foreign_key(&self.name, name, fk)
    }

    fn drop_foreign_key(&self, name: &str) -> Result<()> {
        self.state.borrow_mut().drop_foreign_key(&self.name, name)
    }

    fn create_index_for_foreign_key(&self, def: IndexDef) -> Result<()> {
        self.state.borrow_mut().create_index(&self.name, def)
    }

    fn foreign_key_updater(&self) -> UpdaterHandle {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            if let Ok(data) = state.table_mut(&self.name) {
                data.opens += 1;
            }
        }
        Rc::new(MemUpdater {
            table: self.name.clone(),
            state: Rc::clone(&self.state),
        })
    }

    fn scan(&self) -> Result<Box<dyn RowIter>> {
        let rows = self.with_data(|d| d.rows.clone())?;
        Ok(Box::new(VecRowIter::new(rows)))
    }
}

/// Snapshot of an index definition resolved against its table's schema.
#[derive(Debug, Clone)]
pub struct MemIndex {
    id: String,
    table: String,
    columns: Vec<IndexColumnType>,
    /// `columns` followed by the primary-key columns they lack.
    extended: Vec<IndexColumnType>,
    constraint: IndexConstraint,
    prefix_lengths: Vec<u16>,
}

impl MemIndex {
    fn from_def(data: &TableData, def: &IndexDef) -> Result<Self> {
        let extended: Vec<IndexColumnType> = data
            .key_positions(def)?
            .into_iter()
            .map(|p| {
                let col = &data.schema.columns[p];
                IndexColumnType {
                    expression: col.name.clone(),
                    dtype: col.dtype.clone(),
                }
            })
            .collect();
        Ok(Self {
            id: def.name.clone(),
            table: data.name.clone(),
            columns: extended[..def.columns.len()].to_vec(),
            extended,
            constraint: def.constraint,
            prefix_lengths: def.columns.iter().filter_map(|c| c.prefix_length).collect(),
        })
    }
}

impl Index for MemIndex {
    fn id(&self) -> &str {
        &self.id
    }

    fn table(&self) -> &str {
        &self.table
    }

    fn expressions(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.expression.clone()).collect()
    }

    fn column_types(&self) -> Vec<IndexColumnType> {
        self.columns.clone()
    }

    fn is_unique(&self) -> bool {
        self.constraint == IndexConstraint::Unique
    }

    fn is_spatial(&self) -> bool {
        self.constraint == IndexConstraint::Spatial
    }

    fn is_full_text(&self) -> bool {
        self.constraint == IndexConstraint::FullText
    }

    fn prefix_lengths(&self) -> Vec<u16> {
        self.prefix_lengths.clone()
    }

    fn can_support(&self, range: &IndexRange) -> bool {
        range.len() == self.columns.len() || range.len() == self.extended.len()
    }

    fn as_extended(&self) -> Option<&dyn ExtendedIndex> {
        Some(self)
    }
}

impl ExtendedIndex for MemIndex {
    fn extended_expressions(&self) -> Vec<String> {
        self.extended.iter().map(|c| c.expression.clone()).collect()
    }

    fn extended_column_types(&self) -> Vec<IndexColumnType> {
        self.extended.clone()
    }
}

/// Mutation handle on one in-memory table.
pub struct MemUpdater {
    table: String,
    state: Rc<RefCell<CatalogState>>,
}

impl ForeignKeyUpdater for MemUpdater {
    fn update(&self, old: &Row, new: &Row) -> Result<()> {
        self.state.borrow_mut().update_row(&self.table, old, new)
    }

    fn delete(&self, row: &Row) -> Result<()> {
        self.state.borrow_mut().delete_row(&self.table, row)
    }

    fn indexed_access(&self, lookup: IndexLookup) -> Result<Box<dyn IndexedAccess>> {
        if !lookup.index.table().eq_ignore_ascii_case(&self.table) {
            return Err(FkError::Storage(format!(
                "index '{}' belongs to '{}', not '{}'",
                lookup.index.id(),
                lookup.index.table(),
                self.table
            )));
        }
        Ok(Box::new(MemIndexedAccess {
            table: self.table.clone(),
            state: Rc::clone(&self.state),
            lookup,
            reference_check: false,
        }))
    }

    fn close(&self) -> Result<()> {
        self.state.borrow_mut().table_mut(&self.table)?.closes += 1;
        Ok(())
    }
}

struct MemIndexedAccess {
    table: String,
    state: Rc<RefCell<CatalogState>>,
    lookup: IndexLookup,
    reference_check: bool,
}

impl ReferenceChecker for MemIndexedAccess {
    fn set_reference_check(&mut self) -> Result<()> {
        self.reference_check = true;
        Ok(())
    }
}

impl IndexedAccess for MemIndexedAccess {
    fn as_reference_checker(&mut self) -> Option<&mut dyn ReferenceChecker> {
        Some(self)
    }

    fn rows(self: Box<Self>) -> Result<Box<dyn RowIter>> {
        let mut state = self.state.borrow_mut();
        if self.reference_check {
            state.table_mut(&self.table)?.reference_checks += 1;
        }
        let rows = state.lookup(&self.table, self.lookup.index.id(), &self.lookup.ranges)?;
        trace!(
            table = %self.table,
            index = self.lookup.index.id(),
            matched = rows.len(),
            "indexed access"
        );
        Ok(Box::new(VecRowIter::new(rows)))
    }
}
