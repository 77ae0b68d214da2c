//! Capabilities the foreign-key engine consumes from tables and indexes.
//!
//! Implementations are driven from a single thread, one row at a time, so
//! table handles take `&self` and keep their mutable state behind interior
//! mutability. Optional capabilities are discovered with the `as_*` methods,
//! which return `None` unless an implementation opts in.

use std::rc::Rc;

use crate::engine::constraint::ForeignKeyConstraint;
use crate::error::Result;
use crate::storage::range::{IndexLookup, IndexRange};
use crate::storage::schema::Schema;
use crate::types::Row;
use crate::types::datatype::DataType;

/// An index column together with its type.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexColumnType {
    pub expression: String,
    pub dtype: DataType,
}

pub trait Index {
    /// Stable identifier, unique within the table.
    fn id(&self) -> &str;

    fn table(&self) -> &str;

    /// Column names covered by the index, in index order.
    fn expressions(&self) -> Vec<String>;

    fn column_types(&self) -> Vec<IndexColumnType>;

    fn is_unique(&self) -> bool;

    fn is_spatial(&self) -> bool {
        false
    }

    fn is_full_text(&self) -> bool {
        false
    }

    /// Per-column prefix lengths. Any entry makes the index unusable for
    /// foreign keys.
    fn prefix_lengths(&self) -> Vec<u16> {
        Vec::new()
    }

    fn can_support(&self, range: &IndexRange) -> bool;

    fn as_extended(&self) -> Option<&dyn ExtendedIndex> {
        None
    }

    /// Column types a lookup has to cover, implicit suffix included.
    fn lookup_column_types(&self) -> Vec<IndexColumnType> {
        match self.as_extended() {
            Some(ext) => ext.extended_column_types(),
            None => self.column_types(),
        }
    }
}

/// An index whose physical key also carries the table's primary-key columns.
pub trait ExtendedIndex {
    /// Index expressions followed by the implicit primary-key suffix.
    fn extended_expressions(&self) -> Vec<String>;

    fn extended_column_types(&self) -> Vec<IndexColumnType>;
}

/// A scoped cursor over rows. Callers must `close` it on every exit path.
pub trait RowIter: Iterator<Item = Result<Row>> {
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Row iterator over an already materialised batch.
#[derive(Debug, Default)]
pub struct VecRowIter {
    rows: std::vec::IntoIter<Row>,
}

impl VecRowIter {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl Iterator for VecRowIter {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(Ok)
    }
}

impl RowIter for VecRowIter {}

/// Marks an indexed access as integrity-check traffic rather than an
/// ordinary read.
pub trait ReferenceChecker {
    fn set_reference_check(&mut self) -> Result<()>;
}

/// A prepared index-restricted access to a table.
pub trait IndexedAccess {
    fn as_reference_checker(&mut self) -> Option<&mut dyn ReferenceChecker> {
        None
    }

    fn rows(self: Box<Self>) -> Result<Box<dyn RowIter>>;
}

/// Mutation handle for one table, shared by every editor and row mapper that
/// touches it during a statement.
pub trait ForeignKeyUpdater {
    fn update(&self, old: &Row, new: &Row) -> Result<()>;

    fn delete(&self, row: &Row) -> Result<()>;

    fn indexed_access(&self, lookup: IndexLookup) -> Result<Box<dyn IndexedAccess>>;

    fn close(&self) -> Result<()>;
}

pub type UpdaterHandle = Rc<dyn ForeignKeyUpdater>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexConstraint {
    #[default]
    None,
    Unique,
    Spatial,
    FullText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumnDef {
    pub name: String,
    pub prefix_length: Option<u16>,
}

impl IndexColumnDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix_length: None,
        }
    }
}

/// Definition used to create an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<IndexColumnDef>,
    pub constraint: IndexConstraint,
}

impl IndexDef {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| IndexColumnDef::new(*c)).collect(),
            constraint: IndexConstraint::None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.constraint = IndexConstraint::Unique;
        self
    }

    pub fn with_constraint(mut self, constraint: IndexConstraint) -> Self {
        self.constraint = constraint;
        self
    }
}

pub trait TemporaryTable {
    fn is_temporary(&self) -> bool;
}

pub trait ForeignKeyTable {
    fn name(&self) -> String;

    fn database(&self) -> String;

    fn schema(&self) -> Schema;

    fn as_temporary(&self) -> Option<&dyn TemporaryTable> {
        None
    }

    fn indexes(&self) -> Result<Vec<Rc<dyn Index>>>;

    /// Foreign keys declared on this table (this table is the child).
    fn declared_foreign_keys(&self) -> Result<Vec<ForeignKeyConstraint>>;

    /// Foreign keys on any table that reference this one.
    fn referenced_foreign_keys(&self) -> Result<Vec<ForeignKeyConstraint>>;

    fn add_foreign_key(&self, fk: ForeignKeyConstraint) -> Result<()>;

    fn update_foreign_key(&self, name: &str, fk: ForeignKeyConstraint) -> Result<()>;

    fn drop_foreign_key(&self, name: &str) -> Result<()>;

    fn create_index_for_foreign_key(&self, def: IndexDef) -> Result<()>;

    fn foreign_key_updater(&self) -> UpdaterHandle;

    /// Full scan of the table.
    fn scan(&self) -> Result<Box<dyn RowIter>>;
}

/// Looks tables up by database and name for editor assembly.
pub trait TableResolver {
    fn resolve_table(&self, database: &str, name: &str) -> Result<Rc<dyn ForeignKeyTable>>;
}
