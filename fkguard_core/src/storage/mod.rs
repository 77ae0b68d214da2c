pub mod catalog;
pub mod engine;
pub mod mem;
pub mod range;
pub mod schema;

// Re-export main types for convenience
pub use engine::{
    ExtendedIndex, ForeignKeyTable, ForeignKeyUpdater, Index, IndexDef, IndexedAccess,
    ReferenceChecker, RowIter, TableResolver, TemporaryTable, UpdaterHandle,
};
pub use mem::{MemDatabase, MemIndex, MemTable, MemUpdater};
pub use range::{IndexLookup, IndexRange, RangeColumnExpr};
pub use schema::{Column, Schema};
