pub mod config;
pub mod engine;
pub mod error;
pub mod storage;
pub mod types;

pub use config::{DepthLimitMode, ForeignKeyConfig, MAX_CASCADE_DEPTH};
pub use engine::{
    ForeignKeyConstraint, ForeignKeyEditorGraph, ReferentialAction, build_foreign_key_editor,
    find_fk_index_with_prefix, resolve_foreign_key,
};
pub use error::{ErrorClass, ErrorCode, FkError, Result};
pub use storage::{Column, MemDatabase, Schema};
pub use types::Row;
pub use types::value::Value;
