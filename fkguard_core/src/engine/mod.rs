pub mod builder;
pub mod compat;
pub mod constraint;
pub mod editor;
pub mod index_select;
pub mod mapping;
pub mod reference;
pub mod resolve;
pub mod row_mapper;

pub use builder::build_foreign_key_editor;
pub use compat::foreign_key_comparable_types;
pub use constraint::{ForeignKeyConstraint, ReferentialAction};
pub use editor::{EditorId, ForeignKeyEditor, ForeignKeyEditorGraph, ForeignKeyRefActionData};
pub use index_select::find_fk_index_with_prefix;
pub use mapping::{
    ChildParentMapping, ConversionDirection, TypeConversion, find_foreign_key_col_mapping,
    get_child_parent_mapping, get_foreign_key_type_conversions,
};
pub use reference::ForeignKeyReferenceHandler;
pub use resolve::resolve_foreign_key;
pub use row_mapper::ForeignKeyRowMapper;
