use thiserror::Error;

pub type Result<T> = std::result::Result<T, FkError>;

/// Broad grouping of failures, matching how callers are expected to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad constraint definition, surfaced to the DDL caller.
    Definition,
    /// A row violates a constraint, surfaced to the DML caller.
    Integrity,
    /// A cascade went deeper than the engine allows.
    DepthLimit,
    /// Failure reported by the table/index collaborators.
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    TemporaryTable,
    AlreadyResolved,
    MissingColumns,
    ColumnCountMismatch,
    ColumnNotFound,
    DuplicateColumn,
    SetNullNonNullable,
    ColumnTypeMismatch,
    TextBlob,
    MissingReferenceIndex,
    IndexMissingColumn,
    DuplicateName,
    DuplicateKey,
    ForeignKeyNotFound,
    TableNotFound,
    ChildViolation,
    ParentViolation,
    DepthLimit,
    InvalidLookup,
    Uninitialized,
    UniqueViolation,
    InvalidValue,
    RowArity,
    Storage,
    Config,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::TemporaryTable => "temporary_table",
            ErrorCode::AlreadyResolved => "already_resolved",
            ErrorCode::MissingColumns => "missing_columns",
            ErrorCode::ColumnCountMismatch => "column_count_mismatch",
            ErrorCode::ColumnNotFound => "column_not_found",
            ErrorCode::DuplicateColumn => "duplicate_column",
            ErrorCode::SetNullNonNullable => "set_null_non_nullable",
            ErrorCode::ColumnTypeMismatch => "column_type_mismatch",
            ErrorCode::TextBlob => "text_blob",
            ErrorCode::MissingReferenceIndex => "missing_reference_index",
            ErrorCode::IndexMissingColumn => "index_missing_column",
            ErrorCode::DuplicateName => "duplicate_name",
            ErrorCode::DuplicateKey => "duplicate_key",
            ErrorCode::ForeignKeyNotFound => "foreign_key_not_found",
            ErrorCode::TableNotFound => "table_not_found",
            ErrorCode::ChildViolation => "child_violation",
            ErrorCode::ParentViolation => "parent_violation",
            ErrorCode::DepthLimit => "depth_limit",
            ErrorCode::InvalidLookup => "invalid_lookup",
            ErrorCode::Uninitialized => "uninitialized",
            ErrorCode::UniqueViolation => "unique_violation",
            ErrorCode::InvalidValue => "invalid_value",
            ErrorCode::RowArity => "row_arity",
            ErrorCode::Storage => "storage",
            ErrorCode::Config => "config",
        }
    }

    pub fn class(self) -> ErrorClass {
        match self {
            ErrorCode::ChildViolation | ErrorCode::ParentViolation => ErrorClass::Integrity,
            ErrorCode::DepthLimit => ErrorClass::DepthLimit,
            ErrorCode::InvalidLookup
            | ErrorCode::Uninitialized
            | ErrorCode::UniqueViolation
            | ErrorCode::InvalidValue
            | ErrorCode::RowArity
            | ErrorCode::TableNotFound
            | ErrorCode::ForeignKeyNotFound
            | ErrorCode::Storage => ErrorClass::Storage,
            _ => ErrorClass::Definition,
        }
    }
}

#[derive(Debug, Error)]
pub enum FkError {
    #[error("temporary table `{table}` does not support foreign keys")]
    TemporaryTable { table: String },
    #[error("cannot resolve foreign key `{name}` as it has already been resolved")]
    AlreadyResolved { name: String },
    #[error("cannot create a foreign key without columns")]
    MissingColumns,
    #[error("the foreign key must reference an equivalent number of columns")]
    ColumnCountMismatch,
    #[error("table `{table}` does not have column `{column}`")]
    ColumnNotFound { table: String, column: String },
    #[error("cannot have duplicate columns in a foreign key: `{column}`")]
    DuplicateColumn { column: String },
    #[error("cannot use SET NULL as column `{column}` is non-nullable")]
    SetNullNonNullable { column: String },
    #[error("column type mismatch on `{column}` and `{parent_column}`")]
    ColumnTypeMismatch { column: String, parent_column: String },
    #[error("TEXT/BLOB column `{column}` cannot be used in a foreign key")]
    TextBlob { column: String },
    #[error("missing index for foreign key `{name}` on the referenced table `{table}`")]
    MissingReferenceIndex { name: String, table: String },
    #[error("index `{index}` does not contain foreign key column `{column}`")]
    IndexMissingColumn { index: String, column: String },
    #[error("duplicate foreign key constraint name `{name}`")]
    DuplicateName { name: String },
    #[error("duplicate key name `{name}`")]
    DuplicateKey { name: String },
    #[error("foreign key `{name}` does not exist on table `{table}`")]
    ForeignKeyNotFound { table: String, name: String },
    #[error("table `{table}` does not exist")]
    TableNotFound { table: String },
    #[error(
        "cannot add or update a child row - foreign key violation on fk: `{name}`, table: `{table}`, referenced table: `{parent_table}`, key: `{key}`"
    )]
    ChildViolation {
        name: String,
        table: String,
        parent_table: String,
        key: String,
    },
    #[error(
        "cannot delete or update a parent row - foreign key violation on fk: `{name}`, table: `{table}`, referenced table: `{parent_table}`, key: `{key}`"
    )]
    ParentViolation {
        name: String,
        table: String,
        parent_table: String,
        key: String,
    },
    #[error("foreign key cascade delete or update exceeds max depth of {max}{}", cycle_hint(.cyclical))]
    DepthLimit { max: usize, cyclical: bool },
    #[error("invalid lookup on index `{index}`: {range}")]
    InvalidLookup { index: String, range: String },
    #[error("row mapper for foreign key `{name}` has no index or table handle")]
    Uninitialized { name: String },
    #[error("duplicate entry {key} for unique index `{index}` on table `{table}`")]
    UniqueViolation {
        table: String,
        index: String,
        key: String,
    },
    #[error("invalid value '{token}' for type {dtype}")]
    InvalidValue { dtype: String, token: String },
    #[error("row for table `{table}` has {actual} values, expected {expected}")]
    RowArity {
        table: String,
        expected: usize,
        actual: usize,
    },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("invalid foreign key config: {0}")]
    Config(#[from] serde_json::Error),
}

fn cycle_hint(cyclical: &bool) -> &'static str {
    if *cyclical {
        " (cyclic foreign key graph)"
    } else {
        ""
    }
}

impl FkError {
    pub fn code(&self) -> ErrorCode {
        match self {
            FkError::TemporaryTable { .. } => ErrorCode::TemporaryTable,
            FkError::AlreadyResolved { .. } => ErrorCode::AlreadyResolved,
            FkError::MissingColumns => ErrorCode::MissingColumns,
            FkError::ColumnCountMismatch => ErrorCode::ColumnCountMismatch,
            FkError::ColumnNotFound { .. } => ErrorCode::ColumnNotFound,
            FkError::DuplicateColumn { .. } => ErrorCode::DuplicateColumn,
            FkError::SetNullNonNullable { .. } => ErrorCode::SetNullNonNullable,
            FkError::ColumnTypeMismatch { .. } => ErrorCode::ColumnTypeMismatch,
            FkError::TextBlob { .. } => ErrorCode::TextBlob,
            FkError::MissingReferenceIndex { .. } => ErrorCode::MissingReferenceIndex,
            FkError::IndexMissingColumn { .. } => ErrorCode::IndexMissingColumn,
            FkError::DuplicateName { .. } => ErrorCode::DuplicateName,
            FkError::DuplicateKey { .. } => ErrorCode::DuplicateKey,
            FkError::ForeignKeyNotFound { .. } => ErrorCode::ForeignKeyNotFound,
            FkError::TableNotFound { .. } => ErrorCode::TableNotFound,
            FkError::ChildViolation { .. } => ErrorCode::ChildViolation,
            FkError::ParentViolation { .. } => ErrorCode::ParentViolation,
            FkError::DepthLimit { .. } => ErrorCode::DepthLimit,
            FkError::InvalidLookup { .. } => ErrorCode::InvalidLookup,
            FkError::Uninitialized { .. } => ErrorCode::Uninitialized,
            FkError::UniqueViolation { .. } => ErrorCode::UniqueViolation,
            FkError::InvalidValue { .. } => ErrorCode::InvalidValue,
            FkError::RowArity { .. } => ErrorCode::RowArity,
            FkError::Storage(_) => ErrorCode::Storage,
            FkError::Config(_) => ErrorCode::Config,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }

    pub fn class(&self) -> ErrorClass {
        self.code().class()
    }
}
