use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    /// RESTRICT and NO ACTION are both checked before the parent row changes.
    pub fn is_restrict(self) -> bool {
        matches!(self, ReferentialAction::Restrict | ReferentialAction::NoAction)
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        };
        f.write_str(s)
    }
}

/// A foreign key declared on `database.table` referencing
/// `parent_database.parent_table`.
///
/// An empty `name` asks the resolver to synthesise one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyConstraint {
    pub name: String,
    pub database: String,
    pub table: String,
    pub columns: Vec<String>,
    pub parent_database: String,
    pub parent_table: String,
    pub parent_columns: Vec<String>,
    pub on_update: ReferentialAction,
    pub on_delete: ReferentialAction,
    pub is_resolved: bool,
}

impl ForeignKeyConstraint {
    pub fn new(
        table: impl Into<String>,
        columns: &[&str],
        parent_table: impl Into<String>,
        parent_columns: &[&str],
    ) -> Self {
        Self {
            name: String::new(),
            database: String::new(),
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            parent_database: String::new(),
            parent_table: parent_table.into(),
            parent_columns: parent_columns.iter().map(|c| c.to_string()).collect(),
            on_update: ReferentialAction::default(),
            on_delete: ReferentialAction::default(),
            is_resolved: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the database of both sides; cross-database keys set
    /// `parent_database` afterwards.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        let database = database.into();
        self.parent_database = database.clone();
        self.database = database;
        self
    }

    pub fn with_parent_database(mut self, database: impl Into<String>) -> Self {
        self.parent_database = database.into();
        self
    }

    pub fn with_on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    pub fn with_on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = action;
        self
    }

    pub fn is_self_referential(&self) -> bool {
        self.table.eq_ignore_ascii_case(&self.parent_table)
            && self.database.eq_ignore_ascii_case(&self.parent_database)
    }

    pub fn uses_set_null(&self) -> bool {
        self.on_update == ReferentialAction::SetNull || self.on_delete == ReferentialAction::SetNull
    }
}
