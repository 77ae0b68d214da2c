use std::collections::HashSet;

use tracing::debug;

use crate::engine::builder::build_reference_handler;
use crate::engine::compat::foreign_key_comparable_types;
use crate::engine::constraint::{ForeignKeyConstraint, ReferentialAction};
use crate::engine::index_select::find_fk_index_with_prefix;
use crate::error::{FkError, Result};
use crate::storage::engine::{ForeignKeyTable, IndexDef};
use crate::storage::schema::Schema;

/// Validates `def` against both tables and persists it on `child`.
///
/// With `fk_checks` off only the child side is validated and the stored
/// constraint is left unresolved. `should_add` selects between adding a new
/// constraint and replacing the one with the same name. Returns the
/// constraint as persisted.
pub fn resolve_foreign_key(
    child: &dyn ForeignKeyTable,
    parent: &dyn ForeignKeyTable,
    mut def: ForeignKeyConstraint,
    should_add: bool,
    fk_checks: bool,
    check_existing_rows: bool,
) -> Result<ForeignKeyConstraint> {
    if child.as_temporary().is_some_and(|t| t.is_temporary()) {
        return Err(FkError::TemporaryTable {
            table: child.name(),
        });
    }
    if def.is_resolved {
        return Err(FkError::AlreadyResolved { name: def.name });
    }
    if def.columns.is_empty() {
        return Err(FkError::MissingColumns);
    }
    if def.columns.len() != def.parent_columns.len() {
        return Err(FkError::ColumnCountMismatch);
    }

    let child_schema = child.schema();
    def.columns = normalize_columns(&child.name(), &child_schema, &def.columns)?;
    let set_null = def.on_update == ReferentialAction::SetNull
        || def.on_delete == ReferentialAction::SetNull;
    if set_null {
        for col in &def.columns {
            if child_schema.column(col).is_some_and(|c| c.not_null) {
                return Err(FkError::SetNullNonNullable { column: col.clone() });
            }
        }
    }

    let explicit_name = !def.name.is_empty();
    let existing = child.declared_foreign_keys()?;
    if !explicit_name {
        def.name = synthesize_name(&child.name(), &existing);
        debug!(fk = %def.name, table = %def.table, "synthesized foreign key name");
    }

    if fk_checks {
        let parent_schema = parent.schema();
        def.parent_columns = normalize_columns(&parent.name(), &parent_schema, &def.parent_columns)?;
        for (col, parent_col) in def.columns.iter().zip(&def.parent_columns) {
            let (Some(c), Some(p)) = (child_schema.column(col), parent_schema.column(parent_col))
            else {
                continue;
            };
            if !foreign_key_comparable_types(&c.dtype, &p.dtype) {
                return Err(FkError::ColumnTypeMismatch {
                    column: col.clone(),
                    parent_column: parent_col.clone(),
                });
            }
            if c.dtype.is_text_or_blob() {
                return Err(FkError::TextBlob { column: col.clone() });
            }
            if p.dtype.is_text_or_blob() {
                return Err(FkError::TextBlob { column: parent_col.clone() });
            }
        }

        if find_fk_index_with_prefix(parent, &def.parent_columns, true, &[])?.is_none() {
            return Err(FkError::MissingReferenceIndex {
                name: def.name.clone(),
                table: def.parent_table.clone(),
            });
        }

        if check_existing_rows {
            let parent_updater = parent.foreign_key_updater();
            let checked = build_reference_handler(&def, child, parent, parent_updater.clone())
                .and_then(|handler| handler.check_table(child));
            let closed = parent_updater.close();
            checked?;
            closed?;
        }
    }

    if should_add
        && explicit_name
        && existing.iter().any(|fk| fk.name.eq_ignore_ascii_case(&def.name))
    {
        return Err(FkError::DuplicateName { name: def.name });
    }

    ensure_child_index(child, &def, explicit_name)?;

    def.is_resolved = fk_checks;
    if should_add {
        child.add_foreign_key(def.clone())?;
    } else {
        child.update_foreign_key(&def.name, def.clone())?;
    }
    debug!(
        fk = %def.name,
        table = %def.table,
        parent = %def.parent_table,
        resolved = def.is_resolved,
        "foreign key stored"
    );
    Ok(def)
}

/// Replaces each requested column with the schema's spelling, rejecting
/// unknown and repeated columns.
fn normalize_columns(table: &str, schema: &Schema, columns: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(columns.len());
    for col in columns {
        let column = schema.column(col).ok_or_else(|| FkError::ColumnNotFound {
            table: table.to_string(),
            column: col.clone(),
        })?;
        if !seen.insert(column.name.to_lowercase()) {
            return Err(FkError::DuplicateColumn { column: col.clone() });
        }
        out.push(column.name.clone());
    }
    Ok(out)
}

/// `<table>_ibfk_<n>`, one past the highest suffix already in use.
fn synthesize_name(table: &str, existing: &[ForeignKeyConstraint]) -> String {
    let prefix = format!("{}_ibfk_", table.to_lowercase());
    let highest = existing
        .iter()
        .filter_map(|fk| {
            let name = fk.name.to_lowercase();
            name.strip_prefix(&prefix)?.parse::<u64>().ok()
        })
        .max()
        .unwrap_or(0);
    format!("{}_ibfk_{}", table, highest + 1)
}

/// Creates an index over the child columns unless one already qualifies.
fn ensure_child_index(
    child: &dyn ForeignKeyTable,
    def: &ForeignKeyConstraint,
    explicit_name: bool,
) -> Result<()> {
    if let Some(index) = find_fk_index_with_prefix(child, &def.columns, false, &[])? {
        debug!(fk = %def.name, index = index.id(), "reusing child index");
        return Ok(());
    }

    let taken: HashSet<String> = child
        .indexes()?
        .iter()
        .map(|i| i.id().to_lowercase())
        .collect();
    let name = if explicit_name {
        if taken.contains(&def.name.to_lowercase()) {
            return Err(FkError::DuplicateKey {
                name: def.name.clone(),
            });
        }
        def.name.clone()
    } else {
        let base = def.columns[0].clone();
        let mut candidate = base.clone();
        let mut n = 2;
        while taken.contains(&candidate.to_lowercase()) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        candidate
    };

    let columns: Vec<&str> = def.columns.iter().map(String::as_str).collect();
    debug!(fk = %def.name, index = %name, "creating child index");
    child.create_index_for_foreign_key(IndexDef::new(name, &columns))
}
