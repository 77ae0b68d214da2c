use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use tracing::debug;

use crate::config::ForeignKeyConfig;
use crate::engine::constraint::ForeignKeyConstraint;
use crate::engine::editor::{EditorId, ForeignKeyEditorGraph, ForeignKeyRefActionData};
use crate::engine::index_select::find_fk_index_with_prefix;
use crate::engine::mapping::{
    ConversionDirection, find_foreign_key_col_mapping, get_child_parent_mapping,
    get_foreign_key_type_conversions,
};
use crate::engine::reference::ForeignKeyReferenceHandler;
use crate::engine::row_mapper::ForeignKeyRowMapper;
use crate::error::{FkError, Result};
use crate::storage::engine::{ForeignKeyTable, TableResolver, UpdaterHandle};

struct TableEntry {
    table: Rc<dyn ForeignKeyTable>,
    updater: UpdaterHandle,
    editor: Option<EditorId>,
}

/// Tables touched while assembling one graph, each with a single shared
/// mutation handle.
struct Assembly<'a> {
    resolver: &'a dyn TableResolver,
    entries: HashMap<String, TableEntry>,
    graph: ForeignKeyEditorGraph,
    queue: VecDeque<(String, EditorId)>,
}

fn table_key(database: &str, name: &str) -> String {
    format!("{}.{}", database.to_lowercase(), name.to_lowercase())
}

fn or_default<'a>(database: &'a str, fallback: &'a str) -> &'a str {
    if database.is_empty() { fallback } else { database }
}

impl<'a> Assembly<'a> {
    fn entry(&mut self, database: &str, name: &str) -> Result<&mut TableEntry> {
        let key = table_key(database, name);
        if !self.entries.contains_key(&key) {
            let table = self.resolver.resolve_table(database, name)?;
            let updater = table.foreign_key_updater();
            self.entries.insert(
                key.clone(),
                TableEntry {
                    table,
                    updater,
                    editor: None,
                },
            );
        }
        self.entries
            .get_mut(&key)
            .ok_or_else(|| FkError::TableNotFound {
                table: name.to_string(),
            })
    }

    /// Returns the editor for a table, creating and queueing it on first use.
    fn editor_for(&mut self, database: &str, name: &str) -> Result<EditorId> {
        let key = table_key(database, name);
        let entry = self.entry(database, name)?;
        if let Some(id) = entry.editor {
            return Ok(id);
        }
        let table = Rc::clone(&entry.table);
        let updater = Rc::clone(&entry.updater);
        let id = self.graph.push_editor(table.name(), table.schema(), Some(updater));
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.editor = Some(id);
        }
        self.queue.push_back((key, id));
        Ok(id)
    }

    fn populate(&mut self, key: &str, id: EditorId) -> Result<()> {
        let table = match self.entries.get(key) {
            Some(entry) => Rc::clone(&entry.table),
            None => return Err(FkError::TableNotFound { table: key.to_string() }),
        };
        let database = table.database();

        let mut references = Vec::new();
        for fk in table.declared_foreign_keys()? {
            if !fk.is_resolved {
                debug!(fk = %fk.name, table = %fk.table, "skipping unresolved foreign key");
                continue;
            }
            let parent = self.entry(or_default(&fk.parent_database, &database), &fk.parent_table)?;
            let parent_table = Rc::clone(&parent.table);
            let parent_updater = Rc::clone(&parent.updater);
            references.push(build_reference_handler(
                &fk,
                table.as_ref(),
                parent_table.as_ref(),
                parent_updater,
            )?);
        }

        let mut ref_actions = Vec::new();
        for fk in table.referenced_foreign_keys()? {
            if !fk.is_resolved {
                debug!(fk = %fk.name, table = %fk.table, "skipping unresolved foreign key");
                continue;
            }
            let child_db = or_default(&fk.database, &database).to_string();
            let child_id = self.editor_for(&child_db, &fk.table)?;
            let child = self.entry(&child_db, &fk.table)?;
            let child_table = Rc::clone(&child.table);
            let child_updater = Rc::clone(&child.updater);
            ref_actions.push(build_ref_action(
                &fk,
                table.as_ref(),
                child_table.as_ref(),
                child_updater,
                child_id,
            )?);
        }

        let editor = self
            .graph
            .editor_mut(id)
            .ok_or_else(|| FkError::Storage(format!("unknown foreign key editor {}", id.0)))?;
        editor.references = references;
        editor.ref_actions = ref_actions;
        Ok(())
    }
}

/// Assembles the editors for a statement that mutates `database.table`.
///
/// Every table reachable through referential actions gets exactly one editor.
/// With `foreign_key_checks` off the root editor mutates rows directly.
pub fn build_foreign_key_editor(
    resolver: &dyn TableResolver,
    database: &str,
    table: &str,
    config: &ForeignKeyConfig,
) -> Result<ForeignKeyEditorGraph> {
    let mut assembly = Assembly {
        resolver,
        entries: HashMap::new(),
        graph: ForeignKeyEditorGraph::new(config.depth_limit_mode),
        queue: VecDeque::new(),
    };
    let root = assembly.editor_for(database, table)?;
    assembly.graph.set_root(root);

    if config.foreign_key_checks {
        while let Some((key, id)) = assembly.queue.pop_front() {
            assembly.populate(&key, id)?;
        }
        assembly.graph.mark_cycles();
    }

    let Assembly {
        entries, mut graph, ..
    } = assembly;
    let mut lookup_only: Vec<(String, UpdaterHandle)> = entries
        .into_iter()
        .filter(|(_, e)| e.editor.is_none())
        .map(|(key, e)| (key, e.updater))
        .collect();
    lookup_only.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, updater) in lookup_only {
        graph.add_lookup_handle(key, updater);
    }

    debug!(
        table,
        editors = graph.len(),
        checks = config.foreign_key_checks,
        "assembled foreign key editors"
    );
    Ok(graph)
}

/// Row mapper and reference handler checking rows of `child` against the
/// parent's best index. Extended indexes are allowed on the parent.
pub(crate) fn build_reference_handler(
    fk: &ForeignKeyConstraint,
    child: &dyn ForeignKeyTable,
    parent: &dyn ForeignKeyTable,
    parent_updater: UpdaterHandle,
) -> Result<ForeignKeyReferenceHandler> {
    let index = find_fk_index_with_prefix(parent, &fk.parent_columns, true, &[])?.ok_or_else(|| {
        FkError::MissingReferenceIndex {
            name: fk.name.clone(),
            table: fk.parent_table.clone(),
        }
    })?;
    let child_schema = child.schema();
    let parent_schema = parent.schema();
    let (index_positions, append_types) = find_foreign_key_col_mapping(
        &fk.name,
        &child_schema,
        &fk.columns,
        &fk.parent_columns,
        index.as_ref(),
    )?;
    let type_conversions = get_foreign_key_type_conversions(
        &parent_schema,
        &child_schema,
        fk,
        ConversionDirection::ChildToParent,
    )?;
    let row_mapper = ForeignKeyRowMapper {
        name: fk.name.clone(),
        source_table: child.name(),
        index: Some(index),
        updater: Some(parent_updater),
        source_schema: child_schema,
        type_conversions,
        index_positions,
        append_types,
    };
    Ok(ForeignKeyReferenceHandler::new(fk.clone(), row_mapper))
}

fn build_ref_action(
    fk: &ForeignKeyConstraint,
    parent: &dyn ForeignKeyTable,
    child: &dyn ForeignKeyTable,
    child_updater: UpdaterHandle,
    child_editor: EditorId,
) -> Result<ForeignKeyRefActionData> {
    let index = find_fk_index_with_prefix(child, &fk.columns, false, &[])?.ok_or_else(|| {
        FkError::MissingReferenceIndex {
            name: fk.name.clone(),
            table: fk.table.clone(),
        }
    })?;
    let child_schema = child.schema();
    let parent_schema = parent.schema();
    let (index_positions, append_types) = find_foreign_key_col_mapping(
        &fk.name,
        &parent_schema,
        &fk.parent_columns,
        &fk.columns,
        index.as_ref(),
    )?;
    let type_conversions = get_foreign_key_type_conversions(
        &parent_schema,
        &child_schema,
        fk,
        ConversionDirection::ParentToChild,
    )?;
    let child_parent_mapping = get_child_parent_mapping(&parent_schema, &child_schema, fk)?;
    let row_mapper = ForeignKeyRowMapper {
        name: fk.name.clone(),
        source_table: parent.name(),
        index: Some(index),
        updater: Some(child_updater),
        source_schema: parent_schema,
        type_conversions,
        index_positions,
        append_types,
    };
    Ok(ForeignKeyRefActionData {
        row_mapper,
        editor: child_editor,
        foreign_key: fk.clone(),
        child_parent_mapping,
    })
}
