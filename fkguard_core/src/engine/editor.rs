use std::collections::HashSet;
use std::fmt;

use tracing::{debug, warn};

use crate::config::{DepthLimitMode, MAX_CASCADE_DEPTH};
use crate::engine::constraint::{ForeignKeyConstraint, ReferentialAction};
use crate::engine::mapping::{ChildParentMapping, TypeConversions};
use crate::engine::reference::ForeignKeyReferenceHandler;
use crate::engine::row_mapper::ForeignKeyRowMapper;
use crate::error::{FkError, Result};
use crate::storage::engine::UpdaterHandle;
use crate::storage::schema::Schema;
use crate::types::Row;
use crate::types::value::{Value, compare_values, parse_value};

/// Stable identifier of an editor inside its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditorId(pub usize);

/// A foreign key that references the editor's table, with everything needed
/// to act on the dependent rows.
pub struct ForeignKeyRefActionData {
    /// Maps parent rows onto the child's index.
    pub row_mapper: ForeignKeyRowMapper,
    /// Editor of the child table.
    pub editor: EditorId,
    pub foreign_key: ForeignKeyConstraint,
    pub child_parent_mapping: ChildParentMapping,
}

/// Cascading mutation wrapper for one table.
pub struct ForeignKeyEditor {
    pub id: EditorId,
    pub table: String,
    pub schema: Schema,
    pub updater: Option<UpdaterHandle>,
    /// Keys declared on this table, rechecked when their columns change.
    pub references: Vec<ForeignKeyReferenceHandler>,
    pub ref_actions: Vec<ForeignKeyRefActionData>,
    /// Set when following referential actions can lead back to this editor.
    pub cyclical: bool,
}

impl ForeignKeyEditor {
    fn updater(&self) -> Result<&UpdaterHandle> {
        self.updater.as_ref().ok_or_else(|| FkError::Uninitialized {
            name: self.table.clone(),
        })
    }

    /// Whether any parent column mapped by `action` differs between the rows.
    fn columns_updated(action: &ForeignKeyRefActionData, old: &Row, new: &Row) -> bool {
        action
            .child_parent_mapping
            .parent_positions()
            .any(|pos| match (old.get(pos), new.get(pos)) {
                (Some(a), Some(b)) => compare_values(a, b) != std::cmp::Ordering::Equal,
                (a, b) => a.is_some() != b.is_some(),
            })
    }
}

/// Every editor a statement may reach from its target table.
///
/// Editors refer to each other by `EditorId`, so cyclic and self-referential
/// key graphs need no shared ownership.
pub struct ForeignKeyEditorGraph {
    editors: Vec<ForeignKeyEditor>,
    /// Handles of parent tables that are only read, never mutated.
    lookup_handles: Vec<(String, UpdaterHandle)>,
    root: EditorId,
    depth_mode: DepthLimitMode,
}

impl fmt::Debug for ForeignKeyEditorGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let editors: Vec<(&str, bool)> = self
            .editors
            .iter()
            .map(|e| (e.table.as_str(), e.cyclical))
            .collect();
        let lookups: Vec<&str> = self.lookup_handles.iter().map(|(t, _)| t.as_str()).collect();
        f.debug_struct("ForeignKeyEditorGraph")
            .field("root", &self.root)
            .field("depth_mode", &self.depth_mode)
            .field("editors", &editors)
            .field("lookup_handles", &lookups)
            .finish()
    }
}

impl ForeignKeyEditorGraph {
    pub fn new(depth_mode: DepthLimitMode) -> Self {
        Self {
            editors: Vec::new(),
            lookup_handles: Vec::new(),
            root: EditorId(0),
            depth_mode,
        }
    }

    pub fn push_editor(
        &mut self,
        table: impl Into<String>,
        schema: Schema,
        updater: Option<UpdaterHandle>,
    ) -> EditorId {
        let id = EditorId(self.editors.len());
        self.editors.push(ForeignKeyEditor {
            id,
            table: table.into(),
            schema,
            updater,
            references: Vec::new(),
            ref_actions: Vec::new(),
            cyclical: false,
        });
        id
    }

    pub fn add_lookup_handle(&mut self, table: impl Into<String>, updater: UpdaterHandle) {
        self.lookup_handles.push((table.into(), updater));
    }

    pub fn editor(&self, id: EditorId) -> Option<&ForeignKeyEditor> {
        self.editors.get(id.0)
    }

    pub fn editor_mut(&mut self, id: EditorId) -> Option<&mut ForeignKeyEditor> {
        self.editors.get_mut(id.0)
    }

    pub fn editors(&self) -> impl Iterator<Item = &ForeignKeyEditor> {
        self.editors.iter()
    }

    pub fn len(&self) -> usize {
        self.editors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.editors.is_empty()
    }

    pub fn root(&self) -> EditorId {
        self.root
    }

    pub fn set_root(&mut self, id: EditorId) {
        self.root = id;
    }

    pub fn depth_mode(&self) -> DepthLimitMode {
        self.depth_mode
    }

    /// Marks each editor that can reach itself through referential actions.
    pub fn mark_cycles(&mut self) {
        let flags: Vec<bool> = (0..self.editors.len())
            .map(|i| self.reaches(EditorId(i), EditorId(i)))
            .collect();
        for (editor, cyclical) in self.editors.iter_mut().zip(flags) {
            editor.cyclical = cyclical;
        }
    }

    fn reaches(&self, from: EditorId, target: EditorId) -> bool {
        let mut visited = HashSet::new();
        let mut stack: Vec<EditorId> = self.children(from).collect();
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if visited.insert(id) {
                stack.extend(self.children(id));
            }
        }
        false
    }

    fn children(&self, id: EditorId) -> impl Iterator<Item = EditorId> + '_ {
        self.editors
            .get(id.0)
            .into_iter()
            .flat_map(|e| e.ref_actions.iter().map(|a| a.editor))
    }

    /// True when every editor reachable from the root has its table handle
    /// and every row mapper it uses is bound to an index and a handle.
    pub fn is_initialized(&self) -> bool {
        let mut visited = HashSet::new();
        self.editor_initialized(self.root, &mut visited)
    }

    fn editor_initialized(&self, id: EditorId, visited: &mut HashSet<EditorId>) -> bool {
        if !visited.insert(id) {
            return true;
        }
        let Some(editor) = self.editor(id) else {
            return false;
        };
        if editor.updater.is_none() {
            return false;
        }
        if !editor.references.iter().all(|r| r.is_initialized()) {
            return false;
        }
        editor.ref_actions.iter().all(|action| {
            action.row_mapper.is_initialized() && self.editor_initialized(action.editor, visited)
        })
    }

    /// Checks a row about to be inserted into the root table against every
    /// key the table declares.
    pub fn check_insert(&self, row: &Row) -> Result<()> {
        let editor = self.editor_or_err(self.root)?;
        for reference in &editor.references {
            reference.check_reference(row)?;
        }
        Ok(())
    }

    /// Updates `old` to `new` on the root table, enforcing and cascading every
    /// foreign key involved.
    pub fn update(&self, old: &Row, new: &Row) -> Result<()> {
        self.update_at(self.root, old, new, 1)
    }

    /// Deletes `row` from the root table, enforcing and cascading every
    /// foreign key involved.
    pub fn delete(&self, row: &Row) -> Result<()> {
        self.delete_at(self.root, row, 1)
    }

    pub fn update_at(&self, id: EditorId, old: &Row, new: &Row, depth: usize) -> Result<()> {
        self.update_from(id, old, new, depth, None)
    }

    /// `cascaded_from` names the key whose cascade produced `new`; that key
    /// already holds for the new values and is not rechecked.
    fn update_from(
        &self,
        id: EditorId,
        old: &Row,
        new: &Row,
        depth: usize,
        cascaded_from: Option<&str>,
    ) -> Result<()> {
        let editor = self.editor_or_err(id)?;

        for reference in &editor.references {
            if cascaded_from.is_some_and(|name| reference.foreign_key.name.eq_ignore_ascii_case(name)) {
                continue;
            }
            if reference.row_mapper.key_changed(old, new) {
                reference.check_reference(new)?;
            }
        }

        for action in &editor.ref_actions {
            if action.foreign_key.on_update.is_restrict() {
                self.on_update_restrict(action, old, new)?;
            }
        }

        editor.updater()?.update(old, new)?;

        for action in &editor.ref_actions {
            match action.foreign_key.on_update {
                ReferentialAction::Cascade
                | ReferentialAction::SetNull
                | ReferentialAction::SetDefault => {
                    if ForeignKeyEditor::columns_updated(action, old, new) {
                        self.propagate(editor, action, action.foreign_key.on_update, old, Some(new), depth)?;
                    }
                }
                ReferentialAction::Restrict | ReferentialAction::NoAction => {}
            }
        }
        Ok(())
    }

    pub fn delete_at(&self, id: EditorId, row: &Row, depth: usize) -> Result<()> {
        let editor = self.editor_or_err(id)?;

        for action in &editor.ref_actions {
            if action.foreign_key.on_delete.is_restrict() {
                self.ensure_unreferenced(action, row)?;
            }
        }

        editor.updater()?.delete(row)?;

        for action in &editor.ref_actions {
            match action.foreign_key.on_delete {
                ReferentialAction::Cascade
                | ReferentialAction::SetNull
                | ReferentialAction::SetDefault => {
                    self.propagate(editor, action, action.foreign_key.on_delete, row, None, depth)?;
                }
                ReferentialAction::Restrict | ReferentialAction::NoAction => {}
            }
        }
        Ok(())
    }

    fn on_update_restrict(&self, action: &ForeignKeyRefActionData, old: &Row, new: &Row) -> Result<()> {
        if !ForeignKeyEditor::columns_updated(action, old, new) {
            return Ok(());
        }
        self.ensure_unreferenced(action, old)
    }

    fn ensure_unreferenced(&self, action: &ForeignKeyRefActionData, parent_row: &Row) -> Result<()> {
        if action.row_mapper.first_match(parent_row, false)?.is_some() {
            let fk = &action.foreign_key;
            return Err(FkError::ParentViolation {
                name: fk.name.clone(),
                table: fk.table.clone(),
                parent_table: fk.parent_table.clone(),
                key: action.row_mapper.key_string(parent_row),
            });
        }
        Ok(())
    }

    /// Applies `kind` to every child row that referenced `old`. `new` is the
    /// updated parent row, or `None` on delete.
    fn propagate(
        &self,
        editor: &ForeignKeyEditor,
        action: &ForeignKeyRefActionData,
        kind: ReferentialAction,
        old: &Row,
        new: Option<&Row>,
        depth: usize,
    ) -> Result<()> {
        let children = action.row_mapper.matching_rows(old, false)?;
        if children.is_empty() {
            return Ok(());
        }
        let child_editor = self.editor_or_err(action.editor)?;
        debug!(
            fk = %action.foreign_key.name,
            action = %kind,
            child = %child_editor.table,
            rows = children.len(),
            depth,
            "applying referential action"
        );

        for child in children {
            self.check_depth(editor, depth)?;
            match (kind, new) {
                (ReferentialAction::Cascade, None) => {
                    self.delete_at(action.editor, &child, depth + 1)?;
                }
                (ReferentialAction::Cascade, Some(new)) => {
                    let conversions = action.row_mapper.type_conversions.as_ref();
                    let Some(modified) =
                        cascaded_row(&child, &action.child_parent_mapping, conversions, new)
                    else {
                        let fk = &action.foreign_key;
                        return Err(FkError::ChildViolation {
                            name: fk.name.clone(),
                            table: fk.table.clone(),
                            parent_table: fk.parent_table.clone(),
                            key: action.row_mapper.key_string(new),
                        });
                    };
                    self.update_from(
                        action.editor,
                        &child,
                        &modified,
                        depth + 1,
                        Some(&action.foreign_key.name),
                    )?;
                }
                (ReferentialAction::SetNull, _) => {
                    let modified = nulled_row(&child, &action.child_parent_mapping);
                    self.update_at(action.editor, &child, &modified, depth + 1)?;
                }
                (ReferentialAction::SetDefault, _) => {
                    let modified =
                        defaulted_row(&child, &action.child_parent_mapping, &child_editor.schema)?;
                    self.update_at(action.editor, &child, &modified, depth + 1)?;
                }
                (ReferentialAction::Restrict | ReferentialAction::NoAction, _) => {}
            }
        }
        Ok(())
    }

    fn check_depth(&self, editor: &ForeignKeyEditor, depth: usize) -> Result<()> {
        if self.depth_mode.exceeded(depth, editor.cyclical) {
            debug!(table = %editor.table, depth, cyclical = editor.cyclical, "cascade depth limit reached");
            return Err(FkError::DepthLimit {
                max: MAX_CASCADE_DEPTH,
                cyclical: editor.cyclical,
            });
        }
        Ok(())
    }

    fn editor_or_err(&self, id: EditorId) -> Result<&ForeignKeyEditor> {
        self.editor(id)
            .ok_or_else(|| FkError::Storage(format!("unknown foreign key editor {}", id.0)))
    }

    /// Closes every table handle in the graph. All handles are closed even
    /// when one fails; the first failure is returned.
    pub fn close(&self) -> Result<()> {
        let handles = self
            .editors
            .iter()
            .filter_map(|e| e.updater.as_ref().map(|u| (e.table.as_str(), u)))
            .chain(self.lookup_handles.iter().map(|(t, u)| (t.as_str(), u)));
        let mut first_err = None;
        for (table, updater) in handles {
            if let Err(e) = updater.close() {
                warn!(table, error = %e, "failed to close foreign key table handle");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Child row carrying the new parent key, converted to the child's column
/// types. `None` when a key value cannot be stored in the child column.
fn cascaded_row(
    child: &Row,
    mapping: &ChildParentMapping,
    conversions: Option<&TypeConversions>,
    new_parent: &Row,
) -> Option<Row> {
    child
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let Some(p) = mapping.get(i) else {
                return Some(v.clone());
            };
            let Some(parent_value) = new_parent.get(p) else {
                return Some(v.clone());
            };
            match conversions.and_then(|c| c.get(p)).and_then(Option::as_ref) {
                Some(conv) => conv.apply(parent_value).into_value(),
                None => Some(parent_value.clone()),
            }
        })
        .collect()
}

fn nulled_row(child: &Row, mapping: &ChildParentMapping) -> Row {
    child
        .iter()
        .enumerate()
        .map(|(i, v)| match mapping.get(i) {
            Some(_) => Value::Null,
            None => v.clone(),
        })
        .collect()
}

fn defaulted_row(child: &Row, mapping: &ChildParentMapping, schema: &Schema) -> Result<Row> {
    child
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if mapping.get(i).is_none() {
                return Ok(v.clone());
            }
            match schema.columns.get(i).and_then(|c| c.default.as_ref().map(|d| (c, d))) {
                Some((column, token)) => parse_value(&column.dtype, token),
                None => Ok(Value::Null),
            }
        })
        .collect()
}
