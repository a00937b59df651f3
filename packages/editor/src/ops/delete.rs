use tracing::{info, instrument};
use trellis_compiler::{Board, Diagram};
use trellis_parser::{EdgeIndex, Value};

use super::set::field_path;
use super::{rejected, Editor};
use crate::errors::{EditorError, EditorResult};
use crate::fields::{edge_fields, object_fields};
use crate::finalize::finalize;
use crate::locate::{self, find_edge, find_object, Target};
use crate::plan::Plan;
use crate::scope::{declarations, live_keys};

impl Editor {
    /// Delete an object, an edge, or one field.
    ///
    /// Deleting an object hoists its children into its parent and removes
    /// every edge touching it.
    #[instrument(skip(self, diagram), fields(board = %board.join(".")))]
    pub fn delete(&self, diagram: &Diagram, board: &[&str], key: &str) -> EditorResult<Diagram> {
        rejected("delete", key, self.try_delete(diagram, board, key))
    }

    fn try_delete(&self, diagram: &Diagram, board_path: &[&str], key: &str) -> EditorResult<Diagram> {
        let board = locate::board(diagram, board_path)?;
        let target = locate::target(key)?;
        let result = match delete_plan_for(board, &target)? {
            Some(mut plan) => self.apply_plan(diagram, board_path, board, &mut plan)?,
            None => self.delete_field(diagram, board_path, board, key, &target, true)?,
        };
        info!(key, "Deleted");
        Ok(result)
    }

    /// Remove every statement setting the target's field.
    ///
    /// A flat statement that also declares the object is cut back to the
    /// object path. With `strict`, finding nothing is an error.
    pub(super) fn delete_field(
        &self,
        diagram: &Diagram,
        board_path: &[&str],
        board: &Board,
        key: &str,
        target: &Target,
        strict: bool,
    ) -> EditorResult<Diagram> {
        let mut ast = diagram.ast.clone();
        let live = live_keys(&ast, board.map);
        let fields = field_path(target);
        let label = fields == ["label"];
        let mut truncated = Vec::new();
        let mut changed = false;

        match target {
            Target::Object(object) => {
                let obj = find_object(board, object)?;
                for hit in object_fields(board, &ast, obj, &fields, &live) {
                    match hit.flat {
                        Some(at) => {
                            let statement = ast.key_mut(hit.key);
                            if let Some(path) = statement.path.as_mut() {
                                path.segments.truncate(at);
                            }
                            statement.value = Value::Null;
                            statement.primary = None;
                            truncated.push(hit.key);
                        }
                        None => {
                            ast.remove_key(hit.map, hit.key);
                        }
                    }
                    changed = true;
                }
                if label {
                    for decl in declarations(board, &ast, obj, &live) {
                        let statement = ast.key_mut(decl.key);
                        if matches!(statement.value, Value::Scalar(_)) {
                            statement.value = Value::Null;
                            changed = true;
                        }
                        changed |= statement.primary.take().is_some();
                    }
                }
            }
            Target::Edge(edge) => {
                let e = find_edge(board, edge)?;
                for hit in edge_fields(board, &ast, e, &fields, &live) {
                    ast.remove_key(hit.map, hit.key);
                    changed = true;
                }
                if label {
                    for r in &board.edge(e).references {
                        if !live.contains(&r.key) {
                            continue;
                        }
                        let statement = ast.key_mut(r.key);
                        let label_only = r.indexed
                            && statement.edge_key.is_none()
                            && matches!(statement.edge_index, Some(EdgeIndex::Index(_)))
                            && matches!(statement.value, Value::Scalar(_));
                        if label_only {
                            ast.remove_key(r.map, r.key);
                            changed = true;
                            continue;
                        }
                        if matches!(statement.value, Value::Scalar(_)) {
                            statement.value = Value::Null;
                            changed = true;
                        }
                        changed |= statement.primary.take().is_some();
                    }
                }
            }
        }

        if !changed && strict {
            return Err(EditorError::FieldNotFound(key.to_string()));
        }
        let expected: Vec<Vec<String>> = board.object_ids().skip(1).map(|o| board.path(o)).collect();
        finalize(&mut ast, board.map, &diagram.ast, &truncated, &expected)?;
        self.commit(&diagram.ast, board_path, board.map, &ast)
    }
}

/// The plan a delete of `key` runs, or `None` for a field delete.
pub(crate) fn delete_plan(board: &Board, key: &str) -> EditorResult<Option<Plan>> {
    delete_plan_for(board, &locate::target(key)?)
}

fn delete_plan_for(board: &Board, target: &Target) -> EditorResult<Option<Plan>> {
    match target {
        Target::Object(object) if object.fields.is_empty() => {
            let obj = find_object(board, object)?;
            Ok(Some(Plan::delete_object(board, obj)))
        }
        Target::Edge(edge) if edge.fields.is_empty() => {
            let e = find_edge(board, edge)?;
            Ok(Some(Plan::delete_edge(board, e)))
        }
        _ => Ok(None),
    }
}
