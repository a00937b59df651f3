use tracing::{info, instrument};
use trellis_compiler::keywords::is_reserved;
use trellis_compiler::{edge_id, Board, Diagram, EdgeId, ObjId};
use trellis_parser::format_id;

use super::{rejected, Editor};
use crate::allocate::{sibling_names, unique_name};
use crate::errors::{EditorError, EditorResult};
use crate::locate::{self, find_edge, find_object, EdgeKey, Target};
use crate::plan::Plan;

impl Editor {
    /// Move an object under a new parent, or an edge to new endpoints in the
    /// same scope.
    ///
    /// With `include_descendants` the children travel along; otherwise they
    /// stay behind in the old parent.
    #[instrument(skip(self, diagram), fields(board = %board.join(".")))]
    pub fn move_object(
        &self,
        diagram: &Diagram,
        board: &[&str],
        key: &str,
        new_key: &str,
        include_descendants: bool,
    ) -> EditorResult<Diagram> {
        let result = locate::board(diagram, board).and_then(|target| {
            let (mut plan, destination) = move_plan(target, key, new_key, include_descendants)?;
            let result = self.apply_plan(diagram, board, target, &mut plan)?;
            info!(key, new_key = %destination.key(target, &plan), "Moved");
            Ok(result)
        });
        rejected("move", key, result)
    }

    /// Rename an object within its parent, or flip an edge's arrows.
    /// Returns the new diagram and the final key.
    #[instrument(skip(self, diagram), fields(board = %board.join(".")))]
    pub fn rename(&self, diagram: &Diagram, board: &[&str], key: &str, new_name: &str) -> EditorResult<(Diagram, String)> {
        let result = locate::board(diagram, board).and_then(|target| {
            let (mut plan, destination) = rename_plan(target, key, new_name)?;
            let result = self.apply_plan(diagram, board, target, &mut plan)?;
            let final_key = destination.key(target, &plan);
            info!(key, new_key = %final_key, "Renamed");
            Ok((result, final_key))
        });
        rejected("rename", key, result)
    }
}

/// Where the edited item ends up. An edge's final index is only known once
/// its plan has run.
pub(crate) enum Destination {
    Object(String),
    Edge(EdgeId),
}

impl Destination {
    pub fn key(&self, board: &Board, plan: &Plan) -> String {
        match self {
            Destination::Object(key) => key.clone(),
            Destination::Edge(e) => new_edge_key(board, plan, *e),
        }
    }
}

pub(crate) fn move_plan(
    board: &Board,
    key: &str,
    new_key: &str,
    include_descendants: bool,
) -> EditorResult<(Plan, Destination)> {
    match locate::target(key)? {
        Target::Edge(edge) => {
            let e = find_edge(board, &edge)?;
            let new = match locate::target(new_key)? {
                Target::Edge(new) if new.prefix == edge.prefix => new,
                _ => return Err(EditorError::CrossScopeEdgeMove(new_key.to_string())),
            };
            let src = endpoint(board, &new.src)?;
            let dst = endpoint(board, &new.dst)?;
            let plan = Plan::reconnect_edge(board, e, src, dst, new.src_arrow, new.dst_arrow);
            Ok((plan, Destination::Edge(e)))
        }
        Target::Object(object) => {
            if let Some(field) = object.fields.first() {
                return Err(EditorError::ReservedKeyword(field.clone()));
            }
            let obj = find_object(board, &object)?;
            let dest = locate::object_key(new_key)?;
            if let Some(field) = dest.fields.first() {
                return Err(EditorError::ReservedKeyword(field.clone()));
            }
            if dest.path == object.path {
                let (parent, name) = split_last(&object.path);
                return Ok((Plan::move_object(board, obj, parent, name, true), Destination::Object(object.id())));
            }
            if dest.path.starts_with(&object.path) {
                return Err(EditorError::MoveIntoDescendant(object.id()));
            }

            let (parent, base) = split_last(&dest.path);
            let name = match board.find(parent) {
                Some(p) => unique_name(sibling_names(board, p, Some(obj)).iter().map(String::as_str), &base),
                None => base,
            };
            let mut path = parent.to_vec();
            path.push(name.clone());
            Ok((
                Plan::move_object(board, obj, parent, name, include_descendants),
                Destination::Object(format_id(&path)),
            ))
        }
    }
}

pub(crate) fn rename_plan(board: &Board, key: &str, new_name: &str) -> EditorResult<(Plan, Destination)> {
    match locate::target(key)? {
        Target::Edge(edge) => {
            let e = find_edge(board, &edge)?;
            let new = locate::edge_key(new_name)?;
            if !same_endpoints(&edge, &new) {
                return Err(EditorError::EdgeEndpointsChanged(new_name.to_string()));
            }
            let old = board.edge(e);
            let plan = Plan::reconnect_edge(board, e, old.src, old.dst, new.src_arrow, new.dst_arrow);
            Ok((plan, Destination::Edge(e)))
        }
        Target::Object(object) => {
            if let Some(field) = object.fields.first() {
                return Err(EditorError::ReservedKeyword(field.clone()));
            }
            let obj = find_object(board, &object)?;
            let locator = locate::parse_key(new_name)?;
            let name = match (&locator.path, locator.is_edge()) {
                (Some(path), false) if path.len() == 1 => locate::absolute_values(new_name, path)?.concat(),
                _ => return Err(EditorError::invalid_key(new_name, "a new name must be a single segment")),
            };
            if is_reserved(&name) {
                return Err(EditorError::ReservedKeyword(name));
            }

            let (parent, current) = split_last(&object.path);
            let name = if name == current {
                name
            } else {
                let parent_obj = board.object(obj).parent.unwrap_or(Board::ROOT);
                unique_name(sibling_names(board, parent_obj, Some(obj)).iter().map(String::as_str), &name)
            };
            let mut path = parent.to_vec();
            path.push(name.clone());
            Ok((Plan::move_object(board, obj, parent, name, true), Destination::Object(format_id(&path))))
        }
    }
}

fn split_last(path: &[String]) -> (&[String], String) {
    let (parent, last) = path.split_at(path.len() - 1);
    (parent, last[0].clone())
}

fn endpoint(board: &Board, path: &[String]) -> EditorResult<ObjId> {
    board
        .find(path)
        .filter(|o| *o != Board::ROOT)
        .ok_or_else(|| EditorError::ObjectNotFound(format_id(path)))
}

/// A rename locator may repeat the old prefix or leave it out.
fn same_endpoints(old: &EdgeKey, new: &EdgeKey) -> bool {
    let prefixed = |path: &[String]| {
        let mut full = old.prefix.clone();
        full.extend_from_slice(&path[new.prefix.len()..]);
        full
    };
    (new.src == old.src && new.dst == old.dst) || (prefixed(&new.src) == old.src && prefixed(&new.dst) == old.dst)
}

fn new_edge_key(board: &Board, plan: &Plan, e: EdgeId) -> String {
    match plan.new_edge(e) {
        Some(new) => edge_id(&new.src, &new.dst, new.src_arrow, new.dst_arrow, new.index),
        None => board.edge_abs_id(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use trellis_compiler::compile;

    #[test]
    fn test_move_out_of_block() {
        let diagram = compile("a: {\n  b\n}").unwrap();
        let result = Editor::default().move_object(&diagram, &[], "a.b", "b", true).unwrap();
        assert_eq!(result.text(), "a\nb\n");
    }

    #[test]
    fn test_move_rewrites_near() {
        let diagram = compile("x: {\n  near: y\n}\ny").unwrap();
        let result = Editor::default().move_object(&diagram, &[], "y", "a.y", true).unwrap();
        assert_eq!(result.text(), "x: {\n  near: a.y\n}\na.y\n");
    }

    #[test]
    fn test_move_into_descendant_fails() {
        let diagram = compile("a: {\n  b\n}").unwrap();
        assert!(matches!(
            Editor::default().move_object(&diagram, &[], "a", "a.b.a", true),
            Err(EditorError::MoveIntoDescendant(_))
        ));
    }

    #[test]
    fn test_move_edge_across_scopes_fails() {
        let diagram = compile("a: {\n  b -> c\n}\nd").unwrap();
        assert!(matches!(
            Editor::default().move_object(&diagram, &[], "a.(b -> c)[0]", "(a.b -> d)[0]", true),
            Err(EditorError::CrossScopeEdgeMove(_))
        ));
    }

    #[test]
    fn test_rename_edge_onto_used_pair() {
        let diagram = compile("a -> b\na <-> b\n(a <-> b)[0]: keep").unwrap();
        let (result, key) = Editor::default().rename(&diagram, &[], "(a -> b)[0]", "a <-> b").unwrap();
        assert_eq!(key, "(a <-> b)[0]");
        assert_eq!(result.text(), "a <-> b\na <-> b\n(a <-> b)[1]: keep\n");
        assert_eq!(result.root.edges[0].attributes.label, None);
        assert_eq!(result.root.edges[1].attributes.label.as_deref(), Some("keep"));
    }

    #[test]
    fn test_new_names_must_name_something() {
        let diagram = compile("a -> b").unwrap();
        let editor = Editor::default();
        for name in ["_", "\"\""] {
            assert!(matches!(
                editor.rename(&diagram, &[], "a", name),
                Err(EditorError::InvalidKey { .. })
            ));
        }
        for new_key in ["_", "b._", "\"\"", "b.\"\""] {
            assert!(matches!(
                editor.move_object(&diagram, &[], "a", new_key, true),
                Err(EditorError::InvalidKey { .. })
            ));
        }
    }

    #[test]
    fn test_rename_allocates_free_name() {
        let diagram = compile("a\nb").unwrap();
        let (result, key) = Editor::default().rename(&diagram, &[], "b", "a").unwrap();
        assert_eq!(key, "a 2");
        assert_eq!(result.text(), "a\na 2\n");
    }

    #[test]
    fn test_rename_edge_flips_arrow_only() {
        let diagram = compile("a -> b").unwrap();
        let editor = Editor::default();
        let (result, key) = editor.rename(&diagram, &[], "(a -> b)[0]", "a <-> b").unwrap();
        assert_eq!(key, "(a <-> b)[0]");
        assert_eq!(result.text(), "a <-> b\n");
        assert!(matches!(
            editor.rename(&diagram, &[], "(a -> b)[0]", "a -> c"),
            Err(EditorError::EdgeEndpointsChanged(_))
        ));
        assert!(matches!(
            editor.rename(&diagram, &[], "a", "shape"),
            Err(EditorError::ReservedKeyword(_))
        ));
    }
}
