use tracing::{info, instrument};
use trellis_compiler::{Board, Diagram, ObjId};

use super::{rejected, Editor};
use crate::errors::{EditorError, EditorResult};
use crate::locate::{self, find_edge, find_object};
use crate::plan::Plan;

impl Editor {
    /// Point one edge at new endpoints. `None` keeps that end.
    ///
    /// Endpoints are absolute object keys within the board. A link taken out
    /// of a chain becomes its own statement after the rest of the chain.
    #[instrument(skip(self, diagram), fields(board = %board.join(".")))]
    pub fn reconnect_edge(
        &self,
        diagram: &Diagram,
        board: &[&str],
        edge_key: &str,
        new_src: Option<&str>,
        new_dst: Option<&str>,
    ) -> EditorResult<Diagram> {
        let result = locate::board(diagram, board).and_then(|target| {
            let mut plan = reconnect_plan(target, edge_key, new_src, new_dst)?;
            let result = self.apply_plan(diagram, board, target, &mut plan)?;
            info!(edge_key, "Reconnected");
            Ok(result)
        });
        rejected("reconnect", edge_key, result)
    }
}

pub(crate) fn reconnect_plan(
    board: &Board,
    edge_key: &str,
    new_src: Option<&str>,
    new_dst: Option<&str>,
) -> EditorResult<Plan> {
    let edge = locate::edge_key(edge_key)?;
    if let Some(field) = edge.fields.first() {
        return Err(EditorError::invalid_key(edge_key, format!("'{}' is a field, not an edge", field)));
    }
    let e = find_edge(board, &edge)?;
    let old = board.edge(e);
    let src = endpoint(board, new_src, old.src)?;
    let dst = endpoint(board, new_dst, old.dst)?;
    Ok(Plan::reconnect_edge(board, e, src, dst, old.src_arrow, old.dst_arrow))
}

fn endpoint(board: &Board, key: Option<&str>, current: ObjId) -> EditorResult<ObjId> {
    let Some(key) = key else {
        return Ok(current);
    };
    let object = locate::object_key(key)?;
    if let Some(field) = object.fields.first() {
        return Err(EditorError::ReservedKeyword(field.clone()));
    }
    find_object(board, &object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use trellis_compiler::compile;

    #[test]
    fn test_reconnect_splits_chain() {
        let diagram = compile("x -> y -> z\nq").unwrap();
        let result = Editor::default()
            .reconnect_edge(&diagram, &[], "(x -> y)[0]", None, Some("q"))
            .unwrap();
        assert_eq!(result.text(), "y -> z\nx -> q\nq\n");
    }

    #[test]
    fn test_reconnect_nested_edge_keeps_scope() {
        let diagram = compile("a: {\n  b -> c\n  d\n}").unwrap();
        let result = Editor::default()
            .reconnect_edge(&diagram, &[], "a.(b -> c)[0]", Some("a.d"), None)
            .unwrap();
        assert_eq!(result.text(), "a: {\n  b\n  d -> c\n  d\n}\n");
    }

    #[test]
    fn test_reconnect_onto_used_pair_renumbers_later_edges() {
        let diagram = compile("x -> y\nx -> q\n(x -> q)[0]: keep\nq").unwrap();
        let result = Editor::default()
            .reconnect_edge(&diagram, &[], "(x -> y)[0]", None, Some("q"))
            .unwrap();
        assert_eq!(result.text(), "y\nx -> q\nx -> q\n(x -> q)[1]: keep\nq\n");

        let labels: Vec<Option<&str>> = result.root.edges.iter().map(|e| e.attributes.label.as_deref()).collect();
        assert_eq!(labels, vec![None, Some("keep")]);
    }

    #[test]
    fn test_reconnect_to_missing_object_fails() {
        let diagram = compile("a -> b").unwrap();
        assert!(matches!(
            Editor::default().reconnect_edge(&diagram, &[], "(a -> b)[0]", Some("zzz"), None),
            Err(EditorError::ObjectNotFound(_))
        ));
    }
}
