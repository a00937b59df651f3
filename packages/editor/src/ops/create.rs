use tracing::{info, instrument};
use trellis_compiler::{edge_id, Board, Diagram};
use trellis_parser::{format_id, Ast, Edge, Key, KeyPath};

use super::{rejected, Editor};
use crate::allocate::{next_edge_index, sibling_names, unique_name};
use crate::errors::{EditorError, EditorResult};
use crate::locate::{self, EdgeKey, ObjectKey, Target};
use crate::scope::{common_prefix, live_keys, nearest_block, to_segments};

impl Editor {
    /// Add a bare object or a single edge to `board`.
    ///
    /// Object names are made unique among their future siblings, so the
    /// final key can differ from `key`.
    #[instrument(skip(self, diagram), fields(board = %board.join(".")))]
    pub fn create(&self, diagram: &Diagram, board: &[&str], key: &str) -> EditorResult<(Diagram, String)> {
        rejected("create", key, self.try_create(diagram, board, key))
    }

    fn try_create(&self, diagram: &Diagram, board_path: &[&str], key: &str) -> EditorResult<(Diagram, String)> {
        let board = locate::board(diagram, board_path)?;
        let mut ast = diagram.ast.clone();
        let final_key = match locate::target(key)? {
            Target::Edge(edge) => create_edge(board, &mut ast, key, &edge)?,
            Target::Object(object) => create_object(board, &mut ast, &object)?,
        };

        let result = self.commit(&diagram.ast, board_path, board.map, &ast)?;
        info!(key = %final_key, "Created");
        Ok((result, final_key))
    }
}

fn create_edge(board: &Board, ast: &mut Ast, key: &str, edge: &EdgeKey) -> EditorResult<String> {
    if edge.index.is_some() {
        return Err(EditorError::invalid_key(key, "an edge index cannot be given on create"));
    }
    if let Some(field) = edge.fields.first() {
        return Err(EditorError::ReservedKeyword(field.clone()));
    }

    let live = live_keys(ast, board.map);
    let parents = common_prefix(&edge.src[..edge.src.len() - 1], &edge.dst[..edge.dst.len() - 1]);
    let (block, scope) = nearest_block(board, ast, parents, &live);
    let statement = Key::edge(vec![Edge::new(
        KeyPath::new(to_segments(&edge.src[scope.len()..])),
        KeyPath::new(to_segments(&edge.dst[scope.len()..])),
        edge.src_arrow,
        edge.dst_arrow,
    )]);
    let id = ast.alloc_key(statement);
    ast.push_key(block, id);

    let index = match (board.find(&edge.src), board.find(&edge.dst)) {
        (Some(src), Some(dst)) => next_edge_index(board, src, dst, edge.src_arrow, edge.dst_arrow),
        _ => 0,
    };
    Ok(edge_id(&edge.src, &edge.dst, edge.src_arrow, edge.dst_arrow, index))
}

fn create_object(board: &Board, ast: &mut Ast, object: &ObjectKey) -> EditorResult<String> {
    if let Some(field) = object.fields.first() {
        return Err(EditorError::ReservedKeyword(field.clone()));
    }

    let (parent, base) = object.path.split_at(object.path.len() - 1);
    let name = match board.find(parent) {
        Some(parent) => unique_name(sibling_names(board, parent, None).iter().map(String::as_str), &base[0]),
        None => base[0].clone(),
    };
    let mut path = parent.to_vec();
    path.push(name);

    let live = live_keys(ast, board.map);
    let (block, scope) = nearest_block(board, ast, parent, &live);
    let id = ast.alloc_key(Key::new(KeyPath::new(to_segments(&path[scope.len()..]))));
    ast.push_key(block, id);
    Ok(format_id(&path))
}
