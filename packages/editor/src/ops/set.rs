use tracing::{debug, info, instrument};
use trellis_compiler::{Board, Diagram, EdgeReference};
use trellis_parser::{Ast, Edge, EdgeIndex, Key, KeyId, KeyPath, MapId, Scalar, Segment, Value};

use super::{rejected, Editor};
use crate::errors::{EditorError, EditorResult};
use crate::fields::{edge_fields, object_fields};
use crate::locate::{self, find_edge, EdgeKey, ObjectKey, Target};
use crate::scope::{declarations, live_keys, nearest_block, relativize, to_segments};

const LABEL: &str = "label";

impl Editor {
    /// Set the label or a reserved field of an object or edge.
    ///
    /// `tag` writes the value as a block string (`|md ...|`). A `None` value
    /// clears a label and deletes any other field.
    #[instrument(skip(self, diagram, value), fields(board = %board.join(".")))]
    pub fn set(
        &self,
        diagram: &Diagram,
        board: &[&str],
        key: &str,
        tag: Option<&str>,
        value: Option<&str>,
    ) -> EditorResult<Diagram> {
        rejected("set", key, self.try_set(diagram, board, key, tag, value))
    }

    fn try_set(
        &self,
        diagram: &Diagram,
        board_path: &[&str],
        key: &str,
        tag: Option<&str>,
        value: Option<&str>,
    ) -> EditorResult<Diagram> {
        if let Some(tag) = tag {
            if tag.is_empty() || tag.contains(char::is_whitespace) {
                return Err(EditorError::InvalidTag(tag.to_string()));
            }
        }
        let board = locate::board(diagram, board_path)?;
        let target = locate::target(key)?;
        let Some(value) = value else {
            let labelled = field_path(&target).first().map(String::as_str) == Some(LABEL);
            return self.delete_field(diagram, board_path, board, key, &target, !labelled);
        };

        let scalar = match tag {
            Some(tag) => Scalar::block(tag, value),
            None => Scalar::unquoted(value),
        };
        let mut ast = diagram.ast.clone();
        match &target {
            Target::Object(object) => set_object(board, &mut ast, object, scalar),
            Target::Edge(edge) => set_edge(board, &mut ast, edge, scalar)?,
        }

        let result = self.commit(&diagram.ast, board_path, board.map, &ast)?;
        info!(key, "Set");
        Ok(result)
    }
}

/// Fields addressed by a target, `label` when none are given.
pub(super) fn field_path(target: &Target) -> Vec<String> {
    let fields = match target {
        Target::Object(object) => &object.fields,
        Target::Edge(edge) => &edge.fields,
    };
    if fields.is_empty() {
        vec![LABEL.to_string()]
    } else {
        fields.clone()
    }
}

fn is_label(fields: &[String]) -> bool {
    fields == [LABEL]
}

fn set_object(board: &Board, ast: &mut Ast, object: &ObjectKey, scalar: Scalar) {
    let fields = field_path(&Target::Object(object.clone()));
    let live = live_keys(ast, board.map);
    let path = &object.path;
    let parent = &path[..path.len() - 1];

    let Some(obj) = board.find(path) else {
        debug!(object = %object.id(), "Setting a field creates the object");
        let (block, scope) = nearest_block(board, ast, parent, &live);
        append(ast, block, relative_path(&path[scope.len()..], &fields), scalar);
        return;
    };

    if let Some(hit) = object_fields(board, ast, obj, &fields, &live).last() {
        ast.key_mut(hit.key).value = Value::Scalar(scalar);
        return;
    }

    let decls = declarations(board, ast, obj, &live);
    if is_label(&fields) {
        match decls.last() {
            Some(decl) => set_statement_label(ast, decl.key, scalar),
            None => {
                let (block, scope) = nearest_block(board, ast, parent, &live);
                append(ast, block, to_segments(&path[scope.len()..]), scalar);
            }
        }
        return;
    }

    if let Some(block) = decls.iter().rev().find_map(|r| ast.key(r.key).map_value()) {
        append(ast, block, to_segments(&fields), scalar);
    } else if let Some(decl) = decls.last() {
        let block = open_block(ast, decl.key);
        append(ast, block, to_segments(&fields), scalar);
    } else {
        let (block, scope) = nearest_block(board, ast, parent, &live);
        append(ast, block, relative_path(&path[scope.len()..], &fields), scalar);
    }
}

fn set_edge(board: &Board, ast: &mut Ast, edge: &EdgeKey, scalar: Scalar) -> EditorResult<()> {
    let e = find_edge(board, edge)?;
    let fields = field_path(&Target::Edge(edge.clone()));
    let live = live_keys(ast, board.map);

    if let Some(hit) = edge_fields(board, ast, e, &fields, &live).last() {
        ast.key_mut(hit.key).value = Value::Scalar(scalar);
        return Ok(());
    }

    let refs: Vec<EdgeReference> = board
        .edge(e)
        .references
        .iter()
        .filter(|r| live.contains(&r.key))
        .copied()
        .collect();
    // A statement whose value belongs to this edge alone.
    let own = refs.iter().rev().find(|r| {
        let key = ast.key(r.key);
        match (r.indexed, key.edge_index) {
            (true, Some(EdgeIndex::Index(_))) => key.edge_key.is_none(),
            (false, _) => key.edges.len() == 1,
            _ => false,
        }
    });

    if let Some(own) = own {
        if is_label(&fields) {
            set_statement_label(ast, own.key, scalar);
        } else {
            let block = match ast.key(own.key).map_value() {
                Some(block) => block,
                None => open_block(ast, own.key),
            };
            append(ast, block, to_segments(&fields), scalar);
        }
        return Ok(());
    }

    let Some(chain) = refs.first() else {
        return Err(EditorError::EdgeNotFound(edge.id()));
    };
    let compiled = board.edge(e);
    let scope = board.path(chain.scope);
    let ends = (
        relativize(&board.path(compiled.src), &scope, false),
        relativize(&board.path(compiled.dst), &scope, false),
    );
    let (prefix, src, dst, map, position) = match ends {
        (Some(src), Some(dst)) => (
            ast.key(chain.key).path.clone(),
            src,
            dst,
            chain.map,
            ast.position(chain.map, chain.key).map(|p| p + 1),
        ),
        _ => (
            None,
            to_segments(&board.path(compiled.src)),
            to_segments(&board.path(compiled.dst)),
            board.map,
            None,
        ),
    };

    let mut statement = Key::edge(vec![Edge::new(
        KeyPath::new(src),
        KeyPath::new(dst),
        compiled.src_arrow,
        compiled.dst_arrow,
    )])
    .with_value(Value::Scalar(scalar));
    statement.path = prefix;
    statement.edge_index = Some(EdgeIndex::Index(compiled.index));
    if !is_label(&fields) {
        statement.edge_key = Some(KeyPath::from_strs(&fields));
    }
    let id = ast.alloc_key(statement);
    match position {
        Some(at) => ast.insert_key(map, at, id),
        None => ast.push_key(map, id),
    }
    Ok(())
}

/// Make `scalar` the label of a declaring statement.
fn set_statement_label(ast: &mut Ast, key: KeyId, scalar: Scalar) {
    let key = ast.key_mut(key);
    match key.value {
        Value::Map(_) => key.primary = Some(scalar),
        _ => key.value = Value::Scalar(scalar),
    }
}

/// Give a bare or scalar statement a block. A scalar becomes its primary label.
fn open_block(ast: &mut Ast, key: KeyId) -> MapId {
    let block = ast.new_map();
    let key = ast.key_mut(key);
    if let Value::Scalar(label) = std::mem::replace(&mut key.value, Value::Map(block)) {
        key.primary = Some(label);
    }
    block
}

fn relative_path(object: &[String], fields: &[String]) -> Vec<Segment> {
    let mut segments = to_segments(object);
    if !is_label(fields) {
        segments.extend(to_segments(fields));
    }
    segments
}

fn append(ast: &mut Ast, block: MapId, segments: Vec<Segment>, scalar: Scalar) {
    let id = ast.alloc_key(Key::new(KeyPath::new(segments)).with_value(Value::Scalar(scalar)));
    ast.push_key(block, id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use trellis_compiler::compile;

    fn set(source: &str, key: &str, value: Option<&str>) -> String {
        let diagram = compile(source).unwrap();
        Editor::default().set(&diagram, &[], key, None, value).unwrap().text()
    }

    #[test]
    fn test_set_replaces_existing_field() {
        assert_eq!(set("a.shape: circle", "a.shape", Some("oval")), "a.shape: oval\n");
        assert_eq!(
            set("a: {\n  style: {\n    fill: red\n  }\n}", "a.style.fill", Some("blue")),
            "a: {\n  style: {\n    fill: blue\n  }\n}\n"
        );
    }

    #[test]
    fn test_set_label_on_declaration() {
        assert_eq!(set("a", "a", Some("Hello")), "a: Hello\n");
        assert_eq!(set("a: {\n  b\n}", "a", Some("Hello")), "a: Hello {\n  b\n}\n");
        assert_eq!(set("a.b", "a.b", Some("Hi")), "a.b: Hi\n");
    }

    #[test]
    fn test_set_field_opens_block() {
        assert_eq!(set("a: Hello", "a.shape", Some("circle")), "a: Hello {\n  shape: circle\n}\n");
        assert_eq!(set("a -> b", "a.shape", Some("circle")), "a -> b\na.shape: circle\n");
    }

    #[test]
    fn test_set_on_missing_object_creates_it() {
        assert_eq!(set("a: {\n  b\n}", "a.c.shape", Some("circle")), "a: {\n  b\n  c.shape: circle\n}\n");
    }

    #[test]
    fn test_set_edge_label_in_chain_adds_indexed_statement() {
        assert_eq!(
            set("x -> y -> z", "(y -> z)[0]", Some("go")),
            "x -> y -> z\n(y -> z)[0]: go\n"
        );
        assert_eq!(set("x -> y", "(x -> y)[0].style.opacity", Some("0.5")), "x -> y: {\n  style.opacity: 0.5\n}\n");
    }

    #[test]
    fn test_set_block_string_and_invalid_tag() {
        let diagram = compile("a").unwrap();
        let editor = Editor::default();
        let result = editor.set(&diagram, &[], "a", Some("md"), Some("# Title")).unwrap();
        assert_eq!(result.text(), "a: |md # Title|\n");
        assert!(matches!(
            editor.set(&diagram, &[], "a", Some("m d"), Some("x")),
            Err(EditorError::InvalidTag(_))
        ));
    }

    #[test]
    fn test_set_none_clears_label() {
        assert_eq!(set("a: Hello", "a", None), "a\n");
        assert_eq!(set("a", "a", None), "a\n");
    }
}
