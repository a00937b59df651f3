//! Lookup of reserved-field statements.
//!
//! A field can be written flat (`a.style.fill: red`), inside the object's
//! block (`a: { style.fill: red }`), nested (`a: { style: { fill: red } }`),
//! or for edges in an indexed statement (`(a -> b)[0].style.fill: red`).

use std::collections::HashSet;
use trellis_compiler::{Board, EdgeId, ObjId, ReferenceKind};
use trellis_parser::{Ast, KeyId, MapId};

/// A statement that sets exactly the requested field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldHit {
    pub map: MapId,
    pub key: KeyId,
    /// For flat object paths, the index of the first field segment.
    pub flat: Option<usize>,
}

/// Every live statement setting `fields` on `obj`, in source order.
pub(crate) fn object_fields(
    board: &Board,
    ast: &Ast,
    obj: ObjId,
    fields: &[String],
    live: &HashSet<KeyId>,
) -> Vec<FieldHit> {
    let mut hits = Vec::new();
    for r in &board.object(obj).references {
        let ReferenceKind::Key { index } = r.kind else {
            continue;
        };
        let key = ast.key(r.key);
        let Some(path) = &key.path else {
            continue;
        };
        if !live.contains(&r.key) || key.is_edge() {
            continue;
        }

        let tail: Vec<String> = path.segments[index + 1..].iter().map(|s| s.value.clone()).collect();
        if tail == fields {
            hits.push(FieldHit {
                map: r.map,
                key: r.key,
                flat: Some(index + 1),
            });
        } else if fields.starts_with(&tail) {
            if let Some(block) = key.map_value() {
                search_block(ast, block, &fields[tail.len()..], &mut hits);
            }
        }
    }
    hits
}

/// Every live statement setting `fields` on edge `e`, in source order.
pub(crate) fn edge_fields(
    board: &Board,
    ast: &Ast,
    e: EdgeId,
    fields: &[String],
    live: &HashSet<KeyId>,
) -> Vec<FieldHit> {
    let mut hits = Vec::new();
    for r in &board.edge(e).references {
        if !live.contains(&r.key) {
            continue;
        }
        let key = ast.key(r.key);
        let tail = match (&key.edge_key, r.indexed) {
            (Some(edge_key), true) => edge_key.values(),
            (None, true) => Vec::new(),
            (_, false) if key.edges.len() == 1 => Vec::new(),
            _ => continue,
        };

        if !tail.is_empty() && tail == fields {
            hits.push(FieldHit {
                map: r.map,
                key: r.key,
                flat: None,
            });
        } else if fields.starts_with(&tail) {
            if let Some(block) = key.map_value() {
                search_block(ast, block, &fields[tail.len()..], &mut hits);
            }
        }
    }
    hits
}

fn search_block(ast: &Ast, block: MapId, fields: &[String], hits: &mut Vec<FieldHit>) {
    if fields.is_empty() {
        return;
    }
    for id in ast.keys_of(block) {
        let key = ast.key(id);
        let Some(path) = key.path.as_ref().filter(|_| !key.is_edge()) else {
            continue;
        };
        let values = path.values();
        if values == fields {
            hits.push(FieldHit {
                map: block,
                key: id,
                flat: None,
            });
        } else if fields.starts_with(&values) {
            if let Some(inner) = key.map_value() {
                search_block(ast, inner, &fields[values.len()..], hits);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::live_keys;
    use trellis_compiler::compile;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_object_field_in_every_form() {
        let diagram = compile("a.style.fill: red\na: {\n  style.fill: blue\n  style: {\n    fill: green\n  }\n}").unwrap();
        let board = &diagram.root;
        let live = live_keys(&diagram.ast, board.map);
        let a = board.find(&["a"]).unwrap();

        let hits = object_fields(board, &diagram.ast, a, &strings(&["style", "fill"]), &live);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].flat, Some(1));
        assert!(hits[1..].iter().all(|h| h.flat.is_none()));
        assert!(object_fields(board, &diagram.ast, a, &strings(&["shape"]), &live).is_empty());
    }

    #[test]
    fn test_edge_field_in_indexed_statement_and_block() {
        let diagram = compile("a -> b: {\n  style.opacity: 0.2\n}\n(a -> b)[0].style.opacity: 0.3").unwrap();
        let board = &diagram.root;
        let live = live_keys(&diagram.ast, board.map);

        let hits = edge_fields(board, &diagram.ast, EdgeId(0), &strings(&["style", "opacity"]), &live);
        assert_eq!(hits.len(), 2);
    }
}
