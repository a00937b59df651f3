//! Resolving caller-supplied keys against a compiled board.

use trellis_compiler::keywords::{is_edge_field, is_object_field, is_reserved};
use trellis_compiler::{edge_id, Board, Diagram, EdgeId, ObjId};
use trellis_parser::{format_id, parse_locator, EdgeIndex, KeyPath, Locator};

use crate::errors::{EditorError, EditorResult};

pub(crate) fn board<'d>(diagram: &'d Diagram, path: &[&str]) -> EditorResult<&'d Board> {
    diagram
        .board(path)
        .ok_or_else(|| EditorError::BoardNotFound(path.join(".")))
}

pub(crate) fn parse_key(key: &str) -> EditorResult<Locator> {
    parse_locator(key).map_err(|source| EditorError::locator(key, source))
}

/// An object locator, optionally ending in a reserved field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ObjectKey {
    pub path: Vec<String>,
    pub fields: Vec<String>,
}

impl ObjectKey {
    fn from_path(key: &str, path: &KeyPath) -> EditorResult<Self> {
        let values = absolute_values(key, path)?;
        let split = values.iter().position(|v| is_reserved(v)).unwrap_or(values.len());
        if split == 0 {
            return Err(EditorError::invalid_key(key, "key must name an object"));
        }
        let fields = values[split..].to_vec();
        if let Some(first) = fields.first() {
            if !is_object_field(first) {
                return Err(EditorError::UnsupportedField {
                    field: first.clone(),
                    kind: "objects",
                });
            }
        }
        Ok(Self {
            path: values[..split].to_vec(),
            fields,
        })
    }

    pub fn id(&self) -> String {
        format_id(&self.path)
    }
}

/// A single-edge locator, with endpoints made absolute within the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EdgeKey {
    pub prefix: Vec<String>,
    pub src: Vec<String>,
    pub dst: Vec<String>,
    pub src_arrow: bool,
    pub dst_arrow: bool,
    pub index: Option<usize>,
    pub fields: Vec<String>,
}

impl EdgeKey {
    fn from_locator(key: &str, locator: &Locator) -> EditorResult<Self> {
        let [edge] = locator.edges.as_slice() else {
            return Err(EditorError::MultipleEdges(key.to_string()));
        };
        let prefix = match &locator.path {
            Some(path) => absolute_values(key, path)?,
            None => Vec::new(),
        };
        if prefix.iter().any(|v| is_reserved(v)) {
            return Err(EditorError::invalid_key(key, "edge scope cannot contain reserved keywords"));
        }

        let endpoint = |path: &KeyPath| -> EditorResult<Vec<String>> {
            let values = absolute_values(key, path)?;
            if values.iter().any(|v| is_reserved(v)) {
                return Err(EditorError::invalid_key(key, "edge endpoints cannot be reserved keywords"));
            }
            let mut full = prefix.clone();
            full.extend(values);
            Ok(full)
        };
        let src = endpoint(&edge.src)?;
        let dst = endpoint(&edge.dst)?;

        let index = match locator.edge_index {
            None => None,
            Some(EdgeIndex::Index(i)) => Some(i),
            Some(EdgeIndex::Glob) => return Err(EditorError::GlobIndex(key.to_string())),
        };
        let fields = locator.edge_key.as_ref().map(KeyPath::values).unwrap_or_default();
        if let Some(first) = fields.first() {
            if !is_edge_field(first) {
                return Err(EditorError::UnsupportedField {
                    field: first.clone(),
                    kind: "edges",
                });
            }
        }

        Ok(Self {
            prefix,
            src,
            dst,
            src_arrow: edge.src_arrow,
            dst_arrow: edge.dst_arrow,
            index,
            fields,
        })
    }

    pub fn id(&self) -> String {
        edge_id(&self.src, &self.dst, self.src_arrow, self.dst_arrow, self.index.unwrap_or(0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    Object(ObjectKey),
    Edge(EdgeKey),
}

pub(crate) fn target(key: &str) -> EditorResult<Target> {
    let locator = parse_key(key)?;
    if locator.is_edge() {
        return Ok(Target::Edge(EdgeKey::from_locator(key, &locator)?));
    }
    let path = locator
        .path
        .as_ref()
        .ok_or_else(|| EditorError::invalid_key(key, "empty key"))?;
    Ok(Target::Object(ObjectKey::from_path(key, path)?))
}

pub(crate) fn object_key(key: &str) -> EditorResult<ObjectKey> {
    match target(key)? {
        Target::Object(object) => Ok(object),
        Target::Edge(_) => Err(EditorError::invalid_key(key, "expected an object")),
    }
}

pub(crate) fn edge_key(key: &str) -> EditorResult<EdgeKey> {
    match target(key)? {
        Target::Edge(edge) => Ok(edge),
        Target::Object(_) => Err(EditorError::invalid_key(key, "expected an edge")),
    }
}

pub(crate) fn find_object(board: &Board, key: &ObjectKey) -> EditorResult<ObjId> {
    match board.find(&key.path) {
        Some(obj) if obj != Board::ROOT => Ok(obj),
        _ => Err(EditorError::ObjectNotFound(key.id())),
    }
}

pub(crate) fn find_edge(board: &Board, key: &EdgeKey) -> EditorResult<EdgeId> {
    let not_found = || EditorError::EdgeNotFound(key.id());
    let src = board.find(&key.src).ok_or_else(not_found)?;
    let dst = board.find(&key.dst).ok_or_else(not_found)?;
    board
        .edges_between(src, dst, key.src_arrow, key.dst_arrow)
        .get(key.index.unwrap_or(0))
        .copied()
        .ok_or_else(not_found)
}

/// Segment values of a caller-supplied path. Every segment must name
/// something: no `_` and no empty identifiers.
pub(crate) fn absolute_values(key: &str, path: &KeyPath) -> EditorResult<Vec<String>> {
    if path.segments.iter().any(|s| s.is_underscore()) {
        return Err(EditorError::invalid_key(key, "'_' is not allowed in a locator"));
    }
    if path.segments.iter().any(|s| s.value.is_empty()) {
        return Err(EditorError::invalid_key(key, "identifiers cannot be empty"));
    }
    Ok(path.values())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_compiler::compile;

    #[test]
    fn test_object_key_splits_fields() {
        let key = object_key("a.b.style.fill").unwrap();
        assert_eq!(key.path, vec!["a", "b"]);
        assert_eq!(key.fields, vec!["style", "fill"]);
        assert!(matches!(
            object_key("a.source-arrowhead"),
            Err(EditorError::UnsupportedField { kind: "objects", .. })
        ));
        assert!(matches!(object_key("_.a"), Err(EditorError::InvalidKey { .. })));
        assert!(matches!(object_key("a.b._"), Err(EditorError::InvalidKey { .. })));
        assert!(matches!(object_key("a._.b"), Err(EditorError::InvalidKey { .. })));
        assert!(matches!(object_key("\"\""), Err(EditorError::InvalidKey { .. })));
        assert!(matches!(object_key("a.\"\""), Err(EditorError::InvalidKey { .. })));
        assert!(matches!(edge_key("a -> \"\""), Err(EditorError::InvalidKey { .. })));
        assert!(matches!(edge_key("(a -> b._)[0]"), Err(EditorError::InvalidKey { .. })));
        assert!(matches!(object_key("a..b"), Err(EditorError::Locator { .. })));
    }

    #[test]
    fn test_edge_key_is_absolute() {
        let key = edge_key("a.(b -> c)[1].label").unwrap();
        assert_eq!(key.src, vec!["a", "b"]);
        assert_eq!(key.dst, vec!["a", "c"]);
        assert_eq!(key.index, Some(1));
        assert_eq!(key.fields, vec!["label"]);
        assert_eq!(key.id(), "(a.b -> a.c)[1]");

        assert!(matches!(edge_key("a -> b -> c"), Err(EditorError::MultipleEdges(_))));
        assert!(matches!(edge_key("(a -> b)[*]"), Err(EditorError::GlobIndex(_))));
        assert!(matches!(
            edge_key("(a -> b)[0].shape"),
            Err(EditorError::UnsupportedField { kind: "edges", .. })
        ));
    }

    #[test]
    fn test_find_missing_edge_and_object() {
        let diagram = compile("a -> b").unwrap();
        let board = &diagram.root;
        assert!(find_edge(board, &edge_key("(a -> b)[0]").unwrap()).is_ok());
        assert!(matches!(
            find_edge(board, &edge_key("(a -> b)[1]").unwrap()),
            Err(EditorError::EdgeNotFound(id)) if id == "(a -> b)[1]"
        ));
        assert!(matches!(
            find_object(board, &object_key("c").unwrap()),
            Err(EditorError::ObjectNotFound(id)) if id == "c"
        ));
    }
}
