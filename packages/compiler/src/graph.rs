//! # Semantic graph
//!
//! The compiled form of a program. Every object and edge keeps the list of
//! tree locations that contributed to it, in declaration order.
//!
//! ## Design
//!
//! - Objects and edges are stored in per-board vectors and addressed by
//!   [`ObjId`] / [`EdgeId`]. Object `0` of every board is its root.
//! - References hold arena handles into the [`Ast`] owned by the [`Diagram`],
//!   never pointers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trellis_parser::{format_id, serialize, Ast, KeyId, MapId};

use crate::keywords::BoardKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub usize);

/// A compiled program together with the tree it was compiled from
#[derive(Debug, Clone)]
pub struct Diagram {
    pub ast: Ast,
    pub root: Board,
}

impl Diagram {
    /// Board addressed by alternating keyword/name pairs, e.g. `["layers", "x"]`.
    pub fn board(&self, path: &[&str]) -> Option<&Board> {
        self.root.board(path)
    }

    /// Canonical source text of the owned tree
    pub fn text(&self) -> String {
        serialize(&self.ast)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub name: Option<String>,
    pub kind: Option<BoardKind>,
    /// Block holding the board's statements.
    pub map: MapId,
    pub objects: Vec<Object>,
    pub edges: Vec<Edge>,
    pub boards: Vec<Board>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    /// Last path segment.
    pub name: String,
    /// Absolute, formatted identifier.
    pub id: String,
    pub parent: Option<ObjId>,
    pub children: Vec<ObjId>,
    pub attributes: Attributes,
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    pub label: Option<String>,
    /// Reserved fields by dotted name, e.g. `shape`, `style.opacity`.
    pub fields: BTreeMap<String, String>,
}

/// One tree location that mentions an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub key: KeyId,
    /// Block containing the statement.
    pub map: MapId,
    /// Object whose block the statement is nested in.
    pub scope: ObjId,
    pub kind: ReferenceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// Segment `index` of the statement's path.
    Key { index: usize },
    /// Segment `index` of the source of chain link `edge`.
    EdgeSrc { edge: usize, index: usize },
    EdgeDst { edge: usize, index: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub src: ObjId,
    pub dst: ObjId,
    pub src_arrow: bool,
    pub dst_arrow: bool,
    /// Occurrence index among edges with the same endpoints and arrows.
    pub index: usize,
    pub attributes: Attributes,
    pub references: Vec<EdgeReference>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeReference {
    pub key: KeyId,
    pub map: MapId,
    pub scope: ObjId,
    /// Position of the link in its chain; `0` for indexed statements.
    pub chain_index: usize,
    /// Whether the statement addresses the edge as `(a -> b)[n]`.
    pub indexed: bool,
}

impl Reference {
    /// Whether this reference is the last object segment of a plain key
    /// statement, i.e. the statement declares the object itself.
    pub fn declares(&self, ast: &Ast) -> bool {
        let key = ast.key(self.key);
        match (self.kind, &key.path) {
            (ReferenceKind::Key { index }, Some(path)) if !key.is_edge() => index + 1 == path.len(),
            _ => false,
        }
    }
}

impl Board {
    pub const ROOT: ObjId = ObjId(0);

    pub(crate) fn new(map: MapId, name: Option<String>, kind: Option<BoardKind>) -> Self {
        Self {
            name,
            kind,
            map,
            objects: vec![Object {
                name: String::new(),
                id: String::new(),
                parent: None,
                children: Vec::new(),
                attributes: Attributes::default(),
                references: Vec::new(),
            }],
            edges: Vec::new(),
            boards: Vec::new(),
        }
    }

    pub fn object(&self, id: ObjId) -> &Object {
        &self.objects[id.0]
    }

    pub(crate) fn object_mut(&mut self, id: ObjId) -> &mut Object {
        &mut self.objects[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    /// Every object except the board root
    pub fn object_ids(&self) -> impl Iterator<Item = ObjId> + '_ {
        (1..self.objects.len()).map(ObjId)
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len()).map(EdgeId)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len() - 1
    }

    pub fn child(&self, parent: ObjId, name: &str) -> Option<ObjId> {
        self.object(parent)
            .children
            .iter()
            .copied()
            .find(|c| self.object(*c).name == name)
    }

    pub(crate) fn add_child(&mut self, parent: ObjId, name: &str) -> ObjId {
        let mut path = self.path(parent);
        path.push(name.to_string());
        let id = ObjId(self.objects.len());
        self.objects.push(Object {
            name: name.to_string(),
            id: format_id(&path),
            parent: Some(parent),
            children: Vec::new(),
            attributes: Attributes::default(),
            references: Vec::new(),
        });
        self.object_mut(parent).children.push(id);
        id
    }

    /// Segment values from the board root down to `id`
    pub fn path(&self, id: ObjId) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(obj) = current {
            if obj == Self::ROOT {
                break;
            }
            path.push(self.object(obj).name.clone());
            current = self.object(obj).parent;
        }
        path.reverse();
        path
    }

    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<ObjId> {
        path.iter()
            .try_fold(Self::ROOT, |parent, name| self.child(parent, name.as_ref()))
    }

    /// True if `obj` is `ancestor` or lies below it.
    pub fn contains(&self, ancestor: ObjId, obj: ObjId) -> bool {
        let mut current = Some(obj);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.object(id).parent;
        }
        false
    }

    /// `obj` and everything below it, parents before children.
    pub fn subtree(&self, obj: ObjId) -> Vec<ObjId> {
        let mut out = vec![obj];
        let mut i = 0;
        while i < out.len() {
            out.extend(self.object(out[i]).children.iter().copied());
            i += 1;
        }
        out
    }

    /// Edges with the given endpoints and arrows, in occurrence order.
    pub fn edges_between(&self, src: ObjId, dst: ObjId, src_arrow: bool, dst_arrow: bool) -> Vec<EdgeId> {
        self.edge_ids()
            .filter(|e| {
                let edge = self.edge(*e);
                edge.src == src && edge.dst == dst && edge.src_arrow == src_arrow && edge.dst_arrow == dst_arrow
            })
            .collect()
    }

    pub fn edge_abs_id(&self, id: EdgeId) -> String {
        let edge = self.edge(id);
        edge_id(
            &self.path(edge.src),
            &self.path(edge.dst),
            edge.src_arrow,
            edge.dst_arrow,
            edge.index,
        )
    }

    pub fn sub_board(&self, kind: BoardKind, name: &str) -> Option<&Board> {
        self.boards
            .iter()
            .find(|b| b.kind == Some(kind) && b.name.as_deref() == Some(name))
    }

    pub fn board(&self, path: &[&str]) -> Option<&Board> {
        match path {
            [] => Some(self),
            [keyword, name, rest @ ..] => {
                let kind = BoardKind::from_keyword(keyword)?;
                self.sub_board(kind, name)?.board(rest)
            }
            [_] => None,
        }
    }
}

/// Formatted edge identifier, `(src -> dst)[index]`
pub fn edge_id<S: AsRef<str>>(src: &[S], dst: &[S], src_arrow: bool, dst_arrow: bool, index: usize) -> String {
    format!(
        "({} {} {})[{}]",
        format_id(src),
        trellis_parser::serializer::arrow(src_arrow, dst_arrow),
        format_id(dst),
        index
    )
}
