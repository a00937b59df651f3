//! # Edit plans
//!
//! A [`Plan`] states where every object and edge of a board ends up after a
//! structural edit, before any text is touched. The rewriter executes it and
//! the delta engine reads it, so both always agree.
//!
//! Edge indices are recomputed from the new endpoints. They start out in
//! board order and are settled by [`Plan::renumber`] once the rewriter knows
//! the order the edited statements are read in.

use std::collections::HashMap;
use trellis_compiler::{edge_id, Board, EdgeId, ObjId};
use trellis_parser::format_id;

use crate::allocate::{sibling_names, unique_name};
use crate::deltas::IdDeltas;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EdgeFate {
    Keep,
    Delete,
    Reconnect {
        src: ObjId,
        dst: ObjId,
        src_arrow: bool,
        dst_arrow: bool,
    },
}

/// An edge as it will read after the edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewEdge {
    pub src: Vec<String>,
    pub dst: Vec<String>,
    pub src_arrow: bool,
    pub dst_arrow: bool,
    pub index: usize,
}

/// Where a moved object is re-declared if nothing else declares it.
#[derive(Debug, Clone)]
pub(crate) struct Landing {
    pub moved: ObjId,
    pub parent: Vec<String>,
    pub path: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Plan {
    old: Vec<Vec<String>>,
    objects: Vec<Option<Vec<String>>>,
    edges: Vec<EdgeFate>,
    new_edges: Vec<Option<NewEdge>>,
    landing: Option<Landing>,
}

impl Plan {
    fn identity(board: &Board) -> Self {
        let old: Vec<Vec<String>> = (0..board.objects.len()).map(|i| board.path(ObjId(i))).collect();
        Self {
            objects: old.iter().cloned().map(Some).collect(),
            old,
            edges: vec![EdgeFate::Keep; board.edges.len()],
            new_edges: Vec::new(),
            landing: None,
        }
    }

    /// Drop `obj`, hoisting its children into its parent.
    pub fn delete_object(board: &Board, obj: ObjId) -> Self {
        let mut plan = Self::identity(board);
        let parent = board.object(obj).parent.unwrap_or(Board::ROOT);
        let parent_path = board.path(parent);
        let mut taken = sibling_names(board, parent, Some(obj));

        plan.objects[obj.0] = None;
        plan.hoist_children(board, obj, &parent_path, &mut taken);
        for e in board.edge_ids() {
            let edge = board.edge(e);
            if edge.src == obj || edge.dst == obj {
                plan.edges[e.0] = EdgeFate::Delete;
            }
        }
        plan.finish(board)
    }

    pub fn delete_edge(board: &Board, edge: EdgeId) -> Self {
        let mut plan = Self::identity(board);
        plan.edges[edge.0] = EdgeFate::Delete;
        plan.finish(board)
    }

    /// Re-parent `obj` as `parent.name`. `name` must already be free there.
    pub fn move_object(board: &Board, obj: ObjId, parent: &[String], name: String, include_descendants: bool) -> Self {
        let mut plan = Self::identity(board);
        let mut path = parent.to_vec();
        path.push(name);

        if include_descendants {
            plan.relocate(board, obj, path.clone());
        } else {
            plan.objects[obj.0] = Some(path.clone());
            let old_parent = board.object(obj).parent.unwrap_or(Board::ROOT);
            let old_parent_path = board.path(old_parent);
            let mut taken = sibling_names(board, old_parent, Some(obj));
            if parent == old_parent_path.as_slice() {
                taken.extend(path.last().cloned());
            }
            plan.hoist_children(board, obj, &old_parent_path, &mut taken);
        }

        plan.landing = Some(Landing {
            moved: obj,
            parent: parent.to_vec(),
            path,
        });
        plan.finish(board)
    }

    pub fn reconnect_edge(board: &Board, edge: EdgeId, src: ObjId, dst: ObjId, src_arrow: bool, dst_arrow: bool) -> Self {
        let mut plan = Self::identity(board);
        let old = board.edge(edge);
        let unchanged = old.src == src && old.dst == dst && old.src_arrow == src_arrow && old.dst_arrow == dst_arrow;
        if !unchanged {
            plan.edges[edge.0] = EdgeFate::Reconnect {
                src,
                dst,
                src_arrow,
                dst_arrow,
            };
        }
        plan.finish(board)
    }

    fn hoist_children(&mut self, board: &Board, obj: ObjId, parent_path: &[String], taken: &mut Vec<String>) {
        for &child in &board.object(obj).children {
            let name = unique_name(taken.iter().map(String::as_str), &board.object(child).name);
            taken.push(name.clone());
            let mut path = parent_path.to_vec();
            path.push(name);
            self.relocate(board, child, path);
        }
    }

    fn relocate(&mut self, board: &Board, obj: ObjId, path: Vec<String>) {
        let depth = self.old[obj.0].len();
        for id in board.subtree(obj) {
            let mut new_path = path.clone();
            new_path.extend_from_slice(&self.old[id.0][depth..]);
            self.objects[id.0] = Some(new_path);
        }
    }

    fn finish(mut self, board: &Board) -> Self {
        let mut new_edges = vec![None; board.edges.len()];
        for e in board.edge_ids() {
            let edge = board.edge(e);
            let (src, dst, src_arrow, dst_arrow) = match self.edges[e.0] {
                EdgeFate::Delete => continue,
                EdgeFate::Keep => (edge.src, edge.dst, edge.src_arrow, edge.dst_arrow),
                EdgeFate::Reconnect {
                    src,
                    dst,
                    src_arrow,
                    dst_arrow,
                } => (src, dst, src_arrow, dst_arrow),
            };
            let (Some(src), Some(dst)) = (self.objects[src.0].clone(), self.objects[dst.0].clone()) else {
                continue;
            };
            new_edges[e.0] = Some(NewEdge {
                src,
                dst,
                src_arrow,
                dst_arrow,
                index: 0,
            });
        }

        self.new_edges = new_edges;
        self.renumber(board, &[]);
        self
    }

    /// Number surviving edges per endpoint pair in the order `order` declares
    /// them. Edges `order` leaves out follow in board order.
    pub fn renumber(&mut self, board: &Board, order: &[EdgeId]) {
        let mut placed = vec![false; self.new_edges.len()];
        let mut sequence = Vec::with_capacity(self.new_edges.len());
        for e in order.iter().copied().chain(board.edge_ids()) {
            if !std::mem::replace(&mut placed[e.0], true) {
                sequence.push(e);
            }
        }

        let mut counts: HashMap<(Vec<String>, Vec<String>, bool, bool), usize> = HashMap::new();
        for e in sequence {
            let Some(new) = self.new_edges[e.0].as_mut() else {
                continue;
            };
            let slot = counts
                .entry((new.src.clone(), new.dst.clone(), new.src_arrow, new.dst_arrow))
                .or_insert(0);
            new.index = *slot;
            *slot += 1;
        }
    }

    /// New absolute path of `obj`, or `None` if it is deleted.
    pub fn fate(&self, obj: ObjId) -> Option<&[String]> {
        self.objects[obj.0].as_deref()
    }

    pub fn old_path(&self, obj: ObjId) -> &[String] {
        &self.old[obj.0]
    }

    pub fn is_unchanged(&self, obj: ObjId) -> bool {
        self.fate(obj) == Some(self.old_path(obj))
    }

    pub fn edge_fate(&self, edge: EdgeId) -> EdgeFate {
        self.edges[edge.0]
    }

    pub fn new_edge(&self, edge: EdgeId) -> Option<&NewEdge> {
        self.new_edges[edge.0].as_ref()
    }

    pub fn landing(&self) -> Option<&Landing> {
        self.landing.as_ref()
    }

    /// Whether `target` is the moved object or lies below its new path.
    pub fn lands(&self, target: &[String]) -> bool {
        self.landing.as_ref().is_some_and(|l| target.starts_with(&l.path))
    }

    /// New paths of every object that survives, parents first.
    pub fn surviving(&self) -> Vec<Vec<String>> {
        self.objects.iter().skip(1).flatten().cloned().collect()
    }

    pub fn deltas(&self, board: &Board) -> IdDeltas {
        let mut deltas = IdDeltas::new();
        for obj in board.object_ids() {
            match self.fate(obj) {
                None => {
                    deltas.insert(format_id(self.old_path(obj)), None);
                }
                Some(path) if path != self.old_path(obj) => {
                    deltas.insert(format_id(self.old_path(obj)), Some(format_id(path)));
                }
                Some(_) => {}
            }
        }
        for e in board.edge_ids() {
            let old = board.edge_abs_id(e);
            match self.new_edge(e) {
                None => {
                    deltas.insert(old, None);
                }
                Some(new) => {
                    let id = edge_id(&new.src, &new.dst, new.src_arrow, new.dst_arrow, new.index);
                    if id != old {
                        deltas.insert(old, Some(id));
                    }
                }
            }
        }
        deltas
    }
}
