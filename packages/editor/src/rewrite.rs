//! # Rewriter
//!
//! Executes a [`Plan`] against a clone of the tree.
//!
//! Each block is rebuilt knowing the old scope it was read in and the new
//! scope it will be read in. A statement that can no longer be written where
//! it stands becomes a [`Pending`] and travels outward until an enclosing
//! block can hold it. Pendings under the moved object go to its landing
//! block instead.
//!
//! Statements added only to keep an object declared are recorded as soft.
//! The finalize pass prunes the ones that turn out to be redundant.
//!
//! The compiler numbers edges by the order their statements are read in, so
//! [`execute`] settles the plan's edge indices on the rewritten text and
//! patches indexed statements to match.

use std::collections::HashMap;
use tracing::debug;
use trellis_compiler::keywords::NEAR_CONSTANTS;
use trellis_compiler::{Board, BoardKind, EdgeId, ObjId};
use trellis_parser::{
    format_id, parse_locator, Ast, Edge, EdgeIndex, Entry, Key, KeyId, KeyPath, MapId, Scalar, Segment, Value,
};

use crate::classify::{classify, shape, stand_in, RefAction};
use crate::plan::{EdgeFate, NewEdge, Plan};
use crate::scope::{declarations, live_keys, nearest_block, relativize, resolve, same_values, to_segments, Resolved};

pub(crate) struct Rewritten {
    pub ast: Ast,
    pub soft: Vec<KeyId>,
    /// Old edge behind each link of every chain statement written.
    links: HashMap<KeyId, Vec<Option<EdgeId>>>,
    /// Indexed statements written with a numeric index.
    indexed: Vec<(KeyId, EdgeId)>,
}

/// Run `plan` and renumber its edges in the order the rewritten board
/// declares them.
pub(crate) fn execute(old: &Ast, board: &Board, plan: &mut Plan) -> Rewritten {
    let mut rewritten = Rewriter::new(old, board, plan).run();
    let order: Vec<EdgeId> = rewritten
        .ast
        .walk(board.map)
        .into_iter()
        .filter_map(|(_, key)| rewritten.links.get(&key))
        .flatten()
        .flatten()
        .copied()
        .collect();
    plan.renumber(board, &order);

    for &(key, e) in &rewritten.indexed {
        if let Some(new) = plan.new_edge(e) {
            rewritten.ast.key_mut(key).edge_index = Some(EdgeIndex::Index(new.index));
        }
    }
    rewritten
}

/// A statement waiting for a block that can express it.
#[derive(Debug)]
enum Pending {
    Object {
        target: Vec<String>,
        fields: Vec<Segment>,
        primary: Option<Scalar>,
        value: Value,
        soft: bool,
    },
    Edge {
        src: Vec<String>,
        dst: Vec<String>,
        src_arrow: bool,
        dst_arrow: bool,
        index: Option<EdgeIndex>,
        edge_key: Option<KeyPath>,
        primary: Option<Scalar>,
        value: Value,
        origin: Option<EdgeId>,
    },
}

impl Pending {
    fn expressible(&self, scope: &[String]) -> bool {
        let below = |path: &[String]| path.len() > scope.len() && path.starts_with(scope);
        match self {
            Pending::Object { target, .. } => below(target),
            Pending::Edge { src, dst, .. } => below(src) && below(dst),
        }
    }
}

/// One link of a chain statement after the edit.
enum Piece {
    InPlace(Edge),
    SplitOut(Edge),
    Relocate(NewEdge),
    Gone,
}

enum NearRewrite {
    Unchanged,
    Changed(String),
    Dropped,
}

/// Scope an edge statement's endpoints are read in.
struct EdgeScope {
    old: ObjId,
    new: Vec<String>,
    /// Scope of the block holding the statement.
    block: Vec<String>,
    prefix: Option<KeyPath>,
    stand_in: Option<Vec<Segment>>,
}

pub(crate) struct Rewriter<'a> {
    old: &'a Ast,
    board: &'a Board,
    plan: &'a Plan,
    ast: Ast,
    chain_edges: HashMap<(KeyId, usize), EdgeId>,
    indexed_edges: HashMap<KeyId, Vec<EdgeId>>,
    soft: Vec<KeyId>,
    links: HashMap<KeyId, Vec<Option<EdgeId>>>,
    indexed: Vec<(KeyId, EdgeId)>,
    landing: Vec<Pending>,
    moved_declared: bool,
}

impl<'a> Rewriter<'a> {
    pub fn new(old: &'a Ast, board: &'a Board, plan: &'a Plan) -> Self {
        let mut chain_edges = HashMap::new();
        let mut indexed_edges: HashMap<KeyId, Vec<EdgeId>> = HashMap::new();
        for e in board.edge_ids() {
            for r in &board.edge(e).references {
                if r.indexed {
                    indexed_edges.entry(r.key).or_default().push(e);
                } else {
                    chain_edges.insert((r.key, r.chain_index), e);
                }
            }
        }

        Self {
            old,
            board,
            plan,
            ast: old.clone(),
            chain_edges,
            indexed_edges,
            soft: Vec::new(),
            links: HashMap::new(),
            indexed: Vec::new(),
            landing: Vec::new(),
            moved_declared: false,
        }
    }

    pub fn run(mut self) -> Rewritten {
        let map = self.board.map;
        let (entries, pending) = self.rewrite_map(map, Board::ROOT, &[]);
        self.ast.map_mut(map).entries = entries;
        for p in pending {
            let key = self.build(p, &[]);
            self.ast.push_key(map, key);
        }
        self.place_landing();

        Rewritten {
            ast: self.ast,
            soft: self.soft,
            links: self.links,
            indexed: self.indexed,
        }
    }

    fn rewrite_map(&mut self, map: MapId, old_scope: ObjId, new_scope: &[String]) -> (Vec<Entry>, Vec<Pending>) {
        let old = self.old;
        let board_root = map == self.board.map;
        let mut out = Vec::new();
        let mut up = Vec::new();

        for entry in &old.map(map).entries {
            let id = match entry {
                Entry::Key(id) => *id,
                Entry::Comment(_) => {
                    out.push(entry.clone());
                    continue;
                }
            };
            let key = old.key(id);
            if board_root && is_board_key(key) {
                out.push(Entry::Key(id));
                continue;
            }

            let mut bubbled = Vec::new();
            if key.is_edge() {
                self.rewrite_edge_key(id, old_scope, new_scope, &mut out, &mut bubbled);
            } else {
                self.rewrite_object_key(id, old_scope, new_scope, &mut out, &mut bubbled);
            }
            for pending in bubbled {
                if pending.expressible(new_scope) {
                    let key = self.build(pending, new_scope);
                    out.push(Entry::Key(key));
                } else {
                    up.push(pending);
                }
            }
        }

        (out, up)
    }

    fn rewrite_object_key(
        &mut self,
        id: KeyId,
        old_scope: ObjId,
        new_scope: &[String],
        out: &mut Vec<Entry>,
        bubbled: &mut Vec<Pending>,
    ) {
        let (old, board, plan) = (self.old, self.board, self.plan);
        let key = old.key(id);
        let (Some(path), Some(resolved)) = (&key.path, key.path.as_ref().and_then(|p| resolve(board, old_scope, p)))
        else {
            out.push(Entry::Key(id));
            return;
        };
        let Some(&last) = resolved.objects.last() else {
            self.rewrite_scope_field(id, &resolved, out);
            return;
        };

        let action = classify(plan, key, path, &resolved, new_scope);
        debug!(
            statement = id.index(),
            shape = ?shape(key, old_scope != Board::ROOT),
            action = ?action,
            "Classified reference"
        );

        let fields = path.segments[resolved.fields_start()..].to_vec();
        match action {
            RefAction::Keep => self.keep_object_key(id, &resolved, last, out, bubbled),
            RefAction::Extend {
                path: mut segments,
                stand_in,
            } => {
                if let Some(stand_in) = stand_in {
                    out.push(self.soft_entry(stand_in));
                }
                segments.extend(fields);
                self.ast.key_mut(id).path = Some(KeyPath::new(segments));
                self.keep_object_key(id, &resolved, last, out, bubbled);
            }
            RefAction::Transplant { target } => self.transplant(id, &resolved, last, target, fields, bubbled),
            RefAction::Split { stand_in, target } => {
                out.push(self.soft_entry(stand_in));
                self.transplant(id, &resolved, last, target, fields, bubbled);
            }
            RefAction::Slice { stand_in } | RefAction::Remove { stand_in } => {
                if let Some(stand_in) = stand_in {
                    out.push(self.soft_entry(stand_in));
                }
            }
            RefAction::Hoist { stand_in } => {
                if let Some(stand_in) = stand_in {
                    out.push(self.soft_entry(stand_in));
                }
                if let Some(block) = key.map_value() {
                    let (entries, pending) = self.rewrite_map(block, last, new_scope);
                    out.extend(entries);
                    bubbled.extend(pending);
                }
            }
        }
    }

    fn keep_object_key(
        &mut self,
        id: KeyId,
        resolved: &Resolved,
        last: ObjId,
        out: &mut Vec<Entry>,
        bubbled: &mut Vec<Pending>,
    ) {
        let plan = self.plan;
        if resolved.fields.is_empty() {
            if let Some(block) = self.old.key(id).map_value() {
                let target = plan.fate(last).unwrap_or_default().to_vec();
                let (entries, pending) = self.rewrite_map(block, last, &target);
                self.ast.map_mut(block).entries = entries;
                bubbled.extend(pending);
            }
        } else if resolved.fields == ["near"] {
            match self.near_rewrite(id) {
                NearRewrite::Unchanged => {}
                NearRewrite::Changed(value) => self.ast.key_mut(id).value = Value::Scalar(Scalar::unquoted(value)),
                NearRewrite::Dropped => {
                    let path = self.ast.key(id).path.clone().unwrap_or_default();
                    let object_part = path.len() - resolved.fields.len();
                    out.push(self.soft_entry(path.segments[..object_part].to_vec()));
                    return;
                }
            }
        }
        self.note_declared(&resolved.objects);
        out.push(Entry::Key(id));
    }

    fn transplant(
        &mut self,
        id: KeyId,
        resolved: &Resolved,
        last: ObjId,
        target: Vec<String>,
        fields: Vec<Segment>,
        bubbled: &mut Vec<Pending>,
    ) {
        let key = self.old.key(id);
        let mut value = key.value.clone();
        if resolved.fields.is_empty() {
            if let Value::Map(block) = &value {
                let block = *block;
                let (entries, pending) = self.rewrite_map(block, last, &target);
                self.ast.map_mut(block).entries = entries;
                bubbled.extend(pending);
            }
        } else if resolved.fields == ["near"] {
            match self.near_rewrite(id) {
                NearRewrite::Unchanged => {}
                NearRewrite::Changed(near) => value = Value::Scalar(Scalar::unquoted(near)),
                NearRewrite::Dropped => return,
            }
        }
        self.note_declared(&resolved.objects);

        let lands = self.plan.lands(&target);
        let pending = Pending::Object {
            target,
            fields,
            primary: key.primary.clone(),
            value,
            soft: false,
        };
        if lands {
            self.landing.push(pending);
        } else {
            bubbled.push(pending);
        }
    }

    /// A field statement on the block's own object, e.g. `shape: circle`.
    fn rewrite_scope_field(&mut self, id: KeyId, resolved: &Resolved, out: &mut Vec<Entry>) {
        if self.plan.fate(resolved.base).is_none() {
            return;
        }
        if resolved.fields == ["near"] {
            match self.near_rewrite(id) {
                NearRewrite::Unchanged => {}
                NearRewrite::Changed(value) => self.ast.key_mut(id).value = Value::Scalar(Scalar::unquoted(value)),
                NearRewrite::Dropped => return,
            }
        }
        out.push(Entry::Key(id));
    }

    fn near_rewrite(&self, id: KeyId) -> NearRewrite {
        let Value::Scalar(scalar) = &self.old.key(id).value else {
            return NearRewrite::Unchanged;
        };
        if NEAR_CONSTANTS.contains(&scalar.value.as_str()) {
            return NearRewrite::Unchanged;
        }
        let target = parse_locator(&scalar.value)
            .ok()
            .filter(|locator| !locator.is_edge())
            .and_then(|locator| locator.path)
            .and_then(|path| self.board.find(&path.values()));
        let Some(target) = target else {
            return NearRewrite::Unchanged;
        };
        match self.plan.fate(target) {
            None => NearRewrite::Dropped,
            Some(path) if path != self.plan.old_path(target) => NearRewrite::Changed(format_id(path)),
            Some(_) => NearRewrite::Unchanged,
        }
    }

    fn rewrite_edge_key(
        &mut self,
        id: KeyId,
        old_scope: ObjId,
        new_scope: &[String],
        out: &mut Vec<Entry>,
        bubbled: &mut Vec<Pending>,
    ) {
        let old = self.old;
        let key = old.key(id);
        let scope = self.edge_scope(key, old_scope, new_scope);
        if let Some(index) = key.edge_index {
            self.rewrite_indexed(id, index, &scope, out, bubbled);
            return;
        }

        let chained = key.edges.len() > 1;
        let pieces: Vec<(Piece, Option<EdgeId>)> = key
            .edges
            .iter()
            .enumerate()
            .map(|(chain_index, edge)| match self.chain_edges.get(&(id, chain_index)) {
                Some(&e) => (self.piece(e, edge, &scope, chained), Some(e)),
                None => (Piece::InPlace(edge.clone()), None),
            })
            .collect();

        let mut runs: Vec<Vec<(Edge, Option<EdgeId>)>> = Vec::new();
        let mut split_out = Vec::new();
        let mut stand_ins: Vec<Vec<Segment>> = scope.stand_in.iter().cloned().collect();
        let mut open = false;
        for ((piece, origin), edge) in pieces.into_iter().zip(&key.edges) {
            let reconnected =
                origin.is_some_and(|e| matches!(self.plan.edge_fate(e), EdgeFate::Reconnect { .. }));
            if reconnected {
                self.endpoint_stand_ins(edge, &scope, &mut stand_ins);
            }
            match piece {
                Piece::InPlace(new) => {
                    match runs.last_mut() {
                        Some(run)
                            if open
                                && run
                                    .last()
                                    .is_some_and(|(prev, _)| same_values(&prev.dst.segments, &new.src.segments)) =>
                        {
                            run.push((new, origin))
                        }
                        _ => runs.push(vec![(new, origin)]),
                    }
                    open = true;
                }
                Piece::SplitOut(new) => {
                    split_out.push((new, origin));
                    open = false;
                }
                Piece::Relocate(new) => {
                    self.endpoint_stand_ins(edge, &scope, &mut stand_ins);
                    let value = self.clone_value(&key.value);
                    bubbled.push(Pending::Edge {
                        src: new.src,
                        dst: new.dst,
                        src_arrow: new.src_arrow,
                        dst_arrow: new.dst_arrow,
                        index: None,
                        edge_key: None,
                        primary: key.primary.clone(),
                        value,
                        origin,
                    });
                    open = false;
                }
                Piece::Gone => {
                    self.endpoint_stand_ins(edge, &scope, &mut stand_ins);
                    open = false;
                }
            }
        }
        runs.extend(split_out.into_iter().map(|link| vec![link]));
        if runs.is_empty() {
            if let Some(prefix) = &scope.prefix {
                stand_ins.push(self.prefix_in_block(prefix, &scope));
            }
        }

        for stand_in in stand_ins {
            out.push(self.soft_entry(stand_in));
        }
        for (i, run) in runs.into_iter().enumerate() {
            let target = if i == 0 { id } else { self.ast.deep_clone_key(id) };
            let (edges, origins): (Vec<Edge>, Vec<Option<EdgeId>>) = run.into_iter().unzip();
            let statement = self.ast.key_mut(target);
            statement.edges = edges;
            statement.path = scope.prefix.clone();
            self.links.insert(target, origins);
            out.push(Entry::Key(target));
        }
    }

    fn rewrite_indexed(
        &mut self,
        id: KeyId,
        index: EdgeIndex,
        scope: &EdgeScope,
        out: &mut Vec<Entry>,
        bubbled: &mut Vec<Pending>,
    ) {
        let (old, board, plan) = (self.old, self.board, self.plan);
        let key = old.key(id);
        let edge = &key.edges[0];
        if let Some(stand_in) = scope.stand_in.clone() {
            out.push(self.soft_entry(stand_in));
        }

        let (new, origin) = match index {
            EdgeIndex::Index(_) => {
                let Some(&e) = self.indexed_edges.get(&id).and_then(|ids| ids.first()) else {
                    out.push(Entry::Key(id));
                    return;
                };
                (plan.new_edge(e).cloned(), Some(e))
            }
            EdgeIndex::Glob => {
                let end = |path: &KeyPath| {
                    resolve(board, scope.old, path)
                        .and_then(|r| r.objects.last().copied())
                        .and_then(|o| plan.fate(o).map(<[String]>::to_vec))
                };
                let new = match (end(&edge.src), end(&edge.dst)) {
                    (Some(src), Some(dst)) => Some(NewEdge {
                        src,
                        dst,
                        src_arrow: edge.src_arrow,
                        dst_arrow: edge.dst_arrow,
                        index: 0,
                    }),
                    _ => None,
                };
                (new, None)
            }
        };
        let Some(new) = new else {
            if let Some(prefix) = &scope.prefix {
                let stand_in = self.prefix_in_block(prefix, scope);
                out.push(self.soft_entry(stand_in));
            }
            return;
        };

        let index = match index {
            EdgeIndex::Glob => EdgeIndex::Glob,
            EdgeIndex::Index(_) => EdgeIndex::Index(new.index),
        };
        match (
            endpoint_path(&edge.src, &new.src, &scope.new),
            endpoint_path(&edge.dst, &new.dst, &scope.new),
        ) {
            (Some(src), Some(dst)) => {
                let statement = self.ast.key_mut(id);
                statement.path = scope.prefix.clone();
                statement.edges = vec![Edge::new(src, dst, new.src_arrow, new.dst_arrow)];
                statement.edge_index = Some(index);
                if let Some(e) = origin {
                    self.indexed.push((id, e));
                }
                out.push(Entry::Key(id));
            }
            _ => bubbled.push(Pending::Edge {
                src: new.src,
                dst: new.dst,
                src_arrow: new.src_arrow,
                dst_arrow: new.dst_arrow,
                index: Some(index),
                edge_key: key.edge_key.clone(),
                primary: key.primary.clone(),
                value: key.value.clone(),
                origin,
            }),
        }
    }

    fn edge_scope(&self, key: &Key, old_scope: ObjId, new_scope: &[String]) -> EdgeScope {
        let plan = self.plan;
        let unprefixed = EdgeScope {
            old: old_scope,
            new: new_scope.to_vec(),
            block: new_scope.to_vec(),
            prefix: None,
            stand_in: None,
        };
        let Some(prefix) = &key.path else {
            return unprefixed;
        };
        let Some(resolved) = resolve(self.board, old_scope, prefix) else {
            return EdgeScope {
                prefix: Some(prefix.clone()),
                ..unprefixed
            };
        };

        let obj = resolved.objects.last().copied().unwrap_or(resolved.base);
        let underscores = resolved.uses_underscores();
        if let Some(target) = plan.fate(obj) {
            if let Some(rel) = relativize(target, new_scope, underscores) {
                let prefix = if same_values(&rel, &prefix.segments) {
                    prefix.clone()
                } else {
                    KeyPath::new(rel)
                };
                return EdgeScope {
                    old: obj,
                    new: target.to_vec(),
                    block: new_scope.to_vec(),
                    prefix: Some(prefix),
                    stand_in: None,
                };
            }
        }
        EdgeScope {
            old: obj,
            stand_in: stand_in(plan, &resolved.objects, new_scope, underscores),
            ..unprefixed
        }
    }

    fn piece(&mut self, e: EdgeId, edge: &Edge, scope: &EdgeScope, chained: bool) -> Piece {
        let plan = self.plan;
        let Some(new) = plan.new_edge(e) else {
            return Piece::Gone;
        };
        let (Some(src), Some(dst)) = (
            endpoint_path(&edge.src, &new.src, &scope.new),
            endpoint_path(&edge.dst, &new.dst, &scope.new),
        ) else {
            return Piece::Relocate(new.clone());
        };

        if plan.lands(&new.src) || plan.lands(&new.dst) {
            self.moved_declared = true;
        }
        let old = self.board.edge(e);
        let endpoints_changed = matches!(
            plan.edge_fate(e),
            EdgeFate::Reconnect { src, dst, .. } if src != old.src || dst != old.dst
        );
        let rewritten = Edge::new(src, dst, new.src_arrow, new.dst_arrow);
        if chained && endpoints_changed {
            Piece::SplitOut(rewritten)
        } else {
            Piece::InPlace(rewritten)
        }
    }

    /// Stand-ins keeping the unaffected part of a removed link's endpoints.
    fn endpoint_stand_ins(&self, edge: &Edge, scope: &EdgeScope, stand_ins: &mut Vec<Vec<Segment>>) {
        for path in [&edge.src, &edge.dst] {
            let Some(resolved) = resolve(self.board, scope.old, path) else {
                continue;
            };
            let kept = stand_in(self.plan, &resolved.objects, &scope.new, resolved.uses_underscores());
            let Some(kept) = kept else {
                continue;
            };
            let mut segments = match &scope.prefix {
                Some(prefix) => prefix.segments.clone(),
                None => Vec::new(),
            };
            segments.extend(kept);
            if !stand_ins.iter().any(|s| same_values(s, &segments)) {
                stand_ins.push(segments);
            }
        }
    }

    fn prefix_in_block(&self, prefix: &KeyPath, scope: &EdgeScope) -> Vec<Segment> {
        relativize(&scope.new, &scope.block, prefix.underscores() > 0).unwrap_or_else(|| prefix.segments.clone())
    }

    fn place_landing(&mut self) {
        let plan = self.plan;
        let Some(landing) = plan.landing() else {
            return;
        };
        let mut pending = std::mem::take(&mut self.landing);
        if !self.moved_declared {
            pending.push(Pending::Object {
                target: landing.path.clone(),
                fields: Vec::new(),
                primary: None,
                value: Value::Null,
                soft: true,
            });
        }
        if pending.is_empty() {
            return;
        }

        let (map, scope) = self.landing_block(&landing.parent);
        debug!(parent = %format_id(&landing.parent), statements = pending.len(), "Placing moved statements");
        for p in pending {
            let key = self.build(p, &scope);
            self.ast.push_key(map, key);
        }
    }

    /// Block receiving statements moved under `parent`.
    ///
    /// The parent's last block; else a block opened on its last declaration;
    /// else a new `parent: {}` in the nearest enclosing block. A parent that
    /// doesn't exist yet gets no wrapper: statements land in the nearest
    /// existing ancestor's block with their relative path.
    fn landing_block(&mut self, parent: &[String]) -> (MapId, Vec<String>) {
        let (old, board) = (self.old, self.board);
        if parent.is_empty() {
            return (board.map, Vec::new());
        }
        let live = live_keys(&self.ast, board.map);
        let Some(q) = board.find(parent).filter(|q| self.plan.is_unchanged(*q)) else {
            return nearest_block(board, old, parent, &live);
        };

        let decls = declarations(board, old, q, &live);
        if let Some(block) = decls.iter().rev().find_map(|r| self.ast.key(r.key).map_value()) {
            return (block, parent.to_vec());
        }
        if let Some(decl) = decls.last() {
            let block = self.ast.new_map();
            let key = self.ast.key_mut(decl.key);
            if let Value::Scalar(label) = std::mem::replace(&mut key.value, Value::Map(block)) {
                key.primary = Some(label);
            }
            return (block, parent.to_vec());
        }

        let (outer, scope) = nearest_block(board, old, &parent[..parent.len() - 1], &live);
        let block = self.ast.new_map();
        let key = Key::new(KeyPath::new(to_segments(&parent[scope.len()..]))).with_value(Value::Map(block));
        let key = self.ast.alloc_key(key);
        self.ast.push_key(outer, key);
        (block, parent.to_vec())
    }

    fn note_declared(&mut self, objects: &[ObjId]) {
        if let Some(landing) = self.plan.landing() {
            if objects.contains(&landing.moved) {
                self.moved_declared = true;
            }
        }
    }

    fn build(&mut self, pending: Pending, scope: &[String]) -> KeyId {
        match pending {
            Pending::Object {
                target,
                fields,
                primary,
                value,
                soft,
            } => {
                let mut segments = to_segments(&target[scope.len()..]);
                segments.extend(fields);
                let mut key = Key::new(KeyPath::new(segments)).with_value(value);
                key.primary = primary;
                let id = self.ast.alloc_key(key);
                if soft {
                    self.soft.push(id);
                }
                id
            }
            Pending::Edge {
                src,
                dst,
                src_arrow,
                dst_arrow,
                index,
                edge_key,
                primary,
                value,
                origin,
            } => {
                let edge = Edge::new(
                    KeyPath::new(to_segments(&src[scope.len()..])),
                    KeyPath::new(to_segments(&dst[scope.len()..])),
                    src_arrow,
                    dst_arrow,
                );
                let mut key = Key::edge(vec![edge]).with_value(value);
                key.edge_index = index;
                key.edge_key = edge_key;
                key.primary = primary;
                let id = self.ast.alloc_key(key);
                match (origin, index) {
                    (Some(e), None) => {
                        self.links.insert(id, vec![Some(e)]);
                    }
                    (Some(e), Some(EdgeIndex::Index(_))) => self.indexed.push((id, e)),
                    _ => {}
                }
                id
            }
        }
    }

    fn soft_entry(&mut self, segments: Vec<Segment>) -> Entry {
        let id = self.ast.alloc_key(Key::new(KeyPath::new(segments)));
        self.soft.push(id);
        Entry::Key(id)
    }

    fn clone_value(&mut self, value: &Value) -> Value {
        match value {
            Value::Map(map) => Value::Map(self.ast.deep_clone_map(*map)),
            other => other.clone(),
        }
    }
}

fn is_board_key(key: &Key) -> bool {
    match &key.path {
        Some(path) if path.len() == 1 && !key.is_edge() => BoardKind::from_keyword(&path.segments[0].value).is_some(),
        _ => false,
    }
}

/// `target` written from `scope`, keeping the old text when it still reads
/// the same.
fn endpoint_path(old: &KeyPath, target: &[String], scope: &[String]) -> Option<KeyPath> {
    let rel = relativize(target, scope, old.underscores() > 0)?;
    Some(if same_values(&rel, &old.segments) {
        old.clone()
    } else {
        KeyPath::new(rel)
    })
}
