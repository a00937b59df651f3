//! Path arithmetic between scopes.
//!
//! Paths here are absolute segment values within one board. A statement
//! nested in the block of object `s` writes its paths relative to `s`, with
//! each leading `_` stepping one level up.

use std::collections::HashSet;
use trellis_compiler::keywords::is_reserved;
use trellis_compiler::{Board, ObjId, Reference};
use trellis_parser::{Ast, KeyId, KeyPath, MapId, Segment};

/// What a statement path names when read in a given scope.
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    /// Object reached after the leading `_` segments.
    pub base: ObjId,
    /// Index of the first object segment.
    pub start: usize,
    /// One object per object segment.
    pub objects: Vec<ObjId>,
    /// Reserved suffix, e.g. `["style", "fill"]`.
    pub fields: Vec<String>,
}

impl Resolved {
    /// Index of the first reserved segment.
    pub fn fields_start(&self) -> usize {
        self.start + self.objects.len()
    }

    pub fn uses_underscores(&self) -> bool {
        self.start > 0
    }
}

/// Walk `path` from `scope` through existing objects only.
pub(crate) fn resolve(board: &Board, scope: ObjId, path: &KeyPath) -> Option<Resolved> {
    let start = path.underscores();
    let mut base = scope;
    for _ in 0..start {
        base = board.object(base).parent?;
    }

    let mut objects = Vec::new();
    let mut fields = Vec::new();
    let mut current = base;
    for (i, segment) in path.segments.iter().enumerate().skip(start) {
        if is_reserved(&segment.value) {
            fields = path.segments[i..].iter().map(|s| s.value.clone()).collect();
            break;
        }
        current = board.child(current, &segment.value)?;
        objects.push(current);
    }

    Some(Resolved {
        base,
        start,
        objects,
        fields,
    })
}

/// Write absolute `target` relative to `scope`.
///
/// Without underscores the target must lie strictly below the scope. With
/// them, the result climbs to the closest common ancestor that still leaves
/// at least one segment to name.
pub(crate) fn relativize(target: &[String], scope: &[String], allow_underscores: bool) -> Option<Vec<Segment>> {
    if target.len() > scope.len() && target.starts_with(scope) {
        return Some(to_segments(&target[scope.len()..]));
    }
    if !allow_underscores || target.is_empty() {
        return None;
    }
    let common = scope
        .iter()
        .zip(target)
        .take_while(|(a, b)| a == b)
        .count()
        .min(target.len() - 1);
    let mut segments: Vec<Segment> = (common..scope.len()).map(|_| Segment::underscore()).collect();
    segments.extend(to_segments(&target[common..]));
    Some(segments)
}

pub(crate) fn to_segments<S: AsRef<str>>(values: &[S]) -> Vec<Segment> {
    values.iter().map(|v| Segment::new(v.as_ref())).collect()
}

pub(crate) fn same_values(a: &[Segment], b: &[Segment]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.value == y.value && x.is_underscore() == y.is_underscore())
}

pub(crate) fn common_prefix<'p>(a: &'p [String], b: &[String]) -> &'p [String] {
    let n = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    &a[..n]
}

/// Keys reachable from a board block in the given tree.
pub(crate) fn live_keys(ast: &Ast, map: MapId) -> HashSet<KeyId> {
    ast.walk(map).into_iter().map(|(_, key)| key).collect()
}

/// Live statements that declare `obj` itself, in order.
pub(crate) fn declarations(board: &Board, ast: &Ast, obj: ObjId, live: &HashSet<KeyId>) -> Vec<Reference> {
    board
        .object(obj)
        .references
        .iter()
        .filter(|r| live.contains(&r.key) && r.declares(ast))
        .copied()
        .collect()
}

/// The last block in which statements are nested under `obj`.
pub(crate) fn last_block(board: &Board, ast: &Ast, obj: ObjId, live: &HashSet<KeyId>) -> Option<MapId> {
    if obj == Board::ROOT {
        return Some(board.map);
    }
    declarations(board, ast, obj, live)
        .iter()
        .rev()
        .find_map(|r| ast.key(r.key).map_value())
}

/// Deepest existing block along `path`, and the absolute path of its scope.
pub(crate) fn nearest_block(board: &Board, ast: &Ast, path: &[String], live: &HashSet<KeyId>) -> (MapId, Vec<String>) {
    for len in (1..=path.len()).rev() {
        if let Some(obj) = board.find(&path[..len]) {
            if let Some(map) = last_block(board, ast, obj, live) {
                return (map, path[..len].to_vec());
            }
        }
    }
    (board.map, Vec::new())
}
