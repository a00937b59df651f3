//! Cleanup passes run on a rewritten tree before it is committed.

use std::collections::{HashMap, HashSet};
use tracing::debug;
use trellis_compiler::keywords::is_reserved;
use trellis_compiler::ObjId;
use trellis_parser::{format_id, Ast, Key, KeyId, KeyPath, MapId, Value};

use crate::errors::EditorResult;
use crate::recompile::compile_working;
use crate::scope::{live_keys, nearest_block, to_segments};

/// Prune redundant stand-ins, collapse blocks the edit emptied, and
/// re-declare any surviving object the rewrite lost.
pub(crate) fn finalize(
    ast: &mut Ast,
    map: MapId,
    before: &Ast,
    soft: &[KeyId],
    expected: &[Vec<String>],
) -> EditorResult<()> {
    prune_soft(ast, map, soft)?;
    collapse_emptied(ast, map, before);
    ensure_declared(ast, map, expected)
}

/// Remove soft statements whose objects are all declared elsewhere.
///
/// Soft statements are visited in order. One that is kept counts as a
/// declaration for the ones after it.
fn prune_soft(ast: &mut Ast, map: MapId, soft: &[KeyId]) -> EditorResult<()> {
    if soft.is_empty() {
        return Ok(());
    }
    let board = compile_working(ast, map)?;
    let soft_set: HashSet<KeyId> = soft.iter().copied().collect();

    let mut named: HashMap<KeyId, (MapId, Vec<ObjId>)> = HashMap::new();
    for obj in board.object_ids() {
        for r in &board.object(obj).references {
            if soft_set.contains(&r.key) {
                named.entry(r.key).or_insert_with(|| (r.map, Vec::new())).1.push(obj);
            }
        }
    }

    let mut kept: HashSet<KeyId> = HashSet::new();
    let mut pruned = 0;
    for &key in soft {
        let Some((container, objects)) = named.get(&key) else {
            continue;
        };
        let redundant = objects.iter().all(|&obj| {
            board
                .object(obj)
                .references
                .iter()
                .any(|r| r.key != key && (!soft_set.contains(&r.key) || kept.contains(&r.key)))
        });
        if redundant {
            ast.remove_key(*container, key);
            pruned += 1;
        } else {
            kept.insert(key);
        }
    }

    debug!(pruned, kept = kept.len(), "Pruned stand-in statements");
    Ok(())
}

/// Collapse blocks that were not empty in `before` but are empty now.
///
/// A field statement left with `{}` is removed. An object statement keeps
/// its label, if any, as a plain value.
pub(crate) fn collapse_emptied(ast: &mut Ast, map: MapId, before: &Ast) {
    loop {
        let emptied = ast.walk(map).into_iter().find(|&(_, id)| {
            let Some(block) = ast.key(id).map_value() else {
                return false;
            };
            let was_empty = block.index() < before.map_count() && before.map(block).entries.is_empty();
            ast.map(block).entries.is_empty() && !was_empty
        });
        let Some((container, id)) = emptied else {
            return;
        };

        let key = ast.key(id);
        let is_field = key.edge_key.is_some()
            || (!key.is_edge()
                && key
                    .path
                    .as_ref()
                    .is_some_and(|p| p.segments.iter().any(|s| is_reserved(&s.value))));
        if is_field {
            ast.remove_key(container, id);
        } else {
            let key = ast.key_mut(id);
            key.value = key.primary.take().map_or(Value::Null, Value::Scalar);
        }
    }
}

/// Add a bare declaration for every object in `expected` that no longer
/// compiles into existence.
fn ensure_declared(ast: &mut Ast, map: MapId, expected: &[Vec<String>]) -> EditorResult<()> {
    for _ in 0..=expected.len() {
        let board = compile_working(ast, map)?;
        let Some(missing) = expected.iter().find(|path| board.find(path).is_none()) else {
            return Ok(());
        };
        debug!(object = %format_id(missing), "Re-declaring object");

        let live = live_keys(ast, map);
        let (block, scope) = nearest_block(&board, ast, &missing[..missing.len() - 1], &live);
        let key = ast.alloc_key(Key::new(KeyPath::new(to_segments(&missing[scope.len()..]))));
        ast.push_key(block, key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use trellis_parser::{parse, serialize};

    #[test]
    fn test_soft_statement_is_pruned_when_redundant() {
        let before = parse("a -> b").unwrap();
        let mut ast = before.clone();
        let root = ast.root();
        let soft = ast.alloc_key(Key::new(KeyPath::from_strs(&["a"])));
        let needed = ast.alloc_key(Key::new(KeyPath::from_strs(&["c"])));
        ast.push_key(root, soft);
        ast.push_key(root, needed);

        finalize(&mut ast, root, &before, &[soft, needed], &[]).unwrap();
        assert_eq!(serialize(&ast), "a -> b\nc\n");
    }

    #[test]
    fn test_emptied_block_collapses_to_label() {
        let before = parse("a: hi {\n  b\n}\nc: {}\nd.style: {\n  fill: red\n}").unwrap();
        let mut ast = before.clone();
        for (container, id) in ast.walk(ast.root()) {
            let path = ast.key(id).path.clone().unwrap_or_default();
            if path.values() == ["b"] || path.values() == ["fill"] {
                ast.remove_key(container, id);
            }
        }
        let root = ast.root();
        collapse_emptied(&mut ast, root, &before);
        assert_eq!(serialize(&ast), "a: hi\nc: {}\n");
    }

    #[test]
    fn test_lost_object_is_redeclared() {
        let before = parse("a: {\n  b\n}").unwrap();
        let mut ast = before.clone();
        let root = ast.root();
        let block = ast.key(ast.keys_of(root).next().unwrap()).map_value().unwrap();
        let b = ast.keys_of(block).next().unwrap();
        ast.remove_key(block, b);

        let expected = vec![vec!["a".to_string()], vec!["a".to_string(), "b".to_string()]];
        finalize(&mut ast, root, &before, &[], &expected).unwrap();
        assert_eq!(serialize(&ast), "a\na.b\n");
    }
}
