//! Reference classification.
//!
//! Every statement that mentions an affected object gets exactly one
//! [`RefAction`]. The rewriter matches on it exhaustively.

use trellis_compiler::ObjId;
use trellis_parser::{Key, KeyPath, Segment, Value};

use crate::plan::Plan;
use crate::scope::{relativize, same_values, Resolved};

/// How a reference sits in the text. Reported with every verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefShape {
    /// `x` as the whole key at board level.
    SoleOccupant,
    /// `a.b.x`
    FlatPath,
    /// Any key inside another object's block.
    Nested,
    /// `x` in `x -> y`.
    EdgeEndpoint,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefAction {
    /// The path still names the right object.
    Keep,
    /// The new target can be written from the same scope.
    Extend {
        path: Vec<Segment>,
        stand_in: Option<Vec<Segment>>,
    },
    /// The statement carries content and must move to another scope.
    Transplant { target: Vec<String> },
    /// As `Transplant`, leaving the unaffected prefix declared.
    Split {
        stand_in: Vec<Segment>,
        target: Vec<String>,
    },
    /// A bare mention of the moved object that cannot be written in place.
    Slice { stand_in: Option<Vec<Segment>> },
    /// The statement only describes something that is deleted.
    Remove { stand_in: Option<Vec<Segment>> },
    /// Declaration of a deleted container; its block is spliced outward.
    Hoist { stand_in: Option<Vec<Segment>> },
}

pub(crate) fn shape(key: &Key, nested: bool) -> RefShape {
    match &key.path {
        _ if key.is_edge() => RefShape::EdgeEndpoint,
        _ if nested => RefShape::Nested,
        Some(path) if path.len() - path.underscores() > 1 => RefShape::FlatPath,
        _ => RefShape::SoleOccupant,
    }
}

/// Classify an object statement read in a scope whose new absolute path is
/// `new_scope`.
pub(crate) fn classify(plan: &Plan, key: &Key, path: &KeyPath, resolved: &Resolved, new_scope: &[String]) -> RefAction {
    let Some((&last, prefix)) = resolved.objects.split_last() else {
        return RefAction::Keep;
    };
    let underscores = resolved.uses_underscores();
    let stand_in = stand_in(plan, prefix, new_scope, underscores);

    let Some(target) = plan.fate(last) else {
        let has_block = matches!(key.value, Value::Map(_));
        return if resolved.fields.is_empty() && has_block {
            RefAction::Hoist { stand_in }
        } else {
            RefAction::Remove { stand_in }
        };
    };

    match relativize(target, new_scope, underscores) {
        Some(rel) if same_values(&rel, &path.segments[..resolved.fields_start()]) => RefAction::Keep,
        Some(rel) => {
            let stand_in = stand_in.filter(|s| !(rel.len() > s.len() && same_values(&rel[..s.len()], s)));
            RefAction::Extend { path: rel, stand_in }
        }
        None => {
            let has_content = !resolved.fields.is_empty() || key.value != Value::Null || key.primary.is_some();
            if !has_content && plan.lands(target) {
                return RefAction::Slice { stand_in };
            }
            match stand_in {
                Some(stand_in) => RefAction::Split {
                    stand_in,
                    target: target.to_vec(),
                },
                None => RefAction::Transplant {
                    target: target.to_vec(),
                },
            }
        }
    }
}

/// The longest unchanged leading run of `objects`, written from `new_scope`.
pub(crate) fn stand_in(plan: &Plan, objects: &[ObjId], new_scope: &[String], underscores: bool) -> Option<Vec<Segment>> {
    let kept = objects.iter().take_while(|o| plan.is_unchanged(**o)).count();
    let last = *objects[..kept].last()?;
    relativize(plan.old_path(last), new_scope, underscores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::resolve;
    use trellis_compiler::{compile, Board, Diagram};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn verdict(diagram: &Diagram, plan: &Plan, source_key: usize, new_scope: &[&str]) -> RefAction {
        let board = &diagram.root;
        let id = diagram.ast.keys_of(diagram.ast.root()).nth(source_key).unwrap();
        let key = diagram.ast.key(id);
        let path = key.path.as_ref().unwrap();
        let resolved = resolve(board, Board::ROOT, path).unwrap();
        classify(plan, key, path, &resolved, &strings(new_scope))
    }

    #[test]
    fn test_unaffected_statement_is_kept() {
        let diagram = compile("a\nb").unwrap();
        let b = diagram.root.find(&["b"]).unwrap();
        let plan = Plan::move_object(&diagram.root, b, &strings(&["a"]), "b".into(), true);
        assert_eq!(verdict(&diagram, &plan, 0, &[]), RefAction::Keep);
    }

    #[test]
    fn test_flat_path_is_extended() {
        let diagram = compile("a\nb: hi").unwrap();
        let b = diagram.root.find(&["b"]).unwrap();
        let plan = Plan::move_object(&diagram.root, b, &strings(&["a"]), "b".into(), true);
        match verdict(&diagram, &plan, 1, &[]) {
            RefAction::Extend { path, stand_in } => {
                assert_eq!(path.iter().map(|s| s.value.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
                assert_eq!(stand_in, None);
            }
            other => panic!("unexpected verdict {:?}", other),
        }
    }

    #[test]
    fn test_unexpressible_content_splits_off_prefix() {
        let diagram = compile("a.b: hi\nq").unwrap();
        let b = diagram.root.find(&["a", "b"]).unwrap();
        let plan = Plan::move_object(&diagram.root, b, &strings(&["q"]), "b".into(), true);
        // Read from inside `a`, the new path `q.b` can't be written.
        let key = diagram.ast.key(diagram.ast.keys_of(diagram.ast.root()).next().unwrap());
        let path = key.path.as_ref().unwrap();
        let resolved = resolve(&diagram.root, Board::ROOT, path).unwrap();
        let action = classify(&plan, key, path, &resolved, &strings(&["a"]));
        assert!(matches!(action, RefAction::Transplant { .. } | RefAction::Split { .. }));
    }

    #[test]
    fn test_deleted_container_hoists() {
        let diagram = compile("x: { y }\nz: label").unwrap();
        let x = diagram.root.find(&["x"]).unwrap();
        let z = diagram.root.find(&["z"]).unwrap();
        assert_eq!(
            verdict(&diagram, &Plan::delete_object(&diagram.root, x), 0, &[]),
            RefAction::Hoist { stand_in: None }
        );
        assert_eq!(
            verdict(&diagram, &Plan::delete_object(&diagram.root, z), 1, &[]),
            RefAction::Remove { stand_in: None }
        );
    }

    #[test]
    fn test_shapes() {
        let diagram = compile("a.b\na -> b\nc").unwrap();
        let keys: Vec<_> = diagram.ast.keys_of(diagram.ast.root()).map(|k| diagram.ast.key(k)).collect();
        assert_eq!(shape(keys[0], false), RefShape::FlatPath);
        assert_eq!(shape(keys[1], false), RefShape::EdgeEndpoint);
        assert_eq!(shape(keys[2], false), RefShape::SoleOccupant);
        assert_eq!(shape(keys[2], true), RefShape::Nested);
    }
}
