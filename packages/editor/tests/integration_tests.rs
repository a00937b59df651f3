//! Integration tests for editor crate

use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::path::PathBuf;
use trellis_compiler::{compile, Diagram, EdgeId};
use trellis_editor::{
    check_board_scope, create, delete, delete_id_deltas, move_id_deltas, move_object, reconnect_edge,
    reconnect_edge_id_deltas, rename, rename_id_deltas, set, Document, Edit, Editor, EditorConfig, EditorError,
    IdDeltas,
};
use trellis_parser::{Key, KeyPath};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn edge_ids(diagram: &Diagram) -> Vec<String> {
    (0..diagram.root.edges.len())
        .map(|i| diagram.root.edge_abs_id(EdgeId(i)))
        .collect()
}

/// Label of every object and edge by ID
fn labels(diagram: &Diagram) -> BTreeMap<String, Option<String>> {
    let board = &diagram.root;
    let objects = board
        .objects
        .iter()
        .skip(1)
        .map(|o| (o.id.clone(), o.attributes.label.clone()));
    let edges = board
        .edges
        .iter()
        .enumerate()
        .map(|(i, e)| (board.edge_abs_id(EdgeId(i)), e.attributes.label.clone()));
    objects.chain(edges).collect()
}

/// Every ID, renamed or not, must still denote the same labelled item.
fn assert_deltas_follow(before: &Diagram, after: &Diagram, deltas: &IdDeltas) {
    let (old, new) = (labels(before), labels(after));
    for (id, label) in &old {
        let target = match deltas.get(id) {
            Some(None) => continue,
            Some(Some(target)) => target,
            None => id,
        };
        assert_eq!(new.get(target), Some(label), "{id} should read as {target}");
    }
}

#[test]
fn test_create_square_twice() {
    let diagram = compile("").unwrap();
    let (first, key) = create(&diagram, &[], "square").unwrap();
    assert_eq!(key, "square");

    let (second, key) = create(&first, &[], "square").unwrap();
    assert_eq!(key, "square 2");
    assert_eq!(second.text(), "square\nsquare 2\n");
}

#[test]
fn test_move_child_out_collapses_block() {
    let diagram = compile("a: {\n  b\n}").unwrap();
    let result = move_object(&diagram, &[], "a.b", "b", false).unwrap();
    assert_eq!(result.text(), "a\nb\n");
    assert!(result.root.find(&["b"]).is_some());
    assert!(result.root.find(&["a", "b"]).is_none());
}

#[test]
fn test_delete_endpoint_removes_edge() {
    let diagram = compile("a -> b").unwrap();
    let result = delete(&diagram, &[], "a").unwrap();
    assert_eq!(result.text(), "b\n");
    assert!(result.root.edges.is_empty());
}

#[test]
fn test_move_rewrites_near_pointer() {
    let diagram = compile("x: { near: y }\ny").unwrap();
    let result = move_object(&diagram, &[], "y", "a.y", true).unwrap();
    assert_eq!(result.text(), "x: {\n  near: a.y\n}\na.y\n");
}

#[test]
fn test_reconnect_splits_chain() {
    let diagram = compile("x -> y -> z\nq").unwrap();
    let result = reconnect_edge(&diagram, &[], "(x -> y)[0]", None, Some("q")).unwrap();
    assert_eq!(result.text(), "y -> z\nx -> q\nq\n");
    assert_eq!(result.root.edges.len(), 2);
}

#[test]
fn test_rename_then_set_label() {
    let diagram = compile("a -> b").unwrap();
    let (renamed, key) = rename(&diagram, &[], "a", "start").unwrap();
    assert_eq!(key, "start");
    assert_eq!(renamed.text(), "start -> b\n");

    let labelled = set(&renamed, &[], "start", None, Some("Begin")).unwrap();
    assert!(labelled.root.find(&["start"]).is_some());
    assert_eq!(labelled.root.edges.len(), 1);
}

#[test]
fn test_deltas_match_the_edit() {
    let diagram = compile("a: {\n  b: B\n  c: C\n  b -> c: first\n}\nd: D\nd -> a.c: second\na: A").unwrap();
    let deltas = move_id_deltas(&diagram, &[], "a.b", "d.b", true).unwrap();
    let moved = move_object(&diagram, &[], "a.b", "d.b", true).unwrap();

    assert_eq!(deltas.get("a.b"), Some(&Some("d.b".to_string())));
    assert_deltas_follow(&diagram, &moved, &deltas);
}

#[test]
fn test_edge_deltas_follow_renumbering() {
    let diagram = compile("x -> y: moved\nx -> q\n(x -> q)[0]: keep\nq").unwrap();
    let deltas = reconnect_edge_id_deltas(&diagram, &[], "(x -> y)[0]", None, Some("q")).unwrap();
    let reconnected = reconnect_edge(&diagram, &[], "(x -> y)[0]", None, Some("q")).unwrap();
    assert_deltas_follow(&diagram, &reconnected, &deltas);

    let diagram = compile("a -> b: flipped\na <-> b\n(a <-> b)[0]: keep").unwrap();
    let deltas = rename_id_deltas(&diagram, &[], "(a -> b)[0]", "a <-> b").unwrap();
    let (renamed, key) = rename(&diagram, &[], "(a -> b)[0]", "a <-> b").unwrap();
    assert_eq!(deltas.get("(a -> b)[0]"), Some(&Some(key)));
    assert_deltas_follow(&diagram, &renamed, &deltas);

    let diagram = compile("m -> n: one\nm -> n: two\n(m -> n)[1].style.opacity: 0.5\nm").unwrap();
    let deltas = delete_id_deltas(&diagram, &[], "(m -> n)[0]").unwrap();
    let deleted = delete(&diagram, &[], "(m -> n)[0]").unwrap();
    assert_eq!(deltas.get("(m -> n)[1]"), Some(&Some("(m -> n)[0]".to_string())));
    assert_deltas_follow(&diagram, &deleted, &deltas);
}

#[test]
fn test_delete_deltas_for_field_are_empty() {
    let diagram = compile("a.shape: circle").unwrap();
    assert!(delete_id_deltas(&diagram, &[], "a.shape").unwrap().is_empty());
}

#[test]
fn test_errors() {
    init_tracing();
    let diagram = compile("a: {\n  b\n}\nc -> d").unwrap();
    assert!(matches!(
        delete(&diagram, &[], "nope"),
        Err(EditorError::ObjectNotFound(_))
    ));
    assert!(matches!(
        delete(&diagram, &[], "(c -> a)[0]"),
        Err(EditorError::EdgeNotFound(_))
    ));
    assert!(matches!(
        move_object(&diagram, &[], "a", "a.b.x", true),
        Err(EditorError::MoveIntoDescendant(_))
    ));
    assert!(matches!(
        delete(&diagram, &["layers", "missing"], "a"),
        Err(EditorError::BoardNotFound(_))
    ));
    assert!(matches!(
        set(&diagram, &[], "(c -> d)[*]", None, Some("x")),
        Err(EditorError::GlobIndex(_))
    ));
}

#[test]
fn test_failed_edit_leaves_input_untouched() {
    let diagram = compile("a -> b").unwrap();
    let before = diagram.text();
    assert!(rename(&diagram, &[], "a", "shape").is_err());
    assert_eq!(diagram.text(), before);
}

#[test]
fn test_edit_inside_layer() {
    let source = "a\nlayers: {\n  one: {\n    b\n  }\n}";
    let diagram = compile(source).unwrap();
    let (result, key) = create(&diagram, &["layers", "one"], "c").unwrap();
    assert_eq!(key, "c");
    assert_eq!(result.text(), "a\nlayers: {\n  one: {\n    b\n    c\n  }\n}\n");
    assert_eq!(result.root.object_count(), 1);

    let layer = result.board(&["layers", "one"]).unwrap();
    assert!(layer.find(&["c"]).is_some());
}

#[test]
fn test_board_scope_check() {
    let diagram = compile("a\nlayers: {\n  one: {\n    b\n  }\n}").unwrap();
    let layer = diagram.board(&["layers", "one"]).unwrap().map;

    let mut inside = diagram.ast.clone();
    let key = inside.alloc_key(Key::new(KeyPath::from_strs(&["c"])));
    inside.push_key(layer, key);
    assert!(check_board_scope(&diagram.ast, &inside, layer, &["layers", "one"]).is_ok());

    let mut outside = diagram.ast.clone();
    let key = outside.alloc_key(Key::new(KeyPath::from_strs(&["c"])));
    let root = outside.root();
    outside.push_key(root, key);
    assert!(matches!(
        check_board_scope(&diagram.ast, &outside, layer, &["layers", "one"]),
        Err(EditorError::ScopeViolation { .. })
    ));
}

#[test]
fn test_document_script() {
    init_tracing();
    let mut doc = Document::from_source(PathBuf::from("flow.d2"), "a -> b").unwrap();
    let script = r#"[
        { "type": "create", "key": "c" },
        { "type": "reconnectEdge", "edgeKey": "(a -> b)[0]", "newDst": "c" },
        { "type": "rename", "key": "b", "newName": "done" }
    ]"#;
    let outcomes = doc.apply_script(&[], script).unwrap();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(doc.version, 3);
    assert_eq!(outcomes[2].final_key.as_deref(), Some("done"));

    let diagram = doc.diagram();
    assert_eq!(edge_ids(diagram), vec!["(a -> c)[0]".to_string()]);
    assert!(diagram.root.find(&["done"]).is_some());
    assert!(diagram.root.find(&["b"]).is_none());
}

#[test]
fn test_document_deltas_preview() {
    let doc = Document::from_source(PathBuf::from("flow.d2"), "a -> b").unwrap();
    let deltas = doc
        .deltas(
            &[],
            &Edit::Delete {
                key: "a".to_string(),
            },
        )
        .unwrap();
    assert_eq!(deltas.get("a"), Some(&None));
    assert_eq!(deltas.get("(a -> b)[0]"), Some(&None));
    assert_eq!(doc.version, 0);
}

#[test]
fn test_document_file_roundtrip() {
    let dir = std::env::temp_dir().join(format!("trellis-editor-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("trellis.config.json"), r#"{ "indent": "    " }"#).unwrap();
    let path = dir.join("doc.d2");
    std::fs::write(&path, "a: {\n  b\n}\n").unwrap();

    let mut doc = Document::load(path.clone()).unwrap();
    doc.apply(
        &[],
        Edit::Create {
            key: "a.c".to_string(),
        },
    )
    .unwrap();
    assert!(doc.is_dirty());
    doc.save().unwrap();
    assert!(!doc.is_dirty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "a: {\n    b\n    c\n}\n");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_editor_without_scope_validation() {
    let editor = Editor::new(EditorConfig {
        validate_board_scope: false,
        ..EditorConfig::default()
    });
    let diagram = compile("layers: {\n  one: {\n    x: {\n      y\n    }\n  }\n}").unwrap();
    let result = editor
        .move_object(&diagram, &["layers", "one"], "x.y", "y", true)
        .unwrap();
    assert_eq!(result.text(), "layers: {\n  one: {\n    x\n    y\n  }\n}\n");
}
