//! # Recompile
//!
//! Every edit ends the same way: the working tree is written out as text,
//! the text is parsed and compiled, and the resulting [`Diagram`] is the
//! result. A failure carries the generated text so the caller can see what
//! the edit produced.

use tracing::warn;
use trellis_compiler::{compile, compile_board, Board, Diagram};
use trellis_parser::{Ast, MapId, Serializer};

use crate::config::EditorConfig;
use crate::errors::{EditorError, EditorResult};

/// Serialize, reparse and compile a working tree.
pub fn recompile(ast: &Ast, config: &EditorConfig) -> EditorResult<Diagram> {
    let text = Serializer::with_indent(&config.indent).serialize(ast);
    compile(&text).map_err(|source| {
        warn!(error = %source, "Edited text does not compile");
        EditorError::Recompile { text, source }
    })
}

/// Compile one board of a working tree in place, without a text round trip.
pub(crate) fn compile_working(ast: &Ast, map: MapId) -> EditorResult<Board> {
    compile_board(ast, map).map_err(|source| EditorError::Recompile {
        text: Serializer::new().serialize(ast),
        source,
    })
}

/// Fails if anything outside `board` differs between the two trees.
pub fn check_board_scope(before: &Ast, after: &Ast, board: MapId, board_path: &[&str]) -> EditorResult<()> {
    if board == before.root() {
        return Ok(());
    }
    let outside = |ast: &Ast| Serializer::new().masking(board).serialize(ast);
    if outside(before) != outside(after) {
        warn!(board = %board_path.join("."), "Edit escaped its board");
        return Err(EditorError::ScopeViolation {
            board: board_path.join("."),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_parser::{parse, Key, KeyPath};

    #[test]
    fn test_recompile_inlines_text_on_failure() {
        let mut ast = parse("a").unwrap();
        let key = ast.alloc_key(Key::new(KeyPath::from_strs(&["a", "shape"])));
        let root = ast.root();
        ast.push_key(root, key);

        match recompile(&ast, &EditorConfig::default()) {
            Err(EditorError::Recompile { text, .. }) => assert_eq!(text, "a\na.shape\n"),
            other => panic!("expected a recompile error, got {:?}", other),
        }
    }

    #[test]
    fn test_board_scope_ignores_inner_changes() {
        let before = parse("x\nlayers: {\n  one: {\n    a\n  }\n}").unwrap();
        let diagram = trellis_compiler::compile_ast(before.clone()).unwrap();
        let board = diagram.board(&["layers", "one"]).unwrap().map;

        let mut inside = before.clone();
        let key = inside.alloc_key(Key::new(KeyPath::from_strs(&["b"])));
        inside.push_key(board, key);
        assert!(check_board_scope(&before, &inside, board, &["layers", "one"]).is_ok());

        let mut outside = before.clone();
        let key = outside.alloc_key(Key::new(KeyPath::from_strs(&["y"])));
        let root = outside.root();
        outside.push_key(root, key);
        assert!(matches!(
            check_board_scope(&before, &outside, board, &["layers", "one"]),
            Err(EditorError::ScopeViolation { .. })
        ));
    }
}
