//! # Operations
//!
//! Every edit copies the diagram's tree, changes the copy, and commits it by
//! recompiling the serialized text. The input diagram is never touched,
//! so a failed edit leaves nothing behind.
//!
//! Structural edits (delete, move, rename, reconnect) first build a
//! [`Plan`], then run it through the rewriter and the finalize passes.
//! Field edits and creation write statements directly.

mod create;
mod delete;
mod movement;
mod reconnect;
mod set;

pub(crate) use delete::delete_plan;
pub(crate) use movement::{move_plan, rename_plan};
pub(crate) use reconnect::reconnect_plan;

use tracing::warn;
use trellis_compiler::{Board, Diagram};
use trellis_parser::{Ast, MapId};

use crate::config::EditorConfig;
use crate::errors::EditorResult;
use crate::finalize::finalize;
use crate::plan::Plan;
use crate::recompile::{check_board_scope, recompile};
use crate::rewrite;

/// Runs edits with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Editor {
    config: EditorConfig,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Run `plan` and commit the result. The plan's edge indices are settled
    /// on the way, so callers read final edge keys from it afterwards.
    fn apply_plan(&self, diagram: &Diagram, board_path: &[&str], board: &Board, plan: &mut Plan) -> EditorResult<Diagram> {
        let rewritten = rewrite::execute(&diagram.ast, board, plan);
        let mut ast = rewritten.ast;
        finalize(&mut ast, board.map, &diagram.ast, &rewritten.soft, &plan.surviving())?;
        self.commit(&diagram.ast, board_path, board.map, &ast)
    }

    fn commit(&self, before: &Ast, board_path: &[&str], map: MapId, after: &Ast) -> EditorResult<Diagram> {
        if self.config.validate_board_scope {
            check_board_scope(before, after, map, board_path)?;
        }
        recompile(after, &self.config)
    }
}

fn rejected<T>(op: &'static str, key: &str, result: EditorResult<T>) -> EditorResult<T> {
    if let Err(error) = &result {
        warn!(op, key, %error, "Edit rejected");
    }
    result
}

/// Create an object or edge. Returns the new diagram and the final key.
pub fn create(diagram: &Diagram, board: &[&str], key: &str) -> EditorResult<(Diagram, String)> {
    Editor::default().create(diagram, board, key)
}

/// Set a label or reserved field. A `None` value clears it.
pub fn set(
    diagram: &Diagram,
    board: &[&str],
    key: &str,
    tag: Option<&str>,
    value: Option<&str>,
) -> EditorResult<Diagram> {
    Editor::default().set(diagram, board, key, tag, value)
}

pub fn delete(diagram: &Diagram, board: &[&str], key: &str) -> EditorResult<Diagram> {
    Editor::default().delete(diagram, board, key)
}

pub fn rename(diagram: &Diagram, board: &[&str], key: &str, new_name: &str) -> EditorResult<(Diagram, String)> {
    Editor::default().rename(diagram, board, key, new_name)
}

pub fn move_object(
    diagram: &Diagram,
    board: &[&str],
    key: &str,
    new_key: &str,
    include_descendants: bool,
) -> EditorResult<Diagram> {
    Editor::default().move_object(diagram, board, key, new_key, include_descendants)
}

pub fn reconnect_edge(
    diagram: &Diagram,
    board: &[&str],
    edge_key: &str,
    new_src: Option<&str>,
    new_dst: Option<&str>,
) -> EditorResult<Diagram> {
    Editor::default().reconnect_edge(diagram, board, edge_key, new_src, new_dst)
}
