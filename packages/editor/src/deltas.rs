//! # ID deltas
//!
//! Preview how identifiers change under an edit, without performing it.
//! Each function builds and rewrites the same [`Plan`] its mutating
//! counterpart executes, so a preview always matches the edit. Nothing is
//! recompiled.
//!
//! Keys are old IDs, values the new ID or `None` when the item is deleted.
//! IDs that don't change are left out.

use std::collections::BTreeMap;
use tracing::instrument;
use trellis_compiler::{Board, Diagram};

use crate::errors::EditorResult;
use crate::locate;
use crate::ops::{delete_plan, move_plan, reconnect_plan, rename_plan};
use crate::plan::Plan;
use crate::rewrite;

pub type IdDeltas = BTreeMap<String, Option<String>>;

#[instrument(skip(diagram))]
pub fn move_id_deltas(
    diagram: &Diagram,
    board: &[&str],
    key: &str,
    new_key: &str,
    include_descendants: bool,
) -> EditorResult<IdDeltas> {
    let board = locate::board(diagram, board)?;
    let (plan, _) = move_plan(board, key, new_key, include_descendants)?;
    Ok(settled(diagram, board, plan))
}

/// A field delete changes no IDs.
#[instrument(skip(diagram))]
pub fn delete_id_deltas(diagram: &Diagram, board: &[&str], key: &str) -> EditorResult<IdDeltas> {
    let board = locate::board(diagram, board)?;
    Ok(delete_plan(board, key)?
        .map(|plan| settled(diagram, board, plan))
        .unwrap_or_default())
}

#[instrument(skip(diagram))]
pub fn rename_id_deltas(diagram: &Diagram, board: &[&str], key: &str, new_name: &str) -> EditorResult<IdDeltas> {
    let board = locate::board(diagram, board)?;
    let (plan, _) = rename_plan(board, key, new_name)?;
    Ok(settled(diagram, board, plan))
}

#[instrument(skip(diagram))]
pub fn reconnect_edge_id_deltas(
    diagram: &Diagram,
    board: &[&str],
    edge_key: &str,
    new_src: Option<&str>,
    new_dst: Option<&str>,
) -> EditorResult<IdDeltas> {
    let board = locate::board(diagram, board)?;
    let plan = reconnect_plan(board, edge_key, new_src, new_dst)?;
    Ok(settled(diagram, board, plan))
}

fn settled(diagram: &Diagram, board: &Board, mut plan: Plan) -> IdDeltas {
    rewrite::execute(&diagram.ast, board, &mut plan);
    plan.deltas(board)
}
