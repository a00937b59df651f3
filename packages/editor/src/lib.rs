//! # Trellis Editor
//!
//! Structural editing for Trellis diagrams.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: diagram text → AST                  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ compiler: AST → boards, objects, edges      │
//! │  (every reference points back at a key)     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: edits on a copy of the AST          │
//! │  - Locate the target from a key string      │
//! │  - Plan object and edge fates               │
//! │  - Rewrite every affected reference         │
//! │  - Prune stand-ins, collapse empty blocks   │
//! │  - Serialize, reparse, recompile            │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Edits are pure**: the input diagram is never modified
//! 2. **Text is the commit point**: the result is whatever the edited text compiles to
//! 3. **IDs are predictable**: every structural edit can report its ID changes up front
//! 4. **Boards are walls**: an edit on a nested board only touches that board
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trellis_compiler::compile;
//! use trellis_editor::{create, move_object, move_id_deltas};
//!
//! let diagram = compile("a: {\n  b\n}")?;
//!
//! // Preview, then perform
//! let deltas = move_id_deltas(&diagram, &[], "a.b", "b", true)?;
//! let moved = move_object(&diagram, &[], "a.b", "b", true)?;
//! assert_eq!(moved.text(), "a\nb\n");
//!
//! let (with_square, key) = create(&moved, &[], "square")?;
//! assert_eq!(key, "square");
//! ```

mod allocate;
mod classify;
mod config;
mod deltas;
mod document;
mod errors;
mod fields;
mod finalize;
mod locate;
mod ops;
mod plan;
mod recompile;
mod rewrite;
mod scope;

pub use allocate::{next_edge_index, unique_name};
pub use classify::{RefAction, RefShape};
pub use config::{EditorConfig, DEFAULT_CONFIG_NAME};
pub use deltas::{delete_id_deltas, move_id_deltas, reconnect_edge_id_deltas, rename_id_deltas, IdDeltas};
pub use document::{Document, DocumentStorage, Edit, EditOutcome};
pub use errors::{EditorError, EditorResult};
pub use ops::{create, delete, move_object, reconnect_edge, rename, set, Editor};
pub use recompile::{check_board_scope, recompile};

// Re-export common types for convenience
pub use trellis_compiler::Diagram;
