//! # Trellis Compiler
//!
//! Compiles a syntax tree into the semantic graph the editor works against.
//!
//! ## Architecture
//!
//! ```text
//! Ast ──BoardCompiler──▶ Board { objects, edges, boards }
//!                            │
//!                            └── Reference { key, map, scope, kind } per tree location
//! ```
//!
//! Each board (the root and every `layers`/`scenarios`/`steps` entry) is
//! compiled independently. Object identity is the absolute path of segment
//! values, compared case-sensitively.

pub mod compiler;
pub mod error;
pub mod graph;
pub mod keywords;

pub use compiler::{compile, compile_ast, compile_board};
pub use error::{CompileError, CompileResult};
pub use graph::{
    edge_id, Attributes, Board, Diagram, Edge, EdgeId, EdgeReference, Object, ObjId, Reference, ReferenceKind,
};
pub use keywords::BoardKind;
