//! # Trellis Parser
//!
//! Tokenizer, syntax tree, parser and canonical serializer for the Trellis
//! diagram language, plus the locator parser used to address objects and
//! edges from editor operations.
//!
//! ```text
//! source ──tokenize──▶ tokens ──Parser──▶ Ast ──Serializer──▶ source
//! ```

pub mod ast;
pub mod error;
pub mod locator;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use ast::{
    Ast, Comment, Edge, EdgeIndex, Entry, Key, KeyId, KeyPath, Map, MapId, Scalar, ScalarKind,
    Segment, Span, Value, UNDERSCORE,
};
#[cfg(feature = "pretty-errors")]
pub use error::format_error;
pub use error::{ParseError, ParseResult};
pub use locator::{parse_locator, Locator};
pub use parser::{parse, Parser};
pub use serializer::{format_id, format_path, format_scalar, format_segment, serialize, Serializer};
pub use tokenizer::{tokenize, try_tokenize, Token};
