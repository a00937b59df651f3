//! Error types for the editor

use thiserror::Error;
use trellis_compiler::CompileError;
use trellis_parser::ParseError;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Invalid key '{key}': {source}")]
    Locator {
        key: String,
        #[source]
        source: ParseError,
    },

    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Board not found: {0}")]
    BoardNotFound(String),

    #[error("'{0}' is a reserved keyword")]
    ReservedKeyword(String),

    #[error("Expected exactly one edge in '{0}'")]
    MultipleEdges(String),

    #[error("Moving edges across scopes isn't supported: {0}")]
    CrossScopeEdgeMove(String),

    #[error("Cannot move '{0}' into itself or one of its descendants")]
    MoveIntoDescendant(String),

    #[error("Block string tag '{0}' must not contain whitespace")]
    InvalidTag(String),

    #[error("'{field}' is not a field of {kind}")]
    UnsupportedField { field: String, kind: &'static str },

    #[error("Wildcard index is not allowed here: {0}")]
    GlobIndex(String),

    #[error("Edge rename may only change the arrow direction: {0}")]
    EdgeEndpointsChanged(String),

    #[error("Edit would change content outside board '{board}'")]
    ScopeViolation { board: String },

    #[error("Edited diagram failed to compile: {source}\n\n{text}")]
    Recompile {
        text: String,
        #[source]
        source: CompileError,
    },

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid edit script: {0}")]
    Script(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] anyhow::Error),

    #[error("Document is not file-backed")]
    NotFileBacked,
}

impl EditorError {
    pub fn locator(key: &str, source: ParseError) -> Self {
        Self::Locator {
            key: key.to_string(),
            source,
        }
    }

    pub fn invalid_key(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

pub type EditorResult<T> = Result<T, EditorError>;
