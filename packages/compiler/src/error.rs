use thiserror::Error;
use trellis_parser::{ParseError, Span};

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Invalid statement at {}..{}: {message}", span.start, span.end)]
    Invalid { message: String, span: Span },

    #[error("Unknown near target '{target}' on '{object}'")]
    UnknownNear { object: String, target: String },

    #[error("Indexed edge not found: {edge}")]
    EdgeNotFound { edge: String, span: Span },
}

impl CompileError {
    pub fn invalid(span: Span, message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
            span,
        }
    }
}
