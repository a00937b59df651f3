use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of file at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("Invalid syntax at {pos}: {message}")]
    InvalidSyntax { pos: usize, message: String },

    #[error("Lexer error at {pos}")]
    LexerError { pos: usize },
}

impl ParseError {
    pub fn unexpected_token(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize) -> Self {
        Self::UnexpectedEof { pos }
    }

    pub fn invalid_syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos,
            message: message.into(),
        }
    }

    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }

    /// Byte offset the error points at.
    pub fn pos(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { pos, .. }
            | ParseError::UnexpectedEof { pos }
            | ParseError::InvalidSyntax { pos, .. }
            | ParseError::LexerError { pos } => *pos,
        }
    }
}

/// Pretty-print an error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_error(source: &str, filename: &str, error: &ParseError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let start = error.pos().min(source.len());
    let end = (start + 1).min(source.len()).max(start);
    let mut output = Vec::new();

    let report = Report::build(ReportKind::Error, filename, start)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, start..end))
                .with_color(Color::Red)
                .with_message(match error {
                    ParseError::UnexpectedToken { expected, .. } => format!("expected {}", expected),
                    ParseError::UnexpectedEof { .. } => "unexpected end of input".to_string(),
                    ParseError::InvalidSyntax { message, .. } => message.clone(),
                    ParseError::LexerError { .. } => "unrecognized input".to_string(),
                }),
        )
        .finish();

    if report.write((filename, Source::from(source)), &mut output).is_err() {
        return error.to_string();
    }

    String::from_utf8(output).unwrap_or_else(|_| error.to_string())
}
