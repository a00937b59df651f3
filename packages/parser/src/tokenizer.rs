use logos::{Lexer, Logos};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ParseError, ParseResult};

/// Contents of a `|tag ... |` fenced string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockString {
    pub tag: String,
    pub body: String,
}

/// Token types for the diagram language
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+")]
pub enum Token<'src> {
    #[token("\n")]
    Newline,

    #[token(";")]
    Semicolon,

    #[regex(r"#[^\n]*", |lex| lex.slice()[1..].trim())]
    Comment(&'src str),

    // Symbols
    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(":")]
    Colon,

    #[token(".")]
    Dot,

    #[token("*")]
    Star,

    #[token("<")]
    LAngle,

    #[token(">")]
    RAngle,

    #[token("-")]
    Minus,

    // Arrows
    #[token("->")]
    Arrow,

    #[token("<-")]
    ReverseArrow,

    #[token("<->")]
    BothArrow,

    #[token("--")]
    Line,

    // Strings
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    DoubleQuoted(String),

    #[regex(r"'[^'\n]*'", |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    SingleQuoted(&'src str),

    #[regex(r"\|+", block_string)]
    BlockString(BlockString),

    #[regex(r"[^ \t\r\n;{}\[\]():.\x22'#|*<>\-]", unquoted)]
    Unquoted(&'src str),
}

impl<'src> Token<'src> {
    /// Arrow heads as `(source, destination)` for edge operators.
    pub fn arrow_heads(&self) -> Option<(bool, bool)> {
        match self {
            Token::Arrow => Some((false, true)),
            Token::ReverseArrow => Some((true, false)),
            Token::BothArrow => Some((true, true)),
            Token::Line => Some((false, false)),
            _ => None,
        }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, Token::Newline | Token::Semicolon)
    }
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Newline => write!(f, "newline"),
            Token::Semicolon => write!(f, ";"),
            Token::Comment(_) => write!(f, "comment"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Colon => write!(f, ":"),
            Token::Dot => write!(f, "."),
            Token::Star => write!(f, "*"),
            Token::LAngle => write!(f, "<"),
            Token::RAngle => write!(f, ">"),
            Token::Minus => write!(f, "-"),
            Token::Arrow => write!(f, "->"),
            Token::ReverseArrow => write!(f, "<-"),
            Token::BothArrow => write!(f, "<->"),
            Token::Line => write!(f, "--"),
            Token::DoubleQuoted(s) => write!(f, "string \"{}\"", s),
            Token::SingleQuoted(s) => write!(f, "string '{}'", s),
            Token::BlockString(b) => write!(f, "block string |{}|", b.tag),
            Token::Unquoted(s) => write!(f, "'{}'", s),
        }
    }
}

fn unescape(slice: &str) -> String {
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Extends a single matched character to a full unquoted run.
///
/// A run stops at structural characters and at the start of an arrow. Trailing
/// blanks are not part of the token.
fn unquoted<'src>(lex: &mut Lexer<'src, Token<'src>>) -> &'src str {
    let rest = lex.remainder();
    let len = unquoted_len(rest);
    lex.bump(len);
    lex.slice()
}

fn unquoted_len(rest: &str) -> usize {
    let mut end = 0;
    for (i, c) in rest.char_indices() {
        let next = rest[i + c.len_utf8()..].chars().next();
        let stop = match c {
            '\n' | ';' | '{' | '}' | '[' | ']' | '(' | ')' | ':' | '.' | '"' | '\'' | '#' | '|' => true,
            '-' => matches!(next, Some('-') | Some('>')),
            '<' => next == Some('-'),
            _ => false,
        };
        if stop {
            break;
        }
        if !matches!(c, ' ' | '\t' | '\r') {
            end = i + c.len_utf8();
        }
    }
    end
}

fn block_string<'src>(lex: &mut Lexer<'src, Token<'src>>) -> Option<BlockString> {
    let fence = lex.slice().len();
    let rest = lex.remainder();
    let tag_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let tag = &rest[..tag_len];
    if tag.contains('|') {
        return None;
    }
    let closing = "|".repeat(fence);
    let close = rest[tag_len..].find(&closing)? + tag_len;
    let body = rest[tag_len..close].trim();
    let block = BlockString {
        tag: tag.to_string(),
        body: body.to_string(),
    };
    lex.bump(close + fence);
    Some(block)
}

/// Tokenize a source string, dropping anything the lexer rejects
pub fn tokenize(source: &str) -> Vec<(Token<'_>, std::ops::Range<usize>)> {
    let lexer = Token::lexer(source);
    lexer
        .spanned()
        .filter_map(|(result, span)| result.ok().map(|token| (token, span)))
        .collect()
}

/// Tokenize a source string, failing on the first unrecognized input
pub fn try_tokenize(source: &str) -> ParseResult<Vec<(Token<'_>, std::ops::Range<usize>)>> {
    Token::lexer(source)
        .spanned()
        .map(|(result, span)| {
            result
                .map(|token| (token, span.clone()))
                .map_err(|_| ParseError::lexer_error(span.start))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_arrows() {
        assert_eq!(
            kinds("a -> b <- c <-> d -- e"),
            vec![
                Token::Unquoted("a"),
                Token::Arrow,
                Token::Unquoted("b"),
                Token::ReverseArrow,
                Token::Unquoted("c"),
                Token::BothArrow,
                Token::Unquoted("d"),
                Token::Line,
                Token::Unquoted("e"),
            ]
        );
    }

    #[test]
    fn test_unquoted_keeps_inner_spaces() {
        assert_eq!(
            kinds("square 2.style"),
            vec![Token::Unquoted("square 2"), Token::Dot, Token::Unquoted("style")]
        );
    }

    #[test]
    fn test_unquoted_allows_single_dash() {
        assert_eq!(
            kinds("stroke-width: 2"),
            vec![Token::Unquoted("stroke-width"), Token::Colon, Token::Unquoted("2")]
        );
    }

    #[test]
    fn test_strings() {
        let tokens = kinds(r#""hello \"there\"" 'single'"#);
        assert_eq!(tokens[0], Token::DoubleQuoted("hello \"there\"".to_string()));
        assert_eq!(tokens[1], Token::SingleQuoted("single"));
    }

    #[test]
    fn test_block_string() {
        let tokens = kinds("a: |md # Title\nbody |");
        assert_eq!(
            tokens[2],
            Token::BlockString(BlockString {
                tag: "md".to_string(),
                body: "# Title\nbody".to_string(),
            })
        );
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_comments_and_separators() {
        assert_eq!(
            kinds("a; b # note\n"),
            vec![
                Token::Unquoted("a"),
                Token::Semicolon,
                Token::Unquoted("b"),
                Token::Comment("note"),
                Token::Newline,
            ]
        );
    }

    #[test]
    fn test_try_tokenize_reports_position() {
        let err = try_tokenize("a: 'open").unwrap_err();
        assert_eq!(err, ParseError::lexer_error(3));
    }
}
