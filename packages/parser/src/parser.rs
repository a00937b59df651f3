use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{try_tokenize, BlockString, Token};
use std::ops::Range;

/// Parser for the diagram language
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
    ast: Ast,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            source,
            tokens: try_tokenize(source)?,
            pos: 0,
            ast: Ast::new(),
        })
    }

    /// Parse a complete document into a fresh arena
    pub fn parse_document(mut self) -> ParseResult<Ast> {
        let root = self.ast.root();
        self.parse_map_body(root, false)?;
        self.ast.map_mut(root).span = Span::new(0, self.source.len());
        Ok(self.ast)
    }

    fn parse_map_body(&mut self, map: MapId, closing: bool) -> ParseResult<()> {
        loop {
            match self.peek().cloned() {
                None if closing => return Err(ParseError::unexpected_eof(self.eof_pos())),
                None => return Ok(()),
                Some((Token::RBrace, _)) if closing => return Ok(()),
                Some((Token::RBrace, span)) => {
                    return Err(ParseError::unexpected_token(span.start, "statement", "}"));
                }
                Some((token, _)) if token.is_separator() => {
                    self.advance();
                }
                Some((Token::Comment(text), span)) => {
                    self.advance();
                    self.ast.map_mut(map).entries.push(Entry::Comment(Comment {
                        text: text.to_string(),
                        span: Span::new(span.start, span.end),
                    }));
                }
                Some(_) => {
                    let key = self.parse_statement()?;
                    self.ast.push_key(map, key);
                    self.expect_statement_end()?;
                }
            }
        }
    }

    /// A statement ends at a separator, a comment, a closing brace or EOF.
    fn expect_statement_end(&self) -> ParseResult<()> {
        match self.peek() {
            None => Ok(()),
            Some((token, _)) if token.is_separator() => Ok(()),
            Some((Token::Comment(_) | Token::RBrace, _)) => Ok(()),
            Some((token, span)) => Err(ParseError::unexpected_token(
                span.start,
                "newline",
                token.to_string(),
            )),
        }
    }

    fn parse_statement(&mut self) -> ParseResult<KeyId> {
        let start = self.peek_span().start;

        let mut key = if self.check(&Token::LParen) {
            self.parse_indexed_edge(None)?
        } else {
            let path = self.parse_key_path()?;
            let prefixes_edge = self.check(&Token::Dot)
                && matches!(self.peek_ahead(1), Some((Token::LParen, _)));
            if prefixes_edge {
                self.advance();
                self.parse_indexed_edge(Some(path))?
            } else if self.peek_arrow().is_some() {
                self.parse_edge_chain(path)?
            } else {
                Key::new(path)
            }
        };

        if self.match_token(&Token::Colon) {
            self.parse_value(&mut key)?;
        }

        key.span = Span::new(start, self.prev_end());
        Ok(self.ast.alloc_key(key))
    }

    fn parse_indexed_edge(&mut self, prefix: Option<KeyPath>) -> ParseResult<Key> {
        self.expect(&Token::LParen)?;
        let src = self.parse_key_path()?;
        let (src_arrow, dst_arrow) = self.parse_arrow()?;
        let dst = self.parse_key_path()?;
        self.expect(&Token::RParen)?;
        self.expect(&Token::LBracket)?;

        let index = match self.advance().cloned() {
            Some((Token::Star, _)) => EdgeIndex::Glob,
            Some((Token::Unquoted(text), span)) => text.parse::<usize>().map(EdgeIndex::Index).map_err(|_| {
                ParseError::invalid_syntax(span.start, "edge index must be a non-negative integer or *")
            })?,
            Some((token, span)) => {
                return Err(ParseError::unexpected_token(span.start, "edge index", token.to_string()));
            }
            None => return Err(ParseError::unexpected_eof(self.eof_pos())),
        };
        self.expect(&Token::RBracket)?;

        let edge_key = if self.match_token(&Token::Dot) {
            Some(self.parse_key_path()?)
        } else {
            None
        };

        let mut key = Key::edge(vec![Edge::new(src, dst, src_arrow, dst_arrow)]);
        key.path = prefix;
        key.edge_index = Some(index);
        key.edge_key = edge_key;
        Ok(key)
    }

    fn parse_edge_chain(&mut self, first: KeyPath) -> ParseResult<Key> {
        let mut edges = Vec::new();
        let mut src = first;
        while let Some((src_arrow, dst_arrow)) = self.peek_arrow() {
            self.advance();
            let dst = self.parse_key_path()?;
            edges.push(Edge::new(src, dst.clone(), src_arrow, dst_arrow));
            src = dst;
        }
        Ok(Key::edge(edges))
    }

    fn parse_arrow(&mut self) -> ParseResult<(bool, bool)> {
        match self.peek_arrow() {
            Some(heads) => {
                self.advance();
                Ok(heads)
            }
            None => Err(self.unexpected("arrow")),
        }
    }

    fn parse_key_path(&mut self) -> ParseResult<KeyPath> {
        let mut segments = vec![self.parse_segment()?];
        while self.check(&Token::Dot) && self.peek_ahead(1).map_or(false, |(t, _)| Self::is_segment(t)) {
            self.advance();
            segments.push(self.parse_segment()?);
        }
        Ok(KeyPath::new(segments))
    }

    fn parse_segment(&mut self) -> ParseResult<Segment> {
        let segment = match self.peek() {
            Some((Token::Unquoted(text), _)) => Segment {
                value: text.to_string(),
                quoted: false,
            },
            Some((Token::DoubleQuoted(text), _)) => Segment {
                value: text.clone(),
                quoted: true,
            },
            Some((Token::SingleQuoted(text), _)) => Segment {
                value: text.to_string(),
                quoted: true,
            },
            _ => return Err(self.unexpected("key")),
        };
        self.advance();
        Ok(segment)
    }

    fn is_segment(token: &Token) -> bool {
        matches!(
            token,
            Token::Unquoted(_) | Token::DoubleQuoted(_) | Token::SingleQuoted(_)
        )
    }

    fn parse_value(&mut self, key: &mut Key) -> ParseResult<()> {
        let scalar = match self.peek().cloned() {
            None => return Ok(()),
            Some((Token::LBrace, _)) => {
                key.value = Value::Map(self.parse_block()?);
                return Ok(());
            }
            Some((token, _)) if token.is_separator() => return Ok(()),
            Some((Token::RBrace | Token::Comment(_), _)) => return Ok(()),
            Some((Token::DoubleQuoted(text), _)) => {
                self.advance();
                Scalar {
                    kind: ScalarKind::DoubleQuoted,
                    value: text,
                }
            }
            Some((Token::SingleQuoted(text), _)) => {
                self.advance();
                Scalar {
                    kind: ScalarKind::SingleQuoted,
                    value: text.to_string(),
                }
            }
            Some((Token::BlockString(BlockString { tag, body }), _)) => {
                self.advance();
                Scalar::block(tag, body)
            }
            Some((_, span)) => self.parse_raw_scalar(span.start)?,
        };

        if self.check(&Token::LBrace) {
            key.primary = Some(scalar);
            key.value = Value::Map(self.parse_block()?);
        } else {
            key.value = Value::Scalar(scalar);
        }
        Ok(())
    }

    /// Unquoted values are read straight from the source up to the end of the
    /// statement, then the tokens they cover are skipped.
    fn parse_raw_scalar(&mut self, start: usize) -> ParseResult<Scalar> {
        let rest = &self.source[start..];
        let len = rest
            .find(|c| matches!(c, '\n' | ';' | '{' | '}' | '#'))
            .unwrap_or(rest.len());
        let text = rest[..len].trim_end();
        let end = start + text.len();

        while let Some((_, span)) = self.peek() {
            if span.start >= end {
                break;
            }
            if span.end > end {
                return Err(ParseError::invalid_syntax(
                    span.start,
                    "quoted text inside an unquoted value must cover the whole value",
                ));
            }
            self.pos += 1;
        }
        Ok(Scalar::unquoted(text))
    }

    fn parse_block(&mut self) -> ParseResult<MapId> {
        let start = self.peek_span().start;
        self.expect(&Token::LBrace)?;
        let map = self.ast.new_map();
        self.parse_map_body(map, true)?;
        self.expect(&Token::RBrace)?;
        self.ast.map_mut(map).span = Span::new(start, self.prev_end());
        Ok(map)
    }

    // Helper methods

    fn peek(&self) -> Option<&(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn peek_ahead(&self, offset: usize) -> Option<&(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos + offset)
    }

    fn peek_arrow(&self) -> Option<(bool, bool)> {
        self.peek().and_then(|(t, _)| t.arrow_heads())
    }

    fn advance(&mut self) -> Option<&(Token<'src>, Range<usize>)> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn check(&self, token: &Token) -> bool {
        if let Some((t, _)) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(token)
        } else {
            false
        }
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> ParseResult<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(token.to_string()))
        }
    }

    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        match self.peek() {
            Some((token, span)) => ParseError::unexpected_token(span.start, expected, token.to_string()),
            None => ParseError::unexpected_eof(self.eof_pos()),
        }
    }

    fn peek_span(&self) -> Range<usize> {
        self.peek().map(|(_, span)| span.clone()).unwrap_or_else(|| {
            let end = self.eof_pos();
            end..end
        })
    }

    fn prev_end(&self) -> usize {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|(_, span)| span.end)
            .unwrap_or(0)
    }

    fn eof_pos(&self) -> usize {
        self.source.len()
    }
}

/// Parse source text into a syntax tree
pub fn parse(source: &str) -> ParseResult<Ast> {
    Parser::new(source)?.parse_document()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_keys(ast: &Ast) -> Vec<&Key> {
        ast.keys_of(ast.root()).map(|k| ast.key(k)).collect()
    }

    #[test]
    fn test_parse_bare_keys() {
        let ast = parse("a\nb.c; d").unwrap();
        let keys = root_keys(&ast);
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[1].path.as_ref().unwrap().values(), vec!["b", "c"]);
    }

    #[test]
    fn test_parse_label_and_block() {
        let ast = parse("a: Hello world {\n  shape: circle\n}").unwrap();
        let key = root_keys(&ast)[0];
        assert_eq!(key.primary, Some(Scalar::unquoted("Hello world")));
        let map = key.map_value().unwrap();
        let inner = ast.key(ast.keys_of(map).next().unwrap());
        assert_eq!(inner.value, Value::Scalar(Scalar::unquoted("circle")));
    }

    #[test]
    fn test_parse_value_keeps_dots_and_spaces() {
        let ast = parse("a.style.opacity: 0.4\nb: one. two").unwrap();
        let keys = root_keys(&ast);
        assert_eq!(keys[0].value, Value::Scalar(Scalar::unquoted("0.4")));
        assert_eq!(keys[1].value, Value::Scalar(Scalar::unquoted("one. two")));
    }

    #[test]
    fn test_parse_edge_chain() {
        let ast = parse("x -> y <- z: label").unwrap();
        let key = root_keys(&ast)[0];
        assert_eq!(key.edges.len(), 2);
        assert!(key.edges[0].dst_arrow);
        assert!(key.edges[1].src_arrow);
        assert_eq!(key.edges[1].src.values(), vec!["y"]);
        assert_eq!(key.value, Value::Scalar(Scalar::unquoted("label")));
    }

    #[test]
    fn test_parse_indexed_edge() {
        let ast = parse("a.(x -> y)[1].style.stroke: red\n(x -- y)[*]: hi").unwrap();
        let keys = root_keys(&ast);
        assert_eq!(keys[0].path.as_ref().unwrap().values(), vec!["a"]);
        assert_eq!(keys[0].edge_index, Some(EdgeIndex::Index(1)));
        assert_eq!(keys[0].edge_key.as_ref().unwrap().values(), vec!["style", "stroke"]);
        assert_eq!(keys[1].edge_index, Some(EdgeIndex::Glob));
    }

    #[test]
    fn test_parse_keeps_comments() {
        let ast = parse("# heading\na # trailing\n").unwrap();
        let entries = &ast.map(ast.root()).entries;
        assert_eq!(entries.len(), 3);
        assert!(matches!(&entries[0], Entry::Comment(c) if c.text == "heading"));
        assert!(matches!(&entries[2], Entry::Comment(c) if c.text == "trailing"));
    }

    #[test]
    fn test_parse_quoted_segments() {
        let ast = parse(r#""a.b".'c'"#).unwrap();
        let path = root_keys(&ast)[0].path.clone().unwrap();
        assert_eq!(path.values(), vec!["a.b", "c"]);
        assert!(path.segments.iter().all(|s| s.quoted));
    }

    #[test]
    fn test_unclosed_block_is_error() {
        assert!(matches!(parse("a: {\n b"), Err(ParseError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_stray_closing_brace_is_error() {
        assert!(matches!(parse("a\n}"), Err(ParseError::UnexpectedToken { .. })));
    }

    #[test]
    fn test_missing_separator_is_error() {
        assert!(parse("a: label {} b").is_err());
        assert!(parse("(a -> b)[0] c").is_err());
    }
}
