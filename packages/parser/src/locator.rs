//! Locators address one object, edge or field from outside the source text.
//!
//! A locator is written in the language's own key syntax: `a.b`,
//! `a.style.opacity`, `x -> y`, `(x -> y)[1].label`, `a.(x -> y)[0]`.

use serde::{Deserialize, Serialize};

use crate::ast::{Edge, EdgeIndex, Entry, KeyPath, Value};
use crate::error::{ParseError, ParseResult};
use crate::parser::parse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locator {
    /// Object path, or the scope prefix of an edge locator.
    pub path: Option<KeyPath>,
    pub edges: Vec<Edge>,
    pub edge_index: Option<EdgeIndex>,
    pub edge_key: Option<KeyPath>,
}

impl Locator {
    pub fn is_edge(&self) -> bool {
        !self.edges.is_empty()
    }
}

/// Parse a locator string
pub fn parse_locator(input: &str) -> ParseResult<Locator> {
    let ast = parse(input)?;
    let entries = &ast.map(ast.root()).entries;

    let key = match entries.as_slice() {
        [Entry::Key(key)] => ast.key(*key),
        [] => return Err(ParseError::invalid_syntax(0, "empty key")),
        [Entry::Comment(comment)] => {
            return Err(ParseError::invalid_syntax(comment.span.start, "expected a key, found a comment"));
        }
        _ => return Err(ParseError::invalid_syntax(0, "expected exactly one key")),
    };

    if key.value != Value::Null || key.primary.is_some() {
        return Err(ParseError::invalid_syntax(key.span.start, "a key must not carry a value"));
    }

    Ok(Locator {
        path: key.path.clone(),
        edges: key.edges.clone(),
        edge_index: key.edge_index,
        edge_key: key.edge_key.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_locator() {
        let locator = parse_locator("a.b.style.opacity").unwrap();
        assert_eq!(locator.path.unwrap().values(), vec!["a", "b", "style", "opacity"]);
        assert!(locator.edges.is_empty());
    }

    #[test]
    fn test_indexed_edge_locator() {
        let locator = parse_locator("(x -> y)[0].label").unwrap();
        assert_eq!(locator.edges.len(), 1);
        assert_eq!(locator.edge_index, Some(EdgeIndex::Index(0)));
        assert_eq!(locator.edge_key.unwrap().values(), vec!["label"]);
    }

    #[test]
    fn test_chain_locator_keeps_every_edge() {
        let locator = parse_locator("a -> b -> c").unwrap();
        assert_eq!(locator.edges.len(), 2);
    }

    #[test]
    fn test_locator_json() {
        let locator = parse_locator("a.(x -> y)[1].label").unwrap();
        let json = serde_json::to_string(&locator).unwrap();
        let back: Locator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, locator);
    }

    #[test]
    fn test_rejects_values_and_multiple_keys() {
        assert!(parse_locator("a: b").is_err());
        assert!(parse_locator("a; b").is_err());
        assert!(parse_locator("").is_err());
        assert!(parse_locator("a.(").is_err());
    }
}
