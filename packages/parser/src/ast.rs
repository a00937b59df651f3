//! # Syntax tree
//!
//! The tree is an arena: maps and keys live in flat vectors and refer to each
//! other through [`MapId`] and [`KeyId`] handles. Handles stay valid for the
//! lifetime of the [`Ast`]; removing a key from a map only unlinks it.
//!
//! ## Design
//!
//! - The editor clones an `Ast` and splices the clone, so every handle in the
//!   compiled graph also addresses the same node in the working copy.
//! - Source spans are kept for diagnostics. Serialization is canonical and
//!   never reads them.

use serde::{Deserialize, Serialize};

/// The scope-relative back-reference segment.
pub const UNDERSCORE: &str = "_";

/// Span information for source location tracking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyId(u32);

impl MapId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl KeyId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Root of a parsed program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    maps: Vec<Map>,
    keys: Vec<Key>,
    root: MapId,
}

/// An ordered block of statements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Map {
    pub entries: Vec<Entry>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entry {
    Key(KeyId),
    Comment(Comment),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub span: Span,
}

/// A single statement: an object path, an edge chain, or an indexed edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Key {
    /// Declared path, or the scope prefix of an indexed edge statement.
    pub path: Option<KeyPath>,
    pub edges: Vec<Edge>,
    pub edge_index: Option<EdgeIndex>,
    /// Field path after an indexed edge, as in `(a -> b)[0].style.stroke`.
    pub edge_key: Option<KeyPath>,
    /// Label given before a block, as in `a: label { ... }`.
    pub primary: Option<Scalar>,
    pub value: Value,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Scalar(Scalar),
    Map(MapId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scalar {
    pub kind: ScalarKind,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarKind {
    Unquoted,
    DoubleQuoted,
    SingleQuoted,
    Block { tag: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPath {
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub value: String,
    pub quoted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub src: KeyPath,
    pub src_arrow: bool,
    pub dst: KeyPath,
    pub dst_arrow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeIndex {
    Index(usize),
    Glob,
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Ast {
    pub fn new() -> Self {
        Self {
            maps: vec![Map::default()],
            keys: Vec::new(),
            root: MapId(0),
        }
    }

    pub fn root(&self) -> MapId {
        self.root
    }

    pub fn map(&self, id: MapId) -> &Map {
        &self.maps[id.index()]
    }

    pub fn map_mut(&mut self, id: MapId) -> &mut Map {
        &mut self.maps[id.index()]
    }

    pub fn key(&self, id: KeyId) -> &Key {
        &self.keys[id.index()]
    }

    pub fn key_mut(&mut self, id: KeyId) -> &mut Key {
        &mut self.keys[id.index()]
    }

    pub fn alloc_map(&mut self, map: Map) -> MapId {
        self.maps.push(map);
        MapId((self.maps.len() - 1) as u32)
    }

    pub fn alloc_key(&mut self, key: Key) -> KeyId {
        self.keys.push(key);
        KeyId((self.keys.len() - 1) as u32)
    }

    pub fn new_map(&mut self) -> MapId {
        self.alloc_map(Map::default())
    }

    /// Number of maps ever allocated, reachable or not.
    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    /// Keys of `map` in order, skipping comments.
    pub fn keys_of(&self, map: MapId) -> impl Iterator<Item = KeyId> + '_ {
        self.map(map).entries.iter().filter_map(|entry| match entry {
            Entry::Key(id) => Some(*id),
            Entry::Comment(_) => None,
        })
    }

    pub fn position(&self, map: MapId, key: KeyId) -> Option<usize> {
        self.map(map)
            .entries
            .iter()
            .position(|entry| matches!(entry, Entry::Key(id) if *id == key))
    }

    pub fn push_key(&mut self, map: MapId, key: KeyId) {
        self.map_mut(map).entries.push(Entry::Key(key));
    }

    pub fn insert_key(&mut self, map: MapId, index: usize, key: KeyId) {
        let entries = &mut self.map_mut(map).entries;
        let index = index.min(entries.len());
        entries.insert(index, Entry::Key(key));
    }

    /// Unlinks `key` from `map`, returning its former position.
    pub fn remove_key(&mut self, map: MapId, key: KeyId) -> Option<usize> {
        let index = self.position(map, key)?;
        self.map_mut(map).entries.remove(index);
        Some(index)
    }

    /// Copies a key and everything reachable from its value into fresh nodes.
    pub fn deep_clone_key(&mut self, id: KeyId) -> KeyId {
        let mut key = self.key(id).clone();
        if let Value::Map(map) = key.value {
            key.value = Value::Map(self.deep_clone_map(map));
        }
        self.alloc_key(key)
    }

    pub fn deep_clone_map(&mut self, id: MapId) -> MapId {
        let mut map = self.map(id).clone();
        for entry in map.entries.iter_mut() {
            if let Entry::Key(key) = entry {
                *key = self.deep_clone_key(*key);
            }
        }
        self.alloc_map(map)
    }

    /// Every `(container, key)` pair reachable from `map`, depth first.
    pub fn walk(&self, map: MapId) -> Vec<(MapId, KeyId)> {
        let mut out = Vec::new();
        self.walk_into(map, &mut out);
        out
    }

    fn walk_into(&self, map: MapId, out: &mut Vec<(MapId, KeyId)>) {
        for key in self.keys_of(map) {
            out.push((map, key));
            if let Value::Map(child) = self.key(key).value {
                self.walk_into(child, out);
            }
        }
    }
}

impl Key {
    pub fn new(path: KeyPath) -> Self {
        Self {
            path: Some(path),
            edges: Vec::new(),
            edge_index: None,
            edge_key: None,
            primary: None,
            value: Value::Null,
            span: Span::default(),
        }
    }

    pub fn edge(edges: Vec<Edge>) -> Self {
        Self {
            path: None,
            edges,
            edge_index: None,
            edge_key: None,
            primary: None,
            value: Value::Null,
            span: Span::default(),
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }

    pub fn is_edge(&self) -> bool {
        !self.edges.is_empty()
    }

    pub fn map_value(&self) -> Option<MapId> {
        match self.value {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl Scalar {
    pub fn unquoted(value: impl Into<String>) -> Self {
        Self {
            kind: ScalarKind::Unquoted,
            value: value.into(),
        }
    }

    pub fn block(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: ScalarKind::Block { tag: tag.into() },
            value: value.into(),
        }
    }
}

impl Segment {
    /// A plain identifier segment. A literal `_` is quoted so it never reads
    /// as a back-reference.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let quoted = value == UNDERSCORE;
        Self { value, quoted }
    }

    pub fn underscore() -> Self {
        Self {
            value: UNDERSCORE.to_string(),
            quoted: false,
        }
    }

    pub fn is_underscore(&self) -> bool {
        !self.quoted && self.value == UNDERSCORE
    }
}

impl KeyPath {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn from_strs<S: AsRef<str>>(values: &[S]) -> Self {
        Self::new(values.iter().map(|v| Segment::new(v.as_ref())).collect())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Count of leading back-reference segments.
    pub fn underscores(&self) -> usize {
        self.segments.iter().take_while(|s| s.is_underscore()).count()
    }

    pub fn values(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.value.clone()).collect()
    }
}

impl Edge {
    pub fn new(src: KeyPath, dst: KeyPath, src_arrow: bool, dst_arrow: bool) -> Self {
        Self {
            src,
            src_arrow,
            dst,
            dst_arrow,
        }
    }
}
