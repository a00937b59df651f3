use tracing::{debug, instrument};
use trellis_parser::{parse, parse_locator, Ast, EdgeIndex, Key, KeyId, KeyPath, MapId, Span, Value};

use crate::error::{CompileError, CompileResult};
use crate::graph::{
    edge_id, Attributes, Board, Diagram, Edge, EdgeId, EdgeReference, ObjId, Reference, ReferenceKind,
};
use crate::keywords::{
    is_edge_field, is_object_field, is_reserved, BoardKind, ARROWHEAD_FIELDS, ARROWHEAD_SHAPES,
    NEAR_CONSTANTS, SHAPES, STYLE_KEYWORDS,
};

/// Parse and compile source text
pub fn compile(source: &str) -> CompileResult<Diagram> {
    let ast = parse(source)?;
    compile_ast(ast)
}

/// Compile an already parsed tree, keeping its handles
#[instrument(skip(ast))]
pub fn compile_ast(ast: Ast) -> CompileResult<Diagram> {
    let root = compile_board(&ast, ast.root())?;
    debug!(
        objects = root.object_count(),
        edges = root.edges.len(),
        boards = root.boards.len(),
        "Compiled diagram"
    );
    Ok(Diagram { ast, root })
}

/// Compile one board block on its own
pub fn compile_board(ast: &Ast, map: MapId) -> CompileResult<Board> {
    BoardCompiler::new(ast, Board::new(map, None, None)).run()
}

enum End {
    Src,
    Dst,
}

/// Result of walking the leading part of a path.
struct Resolved {
    /// Object the path starts from after its `_` segments.
    base: ObjId,
    /// First object segment.
    start: usize,
    /// First reserved segment, or the path length.
    fields: usize,
}

struct BoardCompiler<'a> {
    ast: &'a Ast,
    board: Board,
}

impl<'a> BoardCompiler<'a> {
    fn new(ast: &'a Ast, board: Board) -> Self {
        Self { ast, board }
    }

    fn run(mut self) -> CompileResult<Board> {
        let map = self.board.map;
        self.compile_map(map, Board::ROOT, true)?;
        self.check_near()?;
        Ok(self.board)
    }

    fn compile_map(&mut self, map: MapId, scope: ObjId, board_root: bool) -> CompileResult<()> {
        let ast = self.ast;
        for key_id in ast.keys_of(map) {
            let key = ast.key(key_id);
            if let Some(kind) = board_keyword(key) {
                if !board_root {
                    return Err(CompileError::invalid(
                        key.span,
                        format!("{} may only be declared at the root of a board", kind.as_str()),
                    ));
                }
                self.compile_sub_boards(key, kind)?;
            } else if key.is_edge() {
                self.compile_edge_key(key_id, map, scope)?;
            } else {
                self.compile_object_key(key_id, map, scope)?;
            }
        }
        Ok(())
    }

    fn compile_sub_boards(&mut self, key: &Key, kind: BoardKind) -> CompileResult<()> {
        let ast = self.ast;
        let Value::Map(boards) = key.value else {
            return Err(CompileError::invalid(key.span, format!("{} expects a block of boards", kind.as_str())));
        };
        for board_key in ast.keys_of(boards) {
            let entry = ast.key(board_key);
            let (name, map) = match (&entry.path, &entry.value) {
                (Some(path), Value::Map(map)) if path.len() == 1 && !entry.is_edge() => {
                    (path.segments[0].value.clone(), *map)
                }
                _ => return Err(CompileError::invalid(entry.span, "a board must be declared as `name: { ... }`")),
            };
            if self.board.sub_board(kind, &name).is_some() {
                return Err(CompileError::invalid(entry.span, format!("duplicate board '{}'", name)));
            }
            let board = BoardCompiler::new(ast, Board::new(map, Some(name), Some(kind))).run()?;
            self.board.boards.push(board);
        }
        Ok(())
    }

    fn resolve(&self, path: &KeyPath, scope: ObjId, span: Span) -> CompileResult<Resolved> {
        let mut base = scope;
        let mut start = 0;
        while start < path.len() && path.segments[start].is_underscore() {
            base = self
                .board
                .object(base)
                .parent
                .ok_or_else(|| CompileError::invalid(span, "_ cannot refer above the board root"))?;
            start += 1;
        }
        if path.segments[start..].iter().any(|s| s.is_underscore()) {
            return Err(CompileError::invalid(span, "_ may only appear at the start of a key"));
        }
        let fields = (start..path.len())
            .find(|i| is_reserved(&path.segments[*i].value))
            .unwrap_or(path.len());
        Ok(Resolved { base, start, fields })
    }

    fn child_or_create(&mut self, parent: ObjId, name: &str) -> ObjId {
        match self.board.child(parent, name) {
            Some(id) => id,
            None => self.board.add_child(parent, name),
        }
    }

    fn compile_object_key(&mut self, key_id: KeyId, map: MapId, scope: ObjId) -> CompileResult<()> {
        let ast = self.ast;
        let key = ast.key(key_id);
        let Some(path) = &key.path else {
            return Err(CompileError::invalid(key.span, "statement has no key"));
        };
        let resolved = self.resolve(path, scope, key.span)?;

        let mut target = resolved.base;
        for index in resolved.start..resolved.fields {
            target = self.child_or_create(target, &path.segments[index].value);
            self.board.object_mut(target).references.push(Reference {
                key: key_id,
                map,
                scope,
                kind: ReferenceKind::Key { index },
            });
        }

        if resolved.fields < path.len() {
            let fields = path.values()[resolved.fields..].to_vec();
            return self.apply_object_field(target, &fields, key);
        }
        if resolved.start == resolved.fields {
            return Err(CompileError::invalid(key.span, "key must name an object"));
        }

        match &key.value {
            Value::Null => {}
            Value::Scalar(scalar) => self.board.object_mut(target).attributes.label = Some(scalar.value.clone()),
            Value::Map(block) => {
                if let Some(primary) = &key.primary {
                    self.board.object_mut(target).attributes.label = Some(primary.value.clone());
                }
                self.compile_map(*block, target, false)?;
            }
        }
        Ok(())
    }

    fn apply_object_field(&mut self, target: ObjId, fields: &[String], key: &Key) -> CompileResult<()> {
        let name = fields[0].as_str();
        if !is_object_field(name) {
            return Err(CompileError::invalid(key.span, format!("'{}' is not a field of objects", name)));
        }
        let ast = self.ast;
        let attributes = &mut self.board.object_mut(target).attributes;
        if name == "style" {
            return apply_style(ast, attributes, &fields[1..], key);
        }
        if fields.len() > 1 {
            return Err(CompileError::invalid(key.span, format!("'{}' has no sub-fields", name)));
        }
        let value = scalar_value(key, name)?;
        validate_field(name, &value, key.span)?;
        if name == "label" {
            attributes.label = Some(value);
        } else {
            attributes.fields.insert(name.to_string(), value);
        }
        Ok(())
    }

    fn compile_edge_key(&mut self, key_id: KeyId, map: MapId, scope: ObjId) -> CompileResult<()> {
        let ast = self.ast;
        let key = ast.key(key_id);

        let mut edge_scope = scope;
        if let Some(prefix) = &key.path {
            let resolved = self.resolve(prefix, scope, key.span)?;
            if resolved.fields < prefix.len() {
                return Err(CompileError::invalid(key.span, "edge scope cannot contain reserved keywords"));
            }
            edge_scope = resolved.base;
            for index in resolved.start..resolved.fields {
                edge_scope = self.child_or_create(edge_scope, &prefix.segments[index].value);
                self.board.object_mut(edge_scope).references.push(Reference {
                    key: key_id,
                    map,
                    scope,
                    kind: ReferenceKind::Key { index },
                });
            }
        }

        if let Some(index) = key.edge_index {
            return self.compile_indexed_edge(key_id, map, edge_scope, index);
        }

        let mut ids = Vec::with_capacity(key.edges.len());
        for (chain_index, edge) in key.edges.iter().enumerate() {
            let src = self.endpoint(edge_scope, &edge.src, key_id, map, chain_index, End::Src, key.span)?;
            let dst = self.endpoint(edge_scope, &edge.dst, key_id, map, chain_index, End::Dst, key.span)?;
            let index = self.board.edges_between(src, dst, edge.src_arrow, edge.dst_arrow).len();
            ids.push(EdgeId(self.board.edges.len()));
            self.board.edges.push(Edge {
                src,
                dst,
                src_arrow: edge.src_arrow,
                dst_arrow: edge.dst_arrow,
                index,
                attributes: Default::default(),
                references: vec![EdgeReference {
                    key: key_id,
                    map,
                    scope: edge_scope,
                    chain_index,
                    indexed: false,
                }],
            });
        }

        self.apply_edge_value(&ids, key)
    }

    fn compile_indexed_edge(&mut self, key_id: KeyId, map: MapId, scope: ObjId, index: EdgeIndex) -> CompileResult<()> {
        let ast = self.ast;
        let key = ast.key(key_id);
        let edge = &key.edges[0];
        let src = self.lookup(scope, &edge.src, key.span)?;
        let dst = self.lookup(scope, &edge.dst, key.span)?;

        let ids: Vec<EdgeId> = match (src, dst) {
            (Some(src), Some(dst)) => self
                .board
                .edges_between(src, dst, edge.src_arrow, edge.dst_arrow)
                .into_iter()
                .filter(|e| match index {
                    EdgeIndex::Glob => true,
                    EdgeIndex::Index(i) => self.board.edge(*e).index == i,
                })
                .collect(),
            _ => Vec::new(),
        };
        if ids.is_empty() {
            let scope_path = self.board.path(scope);
            let absolute = |p: &KeyPath| {
                let mut path = scope_path.clone();
                path.extend(p.values());
                path
            };
            return Err(CompileError::EdgeNotFound {
                edge: edge_id(
                    &absolute(&edge.src),
                    &absolute(&edge.dst),
                    edge.src_arrow,
                    edge.dst_arrow,
                    match index {
                        EdgeIndex::Index(i) => i,
                        EdgeIndex::Glob => 0,
                    },
                ),
                span: key.span,
            });
        }

        for id in &ids {
            self.board.edges[id.0].references.push(EdgeReference {
                key: key_id,
                map,
                scope,
                chain_index: 0,
                indexed: true,
            });
        }

        match &key.edge_key {
            Some(field) => {
                let fields = field.values();
                for id in &ids {
                    self.apply_edge_field(*id, &fields, key)?;
                }
                Ok(())
            }
            None => self.apply_edge_value(&ids, key),
        }
    }

    fn apply_edge_value(&mut self, ids: &[EdgeId], key: &Key) -> CompileResult<()> {
        let ast = self.ast;
        match &key.value {
            Value::Null => Ok(()),
            Value::Scalar(scalar) => {
                for id in ids {
                    self.board.edges[id.0].attributes.label = Some(scalar.value.clone());
                }
                Ok(())
            }
            Value::Map(block) => {
                for id in ids {
                    if let Some(primary) = &key.primary {
                        self.board.edges[id.0].attributes.label = Some(primary.value.clone());
                    }
                }
                for entry_id in ast.keys_of(*block) {
                    let entry = ast.key(entry_id);
                    let fields = match &entry.path {
                        Some(path) if !entry.is_edge() && is_edge_field(&path.segments[0].value) => path.values(),
                        _ => return Err(CompileError::invalid(entry.span, "edge blocks may only set edge fields")),
                    };
                    for id in ids {
                        self.apply_edge_field(*id, &fields, entry)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn apply_edge_field(&mut self, id: EdgeId, fields: &[String], key: &Key) -> CompileResult<()> {
        let name = fields[0].as_str();
        if !is_edge_field(name) {
            return Err(CompileError::invalid(key.span, format!("'{}' is not a field of edges", name)));
        }
        let ast = self.ast;
        let attributes = &mut self.board.edges[id.0].attributes;
        match name {
            "style" => apply_style(ast, attributes, &fields[1..], key),
            "source-arrowhead" | "target-arrowhead" => apply_arrowhead(ast, attributes, name, &fields[1..], key),
            _ if fields.len() > 1 => Err(CompileError::invalid(key.span, format!("'{}' has no sub-fields", name))),
            "label" => {
                attributes.label = Some(scalar_value(key, name)?);
                Ok(())
            }
            _ => {
                attributes.fields.insert(name.to_string(), scalar_value(key, name)?);
                Ok(())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn endpoint(
        &mut self,
        scope: ObjId,
        path: &KeyPath,
        key: KeyId,
        map: MapId,
        edge: usize,
        end: End,
        span: Span,
    ) -> CompileResult<ObjId> {
        let resolved = self.resolve(path, scope, span)?;
        if resolved.fields < path.len() {
            return Err(CompileError::invalid(span, "edge endpoints cannot be reserved keywords"));
        }
        if resolved.start == path.len() {
            return Err(CompileError::invalid(span, "edge endpoint must name an object"));
        }
        let mut target = resolved.base;
        for index in resolved.start..path.len() {
            target = self.child_or_create(target, &path.segments[index].value);
            let kind = match end {
                End::Src => ReferenceKind::EdgeSrc { edge, index },
                End::Dst => ReferenceKind::EdgeDst { edge, index },
            };
            self.board.object_mut(target).references.push(Reference { key, map, scope, kind });
        }
        Ok(target)
    }

    fn lookup(&self, scope: ObjId, path: &KeyPath, span: Span) -> CompileResult<Option<ObjId>> {
        let resolved = self.resolve(path, scope, span)?;
        if resolved.fields < path.len() || resolved.start == path.len() {
            return Err(CompileError::invalid(span, "edge endpoint must name an object"));
        }
        Ok(path.segments[resolved.start..]
            .iter()
            .try_fold(resolved.base, |parent, segment| self.board.child(parent, &segment.value)))
    }

    fn check_near(&self) -> CompileResult<()> {
        for id in self.board.object_ids() {
            let object = self.board.object(id);
            let Some(target) = object.attributes.fields.get("near") else {
                continue;
            };
            if NEAR_CONSTANTS.contains(&target.as_str()) {
                continue;
            }
            let found = parse_locator(target)
                .ok()
                .filter(|locator| !locator.is_edge())
                .and_then(|locator| locator.path)
                .and_then(|path| self.board.find(&path.values()));
            if found.is_none() || found == Some(id) {
                return Err(CompileError::UnknownNear {
                    object: object.id.clone(),
                    target: target.clone(),
                });
            }
        }
        Ok(())
    }
}

/// `layers: {...}` style statements at a board root
fn board_keyword(key: &Key) -> Option<BoardKind> {
    match &key.path {
        Some(path) if path.len() == 1 && !key.is_edge() => BoardKind::from_keyword(&path.segments[0].value),
        _ => None,
    }
}

fn scalar_value(key: &Key, field: &str) -> CompileResult<String> {
    match &key.value {
        Value::Scalar(scalar) => Ok(scalar.value.clone()),
        Value::Null => Err(CompileError::invalid(key.span, format!("'{}' requires a value", field))),
        Value::Map(_) => Err(CompileError::invalid(key.span, format!("'{}' expects a value, not a block", field))),
    }
}

fn validate_field(name: &str, value: &str, span: Span) -> CompileResult<()> {
    match name {
        "shape" if !SHAPES.contains(&value) => Err(CompileError::invalid(span, format!("unknown shape '{}'", value))),
        "width" | "height" | "top" | "left" if value.parse::<i64>().is_err() => {
            Err(CompileError::invalid(span, format!("'{}' must be an integer", name)))
        }
        _ => Ok(()),
    }
}

fn validate_style(name: &str, value: &str, span: Span) -> CompileResult<()> {
    match name {
        "opacity" => match value.parse::<f64>() {
            Ok(v) if (0.0..=1.0).contains(&v) => Ok(()),
            _ => Err(CompileError::invalid(span, "opacity must be a number between 0 and 1")),
        },
        "bold" | "italic" | "underline" | "3d" | "multiple" | "animated" | "filled" | "double-border" | "shadow"
            if value != "true" && value != "false" =>
        {
            Err(CompileError::invalid(span, format!("style.{} must be true or false", name)))
        }
        _ => Ok(()),
    }
}

fn apply_style(ast: &Ast, attributes: &mut Attributes, rest: &[String], key: &Key) -> CompileResult<()> {
    match rest {
        [] => {
            let Value::Map(block) = key.value else {
                return Err(CompileError::invalid(key.span, "style expects a block or a keyword"));
            };
            for entry_id in ast.keys_of(block) {
                let entry = ast.key(entry_id);
                let fields = match &entry.path {
                    Some(path) if !entry.is_edge() => path.values(),
                    _ => return Err(CompileError::invalid(entry.span, "style blocks may only set style keywords")),
                };
                apply_style(ast, attributes, &fields, entry)?;
            }
            Ok(())
        }
        [name] => {
            if !STYLE_KEYWORDS.contains(&name.as_str()) {
                return Err(CompileError::invalid(key.span, format!("unknown style keyword '{}'", name)));
            }
            let value = scalar_value(key, name)?;
            validate_style(name, &value, key.span)?;
            attributes.fields.insert(format!("style.{}", name), value);
            Ok(())
        }
        _ => Err(CompileError::invalid(key.span, format!("invalid style path 'style.{}'", rest.join(".")))),
    }
}

fn apply_arrowhead(
    ast: &Ast,
    attributes: &mut Attributes,
    head: &str,
    rest: &[String],
    key: &Key,
) -> CompileResult<()> {
    match rest {
        [] => match &key.value {
            Value::Map(block) => {
                if let Some(primary) = &key.primary {
                    attributes.fields.insert(format!("{}.label", head), primary.value.clone());
                }
                for entry_id in ast.keys_of(*block) {
                    let entry = ast.key(entry_id);
                    let fields = match &entry.path {
                        Some(path) if !entry.is_edge() => path.values(),
                        _ => return Err(CompileError::invalid(entry.span, "arrowhead blocks may only set arrowhead fields")),
                    };
                    apply_arrowhead(ast, attributes, head, &fields, entry)?;
                }
                Ok(())
            }
            _ => {
                attributes.fields.insert(format!("{}.label", head), scalar_value(key, head)?);
                Ok(())
            }
        },
        [field] if field == "shape" => {
            let value = scalar_value(key, field)?;
            if !ARROWHEAD_SHAPES.contains(&value.as_str()) {
                return Err(CompileError::invalid(key.span, format!("unknown arrowhead shape '{}'", value)));
            }
            attributes.fields.insert(format!("{}.shape", head), value);
            Ok(())
        }
        [field] if field == "label" => {
            attributes.fields.insert(format!("{}.label", head), scalar_value(key, field)?);
            Ok(())
        }
        [style] if style == "style" => {
            let Value::Map(block) = key.value else {
                return Err(CompileError::invalid(key.span, "arrowhead style expects a block"));
            };
            for entry_id in ast.keys_of(block) {
                let entry = ast.key(entry_id);
                let mut fields = vec![style.clone()];
                if let Some(path) = &entry.path {
                    fields.extend(path.values());
                }
                apply_arrowhead(ast, attributes, head, &fields, entry)?;
            }
            Ok(())
        }
        [style, filled] if style == "style" && filled == "filled" => {
            let value = scalar_value(key, filled)?;
            validate_style(filled, &value, key.span)?;
            attributes.fields.insert(format!("{}.style.filled", head), value);
            Ok(())
        }
        _ => Err(CompileError::invalid(
            key.span,
            format!(
                "invalid arrowhead field '{}'; expected one of {}",
                rest.join("."),
                ARROWHEAD_FIELDS.join(", ")
            ),
        )),
    }
}
