use crate::ast::*;
use std::fmt::Write;

/// Serializer converts a syntax tree back to canonical source text
///
/// Output is stable: one statement per line, blocks indented, comments kept in
/// place. Segments and values are quoted only when the unquoted form would not
/// read back to the same text.
pub struct Serializer {
    indent_level: usize,
    indent_string: String,
    mask: Option<MapId>,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            indent_string: "  ".to_string(), // 2 spaces
            mask: None,
        }
    }

    pub fn with_indent(indent: &str) -> Self {
        Self {
            indent_level: 0,
            indent_string: indent.to_string(),
            mask: None,
        }
    }

    /// Render `map` as an opaque placeholder. Used to compare everything
    /// around a block while ignoring the block itself.
    pub fn masking(mut self, map: MapId) -> Self {
        self.mask = Some(map);
        self
    }

    /// Serialize a whole tree to source code
    pub fn serialize(&mut self, ast: &Ast) -> String {
        let mut output = String::new();
        let root = ast.root();
        if self.mask == Some(root) {
            output.push_str("{...}\n");
            return output;
        }
        for entry in &ast.map(root).entries {
            self.serialize_entry(ast, entry, &mut output);
            output.push('\n');
        }
        output
    }

    /// Serialize one statement without a trailing newline
    pub fn serialize_key(&mut self, ast: &Ast, key: KeyId) -> String {
        let mut output = String::new();
        self.write_key(ast, key, &mut output);
        output
    }

    fn serialize_entry(&mut self, ast: &Ast, entry: &Entry, output: &mut String) {
        match entry {
            Entry::Key(key) => self.write_key(ast, *key, output),
            Entry::Comment(comment) if comment.text.is_empty() => output.push('#'),
            Entry::Comment(comment) => {
                let _ = write!(output, "# {}", comment.text);
            }
        }
    }

    fn write_key(&mut self, ast: &Ast, id: KeyId, output: &mut String) {
        let key = ast.key(id);

        match (key.edge_index, key.edges.first()) {
            (Some(index), Some(edge)) => {
                if let Some(prefix) = &key.path {
                    output.push_str(&format_path(prefix));
                    output.push('.');
                }
                let index = match index {
                    EdgeIndex::Index(i) => i.to_string(),
                    EdgeIndex::Glob => "*".to_string(),
                };
                let _ = write!(
                    output,
                    "({} {} {})[{}]",
                    format_path(&edge.src),
                    arrow(edge.src_arrow, edge.dst_arrow),
                    format_path(&edge.dst),
                    index
                );
                if let Some(field) = &key.edge_key {
                    output.push('.');
                    output.push_str(&format_path(field));
                }
            }
            (None, Some(first)) => {
                output.push_str(&format_path(&first.src));
                for edge in &key.edges {
                    let _ = write!(
                        output,
                        " {} {}",
                        arrow(edge.src_arrow, edge.dst_arrow),
                        format_path(&edge.dst)
                    );
                }
            }
            _ => {
                if let Some(path) = &key.path {
                    output.push_str(&format_path(path));
                }
            }
        }

        match &key.value {
            Value::Null => {
                if let Some(primary) = &key.primary {
                    output.push_str(": ");
                    output.push_str(&format_scalar(primary));
                }
            }
            Value::Scalar(scalar) => {
                output.push_str(": ");
                output.push_str(&format_scalar(scalar));
            }
            Value::Map(map) => {
                output.push_str(": ");
                if let Some(primary) = &key.primary {
                    output.push_str(&format_scalar(primary));
                    output.push(' ');
                }
                self.write_block(ast, *map, output);
            }
        }
    }

    fn write_block(&mut self, ast: &Ast, map: MapId, output: &mut String) {
        if self.mask == Some(map) {
            output.push_str("{...}");
            return;
        }
        let entries = &ast.map(map).entries;
        if entries.is_empty() {
            output.push_str("{}");
            return;
        }

        output.push_str("{\n");
        self.indent_level += 1;
        for entry in entries {
            self.write_indent(output);
            self.serialize_entry(ast, entry, output);
            output.push('\n');
        }
        self.indent_level -= 1;
        self.write_indent(output);
        output.push('}');
    }

    fn write_indent(&self, output: &mut String) {
        for _ in 0..self.indent_level {
            output.push_str(&self.indent_string);
        }
    }
}

/// Serialize a tree with the default settings
pub fn serialize(ast: &Ast) -> String {
    Serializer::new().serialize(ast)
}

pub fn arrow(src_arrow: bool, dst_arrow: bool) -> &'static str {
    match (src_arrow, dst_arrow) {
        (true, true) => "<->",
        (true, false) => "<-",
        (false, true) => "->",
        (false, false) => "--",
    }
}

pub fn format_path(path: &KeyPath) -> String {
    path.segments
        .iter()
        .map(|segment| {
            if segment.quoted && (segment.value == UNDERSCORE || segment_needs_quotes(&segment.value)) {
                quote(&segment.value)
            } else if segment.quoted {
                // Quoting that carries no meaning is dropped.
                segment.value.clone()
            } else {
                format_segment(&segment.value)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Canonical form of one identifier segment
pub fn format_segment(value: &str) -> String {
    if segment_needs_quotes(value) {
        quote(value)
    } else {
        value.to_string()
    }
}

/// Canonical absolute identifier for a path of raw segment values
pub fn format_id<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|v| {
            let v = v.as_ref();
            if v == UNDERSCORE {
                quote(v)
            } else {
                format_segment(v)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

pub fn format_scalar(scalar: &Scalar) -> String {
    match &scalar.kind {
        ScalarKind::Unquoted if value_needs_quotes(&scalar.value) => quote(&scalar.value),
        ScalarKind::Unquoted => scalar.value.clone(),
        ScalarKind::DoubleQuoted => quote(&scalar.value),
        ScalarKind::SingleQuoted if scalar.value.contains(['\'', '\n']) => quote(&scalar.value),
        ScalarKind::SingleQuoted => format!("'{}'", scalar.value),
        ScalarKind::Block { tag } => {
            let fence = "|".repeat(longest_pipe_run(&scalar.value) + 1);
            if scalar.value.contains('\n') {
                format!("{}{}\n{}\n{}", fence, tag, scalar.value, fence)
            } else {
                format!("{}{} {}{}", fence, tag, scalar.value, fence)
            }
        }
    }
}

fn segment_needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value != value.trim()
        || value.contains(|c| {
            matches!(
                c,
                '\n' | ';' | '{' | '}' | '[' | ']' | '(' | ')' | ':' | '.' | '"' | '\'' | '#' | '|'
            )
        })
        || value.contains("--")
        || value.contains("->")
        || value.contains("<-")
        || value.starts_with(['-', '<', '>', '*'])
}

fn value_needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value != value.trim()
        || value.contains(|c| matches!(c, '\n' | ';' | '{' | '}' | '#' | '|' | '"' | '\''))
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn longest_pipe_run(value: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in value.chars() {
        if c == '|' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn canonical(source: &str) -> String {
        serialize(&parse(source).unwrap())
    }

    #[test]
    fn test_serialize_nested_blocks() {
        assert_eq!(
            canonical("a: A {\nb: {shape: circle}\nc -> d\n}"),
            "a: A {\n  b: {\n    shape: circle\n  }\n  c -> d\n}\n"
        );
    }

    #[test]
    fn test_serialize_empty_block_and_comments() {
        assert_eq!(canonical("# top\nx: {}\n"), "# top\nx: {}\n");
    }

    #[test]
    fn test_serialize_indexed_edges() {
        assert_eq!(
            canonical("a.(b <- c)[2].style.stroke: red"),
            "a.(b <- c)[2].style.stroke: red\n"
        );
    }

    #[test]
    fn test_serialize_quotes_when_needed() {
        assert_eq!(canonical(r#""a.b": "x""#), "\"a.b\": \"x\"\n");
        assert_eq!(canonical(r#""plain": hi"#), "plain: hi\n");
        assert_eq!(format_segment("a -> b"), "\"a -> b\"");
        assert_eq!(format_id(&["a", "square 2"]), "a.square 2");
    }

    #[test]
    fn test_serialize_block_string_fence() {
        let scalar = Scalar::block("md", "a || b");
        assert_eq!(format_scalar(&scalar), "|||md a || b|||");
        let source = format!("x: {}", format_scalar(&scalar));
        assert_eq!(canonical(&source), format!("{}\n", source));
    }

    #[test]
    fn test_mask_hides_block() {
        let ast = parse("a: {\n  b\n}\nc").unwrap();
        let map = ast.key(ast.keys_of(ast.root()).next().unwrap()).map_value().unwrap();
        let masked = Serializer::new().masking(map).serialize(&ast);
        assert_eq!(masked, "a: {...}\nc\n");
    }

    #[test]
    fn test_custom_indent() {
        let ast = parse("a: {\nb\n}").unwrap();
        assert_eq!(Serializer::with_indent("\t").serialize(&ast), "a: {\n\tb\n}\n");
    }
}
