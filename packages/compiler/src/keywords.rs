//! Reserved words of the language.

use serde::{Deserialize, Serialize};

/// Fields an object statement may set.
pub const OBJECT_FIELDS: &[&str] = &[
    "shape", "label", "tooltip", "link", "icon", "width", "height", "top", "left", "near", "style",
    "class",
];

/// Fields an edge statement may set.
pub const EDGE_FIELDS: &[&str] = &["label", "style", "source-arrowhead", "target-arrowhead", "class"];

pub const STYLE_KEYWORDS: &[&str] = &[
    "opacity",
    "stroke",
    "fill",
    "stroke-width",
    "stroke-dash",
    "border-radius",
    "shadow",
    "font-size",
    "font-color",
    "bold",
    "italic",
    "underline",
    "3d",
    "multiple",
    "animated",
    "filled",
    "double-border",
];

pub const ARROWHEAD_FIELDS: &[&str] = &["shape", "label", "style"];

pub const SHAPES: &[&str] = &[
    "rectangle",
    "square",
    "page",
    "parallelogram",
    "document",
    "cylinder",
    "queue",
    "package",
    "step",
    "callout",
    "stored_data",
    "person",
    "diamond",
    "oval",
    "circle",
    "hexagon",
    "cloud",
    "text",
    "code",
    "class",
    "sql_table",
    "image",
    "sequence_diagram",
];

pub const ARROWHEAD_SHAPES: &[&str] = &[
    "triangle", "arrow", "diamond", "circle", "box", "cf-one", "cf-one-required", "cf-many",
    "cf-many-required", "cross", "none",
];

/// Constant positions accepted by `near`.
pub const NEAR_CONSTANTS: &[&str] = &[
    "top-left",
    "top-center",
    "top-right",
    "center-left",
    "center-right",
    "bottom-left",
    "bottom-center",
    "bottom-right",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardKind {
    Layers,
    Scenarios,
    Steps,
}

impl BoardKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BoardKind::Layers => "layers",
            BoardKind::Scenarios => "scenarios",
            BoardKind::Steps => "steps",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "layers" => Some(BoardKind::Layers),
            "scenarios" => Some(BoardKind::Scenarios),
            "steps" => Some(BoardKind::Steps),
            _ => None,
        }
    }
}

/// Words that can never name an object.
pub fn is_reserved(word: &str) -> bool {
    OBJECT_FIELDS.contains(&word) || EDGE_FIELDS.contains(&word) || BoardKind::from_keyword(word).is_some()
}

pub fn is_object_field(word: &str) -> bool {
    OBJECT_FIELDS.contains(&word)
}

pub fn is_edge_field(word: &str) -> bool {
    EDGE_FIELDS.contains(&word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_words() {
        assert!(is_reserved("shape"));
        assert!(is_reserved("target-arrowhead"));
        assert!(is_reserved("layers"));
        assert!(!is_reserved("fill"));
        assert!(!is_reserved("square"));
    }

    #[test]
    fn test_board_keywords_roundtrip() {
        for kind in [BoardKind::Layers, BoardKind::Scenarios, BoardKind::Steps] {
            assert_eq!(BoardKind::from_keyword(kind.as_str()), Some(kind));
        }
    }
}
