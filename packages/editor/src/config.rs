use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "trellis.config.json";

/// Editor configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Indentation unit used when writing blocks
    #[serde(default = "default_indent")]
    pub indent: String,

    /// Reject edits on a nested board that touch text outside it
    #[serde(default = "default_validate_board_scope")]
    pub validate_board_scope: bool,
}

fn default_indent() -> String {
    "  ".to_string()
}

fn default_validate_board_scope() -> bool {
    true
}

impl EditorConfig {
    /// Load config from a directory
    pub fn load(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: EditorConfig = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(EditorConfig::default())
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            validate_board_scope: default_validate_board_scope(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{ "indent": "\t", "validateBoardScope": false }"#;

        let config: EditorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.indent, "\t");
        assert!(!config.validate_board_scope);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: EditorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.indent, "  ");
        assert!(config.validate_board_scope);
    }

    #[test]
    fn test_load_without_file() {
        let dir = std::env::temp_dir().join("trellis-config-missing");
        let config = EditorConfig::load(&dir).unwrap();
        assert_eq!(config, EditorConfig::default());
    }
}
