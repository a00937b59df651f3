//! # Document Handle
//!
//! Owns one diagram and applies edits to it in sequence.
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Compile → Edit* → Save
//!   ↓       ↓        ↓       ↓
//! File   Diagram  Diagram   File
//! ```
//!
//! Every successful edit replaces the held diagram and bumps the version.
//! A rejected edit leaves both untouched.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};
use trellis_compiler::{compile, Diagram};
use trellis_parser::Serializer;

use crate::config::EditorConfig;
use crate::deltas::{delete_id_deltas, move_id_deltas, reconnect_edge_id_deltas, rename_id_deltas, IdDeltas};
use crate::errors::{EditorError, EditorResult};
use crate::ops::Editor;

/// One edit, as it appears in an edit script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Edit {
    Create {
        key: String,
    },
    Set {
        key: String,
        #[serde(default)]
        tag: Option<String>,
        #[serde(default)]
        value: Option<String>,
    },
    Delete {
        key: String,
    },
    Rename {
        key: String,
        #[serde(rename = "newName")]
        new_name: String,
    },
    Move {
        key: String,
        #[serde(rename = "newKey")]
        new_key: String,
        #[serde(rename = "includeDescendants", default)]
        include_descendants: bool,
    },
    ReconnectEdge {
        #[serde(rename = "edgeKey")]
        edge_key: String,
        #[serde(rename = "newSrc", default)]
        new_src: Option<String>,
        #[serde(rename = "newDst", default)]
        new_dst: Option<String>,
    },
}

impl Edit {
    /// Parse a JSON array of edits
    pub fn parse_script(json: &str) -> EditorResult<Vec<Edit>> {
        Ok(serde_json::from_str(json)?)
    }

    fn name(&self) -> &'static str {
        match self {
            Edit::Create { .. } => "create",
            Edit::Set { .. } => "set",
            Edit::Delete { .. } => "delete",
            Edit::Rename { .. } => "rename",
            Edit::Move { .. } => "move",
            Edit::ReconnectEdge { .. } => "reconnect",
        }
    }
}

/// Result of applying an edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOutcome {
    /// Document version after the edit
    pub version: u64,

    /// Key the edited item ended up under, for create and rename
    pub final_key: Option<String>,
}

/// Editable diagram document
#[derive(Debug)]
pub struct Document {
    /// Path to source file (if any)
    pub path: PathBuf,

    /// Current version number (increments on each edit)
    pub version: u64,

    storage: DocumentStorage,
    editor: Editor,
}

/// Storage backend for document
#[derive(Debug)]
pub enum DocumentStorage {
    /// In-memory only (for testing, temp docs)
    Memory { diagram: Diagram },

    /// File-backed
    File { diagram: Diagram, dirty: bool },
}

impl Document {
    /// Create document from source text (memory-backed)
    pub fn from_source(path: PathBuf, source: &str) -> EditorResult<Self> {
        let diagram = compile(source)?;

        Ok(Self {
            path,
            version: 0,
            storage: DocumentStorage::Memory { diagram },
            editor: Editor::default(),
        })
    }

    /// Load document from file (file-backed), picking up the config file
    /// next to it
    pub fn load(path: PathBuf) -> EditorResult<Self> {
        let source = std::fs::read_to_string(&path)?;
        let diagram = compile(&source)?;
        let dir = path.parent().map(PathBuf::from).unwrap_or_default();
        let config = EditorConfig::load(&dir)?;
        debug!(path = %path.display(), "Loaded document");

        Ok(Self {
            path,
            version: 0,
            storage: DocumentStorage::File { diagram, dirty: false },
            editor: Editor::new(config),
        })
    }

    pub fn with_editor(mut self, editor: Editor) -> Self {
        self.editor = editor;
        self
    }

    pub fn diagram(&self) -> &Diagram {
        match &self.storage {
            DocumentStorage::Memory { diagram } | DocumentStorage::File { diagram, .. } => diagram,
        }
    }

    /// Current text, written with the configured indent
    pub fn source(&self) -> String {
        Serializer::with_indent(&self.editor.config().indent).serialize(&self.diagram().ast)
    }

    /// Apply an edit on the given board
    pub fn apply(&mut self, board: &[&str], edit: Edit) -> EditorResult<EditOutcome> {
        let current = self.diagram();
        let editor = &self.editor;
        let (diagram, final_key) = match &edit {
            Edit::Create { key } => {
                let (diagram, key) = editor.create(current, board, key)?;
                (diagram, Some(key))
            }
            Edit::Set { key, tag, value } => {
                (editor.set(current, board, key, tag.as_deref(), value.as_deref())?, None)
            }
            Edit::Delete { key } => (editor.delete(current, board, key)?, None),
            Edit::Rename { key, new_name } => {
                let (diagram, key) = editor.rename(current, board, key, new_name)?;
                (diagram, Some(key))
            }
            Edit::Move {
                key,
                new_key,
                include_descendants,
            } => (editor.move_object(current, board, key, new_key, *include_descendants)?, None),
            Edit::ReconnectEdge {
                edge_key,
                new_src,
                new_dst,
            } => (
                editor.reconnect_edge(current, board, edge_key, new_src.as_deref(), new_dst.as_deref())?,
                None,
            ),
        };

        self.version += 1;
        match &mut self.storage {
            DocumentStorage::Memory { diagram: held } => *held = diagram,
            DocumentStorage::File { diagram: held, dirty } => {
                *held = diagram;
                *dirty = true;
            }
        }
        info!(edit = edit.name(), version = self.version, "Applied edit");

        Ok(EditOutcome {
            version: self.version,
            final_key,
        })
    }

    /// Apply a JSON edit script in order, stopping at the first rejected edit
    pub fn apply_script(&mut self, board: &[&str], json: &str) -> EditorResult<Vec<EditOutcome>> {
        Edit::parse_script(json)?
            .into_iter()
            .map(|edit| self.apply(board, edit))
            .collect()
    }

    /// How IDs would change if `edit` were applied. Create and set rename
    /// nothing.
    pub fn deltas(&self, board: &[&str], edit: &Edit) -> EditorResult<IdDeltas> {
        let diagram = self.diagram();
        match edit {
            Edit::Create { .. } | Edit::Set { .. } => Ok(IdDeltas::new()),
            Edit::Delete { key } => delete_id_deltas(diagram, board, key),
            Edit::Rename { key, new_name } => rename_id_deltas(diagram, board, key, new_name),
            Edit::Move {
                key,
                new_key,
                include_descendants,
            } => move_id_deltas(diagram, board, key, new_key, *include_descendants),
            Edit::ReconnectEdge {
                edge_key,
                new_src,
                new_dst,
            } => reconnect_edge_id_deltas(diagram, board, edge_key, new_src.as_deref(), new_dst.as_deref()),
        }
    }

    /// Check if document has unsaved changes
    pub fn is_dirty(&self) -> bool {
        match &self.storage {
            DocumentStorage::File { dirty, .. } => *dirty,
            DocumentStorage::Memory { .. } => false,
        }
    }

    /// Write the current text back to the file
    pub fn save(&mut self) -> EditorResult<()> {
        let source = self.source();
        match &mut self.storage {
            DocumentStorage::File { dirty, .. } => {
                std::fs::write(&self.path, source)?;
                *dirty = false;
                debug!(path = %self.path.display(), "Saved document");
                Ok(())
            }
            DocumentStorage::Memory { .. } => Err(EditorError::NotFileBacked),
        }
    }
}
