//! Data models for the sharing core.
//!
//! This module contains the notebook document as the host hands it over, the
//! typed view over its sharing metadata, and the request/response shapes of
//! the remote sharing API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Metadata Keys
// ============================================================================

pub const SHARED_ID_KEY: &str = "sharedId";
pub const READABLE_ID_KEY: &str = "readableId";
pub const SHARED_NAME_KEY: &str = "sharedName";
pub const LAST_SHARED_KEY: &str = "lastShared";
pub const IS_SHARED_NOTEBOOK_KEY: &str = "isSharedNotebook";
pub const DOMAIN_ID_KEY: &str = "domainId";

/// Every metadata key owned by the sharing workflow.
pub const SHARING_METADATA_KEYS: &[&str] = &[
    SHARED_ID_KEY,
    READABLE_ID_KEY,
    SHARED_NAME_KEY,
    LAST_SHARED_KEY,
    IS_SHARED_NOTEBOOK_KEY,
    DOMAIN_ID_KEY,
];

// ============================================================================
// Notebook Document
// ============================================================================

fn default_nbformat() -> u32 {
    4
}

fn default_nbformat_minor() -> u32 {
    5
}

/// A notebook as a JSON document: ordered cells plus free-form metadata.
///
/// Fields the sharing core does not look at are kept in `extra` so that a
/// document read from the host and written back is not truncated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookDocument {
    #[serde(default)]
    pub cells: Vec<Cell>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default = "default_nbformat")]
    pub nbformat: u32,
    #[serde(default = "default_nbformat_minor")]
    pub nbformat_minor: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for NotebookDocument {
    fn default() -> Self {
        Self {
            cells: Vec::new(),
            metadata: Map::new(),
            nbformat: default_nbformat(),
            nbformat_minor: default_nbformat_minor(),
            extra: Map::new(),
        }
    }
}

impl NotebookDocument {
    pub fn sharing(&self) -> SharingMetadata {
        SharingMetadata::from_metadata(&self.metadata)
    }

    /// Serialized size in bytes, as it would travel over the wire.
    pub fn encoded_len(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Code,
    Markdown,
    Raw,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub cell_type: CellKind,
    #[serde(default)]
    pub source: CellSource,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// id, outputs, execution_count, attachments...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Cell {
    pub fn new(cell_type: CellKind, source: impl Into<String>) -> Self {
        Self {
            cell_type,
            source: CellSource::Text(source.into()),
            metadata: Map::new(),
            extra: Map::new(),
        }
    }
}

/// nbformat allows a cell source to be one string or a list of lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellSource {
    Text(String),
    Lines(Vec<String>),
}

impl Default for CellSource {
    fn default() -> Self {
        CellSource::Text(String::new())
    }
}

impl CellSource {
    pub fn to_text(&self) -> String {
        match self {
            CellSource::Text(s) => s.clone(),
            CellSource::Lines(lines) => lines.concat(),
        }
    }
}

// ============================================================================
// Sharing Metadata
// ============================================================================

/// Typed read-only view over the sharing fields of a notebook's metadata.
///
/// Values of the wrong JSON type are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharingMetadata {
    pub shared_id: Option<String>,
    pub readable_id: Option<String>,
    pub shared_name: Option<String>,
    pub last_shared: Option<String>,
    pub is_shared_notebook: bool,
    pub domain_id: Option<String>,
}

impl SharingMetadata {
    pub fn from_metadata(metadata: &Map<String, Value>) -> Self {
        let text = |key: &str| {
            metadata
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            shared_id: text(SHARED_ID_KEY),
            readable_id: text(READABLE_ID_KEY),
            shared_name: text(SHARED_NAME_KEY),
            last_shared: text(LAST_SHARED_KEY),
            is_shared_notebook: metadata
                .get(IS_SHARED_NOTEBOOK_KEY)
                .and_then(Value::as_bool)
                .unwrap_or(false),
            domain_id: text(DOMAIN_ID_KEY),
        }
    }

    /// Identifier used in links: the readable alias when there is one.
    pub fn link_id(&self) -> Option<&str> {
        self.readable_id.as_deref().or(self.shared_id.as_deref())
    }
}

// ============================================================================
// Sharing API Wire Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueTokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRequest {
    pub content: NotebookDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub content: NotebookDocument,
}

/// Identifiers the server assigned to a freshly shared notebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedNotebookRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readable_id: Option<String>,
}

impl SharedNotebookRef {
    pub fn link_id(&self) -> &str {
        self.readable_id.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub notebook: SharedNotebookRef,
}

/// A shared notebook as the remote API returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedNotebookRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readable_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,
    pub content: NotebookDocument,
}

/// Error body returned by the sharing API on failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, alias = "error", alias = "detail")]
    pub message: Option<String>,
}
