//! Chat and file types matching the browser API surface and the provider wire format.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Chat message in the browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Incoming chat request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default, rename = "hasAttachedFiles")]
    pub has_attached_files: bool,
}

// ---------------------------------------------------------------
// Provider: Responses API
// ---------------------------------------------------------------

/// Body for a streaming `POST /responses` call.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRequest {
    pub model: String,
    pub input: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

impl ResponseRequest {
    pub fn streaming(model: impl Into<String>, input: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            input,
            stream: true,
            tools: Vec::new(),
        }
    }

    /// Let the model search the given vector store.
    pub fn with_file_search(mut self, vector_store_id: impl Into<String>) -> Self {
        self.tools.push(Tool::FileSearch {
            vector_store_ids: vec![vector_store_id.into()],
        });
        self
    }
}

/// Hosted tool made available to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Tool {
    #[serde(rename = "file_search")]
    FileSearch { vector_store_ids: Vec<String> },
}

/// One decoded event from the upstream response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    /// `response.output_text.delta` — an incremental text fragment.
    OutputTextDelta { delta: String },
    /// `response.completed`.
    Completed,
    /// Any other event kind (tool calls, status markers, ...).
    Other { kind: String },
}

impl ResponseEvent {
    /// Text carried by this event, if it is a text delta.
    pub fn text_delta(&self) -> Option<&str> {
        match self {
            ResponseEvent::OutputTextDelta { delta } => Some(delta),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------
// Provider: Files / Vector Stores
// ---------------------------------------------------------------

/// Provider-managed vector store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorStore {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One page of `GET /vector_stores`.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorStoreList {
    #[serde(default)]
    pub data: Vec<VectorStore>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub last_id: Option<String>,
}

/// File object returned by `POST /files`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
}

/// Payload for a file-store upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

// ---------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------

/// A file the user attached to the conversation.
///
/// Holds its raw bytes until the provider has accepted it; after
/// [`AttachedFile::mark_uploaded`] only the remote id remains.
#[derive(Debug, Clone)]
pub struct AttachedFile {
    pub name: String,
    pub extension: String,
    pub size: u64,
    pub content_type: String,
    remote_id: String,
    uploaded: bool,
    raw: Option<Bytes>,
}

impl AttachedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, raw: Bytes) -> Self {
        let name = name.into();
        let extension = std::path::Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        Self {
            extension,
            remote_id: String::new(),
            uploaded: false,
            size: raw.len() as u64,
            content_type: content_type.into(),
            raw: Some(raw),
            name,
        }
    }

    /// Raw bytes, present only before upload.
    pub fn raw_bytes(&self) -> Option<&Bytes> {
        self.raw.as_ref()
    }

    /// Hand the raw bytes over for upload. Yields them at most once.
    pub fn take_bytes(&mut self) -> Option<Bytes> {
        self.raw.take()
    }

    /// Provider file id; empty until uploaded.
    pub fn remote_id(&self) -> &str {
        &self.remote_id
    }

    pub fn is_uploaded(&self) -> bool {
        self.uploaded
    }

    /// Record the provider id and drop the local bytes.
    pub fn mark_uploaded(&mut self, remote_id: impl Into<String>) {
        self.remote_id = remote_id.into();
        self.uploaded = true;
        self.raw = None;
    }

    /// Users may only remove attachments that have not been uploaded yet.
    pub fn is_removable(&self) -> bool {
        !self.uploaded
    }

    pub fn to_uploaded(&self) -> UploadedFile {
        UploadedFile {
            id: self.remote_id.clone(),
            name: self.name.clone(),
            size: self.size,
            content_type: self.content_type.clone(),
        }
    }
}

/// Per-file entry of a successful upload response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
}

/// File relay response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub files: Vec<UploadedFile>,
}

/// JSON error body returned to the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
