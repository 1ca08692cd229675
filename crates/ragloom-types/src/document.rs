//! Uploaded documents and the chunks retrieval searches over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored document with its extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Integer id assigned by the store; referenced by `documentIds` in node config.
    pub id: i64,
    /// Name under which the file was stored.
    pub filename: String,
    /// Name the file was uploaded with.
    pub original_name: String,
    pub mime_type: String,
    pub file_size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    /// Whether every chunk has a stored embedding vector.
    pub embeddings_generated: bool,
    pub uploaded_at: DateTime<Utc>,
}

/// Fields supplied when a document is added; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub file_size: i64,
    pub extracted_text: Option<String>,
}

/// A fixed-size window of a document's text.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub document_id: i64,
    /// Position of the chunk within its document, from 0.
    pub chunk_index: i64,
    pub content: String,
    /// Embedding vector when one was generated.
    pub embedding: Option<Vec<f32>>,
}
