//! Document ingestion: store, extract, chunk, optionally embed.
//!
//! Text formats are decoded as UTF-8 with a Latin-1 fallback. PDF files are
//! rejected; binary text extraction is not supported.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use secrecy::SecretString;
use uuid::Uuid;

use ragloom_core::repository::document::DocumentRepository;
use ragloom_types::document::{Document, DocumentChunk, NewDocument};
use ragloom_types::error::RepositoryError;

use super::chunker::split_into_chunks;
use super::embedding::Embedder;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("failed to read or store file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("document {0} not found")]
    DocumentNotFound(i64),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct DocumentIndexer<D, E> {
    documents: Arc<D>,
    embedder: Arc<E>,
    upload_dir: PathBuf,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl<D: DocumentRepository, E: Embedder> DocumentIndexer<D, E> {
    pub fn new(
        documents: Arc<D>,
        embedder: Arc<E>,
        upload_dir: PathBuf,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            documents,
            embedder,
            upload_dir,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Copy `path` into the upload directory, store its text and chunks.
    ///
    /// Chunks are embedded only when `api_key` is given; a failed embedding
    /// leaves that chunk without a vector and the document is then not
    /// marked as embedded.
    pub async fn add_file(
        &self,
        path: &Path,
        api_key: Option<&SecretString>,
    ) -> Result<Document, IndexError> {
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        reject_unsupported(&original_name)?;

        let bytes = tokio::fs::read(path).await?;
        self.add_bytes(&original_name, &bytes, api_key).await
    }

    /// Store uploaded content under a fresh name, then extract and chunk it.
    /// The MIME type is derived from the extension of `original_name`.
    pub async fn add_bytes(
        &self,
        original_name: &str,
        bytes: &[u8],
        api_key: Option<&SecretString>,
    ) -> Result<Document, IndexError> {
        let mime_type = reject_unsupported(original_name)?;

        let filename = match Path::new(original_name).extension() {
            Some(ext) => format!("{}.{}", Uuid::now_v7(), ext.to_string_lossy()),
            None => Uuid::now_v7().to_string(),
        };
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::write(self.upload_dir.join(&filename), bytes).await?;

        let text = decode_text(bytes);
        let doc = self
            .documents
            .create_document(&NewDocument {
                filename,
                original_name: original_name.to_string(),
                mime_type: mime_type.to_string(),
                file_size: bytes.len() as i64,
                extracted_text: Some(text.clone()),
            })
            .await?;
        tracing::info!(document_id = doc.id, name = %doc.original_name, "document stored");

        self.index(doc.id, &text, api_key).await?;
        Ok(self.documents.get_document(doc.id).await?.unwrap_or(doc))
    }

    /// Re-chunk a stored document's extracted text and embed every chunk.
    pub async fn reembed(&self, id: i64, api_key: &SecretString) -> Result<Document, IndexError> {
        let doc = self
            .documents
            .get_document(id)
            .await?
            .ok_or(IndexError::DocumentNotFound(id))?;
        let text = doc.extracted_text.clone().unwrap_or_default();

        let embedded = self.index(id, &text, Some(api_key)).await?;
        tracing::info!(document_id = id, embedded, "document re-embedded");

        Ok(self.documents.get_document(id).await?.unwrap_or(doc))
    }

    /// Remove a document, its chunks and its stored file.
    pub async fn delete(&self, id: i64) -> Result<Document, IndexError> {
        let doc = self
            .documents
            .get_document(id)
            .await?
            .ok_or(IndexError::DocumentNotFound(id))?;
        if !self.documents.delete_document(id).await? {
            return Err(IndexError::DocumentNotFound(id));
        }

        match tokio::fs::remove_file(self.upload_dir.join(&doc.filename)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(document_id = id, file = %doc.filename, "stored file already gone");
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(document_id = id, name = %doc.original_name, "document deleted");
        Ok(doc)
    }

    /// Chunk `text`, embed when a key is given, and replace the stored chunks.
    /// Returns how many chunks received a vector.
    async fn index(
        &self,
        document_id: i64,
        text: &str,
        api_key: Option<&SecretString>,
    ) -> Result<usize, IndexError> {
        let mut chunks = Vec::new();
        for (index, content) in split_into_chunks(text, self.chunk_size, self.chunk_overlap)
            .into_iter()
            .enumerate()
        {
            let embedding = match api_key {
                Some(key) => match self.embedder.embed(&content, key).await {
                    Ok(v) => Some(v),
                    Err(e) => {
                        tracing::warn!(document_id, chunk = index, error = %e, "embedding failed");
                        None
                    }
                },
                None => None,
            };
            chunks.push(DocumentChunk {
                document_id,
                chunk_index: index as i64,
                content,
                embedding,
            });
        }
        self.documents.replace_chunks(document_id, &chunks).await?;
        tracing::debug!(document_id, chunks = chunks.len(), "document chunked");

        Ok(chunks.iter().filter(|c| c.embedding.is_some()).count())
    }
}

fn reject_unsupported(original_name: &str) -> Result<&'static str, IndexError> {
    match mime_type_for(Path::new(original_name)) {
        "application/pdf" => Err(IndexError::UnsupportedFormat(original_name.to_string())),
        mime => Ok(mime),
    }
}

/// UTF-8 when valid, otherwise each byte read as a Latin-1 code point.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "text" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use ragloom_types::error::RetrievalError;

    use super::*;
    use crate::sqlite::document::SqliteDocumentRepository;
    use crate::sqlite::test_pool;

    struct LengthEmbedder;

    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str, _api_key: &SecretString) -> Result<Vec<f32>, RetrievalError> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    type TestIndexer = DocumentIndexer<SqliteDocumentRepository, LengthEmbedder>;

    async fn indexer(dir: &Path) -> (TestIndexer, Arc<SqliteDocumentRepository>, tempfile::TempDir) {
        let (pool, db_dir) = test_pool().await;
        let repo = Arc::new(SqliteDocumentRepository::new(pool));
        let indexer = DocumentIndexer::new(repo.clone(), Arc::new(LengthEmbedder), dir.join("uploads"), 10, 2);
        (indexer, repo, db_dir)
    }

    #[test]
    fn decode_text_falls_back_to_latin1() {
        assert_eq!(decode_text("héllo".as_bytes()), "héllo");
        assert_eq!(decode_text(&[0x63, 0x61, 0x66, 0xE9]), "café");
    }

    #[test]
    fn mime_types() {
        assert_eq!(mime_type_for(Path::new("a.TXT")), "text/plain");
        assert_eq!(mime_type_for(Path::new("notes.md")), "text/markdown");
        assert_eq!(mime_type_for(Path::new("blob")), "application/octet-stream");
    }

    #[tokio::test]
    async fn add_file_without_key_stores_plain_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        tokio::fs::write(&source, "abcdefghijklmnop").await.unwrap();
        let (indexer, repo, _db) = indexer(dir.path()).await;

        let doc = indexer.add_file(&source, None).await.unwrap();
        assert_eq!(doc.original_name, "notes.txt");
        assert_eq!(doc.mime_type, "text/plain");
        assert_eq!(doc.file_size, 16);
        assert!(!doc.embeddings_generated);
        assert!(dir.path().join("uploads").join(&doc.filename).exists());

        let chunks = repo.list_chunks(&[doc.id]).await.unwrap();
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["abcdefghij", "ijklmnop"]);
        assert!(chunks.iter().all(|c| c.embedding.is_none()));
    }

    #[tokio::test]
    async fn add_file_with_key_embeds_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("short.md");
        tokio::fs::write(&source, "tiny").await.unwrap();
        let (indexer, repo, _db) = indexer(dir.path()).await;

        let key = SecretString::from("k".to_string());
        let doc = indexer.add_file(&source, Some(&key)).await.unwrap();
        assert!(doc.embeddings_generated);

        let chunks = repo.list_chunks(&[doc.id]).await.unwrap();
        assert_eq!(chunks[0].embedding, Some(vec![4.0, 1.0]));
    }

    #[tokio::test]
    async fn add_file_rejects_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("paper.pdf");
        tokio::fs::write(&source, "%PDF-1.4").await.unwrap();
        let (indexer, _, _db) = indexer(dir.path()).await;

        let err = indexer.add_file(&source, None).await.unwrap_err();
        assert!(matches!(err, IndexError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn add_bytes_names_file_after_original_extension() {
        let dir = tempfile::tempdir().unwrap();
        let (indexer, _, _db) = indexer(dir.path()).await;

        let doc = indexer.add_bytes("README.md", b"# title", None).await.unwrap();
        assert_eq!(doc.original_name, "README.md");
        assert_eq!(doc.mime_type, "text/markdown");
        assert!(doc.filename.ends_with(".md"));
        assert_ne!(doc.filename, "README.md");

        let err = indexer.add_bytes("scan.PDF", b"%PDF", None).await.unwrap_err();
        assert!(matches!(err, IndexError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn reembed_embeds_existing_text() {
        let dir = tempfile::tempdir().unwrap();
        let (indexer, repo, _db) = indexer(dir.path()).await;
        let doc = indexer.add_bytes("notes.txt", b"abcdefghijklmnop", None).await.unwrap();
        assert!(!doc.embeddings_generated);

        let key = SecretString::from("k".to_string());
        let doc = indexer.reembed(doc.id, &key).await.unwrap();
        assert!(doc.embeddings_generated);

        let chunks = repo.list_chunks(&[doc.id]).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].embedding, Some(vec![10.0, 1.0]));
        assert_eq!(chunks[1].embedding, Some(vec![8.0, 1.0]));
    }

    #[tokio::test]
    async fn reembed_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let (indexer, _, _db) = indexer(dir.path()).await;
        let key = SecretString::from("k".to_string());
        let err = indexer.reembed(99, &key).await.unwrap_err();
        assert!(matches!(err, IndexError::DocumentNotFound(99)));
    }

    #[tokio::test]
    async fn delete_removes_rows_and_stored_file() {
        let dir = tempfile::tempdir().unwrap();
        let (indexer, repo, _db) = indexer(dir.path()).await;
        let doc = indexer.add_bytes("notes.txt", b"some text", None).await.unwrap();
        let stored = dir.path().join("uploads").join(&doc.filename);
        assert!(stored.exists());

        let deleted = indexer.delete(doc.id).await.unwrap();
        assert_eq!(deleted.id, doc.id);
        assert!(!stored.exists());
        assert!(repo.get_document(doc.id).await.unwrap().is_none());
        assert!(repo.list_chunks(&[doc.id]).await.unwrap().is_empty());

        let err = indexer.delete(doc.id).await.unwrap_err();
        assert!(matches!(err, IndexError::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn delete_tolerates_missing_stored_file() {
        let dir = tempfile::tempdir().unwrap();
        let (indexer, repo, _db) = indexer(dir.path()).await;
        let doc = indexer.add_bytes("notes.txt", b"text", None).await.unwrap();
        tokio::fs::remove_file(dir.path().join("uploads").join(&doc.filename))
            .await
            .unwrap();

        indexer.delete(doc.id).await.unwrap();
        assert!(repo.get_document(doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn add_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let (indexer, _, _db) = indexer(dir.path()).await;
        let err = indexer.add_file(&dir.path().join("nope.txt"), None).await.unwrap_err();
        assert!(matches!(err, IndexError::Io(_)));
    }
}
