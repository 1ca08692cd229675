//! Document repository trait definition.

use ragloom_types::document::{Document, DocumentChunk, NewDocument};
use ragloom_types::error::RepositoryError;

/// Storage for uploaded documents and their chunks.
pub trait DocumentRepository: Send + Sync {
    /// Insert a document and return it with its assigned id.
    fn create_document(
        &self,
        doc: &NewDocument,
    ) -> impl std::future::Future<Output = Result<Document, RepositoryError>> + Send;

    fn get_document(
        &self,
        id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Document>, RepositoryError>> + Send;

    /// List every document, newest first.
    fn list_documents(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Document>, RepositoryError>> + Send;

    /// Delete a document and its chunks. Returns `false` if it did not exist.
    fn delete_document(
        &self,
        id: i64,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Replace the chunks of a document and record whether all were embedded.
    fn replace_chunks(
        &self,
        document_id: i64,
        chunks: &[DocumentChunk],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Chunks belonging to any of `document_ids`, ordered by document then index.
    fn list_chunks(
        &self,
        document_ids: &[i64],
    ) -> impl std::future::Future<Output = Result<Vec<DocumentChunk>, RepositoryError>> + Send;
}
