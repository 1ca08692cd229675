//! SQLite document repository implementation.
//!
//! Documents keep their extracted text; chunks carry an optional embedding
//! vector stored as a JSON array.

use chrono::Utc;
use ragloom_core::repository::document::DocumentRepository;
use ragloom_types::document::{Document, DocumentChunk, NewDocument};
use ragloom_types::error::RepositoryError;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed implementation of `DocumentRepository`.
pub struct SqliteDocumentRepository {
    pool: DatabasePool,
}

impl SqliteDocumentRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct DocumentRow {
    id: i64,
    filename: String,
    original_name: String,
    mime_type: String,
    file_size: i64,
    extracted_text: Option<String>,
    embeddings_generated: i64,
    uploaded_at: String,
}

impl DocumentRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            filename: row.try_get("filename")?,
            original_name: row.try_get("original_name")?,
            mime_type: row.try_get("mime_type")?,
            file_size: row.try_get("file_size")?,
            extracted_text: row.try_get("extracted_text")?,
            embeddings_generated: row.try_get("embeddings_generated")?,
            uploaded_at: row.try_get("uploaded_at")?,
        })
    }

    fn into_document(self) -> Result<Document, RepositoryError> {
        Ok(Document {
            id: self.id,
            filename: self.filename,
            original_name: self.original_name,
            mime_type: self.mime_type,
            file_size: self.file_size,
            extracted_text: self.extracted_text,
            embeddings_generated: self.embeddings_generated != 0,
            uploaded_at: parse_datetime(&self.uploaded_at)?,
        })
    }
}

fn chunk_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<DocumentChunk, RepositoryError> {
    let embedding: Option<String> = row.try_get("embedding").map_err(query_error)?;
    let embedding = embedding
        .as_deref()
        .map(serde_json::from_str::<Vec<f32>>)
        .transpose()
        .map_err(|e| RepositoryError::Query(format!("invalid embedding JSON: {e}")))?;

    Ok(DocumentChunk {
        document_id: row.try_get("document_id").map_err(query_error)?,
        chunk_index: row.try_get("chunk_index").map_err(query_error)?,
        content: row.try_get("content").map_err(query_error)?,
        embedding,
    })
}

// ---------------------------------------------------------------------------
// DocumentRepository
// ---------------------------------------------------------------------------

impl DocumentRepository for SqliteDocumentRepository {
    async fn create_document(&self, doc: &NewDocument) -> Result<Document, RepositoryError> {
        let uploaded_at = Utc::now();
        let result = sqlx::query(
            r#"INSERT INTO documents
                 (filename, original_name, mime_type, file_size, extracted_text, embeddings_generated, uploaded_at)
               VALUES (?, ?, ?, ?, ?, 0, ?)"#,
        )
        .bind(&doc.filename)
        .bind(&doc.original_name)
        .bind(&doc.mime_type)
        .bind(doc.file_size)
        .bind(&doc.extracted_text)
        .bind(format_datetime(&uploaded_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(Document {
            id: result.last_insert_rowid(),
            filename: doc.filename.clone(),
            original_name: doc.original_name.clone(),
            mime_type: doc.mime_type.clone(),
            file_size: doc.file_size,
            extracted_text: doc.extracted_text.clone(),
            embeddings_generated: false,
            uploaded_at,
        })
    }

    async fn get_document(&self, id: i64) -> Result<Option<Document>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|row| DocumentRow::from_row(&row).map_err(query_error)?.into_document())
            .transpose()
    }

    async fn list_documents(&self) -> Result<Vec<Document>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM documents ORDER BY uploaded_at DESC, id DESC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        rows.iter()
            .map(|row| DocumentRow::from_row(row).map_err(query_error)?.into_document())
            .collect()
    }

    async fn delete_document(&self, id: i64) -> Result<bool, RepositoryError> {
        // Chunks go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn replace_chunks(
        &self,
        document_id: i64,
        chunks: &[DocumentChunk],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        sqlx::query("DELETE FROM document_chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;

        for chunk in chunks {
            let embedding = chunk
                .embedding
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| RepositoryError::Query(format!("serialize embedding: {e}")))?;

            sqlx::query(
                "INSERT INTO document_chunks (document_id, chunk_index, content, embedding) VALUES (?, ?, ?, ?)",
            )
            .bind(document_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.content)
            .bind(&embedding)
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;
        }

        let all_embedded = !chunks.is_empty() && chunks.iter().all(|c| c.embedding.is_some());
        let result = sqlx::query("UPDATE documents SET embeddings_generated = ? WHERE id = ?")
            .bind(all_embedded as i64)
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await.map_err(query_error)?;
        Ok(())
    }

    async fn list_chunks(&self, document_ids: &[i64]) -> Result<Vec<DocumentChunk>, RepositoryError> {
        if document_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; document_ids.len()].join(", ");
        let sql = format!(
            "SELECT * FROM document_chunks WHERE document_id IN ({placeholders}) ORDER BY document_id, chunk_index"
        );
        let mut query = sqlx::query(&sql);
        for id in document_ids {
            query = query.bind(*id);
        }

        let rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        rows.iter().map(chunk_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::test_pool;

    fn new_doc(name: &str, text: &str) -> NewDocument {
        NewDocument {
            filename: format!("stored-{name}"),
            original_name: name.to_string(),
            mime_type: "text/plain".to_string(),
            file_size: text.len() as i64,
            extracted_text: Some(text.to_string()),
        }
    }

    fn chunk(document_id: i64, index: i64, content: &str, embedding: Option<Vec<f32>>) -> DocumentChunk {
        DocumentChunk {
            document_id,
            chunk_index: index,
            content: content.to_string(),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_document() {
        let (pool, _dir) = test_pool().await;
        let repo = SqliteDocumentRepository::new(pool);
        let doc = repo.create_document(&new_doc("a.txt", "alpha")).await.unwrap();
        assert!(doc.id > 0);
        assert!(!doc.embeddings_generated);

        let loaded = repo.get_document(doc.id).await.unwrap().unwrap();
        assert_eq!(loaded.original_name, "a.txt");
        assert_eq!(loaded.extracted_text.as_deref(), Some("alpha"));
        assert!(repo.get_document(doc.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_documents_newest_first() {
        let (pool, _dir) = test_pool().await;
        let repo = SqliteDocumentRepository::new(pool);
        let first = repo.create_document(&new_doc("a.txt", "a")).await.unwrap();
        let second = repo.create_document(&new_doc("b.txt", "b")).await.unwrap();

        let ids: Vec<i64> = repo.list_documents().await.unwrap().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_replace_chunks_sets_embedding_flag() {
        let (pool, _dir) = test_pool().await;
        let repo = SqliteDocumentRepository::new(pool);
        let doc = repo.create_document(&new_doc("a.txt", "alpha beta")).await.unwrap();

        repo.replace_chunks(
            doc.id,
            &[
                chunk(doc.id, 0, "alpha", Some(vec![1.0, 0.0])),
                chunk(doc.id, 1, "beta", Some(vec![0.0, 1.0])),
            ],
        )
        .await
        .unwrap();
        assert!(repo.get_document(doc.id).await.unwrap().unwrap().embeddings_generated);

        let chunks = repo.list_chunks(&[doc.id]).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].embedding, Some(vec![0.0, 1.0]));

        repo.replace_chunks(doc.id, &[chunk(doc.id, 0, "alpha beta", None)])
            .await
            .unwrap();
        let chunks = repo.list_chunks(&[doc.id]).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].embedding.is_none());
        assert!(!repo.get_document(doc.id).await.unwrap().unwrap().embeddings_generated);
    }

    #[tokio::test]
    async fn test_delete_document_removes_chunks() {
        let (pool, _dir) = test_pool().await;
        let repo = SqliteDocumentRepository::new(pool);
        let doc = repo.create_document(&new_doc("a.txt", "alpha")).await.unwrap();
        let other = repo.create_document(&new_doc("b.txt", "beta")).await.unwrap();
        repo.replace_chunks(doc.id, &[chunk(doc.id, 0, "alpha", None)]).await.unwrap();
        repo.replace_chunks(other.id, &[chunk(other.id, 0, "beta", None)]).await.unwrap();

        assert!(repo.delete_document(doc.id).await.unwrap());
        assert!(repo.get_document(doc.id).await.unwrap().is_none());
        assert!(repo.list_chunks(&[doc.id]).await.unwrap().is_empty());
        assert_eq!(repo.list_chunks(&[other.id]).await.unwrap().len(), 1);

        assert!(!repo.delete_document(doc.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_chunks_for_missing_document() {
        let (pool, _dir) = test_pool().await;
        let repo = SqliteDocumentRepository::new(pool);
        let err = repo.replace_chunks(42, &[]).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_chunks_filters_by_document() {
        let (pool, _dir) = test_pool().await;
        let repo = SqliteDocumentRepository::new(pool);
        let a = repo.create_document(&new_doc("a.txt", "a")).await.unwrap();
        let b = repo.create_document(&new_doc("b.txt", "b")).await.unwrap();
        repo.replace_chunks(a.id, &[chunk(a.id, 0, "from a", None)]).await.unwrap();
        repo.replace_chunks(b.id, &[chunk(b.id, 0, "from b", None)]).await.unwrap();

        let only_b = repo.list_chunks(&[b.id]).await.unwrap();
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b[0].content, "from b");

        assert_eq!(repo.list_chunks(&[a.id, b.id]).await.unwrap().len(), 2);
        assert!(repo.list_chunks(&[]).await.unwrap().is_empty());
    }
}
