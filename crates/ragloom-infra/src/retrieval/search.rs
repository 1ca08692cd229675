//! `RetrievalService` over stored document chunks.
//!
//! With a key and embedded chunks, passages are ranked by cosine similarity
//! to the query embedding. Otherwise (or when the embedding call fails) a
//! case-insensitive substring scan over the chunks is used.

use std::sync::Arc;

use ragloom_core::repository::document::DocumentRepository;
use ragloom_core::retrieval::RetrievalService;
use ragloom_types::document::DocumentChunk;
use ragloom_types::error::RetrievalError;
use ragloom_types::llm::RetrievalQuery;

use super::embedding::{cosine_similarity, Embedder};

pub struct DocumentRetriever<D, E> {
    documents: Arc<D>,
    embedder: Arc<E>,
}

impl<D: DocumentRepository, E: Embedder> DocumentRetriever<D, E> {
    pub fn new(documents: Arc<D>, embedder: Arc<E>) -> Self {
        Self { documents, embedder }
    }

    async fn vector_search(
        &self,
        query: &RetrievalQuery,
        chunks: &[DocumentChunk],
    ) -> Option<Vec<String>> {
        let api_key = query.api_key.as_ref()?;
        if !chunks.iter().any(|c| c.embedding.is_some()) {
            return None;
        }

        let query_vector = match self.embedder.embed(&query.query, api_key).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed, falling back to text search");
                return None;
            }
        };

        let mut scored: Vec<(f32, &DocumentChunk)> = chunks
            .iter()
            .filter_map(|c| {
                c.embedding
                    .as_deref()
                    .map(|e| (cosine_similarity(&query_vector, e), c))
            })
            .collect();
        // Stable sort keeps document order among equal scores.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Some(
            scored
                .into_iter()
                .take(query.top_k)
                .map(|(_, c)| c.content.clone())
                .collect(),
        )
    }
}

/// Chunks containing `query` (case-insensitive), in document order, up to `top_k`.
pub fn substring_search(query: &str, chunks: &[DocumentChunk], top_k: usize) -> Vec<String> {
    let needle = query.to_lowercase();
    chunks
        .iter()
        .filter(|c| c.content.to_lowercase().contains(&needle))
        .take(top_k)
        .map(|c| c.content.clone())
        .collect()
}

impl<D: DocumentRepository, E: Embedder> RetrievalService for DocumentRetriever<D, E> {
    async fn search(&self, query: &RetrievalQuery) -> Result<Vec<String>, RetrievalError> {
        if query.document_ids.is_empty() || query.top_k == 0 {
            return Ok(Vec::new());
        }

        let chunks = self
            .documents
            .list_chunks(&query.document_ids)
            .await
            .map_err(|e| RetrievalError::Storage(e.to_string()))?;

        if let Some(passages) = self.vector_search(query, &chunks).await {
            tracing::debug!(passages = passages.len(), "vector search");
            return Ok(passages);
        }

        let passages = substring_search(&query.query, &chunks, query.top_k);
        tracing::debug!(passages = passages.len(), "substring search");
        Ok(passages)
    }
}
