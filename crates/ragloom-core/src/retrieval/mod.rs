//! RetrievalService trait definition.

use ragloom_types::error::RetrievalError;
use ragloom_types::llm::RetrievalQuery;

/// Trait for document retrieval used by KnowledgeBase nodes.
///
/// Implementations should degrade to a non-vector search rather than fail
/// when no credential or embeddings are available.
pub trait RetrievalService: Send + Sync {
    /// Return up to `query.top_k` passages, best first.
    fn search(
        &self,
        query: &RetrievalQuery,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RetrievalError>> + Send;
}
