//! Document retrieval: chunking, Gemini embeddings, search and ingestion.

pub mod chunker;
pub mod embedding;
pub mod indexer;
pub mod search;
