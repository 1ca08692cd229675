//! GenerationService trait definition.
//!
//! The engine only sees the contract: a request with query, context, prompt
//! override, web-search flag, credential and model id goes in; text plus
//! sources come out. Provider routing, prompt assembly and HTTP live in
//! ragloom-infra.

use ragloom_types::error::GenerationError;
use ragloom_types::llm::{Generation, GenerationRequest};

/// Trait for generation backends used by LlmEngine nodes.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait GenerationService: Send + Sync {
    /// Produce a response for `request`.
    ///
    /// Fails with `GenerationError::MissingCredential` when the model needs
    /// a key and none was supplied.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl std::future::Future<Output = Result<Generation, GenerationError>> + Send;
}
