//! System prompt assembly.

/// Prompt used when an LlmEngine node has no custom prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

fn present(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

/// Build the system prompt from an optional override plus document and web context.
///
/// Blank values count as absent.
pub fn build_system_prompt(
    custom_prompt: Option<&str>,
    document_context: Option<&str>,
    web_context: Option<&str>,
) -> String {
    let mut prompt = present(custom_prompt)
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
        .to_string();

    let document_context = present(document_context);
    let web_context = present(web_context);
    if document_context.is_none() && web_context.is_none() {
        return prompt;
    }

    prompt.push_str("\n\nAdditional Context:\n");
    if let Some(ctx) = document_context {
        prompt.push_str(&format!("Document Context: {ctx}\n"));
    }
    if let Some(ctx) = web_context {
        prompt.push_str(&format!("Web Search Results: {ctx}\n"));
    }
    prompt.push_str("\nUse this context to provide accurate and relevant responses.");
    prompt
}
