//! CLI document subcommands: add, list, inspect, re-embed and delete
//! knowledge-base documents.

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use secrecy::SecretString;

use ragloom_core::repository::document::DocumentRepository;

use crate::state::AppState;

#[derive(Subcommand)]
pub enum DocumentCommand {
    /// Add a text document; its chunks become searchable by KnowledgeBase nodes.
    Add {
        /// Path to the file.
        file: PathBuf,

        /// Gemini API key used to embed the chunks (text search only without one).
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        embedding_key: Option<String>,
    },

    /// List stored documents.
    List,

    /// Show a document's metadata and the start of its text.
    Show {
        /// Document ID.
        id: i64,
    },

    /// Re-chunk a stored document and embed every chunk.
    Embed {
        /// Document ID.
        id: i64,

        /// Gemini API key used to embed the chunks.
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        embedding_key: Option<String>,
    },

    /// Delete a document, its chunks and its stored file.
    Delete {
        /// Document ID.
        id: i64,
    },
}

/// Characters of extracted text shown by `document show`.
const PREVIEW_CHARS: usize = 400;

pub async fn handle_document_command(
    cmd: DocumentCommand,
    state: &AppState,
    json: bool,
) -> Result<()> {
    match cmd {
        DocumentCommand::Add {
            file,
            embedding_key,
        } => {
            let key = embedding_key
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from);
            let doc = state
                .indexer
                .add_file(&file, key.as_ref())
                .await
                .map_err(|e| anyhow::anyhow!("Failed to add {}: {e}", file.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                println!();
                println!(
                    "  {} Added '{}' as document {}",
                    style("*").green().bold(),
                    style(&doc.original_name).cyan(),
                    style(doc.id).bold()
                );
                println!(
                    "  Embeddings: {}",
                    if doc.embeddings_generated { "yes" } else { "no (text search)" }
                );
                println!(
                    "  Reference it from a KnowledgeBase node: {}",
                    style(format!("\"documentIds\": [{}]", doc.id)).dim()
                );
                println!();
            }
        }

        DocumentCommand::List => {
            let docs = state
                .document_repo
                .list_documents()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to list documents: {e}"))?;

            if json {
                // Extracted text can be large; list only metadata.
                let out: Vec<_> = docs
                    .iter()
                    .map(|d| {
                        serde_json::json!({
                            "id": d.id,
                            "name": d.original_name,
                            "mime_type": d.mime_type,
                            "file_size": d.file_size,
                            "embeddings_generated": d.embeddings_generated,
                            "uploaded_at": d.uploaded_at.to_rfc3339(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
                return Ok(());
            }

            if docs.is_empty() {
                println!();
                println!("  No documents stored.");
                println!("  Add one with: {}", style("ragloom document add <file>").dim());
                println!();
                return Ok(());
            }

            let mut table = Table::new();
            table
                .load_preset(presets::UTF8_FULL_CONDENSED)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    Cell::new("ID").fg(Color::Cyan),
                    Cell::new("Name"),
                    Cell::new("Type"),
                    Cell::new("Size"),
                    Cell::new("Embedded"),
                    Cell::new("Uploaded"),
                ]);
            for d in &docs {
                table.add_row(vec![
                    Cell::new(d.id),
                    Cell::new(&d.original_name),
                    Cell::new(&d.mime_type),
                    Cell::new(d.file_size),
                    Cell::new(if d.embeddings_generated { "yes" } else { "no" }),
                    Cell::new(d.uploaded_at.format("%Y-%m-%d %H:%M").to_string()),
                ]);
            }
            println!();
            println!("{table}");
            println!();
        }

        DocumentCommand::Show { id } => {
            let doc = state
                .document_repo
                .get_document(id)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to load document: {e}"))?
                .ok_or_else(|| anyhow::anyhow!("Document {id} not found"))?;
            let chunks = state
                .document_repo
                .list_chunks(&[id])
                .await
                .map_err(|e| anyhow::anyhow!("Failed to load chunks: {e}"))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&doc)?);
                return Ok(());
            }

            let text = doc.extracted_text.as_deref().unwrap_or("");
            let preview: String = text.chars().take(PREVIEW_CHARS).collect();
            println!();
            println!("  {} {}", style(&doc.original_name).cyan().bold(), style(format!("#{}", doc.id)).dim());
            println!("  Type:       {}", doc.mime_type);
            println!("  Size:       {} bytes", doc.file_size);
            println!("  Stored as:  {}", doc.filename);
            println!("  Uploaded:   {}", doc.uploaded_at.format("%Y-%m-%d %H:%M:%S"));
            println!(
                "  Chunks:     {} ({} embedded)",
                chunks.len(),
                chunks.iter().filter(|c| c.embedding.is_some()).count()
            );
            println!();
            println!("{}", style(preview).dim());
            if text.chars().count() > PREVIEW_CHARS {
                println!("{}", style("...").dim());
            }
            println!();
        }

        DocumentCommand::Embed { id, embedding_key } => {
            let key = embedding_key
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from)
                .ok_or_else(|| {
                    anyhow::anyhow!("An embedding key is required (--embedding-key or GEMINI_API_KEY)")
                })?;
            let doc = state
                .indexer
                .reembed(id, &key)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to embed document {id}: {e}"))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else if doc.embeddings_generated {
                println!();
                println!(
                    "  {} Embedded '{}'",
                    style("*").green().bold(),
                    style(&doc.original_name).cyan()
                );
                println!();
            } else {
                println!();
                println!(
                    "  {} Some chunks of '{}' could not be embedded; text search still applies.",
                    style("!").yellow().bold(),
                    style(&doc.original_name).cyan()
                );
                println!();
            }
        }

        DocumentCommand::Delete { id } => {
            let doc = state
                .indexer
                .delete(id)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to delete document {id}: {e}"))?;

            if json {
                println!("{}", serde_json::json!({"deleted": true, "id": id}));
            } else {
                println!();
                println!(
                    "  {} Deleted document '{}'",
                    style("*").green().bold(),
                    style(&doc.original_name).cyan()
                );
                println!();
            }
        }
    }

    Ok(())
}
