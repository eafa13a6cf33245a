//! Knowledge base CLI commands.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde_json::Value;

use crate::cli::output::{list_table, output, render_list, truncate, CommandOutput};
use crate::domain::models::{Metadata, RetrievalResult};
use crate::infrastructure::AppContext;

#[derive(Args, Debug)]
pub struct KnowledgeArgs {
    #[command(subcommand)]
    pub command: KnowledgeCommands,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeCommands {
    /// Ingest a document, replacing any previous version
    Ingest {
        /// Document identifier
        document_id: String,
        /// Knowledge base the document belongs to
        #[arg(short, long)]
        kb: String,
        /// Read content from a file
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,
        /// Inline content
        #[arg(short, long)]
        text: Option<String>,
        /// Extra metadata (format: "key=value")
        #[arg(short, long)]
        meta: Vec<String>,
    },
    /// Delete every chunk of a document
    Delete {
        /// Document identifier
        document_id: String,
    },
    /// Search documents by similarity
    Search {
        /// Query text
        query: String,
        /// Maximum number of documents
        #[arg(short, long, default_value = "5")]
        limit: usize,
        /// Restrict to these knowledge bases
        #[arg(long)]
        kb: Vec<String>,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct IngestOutput {
    pub document_id: String,
    pub knowledge_base_id: String,
    pub chunks: usize,
}

impl CommandOutput for IngestOutput {
    fn to_human(&self) -> String {
        format!(
            "Ingested {} into {} ({} chunk{})",
            self.document_id,
            self.knowledge_base_id,
            self.chunks,
            if self.chunks == 1 { "" } else { "s" }
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct DeleteOutput {
    pub document_id: String,
    pub chunks_removed: usize,
}

impl CommandOutput for DeleteOutput {
    fn to_human(&self) -> String {
        if self.chunks_removed == 0 {
            format!("No chunks stored for {}", self.document_id)
        } else {
            format!("Deleted {} chunk(s) of {}", self.chunks_removed, self.document_id)
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct SearchOutput {
    pub query: String,
    pub results: Vec<RetrievalResult>,
}

impl CommandOutput for SearchOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["document", "knowledge base", "similarity", "chunks", "content"]);
        for result in &self.results {
            table.add_row(vec![
                result.document_id.clone(),
                result.knowledge_base_id().unwrap_or("-").to_string(),
                format!("{:.3}", result.similarity),
                result.chunk_count.to_string(),
                truncate(&result.content.replace('\n', " "), 60),
            ]);
        }
        render_list("document", &table, self.results.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Parse "key=value" pairs. Values that parse as JSON keep their type.
fn parse_metadata(pairs: &[String]) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid metadata '{pair}', expected key=value");
        };
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
        metadata.insert(key.trim().to_string(), value);
    }
    Ok(metadata)
}

pub async fn execute(args: KnowledgeArgs, context: &AppContext, json_mode: bool) -> Result<()> {
    let store = &context.knowledge;

    match args.command {
        KnowledgeCommands::Ingest {
            document_id,
            kb,
            file,
            text,
            meta,
        } => {
            let mut metadata = parse_metadata(&meta)?;
            let content = match (file, text) {
                (Some(path), _) => {
                    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                        metadata
                            .entry("title")
                            .or_insert_with(|| Value::from(name));
                    }
                    tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?
                }
                (None, Some(text)) => text,
                (None, None) => bail!("Provide the document content with --file or --text"),
            };

            let chunks = store
                .try_ingest(&document_id, &kb, &content, metadata)
                .await?;
            output(
                &IngestOutput {
                    document_id,
                    knowledge_base_id: kb,
                    chunks,
                },
                json_mode,
            );
        }

        KnowledgeCommands::Delete { document_id } => {
            let chunks_removed = store.try_delete(&document_id).await?;
            output(
                &DeleteOutput {
                    document_id,
                    chunks_removed,
                },
                json_mode,
            );
        }

        KnowledgeCommands::Search { query, limit, kb } => {
            let results = store.try_search(&query, limit, &kb).await?;
            output(&SearchOutput { query, results }, json_mode);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metadata() {
        let metadata = parse_metadata(&[
            "title=Handbook".to_string(),
            "year=2024".to_string(),
            "draft=false".to_string(),
        ])
        .unwrap();
        assert_eq!(metadata["title"], Value::from("Handbook"));
        assert_eq!(metadata["year"], Value::from(2024));
        assert_eq!(metadata["draft"], Value::from(false));

        assert!(parse_metadata(&["novalue".to_string()]).is_err());
    }

    #[test]
    fn test_search_output_human() {
        let out = SearchOutput {
            query: "q".to_string(),
            results: vec![],
        };
        assert_eq!(out.to_human(), "No documents found.");
    }
}
