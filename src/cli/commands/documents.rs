//! Documents management command.

use anyhow::{Result, bail};

use super::open_store;
use crate::cli::DocumentAction;
use crate::cli::table::{new_table, one_line};
use crate::config::Settings;
use crate::storage::ChunkStore;
use crate::utils::display_timestamp;

/// Run documents management command.
pub fn run(action: DocumentAction, settings: &Settings) -> Result<()> {
    let store = open_store(settings)?;

    match action {
        DocumentAction::List { json } => {
            let documents = store.list_documents()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&documents)?);
            } else if documents.is_empty() {
                eprintln!("No documents stored.");
            } else {
                let mut table = new_table(["Id", "File", "Type", "Status", "Chunks", "Created"]);
                for doc in &documents {
                    let chunks = doc
                        .metadata
                        .as_ref()
                        .map_or_else(String::new, |m| m.total_chunks.to_string());
                    table.add_row(vec![
                        doc.document_id.clone(),
                        doc.filename.clone(),
                        doc.file_type.clone(),
                        doc.status.to_string(),
                        chunks,
                        display_timestamp(&doc.created_at),
                    ]);
                }
                println!("{table}");
            }
        }

        DocumentAction::Show { id, chunks } => {
            let Some(document) = store.get_document(&id)? else {
                bail!("Document '{id}' not found");
            };
            println!("{}", serde_json::to_string_pretty(&document)?);

            if chunks {
                let mut table = new_table(["#", "Type", "Chars", "Content"]);
                for chunk in store.document_chunks(&id)? {
                    table.add_row(vec![
                        chunk.chunk_index.to_string(),
                        chunk.content_type.to_string(),
                        chunk.content.chars().count().to_string(),
                        one_line(&chunk.content, 80),
                    ]);
                }
                println!("{table}");
            }
        }

        DocumentAction::Delete { id } => {
            if store.delete_document(&id)? {
                println!("Deleted document {id}");
            } else {
                bail!("Document '{id}' not found");
            }
        }
    }

    Ok(())
}
