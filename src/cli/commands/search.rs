//! Search command: rank stored chunks against a query.

use anyhow::{Context, Result, bail};
use serde_json::json;

use super::{build_gateway, open_store};
use crate::cli::table::{new_table, one_line};
use crate::config::Settings;
use crate::storage::{ChunkStore, SearchHit};

pub fn run(query: &str, limit: usize, threshold: f32, text: bool, json: bool, settings: &Settings) -> Result<()> {
    let store = open_store(settings)?;

    let hits = if text {
        store.search_text(query, limit)?
    } else {
        let Some(gateway) = build_gateway(settings)? else {
            bail!("Embedding provider is 'none'; use --text for keyword search");
        };
        let vector = gateway
            .generate(query)
            .context("Failed to embed query")?;
        store.search_similar(&vector, limit, threshold)?
    };

    if json {
        let results: Vec<_> = hits.iter().map(hit_json).collect();
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if hits.is_empty() {
        eprintln!("No results found.");
        return Ok(());
    }

    let mut table = new_table(["Score", "Document", "#", "Content"]);
    for hit in &hits {
        table.add_row(vec![
            format!("{:.3}", hit.score),
            hit.chunk.document_id.clone(),
            hit.chunk.chunk_index.to_string(),
            one_line(&hit.chunk.content, 80),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Search result without the stored vectors.
fn hit_json(hit: &SearchHit) -> serde_json::Value {
    json!({
        "score": hit.score,
        "document_id": hit.chunk.document_id,
        "chunk_id": hit.chunk.chunk_id,
        "chunk_index": hit.chunk.chunk_index,
        "content_type": hit.chunk.content_type,
        "content": hit.chunk.content,
        "schema_matches": hit.chunk.extracted_metadata.extraction.schema_matches,
    })
}
