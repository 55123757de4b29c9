//! Extract command: run schema extraction over one file.

use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;

use super::{build_pipeline, load_registry};
use crate::config::Settings;
use crate::documents::load_file;

pub fn run(
    file: &Path,
    schemas: &[String],
    threshold: Option<f64>,
    per_chunk: bool,
    settings: &Settings,
) -> Result<()> {
    let mut settings = settings.clone();
    if let Some(threshold) = threshold {
        settings.extraction.options.confidence_threshold = threshold;
    }

    let registry = load_registry(&settings)?;
    let pipeline = build_pipeline(&settings, registry, None)?;
    let loaded = load_file(file, settings.processing.max_file_size)?;
    let processed = pipeline
        .process(&loaded.document_id, &loaded.content, schemas)
        .with_context(|| format!("Failed to process {}", file.display()))?;

    let output = if per_chunk {
        let chunks: Vec<_> = processed
            .chunks
            .iter()
            .map(|c| {
                json!({
                    "chunk_id": c.chunk.chunk_id,
                    "chunk_index": c.chunk.chunk_index,
                    "extraction": c.extracted_metadata.extraction,
                    "text_analysis": c.extracted_metadata.text_analysis,
                    "content_insights": c.extracted_metadata.content_insights,
                    "error": c.extracted_metadata.error,
                })
            })
            .collect();
        json!({
            "document_id": processed.document_id,
            "filename": loaded.filename,
            "chunks": chunks,
            "metadata": processed.metadata,
        })
    } else {
        let matches: Vec<_> = processed
            .chunks
            .iter()
            .filter(|c| !c.extracted_metadata.extraction.schema_matches.is_empty())
            .map(|c| {
                json!({
                    "chunk_index": c.chunk.chunk_index,
                    "schema_matches": c.extracted_metadata.extraction.schema_matches,
                })
            })
            .collect();
        json!({
            "document_id": processed.document_id,
            "filename": loaded.filename,
            "schema_matches": matches,
            "metadata": processed.metadata,
        })
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
