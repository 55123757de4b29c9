//! Chunk command: split one file and print the chunks.

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::table::{new_table, one_line};
use crate::config::Settings;
use crate::documents::{ChunkConfig, Chunker, ParagraphChunker, load_file};

/// CLI overrides for the configured chunk sizes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SizeOverrides {
    pub max: Option<usize>,
    pub min: Option<usize>,
    pub overlap: Option<usize>,
}

impl SizeOverrides {
    pub fn apply(&self, mut config: ChunkConfig) -> ChunkConfig {
        if let Some(max) = self.max {
            config.max_chunk_size = max;
        }
        if let Some(min) = self.min {
            config.min_chunk_size = min;
        }
        if let Some(overlap) = self.overlap {
            config.overlap_size = overlap;
        }
        config
    }
}

pub fn run(file: &Path, sizes: SizeOverrides, json: bool, settings: &Settings) -> Result<()> {
    let config = sizes.apply(settings.chunking.clone());
    let loaded = load_file(file, settings.processing.max_file_size)?;

    let chunks = ParagraphChunker::new()
        .chunk(&loaded.content, &loaded.document_id, &config)
        .context("Invalid chunk sizes")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }

    if chunks.is_empty() {
        eprintln!("No chunks produced from {}", file.display());
        return Ok(());
    }

    let mut table = new_table(["#", "Id", "Type", "Chars", "Words", "Preview"]);
    for chunk in &chunks {
        table.add_row(vec![
            chunk.chunk_index.to_string(),
            chunk.chunk_id.clone(),
            chunk.content_type.to_string(),
            chunk.char_count().to_string(),
            chunk.chunk_metadata.word_count.to_string(),
            one_line(&chunk.content, 60),
        ]);
    }
    println!("{table}");
    println!(
        "{} chunks from {} (document {})",
        chunks.len(),
        loaded.filename,
        loaded.document_id
    );
    Ok(())
}
