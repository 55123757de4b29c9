//! Command implementations for the CLI.
//!
//! Each command group is implemented in its own module. The helpers here turn
//! settings into the registry, gateway and store the commands share.

pub mod chunk;
pub mod documents;
pub mod extract;
pub mod init;
pub mod process;
pub mod schemas;
pub mod search;

use crate::config::{EmbeddingProvider, Settings};
use crate::embedding::{EmbeddingGateway, LocalGateway, OpenAiGateway};
use crate::pipeline::DocumentPipeline;
use crate::schema::SchemaRegistry;
use crate::storage::TantivyChunkStore;
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use walkdir::WalkDir;

/// Load the schema registry from the configured directory.
///
/// A missing directory yields an empty registry with a warning, so chunking
/// and analysis still work without schemas.
pub fn load_registry(settings: &Settings) -> Result<Arc<SchemaRegistry>> {
    let dir = settings.schema_dir();
    if !dir.exists() {
        tracing::warn!(target: "cli", "schema directory {} not found; no schemas loaded", dir.display());
        return Ok(Arc::new(SchemaRegistry::empty()));
    }
    let registry = SchemaRegistry::load(&dir)
        .with_context(|| format!("Failed to load schemas from {}", dir.display()))?;
    Ok(Arc::new(registry))
}

/// Gateway for the configured provider, or `None` when embeddings are off.
pub fn build_gateway(settings: &Settings) -> Result<Option<Arc<dyn EmbeddingGateway>>> {
    let config = &settings.embedding;
    let gateway: Arc<dyn EmbeddingGateway> = match config.provider {
        EmbeddingProvider::None => return Ok(None),
        EmbeddingProvider::OpenAi => Arc::new(
            OpenAiGateway::from_env(
                &config.base_url,
                &config.model,
                config.dimension,
                Duration::from_secs(config.timeout_secs),
                config.max_retries,
            )
            .context("Failed to create OpenAI embedding gateway")?,
        ),
        EmbeddingProvider::Local => Arc::new(
            LocalGateway::new(&config.local_model, config.cache_dir.clone())
                .context("Failed to load local embedding model")?,
        ),
    };
    tracing::info!(
        target: "cli",
        "embedding with {} ({} dimensions)",
        gateway.model_name(),
        gateway.dimension()
    );
    Ok(Some(gateway))
}

/// Pipeline configured from settings, optionally with a gateway.
pub fn build_pipeline(
    settings: &Settings,
    registry: Arc<SchemaRegistry>,
    gateway: Option<Arc<dyn EmbeddingGateway>>,
) -> Result<DocumentPipeline> {
    let mut builder = DocumentPipeline::builder(registry)
        .chunk_config(settings.chunking.clone())
        .extraction_options(settings.extraction.options.clone())
        .dimension(settings.embedding.dimension)
        .default_schemas(settings.extraction.default_schemas.clone());
    if let Some(gateway) = gateway {
        builder = builder.gateway(gateway);
    }
    builder.build().context("Invalid pipeline configuration")
}

pub fn open_store(settings: &Settings) -> Result<TantivyChunkStore> {
    let path = settings.index_path();
    TantivyChunkStore::open(&path)
        .with_context(|| format!("Failed to open document index at {}", path.display()))
}

/// Expand directories into the files below them, keeping plain files as given.
pub fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(
                WalkDir::new(path)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()))
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.file_type().is_file())
                    .map(|entry| entry.into_path()),
            );
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}
