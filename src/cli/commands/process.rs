//! Process command: ingest files into the document index.

use anyhow::{Result, bail};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::{build_gateway, build_pipeline, collect_files, load_registry, open_store};
use crate::cli::table::new_table;
use crate::config::Settings;
use crate::pipeline::{BatchOptions, FileOutcome, process_files};
use crate::storage::ChunkStore;

/// Flags for one `process` invocation.
#[derive(Debug, Clone, Default)]
pub struct ProcessArgs {
    pub paths: Vec<PathBuf>,
    pub schemas: Vec<String>,
    pub no_embed: bool,
    pub concurrency: Option<usize>,
    pub timeout: Option<u64>,
}

pub async fn run(args: ProcessArgs, settings: &Settings) -> Result<()> {
    let files = collect_files(&args.paths);
    if files.is_empty() {
        bail!("No files to process");
    }

    let registry = load_registry(settings)?;

    if args.no_embed {
        return run_without_storage(&files, &args.schemas, settings, registry);
    }

    let Some(gateway) = build_gateway(settings)? else {
        bail!("Embedding provider is 'none'; stored chunks need embeddings. Use --no-embed to process without storing");
    };
    let pipeline = Arc::new(build_pipeline(settings, registry, Some(gateway))?);
    let store: Arc<dyn ChunkStore> = Arc::new(open_store(settings)?);

    let options = BatchOptions {
        concurrency: args.concurrency.unwrap_or(settings.processing.concurrency),
        document_timeout: Duration::from_secs(
            args.timeout.unwrap_or(settings.processing.document_timeout_secs),
        ),
        max_file_size: settings.processing.max_file_size,
        schemas: args.schemas,
    };

    let report = process_files(pipeline, store, files, options).await;

    let mut table = new_table(["File", "Document", "Status", "Chunks", "Rejected / Error"]);
    for outcome in &report.outcomes {
        match outcome {
            FileOutcome::Stored(stored) => table.add_row(vec![
                stored.filename.clone(),
                stored.document_id.clone(),
                stored.status.to_string(),
                stored.stored_chunks.to_string(),
                stored.rejected.len().to_string(),
            ]),
            FileOutcome::Failed { path, error } => table.add_row(vec![
                path.display().to_string(),
                String::new(),
                "failed".to_string(),
                String::new(),
                error.to_string(),
            ]),
        };
    }
    println!("{table}");
    println!("{} stored, {} failed", report.stored(), report.failed());

    if report.stored() == 0 {
        bail!("No documents were stored");
    }
    Ok(())
}

fn run_without_storage(
    files: &[PathBuf],
    schemas: &[String],
    settings: &Settings,
    registry: Arc<crate::schema::SchemaRegistry>,
) -> Result<()> {
    let pipeline = build_pipeline(settings, registry, None)?;
    let mut documents = Vec::with_capacity(files.len());

    for path in files {
        match pipeline.process_file(path, settings.processing.max_file_size, schemas) {
            Ok((record, processed)) => documents.push(json!({
                "document_id": record.document_id,
                "filename": record.filename,
                "file_type": record.file_type,
                "total_chunks": processed.chunks.len(),
                "failed_chunks": processed.failed_chunks(),
                "metadata": processed.metadata,
            })),
            Err(e) => {
                tracing::warn!(target: "cli", "failed {}: {e}", path.display());
                documents.push(json!({
                    "filename": path.display().to_string(),
                    "error": e.to_string(),
                }));
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&documents)?);
    Ok(())
}
