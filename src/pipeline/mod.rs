//! Document pipeline: chunk, extract, embed, aggregate, store.
//!
//! All collaborators (schema registry, embedding gateway, store) are passed in
//! explicitly. Extraction fans out over chunks with rayon; each chunk owns its
//! input, so the work shares nothing but the read-only registry.

pub mod batch;

pub use batch::{BatchOptions, BatchReport, FileOutcome, process_files};

use crate::documents::analysis::analyze;
use crate::documents::loader::{LoadError, load_file};
use crate::documents::{
    Chunk, ChunkConfig, ChunkConfigError, Chunker, ContentType, ConvertedContent, ExternalChunk,
    ParagraphChunker,
};
use crate::embedding::{DEFAULT_DIMENSION, EmbeddingGateway, embed_chunk};
use crate::extraction::{
    DEFAULT_SCHEMAS, ExtractionError, ExtractionOptions, FieldExtractor, MetadataExtractor,
    StrategyTable,
};
use crate::metadata::{DocumentMetadata, ProcessedChunk, aggregate};
use crate::schema::SchemaRegistry;
use crate::storage::{ChunkStore, DocumentRecord, DocumentStatus, RejectedChunk, StorageBatch, StorageError};
use indexmap::IndexMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid chunk configuration: {0}")]
    Config(#[from] ChunkConfigError),

    #[error("Invalid extraction options: {0}")]
    Options(#[from] ExtractionError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Document '{0}' produced no chunks")]
    NoChunks(String),

    #[error("Timed out after {secs}s processing {}", path.display())]
    Timeout { path: PathBuf, secs: u64 },

    #[error("Processing of document '{0}' was cancelled before storage")]
    Cancelled(String),

    #[error("Worker task failed: {0}")]
    Task(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum CancelState {
    #[default]
    Running,
    Cancelled,
    Committed,
}

/// Cancellation shared between a document being processed and its supervisor.
///
/// The worker claims the store step with a commit; after that a cancel has no
/// effect. A cancel that wins makes the worker record the document as failed
/// instead of storing it.
#[derive(Debug, Default)]
pub struct Cancellation {
    state: Mutex<CancelState>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel unless storage has already begun. Returns whether the cancel took effect.
    pub fn cancel(&self) -> bool {
        let mut state = self.state.lock();
        if *state == CancelState::Committed {
            return false;
        }
        *state = CancelState::Cancelled;
        true
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.lock() == CancelState::Cancelled
    }

    /// Claim the store step. Fails once cancelled.
    fn commit(&self) -> bool {
        let mut state = self.state.lock();
        if *state == CancelState::Cancelled {
            return false;
        }
        *state = CancelState::Committed;
        true
    }
}

/// Chunks of one document with their document-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedDocument {
    pub document_id: String,
    pub chunks: Vec<ProcessedChunk>,
    pub metadata: DocumentMetadata,
}

impl ProcessedDocument {
    pub fn failed_chunks(&self) -> usize {
        self.chunks
            .iter()
            .filter(|c| !c.extracted_metadata.is_success())
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExternalSummary {
    pub total_chunks: usize,
    pub processed_chunks: usize,
    pub failed_chunks: usize,
}

/// Result of processing externally chunked input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalBatch {
    pub documents: Vec<ProcessedDocument>,
    pub summary: ExternalSummary,
}

/// Outcome of handing one document to a store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreReport {
    pub document_id: String,
    pub filename: String,
    pub status: DocumentStatus,
    pub stored_chunks: usize,
    pub rejected: Vec<RejectedChunk>,
}

pub struct DocumentPipelineBuilder {
    registry: Arc<SchemaRegistry>,
    chunker: Box<dyn Chunker>,
    chunk_config: ChunkConfig,
    options: ExtractionOptions,
    strategies: Option<StrategyTable>,
    gateway: Option<Arc<dyn EmbeddingGateway>>,
    dimension: Option<usize>,
    default_schemas: Vec<String>,
}

impl DocumentPipelineBuilder {
    pub fn chunker(mut self, chunker: Box<dyn Chunker>) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn chunk_config(mut self, config: ChunkConfig) -> Self {
        self.chunk_config = config;
        self
    }

    pub fn extraction_options(mut self, options: ExtractionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn strategies(mut self, strategies: StrategyTable) -> Self {
        self.strategies = Some(strategies);
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn EmbeddingGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Dimension every stored vector must have. Defaults to the gateway's.
    pub fn dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn default_schemas(mut self, schemas: Vec<String>) -> Self {
        if !schemas.is_empty() {
            self.default_schemas = schemas;
        }
        self
    }

    pub fn build(self) -> PipelineResult<DocumentPipeline> {
        self.chunk_config.validate()?;
        self.options.validate()?;

        let dimension = self
            .dimension
            .or_else(|| self.gateway.as_ref().map(|g| g.dimension()))
            .unwrap_or(DEFAULT_DIMENSION);
        if let Some(gateway) = self.gateway.as_ref().filter(|g| g.dimension() != dimension) {
            tracing::warn!(
                target: "pipeline",
                "gateway '{}' produces {} dimensions but {dimension} are required; its vectors will be rejected",
                gateway.model_name(),
                gateway.dimension()
            );
        }

        let extractor = match self.strategies {
            Some(table) => FieldExtractor::with_strategies(self.registry, table),
            None => FieldExtractor::new(self.registry),
        };

        Ok(DocumentPipeline {
            chunker: self.chunker,
            chunk_config: self.chunk_config,
            extractor: MetadataExtractor::new(extractor, self.options),
            gateway: self.gateway,
            dimension,
            default_schemas: self.default_schemas,
        })
    }
}

pub struct DocumentPipeline {
    chunker: Box<dyn Chunker>,
    chunk_config: ChunkConfig,
    extractor: MetadataExtractor,
    gateway: Option<Arc<dyn EmbeddingGateway>>,
    dimension: usize,
    default_schemas: Vec<String>,
}

impl std::fmt::Debug for DocumentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentPipeline")
            .field("chunk_config", &self.chunk_config)
            .field("options", self.extractor.options())
            .field("gateway", &self.gateway.as_ref().map(|g| g.model_name().to_string()))
            .field("dimension", &self.dimension)
            .field("default_schemas", &self.default_schemas)
            .finish()
    }
}

impl DocumentPipeline {
    pub fn builder(registry: Arc<SchemaRegistry>) -> DocumentPipelineBuilder {
        DocumentPipelineBuilder {
            registry,
            chunker: Box::new(ParagraphChunker::new()),
            chunk_config: ChunkConfig::default(),
            options: ExtractionOptions::default(),
            strategies: None,
            gateway: None,
            dimension: None,
            default_schemas: DEFAULT_SCHEMAS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn chunk_config(&self) -> &ChunkConfig {
        &self.chunk_config
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn has_gateway(&self) -> bool {
        self.gateway.is_some()
    }

    pub fn registry(&self) -> &SchemaRegistry {
        self.extractor.field_extractor().registry()
    }

    fn resolve_schemas<S: AsRef<str>>(&self, schemas: &[S]) -> Vec<String> {
        if schemas.is_empty() {
            self.default_schemas.clone()
        } else {
            schemas.iter().map(|s| s.as_ref().to_string()).collect()
        }
    }

    /// Chunk `content` and run extraction and embedding on every chunk.
    pub fn process<S: AsRef<str>>(
        &self,
        document_id: &str,
        content: &ConvertedContent,
        schemas: &[S],
    ) -> PipelineResult<ProcessedDocument> {
        let schemas = self.resolve_schemas(schemas);
        let chunks = self.chunker.chunk(content, document_id, &self.chunk_config)?;
        tracing::info!(
            target: "pipeline",
            "document {document_id}: {} chunks, schemas [{}]",
            chunks.len(),
            schemas.join(", ")
        );

        Ok(self.process_chunks(document_id, chunks, &schemas))
    }

    fn process_chunks(&self, document_id: &str, chunks: Vec<Chunk>, schemas: &[String]) -> ProcessedDocument {
        let processed: Vec<ProcessedChunk> = chunks
            .into_par_iter()
            .map(|chunk| self.process_chunk(chunk, schemas))
            .collect();
        let metadata = aggregate(&processed);

        ProcessedDocument {
            document_id: document_id.to_string(),
            chunks: processed,
            metadata,
        }
    }

    pub fn process_chunk(&self, chunk: Chunk, schemas: &[String]) -> ProcessedChunk {
        let extracted = self.extractor.extract_metadata(&chunk.content, schemas);
        if let Some(error) = &extracted.error {
            tracing::warn!(target: "pipeline", "chunk {}: {error}", chunk.chunk_id);
        }

        let embeddings = match &self.gateway {
            Some(gateway) => embed_chunk(
                gateway.as_ref(),
                &chunk.content,
                &extracted.extraction,
                self.dimension,
            ),
            None => Default::default(),
        };

        ProcessedChunk::new(chunk, extracted).with_embeddings(embeddings)
    }

    /// Process chunks produced by an external chunker, grouped by document
    /// in first-seen order.
    pub fn process_external<S: AsRef<str>>(&self, inputs: &[ExternalChunk], schemas: &[S]) -> ExternalBatch {
        let schemas = self.resolve_schemas(schemas);

        let mut groups: IndexMap<&str, Vec<&ExternalChunk>> = IndexMap::new();
        for input in inputs {
            groups.entry(input.document_id.as_str()).or_default().push(input);
        }

        let mut summary = ExternalSummary {
            total_chunks: inputs.len(),
            ..Default::default()
        };
        let mut documents = Vec::with_capacity(groups.len());

        for (document_id, group) in groups {
            let chunks: Vec<Chunk> = group
                .into_iter()
                .enumerate()
                .map(|(i, input)| external_to_chunk(input, i as u32))
                .collect();
            let processed = self.process_chunks(document_id, chunks, &schemas);

            let failed = processed.failed_chunks();
            summary.failed_chunks += failed;
            summary.processed_chunks += processed.chunks.len() - failed;
            documents.push(processed);
        }

        tracing::info!(
            target: "pipeline",
            "external batch: {} chunks across {} documents, {} failed",
            summary.total_chunks,
            documents.len(),
            summary.failed_chunks
        );

        ExternalBatch { documents, summary }
    }

    /// Hand a processed document to `store`, replacing any earlier version.
    ///
    /// Chunks without a valid primary embedding are left out. When nothing is
    /// storable the document is recorded as failed and the error returned.
    pub fn store(
        &self,
        store: &dyn ChunkStore,
        mut record: DocumentRecord,
        processed: &ProcessedDocument,
    ) -> PipelineResult<StoreReport> {
        if processed.chunks.is_empty() {
            record.mark_failed("document produced no chunks");
            store.upsert_document(&record)?;
            return Err(PipelineError::NoChunks(record.document_id));
        }

        let batch = match StorageBatch::prepare(&processed.chunks, self.dimension) {
            Ok(batch) => batch,
            Err(e) => {
                record.mark_failed(e.to_string());
                store.upsert_document(&record)?;
                return Err(e.into());
            }
        };

        record.mark_completed(processed.metadata.clone());
        store.replace_document(&record, &batch.accepted)?;

        Ok(StoreReport {
            document_id: record.document_id,
            filename: record.filename,
            status: record.status,
            stored_chunks: batch.accepted.len(),
            rejected: batch.rejected,
        })
    }

    /// Load and process one file.
    pub fn process_file<S: AsRef<str>>(
        &self,
        path: &Path,
        max_file_size: u64,
        schemas: &[S],
    ) -> PipelineResult<(DocumentRecord, ProcessedDocument)> {
        let loaded = load_file(path, max_file_size)?;
        let record = DocumentRecord::new(
            loaded.document_id.clone(),
            loaded.filename.clone(),
            loaded.kind.label(),
            loaded.file_size,
        );
        let processed = self.process(&loaded.document_id, &loaded.content, schemas)?;
        Ok((record, processed))
    }

    /// Load, process and store one file.
    pub fn ingest_file<S: AsRef<str>>(
        &self,
        store: &dyn ChunkStore,
        path: &Path,
        max_file_size: u64,
        schemas: &[S],
    ) -> PipelineResult<StoreReport> {
        let (record, processed) = self.process_file(path, max_file_size, schemas)?;
        self.store(store, record, &processed)
    }

    /// Like [`ingest_file`](Self::ingest_file), but nothing is stored once
    /// `cancel` has fired. A cancelled document is recorded as failed.
    pub fn ingest_file_cancellable<S: AsRef<str>>(
        &self,
        store: &dyn ChunkStore,
        path: &Path,
        max_file_size: u64,
        schemas: &[S],
        cancel: &Cancellation,
    ) -> PipelineResult<StoreReport> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled(path.display().to_string()));
        }

        let (mut record, processed) = self.process_file(path, max_file_size, schemas)?;
        if !cancel.commit() {
            tracing::warn!(
                target: "pipeline",
                "document {} cancelled after processing; not storing chunks",
                record.document_id
            );
            record.mark_failed("timed out");
            store.upsert_document(&record)?;
            return Err(PipelineError::Cancelled(record.document_id));
        }
        self.store(store, record, &processed)
    }
}

fn external_to_chunk(input: &ExternalChunk, index: u32) -> Chunk {
    let content = input.text.trim().to_string();
    let mut chunk_metadata = analyze(&content, index);
    if !input.metadata.is_null() {
        chunk_metadata.source_metadata = Some(input.metadata.clone());
    }

    Chunk {
        chunk_id: input.chunk_id.clone(),
        document_id: input.document_id.clone(),
        chunk_index: index,
        content,
        content_type: ContentType::Text,
        chunk_metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingResult;
    use crate::schema::{FieldDef, FieldType, Schema, Vocabulary};
    use crate::storage::MemoryChunkStore;
    use serde_json::json;

    struct ConstantGateway(usize);

    impl EmbeddingGateway for ConstantGateway {
        fn dimension(&self) -> usize {
            self.0
        }

        fn model_name(&self) -> &str {
            "constant"
        }

        fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.25; self.0]).collect())
        }
    }

    fn registry() -> Arc<SchemaRegistry> {
        let invoice = Schema::new("invoice")
            .field("invoice_no", FieldDef::new(FieldType::String))
            .field("grand_total", FieldDef::new(FieldType::Number))
            .require("invoice_no")
            .require("grand_total");
        Arc::new(SchemaRegistry::from_parts(
            vec![("invoice".to_string(), invoice)],
            Vec::<(String, Vocabulary)>::new(),
        ))
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        let result = DocumentPipeline::builder(registry())
            .chunk_config(ChunkConfig::with_sizes(100, 100, 10))
            .build();
        assert!(matches!(result, Err(PipelineError::Config(_))));

        let result = DocumentPipeline::builder(registry())
            .extraction_options(ExtractionOptions::default().with_threshold(2.0))
            .build();
        assert!(matches!(result, Err(PipelineError::Options(_))));
    }

    #[test]
    fn test_process_extracts_and_embeds() {
        let pipeline = DocumentPipeline::builder(registry())
            .gateway(Arc::new(ConstantGateway(8)))
            .build()
            .unwrap();
        assert_eq!(pipeline.dimension(), 8);

        let content = ConvertedContent::from_text("Invoice #INV-2024-001 for consulting.\n\nGrand Total: $1,250.00");
        let processed = pipeline.process("doc", &content, &["invoice"]).unwrap();

        assert_eq!(processed.chunks.len(), 1);
        let chunk = &processed.chunks[0];
        assert!(chunk.extracted_metadata.extraction.schema_matches.contains_key("invoice"));
        assert!(chunk.embeddings.has_text());
        assert!(chunk.embeddings.schemas.contains_key("invoice"));
        assert_eq!(processed.metadata.total_chunks, 1);
        assert_eq!(processed.metadata.extraction_summary.schemas_applied, vec!["invoice"]);
    }

    #[test]
    fn test_process_empty_content() {
        let pipeline = DocumentPipeline::builder(registry()).build().unwrap();
        let processed = pipeline
            .process::<&str>("doc", &ConvertedContent::default(), &[])
            .unwrap();
        assert!(processed.chunks.is_empty());
        assert_eq!(processed.metadata.total_chunks, 0);

        let store = MemoryChunkStore::new();
        let record = DocumentRecord::new("doc", "empty.txt", "txt", 0);
        let result = pipeline.store(&store, record, &processed);
        assert!(matches!(result, Err(PipelineError::NoChunks(_))));
        assert_eq!(
            store.get_document("doc").unwrap().unwrap().status,
            DocumentStatus::Failed
        );
    }

    #[test]
    fn test_store_rejects_wrong_dimension() {
        let pipeline = DocumentPipeline::builder(registry())
            .gateway(Arc::new(ConstantGateway(512)))
            .dimension(1536)
            .build()
            .unwrap();
        let processed = pipeline
            .process("doc", &ConvertedContent::from_text("Some text to embed."), &["invoice"])
            .unwrap();

        let store = MemoryChunkStore::new();
        let result = pipeline.store(&store, DocumentRecord::new("doc", "a.txt", "txt", 19), &processed);
        assert!(matches!(
            result,
            Err(PipelineError::Storage(StorageError::NoValidChunks { .. }))
        ));
        assert_eq!(store.chunk_count(), 0);
        assert_eq!(
            store.get_document("doc").unwrap().unwrap().status,
            DocumentStatus::Failed
        );
    }

    #[test]
    fn test_process_external_groups_by_document() {
        let pipeline = DocumentPipeline::builder(registry()).build().unwrap();
        let inputs = crate::documents::adapt(&json!({
            "data": [
                {"text": "First chunk of alpha.", "document_id": "alpha", "id": "a1"},
                {"text": "First chunk of beta.", "document_id": "beta", "id": "b1"},
                {"text": "Second chunk of alpha.", "document_id": "alpha", "id": "a2", "page": 2}
            ]
        }));

        let batch = pipeline.process_external(&inputs, &["invoice"]);
        assert_eq!(batch.summary.total_chunks, 3);
        assert_eq!(batch.summary.processed_chunks, 3);
        assert_eq!(batch.summary.failed_chunks, 0);

        let ids: Vec<&str> = batch.documents.iter().map(|d| d.document_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "beta"]);
        let alpha = &batch.documents[0];
        assert_eq!(alpha.chunks[1].chunk.chunk_id, "a2");
        assert_eq!(alpha.chunks[1].chunk.chunk_index, 1);
        assert_eq!(
            alpha.chunks[1].chunk.chunk_metadata.source_metadata,
            Some(json!({"page": 2}))
        );
    }
}
