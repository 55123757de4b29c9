//! Document chunking and schema-driven field extraction for retrieval pipelines.
//!
//! Converted document content is split into overlapping chunks, each chunk is
//! run through schema-driven field extraction and content analysis, chunk
//! results are aggregated into document metadata, and embeddings are attached
//! before the chunks are handed to a store.

pub mod cli;
pub mod config;
pub mod documents;
pub mod embedding;
pub mod extraction;
pub mod logging;
pub mod metadata;
pub mod patterns;
pub mod pipeline;
pub mod schema;
pub mod storage;
pub mod utils;

pub use config::Settings;
pub use documents::{
    Chunk, ChunkConfig, ChunkConfigError, ChunkMetadata, Chunker, ContentType, ConvertedContent,
    ExternalChunk, ParagraphChunker,
};
pub use embedding::{ChunkEmbeddings, EmbeddingError, EmbeddingGateway};
pub use extraction::{ExtractedMetadata, ExtractionOptions, ExtractionResult, FieldExtractor};
pub use metadata::{DocumentMetadata, ProcessedChunk, aggregate};
pub use pipeline::{DocumentPipeline, PipelineError, ProcessedDocument};
pub use schema::{Schema, SchemaRegistry};
pub use storage::{ChunkStore, MemoryChunkStore, StorageError, TantivyChunkStore};
