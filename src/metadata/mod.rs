//! Processed chunks and document-level metadata aggregation.

pub mod aggregator;

pub use aggregator::{
    AggregatedInsights, AggregationError, DocumentMetadata, DocumentTypeSummary,
    ExtractionSummary, aggregate, try_aggregate,
};

use crate::documents::Chunk;
use crate::embedding::ChunkEmbeddings;
use crate::extraction::ExtractedMetadata;
use serde::{Deserialize, Serialize};

/// A chunk with its extraction output and embeddings attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub extracted_metadata: ExtractedMetadata,
    #[serde(default)]
    pub embeddings: ChunkEmbeddings,
}

impl ProcessedChunk {
    pub fn new(chunk: Chunk, extracted_metadata: ExtractedMetadata) -> Self {
        Self {
            chunk,
            extracted_metadata,
            embeddings: ChunkEmbeddings::default(),
        }
    }

    pub fn with_embeddings(mut self, embeddings: ChunkEmbeddings) -> Self {
        self.embeddings = embeddings;
        self
    }
}
