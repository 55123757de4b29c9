//! Records handed to a [`ChunkStore`](super::ChunkStore).
//!
//! [`StorageBatch::prepare`] is the only way processed chunks become
//! [`ChunkRecord`]s, so every stored chunk carries a primary embedding of the
//! configured dimension.

use super::error::{StorageError, StorageResult};
use crate::documents::{ChunkMetadata, ContentType};
use crate::extraction::ExtractedMetadata;
use crate::metadata::{DocumentMetadata, ProcessedChunk};
use crate::utils::now_rfc3339;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: String,
    pub filename: String,
    pub file_type: String,
    pub file_size: u64,
    pub status: DocumentStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,

    pub created_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
}

impl DocumentRecord {
    pub fn new(
        document_id: impl Into<String>,
        filename: impl Into<String>,
        file_type: impl Into<String>,
        file_size: u64,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            filename: filename.into(),
            file_type: file_type.into(),
            file_size,
            status: DocumentStatus::Processing,
            processing_error: None,
            metadata: None,
            created_at: now_rfc3339(),
            processed_at: None,
        }
    }

    pub fn mark_completed(&mut self, metadata: DocumentMetadata) {
        self.status = DocumentStatus::Completed;
        self.processing_error = None;
        self.metadata = Some(metadata);
        self.processed_at = Some(now_rfc3339());
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = DocumentStatus::Failed;
        self.processing_error = Some(error.into());
        self.processed_at = Some(now_rfc3339());
    }
}

/// Flattened chunk as persisted. `embedding` is the similarity vector;
/// `all_embeddings` holds the full embeddings map as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub document_id: String,
    pub chunk_index: u32,
    pub content: String,
    pub content_type: ContentType,
    pub embedding: Vec<f32>,
    pub all_embeddings: String,
    pub extracted_metadata: ExtractedMetadata,
    pub chunk_metadata: ChunkMetadata,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    EmptyContent,
    MissingEmbedding,
    DimensionMismatch { expected: usize, actual: usize },
    Serialization { message: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::EmptyContent => f.write_str("empty content"),
            RejectReason::MissingEmbedding => f.write_str("no text embedding"),
            RejectReason::DimensionMismatch { expected, actual } => {
                write!(f, "embedding has {actual} dimensions, expected {expected}")
            }
            RejectReason::Serialization { message } => write!(f, "cannot serialize: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedChunk {
    pub chunk_id: String,
    pub reason: RejectReason,
}

/// Chunks of one document split into storable records and rejections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageBatch {
    pub document_id: String,
    pub accepted: Vec<ChunkRecord>,
    pub rejected: Vec<RejectedChunk>,
}

impl StorageBatch {
    /// Validate and flatten `chunks`.
    ///
    /// Fails with [`StorageError::NoValidChunks`] when chunks were given but
    /// none can be stored. An empty input yields an empty batch.
    pub fn prepare(chunks: &[ProcessedChunk], dimension: usize) -> StorageResult<Self> {
        let document_id = chunks
            .first()
            .map(|c| c.chunk.document_id.clone())
            .unwrap_or_default();
        let created_at = now_rfc3339();

        let mut batch = StorageBatch {
            document_id,
            ..Default::default()
        };

        for processed in chunks {
            match to_record(processed, dimension, &created_at) {
                Ok(record) => batch.accepted.push(record),
                Err(reason) => {
                    tracing::warn!(
                        target: "storage",
                        "rejecting chunk {}: {reason}",
                        processed.chunk.chunk_id
                    );
                    batch.rejected.push(RejectedChunk {
                        chunk_id: processed.chunk.chunk_id.clone(),
                        reason,
                    });
                }
            }
        }

        if !chunks.is_empty() && batch.accepted.is_empty() {
            return Err(StorageError::NoValidChunks {
                document_id: batch.document_id,
                rejected: batch.rejected.len(),
            });
        }

        Ok(batch)
    }
}

fn to_record(
    processed: &ProcessedChunk,
    dimension: usize,
    created_at: &str,
) -> Result<ChunkRecord, RejectReason> {
    let chunk = &processed.chunk;
    if chunk.content.trim().is_empty() {
        return Err(RejectReason::EmptyContent);
    }

    let embedding = processed
        .embeddings
        .text
        .as_ref()
        .ok_or(RejectReason::MissingEmbedding)?;
    if embedding.len() != dimension {
        return Err(RejectReason::DimensionMismatch {
            expected: dimension,
            actual: embedding.len(),
        });
    }

    let all_embeddings =
        serde_json::to_string(&processed.embeddings).map_err(|e| RejectReason::Serialization {
            message: e.to_string(),
        })?;

    Ok(ChunkRecord {
        chunk_id: chunk.chunk_id.clone(),
        document_id: chunk.document_id.clone(),
        chunk_index: chunk.chunk_index,
        content: chunk.content.clone(),
        content_type: chunk.content_type,
        embedding: embedding.clone(),
        all_embeddings,
        extracted_metadata: processed.extracted_metadata.clone(),
        chunk_metadata: chunk.chunk_metadata.clone(),
        created_at: created_at.to_string(),
    })
}

/// A stored chunk ranked against a query vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub chunk: ChunkRecord,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::Chunk;
    use crate::embedding::ChunkEmbeddings;

    fn processed(index: u32, content: &str, vector: Option<Vec<f32>>) -> ProcessedChunk {
        let chunk = Chunk {
            chunk_id: format!("doc_chunk_{index:03}"),
            document_id: "doc".to_string(),
            chunk_index: index,
            content: content.to_string(),
            content_type: ContentType::Text,
            chunk_metadata: ChunkMetadata::default(),
        };
        ProcessedChunk::new(chunk, ExtractedMetadata::default()).with_embeddings(ChunkEmbeddings {
            text: vector,
            ..Default::default()
        })
    }

    #[test]
    fn test_prepare_filters_invalid_embeddings() {
        let chunks = vec![
            processed(0, "good", Some(vec![0.5; 4])),
            processed(1, "short vector", Some(vec![0.5; 2])),
            processed(2, "no vector", None),
        ];
        let batch = StorageBatch::prepare(&chunks, 4).unwrap();

        assert_eq!(batch.document_id, "doc");
        assert_eq!(batch.accepted.len(), 1);
        assert_eq!(batch.accepted[0].embedding.len(), 4);
        assert!(batch.accepted[0].all_embeddings.contains("\"text\""));
        assert_eq!(
            batch.rejected[0].reason,
            RejectReason::DimensionMismatch { expected: 4, actual: 2 }
        );
        assert_eq!(batch.rejected[1].reason, RejectReason::MissingEmbedding);
    }

    #[test]
    fn test_prepare_refuses_all_rejected() {
        let result = StorageBatch::prepare(&[processed(0, "text", None)], 4);
        assert!(matches!(
            result,
            Err(StorageError::NoValidChunks { rejected: 1, .. })
        ));
        assert!(StorageBatch::prepare(&[], 4).unwrap().accepted.is_empty());
    }

    #[test]
    fn test_document_status_transitions() {
        let mut record = DocumentRecord::new("doc", "a.txt", "txt", 10);
        assert_eq!(record.status, DocumentStatus::Processing);
        record.mark_failed("boom");
        assert_eq!(record.status.to_string(), "failed");
        record.mark_completed(DocumentMetadata::default());
        assert_eq!(record.status, DocumentStatus::Completed);
        assert!(record.processing_error.is_none());
        assert!(record.processed_at.is_some());
    }
}
