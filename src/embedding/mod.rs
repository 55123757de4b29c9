//! Embedding generation behind a gateway trait.
//!
//! The pipeline only depends on [`EmbeddingGateway`]. Gateways own their
//! retry policy; a failed or malformed vector is logged and left out of the
//! chunk's [`ChunkEmbeddings`] rather than raised.

pub mod local;
pub mod openai;

pub use local::LocalGateway;
pub use openai::OpenAiGateway;

use crate::extraction::{ExtractionResult, SchemaMatch};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Dimension of OpenAI `text-embedding-3-small` and `ada-002` vectors.
pub const DEFAULT_DIMENSION: usize = 1536;

/// Key phrases embedded per chunk.
pub const MAX_PHRASE_EMBEDDINGS: usize = 3;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    ModelInit(String),

    #[error("Missing API key for {0}")]
    MissingApiKey(String),

    #[error("Embedding request failed: {0}")]
    Request(String),

    #[error("Unexpected embedding response: {0}")]
    Response(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Unknown embedding model '{0}'")]
    UnknownModel(String),
}

pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Text to fixed-dimension vector.
pub trait EmbeddingGateway: Send + Sync {
    /// Vector length this gateway produces.
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;

    /// Embed several texts, returning one vector per input in order.
    fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>>;

    fn generate(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Response("no embedding returned".to_string()))
    }
}

/// Vectors owned by one chunk. A missing `text` vector makes the chunk unstorable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkEmbeddings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<f32>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<String, Vec<f32>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub key_phrases: BTreeMap<String, Vec<f32>>,
}

impl ChunkEmbeddings {
    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.schemas.is_empty() && self.key_phrases.is_empty()
    }
}

pub fn check_dimension(vector: &[f32], expected: usize) -> EmbeddingResult<()> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        })
    }
}

/// `Schema: invoice; invoice_no: INV-1; grand_total: 1250`
pub fn schema_summary(name: &str, fields: &SchemaMatch) -> Option<String> {
    let parts: Vec<String> = fields
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(field, value)| format!("{field}: {value}"))
        .collect();

    if parts.is_empty() {
        return None;
    }
    Some(format!("Schema: {name}; {}", parts.join("; ")))
}

/// Embed chunk text, schema summaries and leading key phrases.
///
/// Vectors that fail or have the wrong length are logged and skipped.
pub fn embed_chunk(
    gateway: &dyn EmbeddingGateway,
    text: &str,
    extraction: &ExtractionResult,
    dimension: usize,
) -> ChunkEmbeddings {
    let mut embeddings = ChunkEmbeddings::default();

    match gateway.generate(text) {
        Ok(vector) => embeddings.text = accept(vector, dimension, "text"),
        Err(e) => tracing::warn!(target: "embed", "text embedding failed: {e}"),
    }

    let mut labels: Vec<(bool, String)> = Vec::new();
    let mut inputs: Vec<String> = Vec::new();
    for (name, fields) in &extraction.schema_matches {
        if let Some(summary) = schema_summary(name, fields) {
            labels.push((true, name.clone()));
            inputs.push(summary);
        }
    }
    for phrase in extraction.key_phrases.iter().take(MAX_PHRASE_EMBEDDINGS) {
        labels.push((false, phrase.clone()));
        inputs.push(phrase.clone());
    }
    if inputs.is_empty() {
        return embeddings;
    }

    let refs: Vec<&str> = inputs.iter().map(String::as_str).collect();
    match gateway.embed_batch(&refs) {
        Ok(vectors) if vectors.len() == labels.len() => {
            for ((is_schema, label), vector) in labels.into_iter().zip(vectors) {
                let Some(vector) = accept(vector, dimension, &label) else {
                    continue;
                };
                if is_schema {
                    embeddings.schemas.insert(label, vector);
                } else {
                    embeddings.key_phrases.insert(label, vector);
                }
            }
        }
        Ok(vectors) => tracing::warn!(
            target: "embed",
            "expected {} auxiliary embeddings, got {}",
            labels.len(),
            vectors.len()
        ),
        Err(e) => tracing::warn!(target: "embed", "auxiliary embeddings failed: {e}"),
    }

    embeddings
}

fn accept(vector: Vec<f32>, dimension: usize, label: &str) -> Option<Vec<f32>> {
    match check_dimension(&vector, dimension) {
        Ok(()) => Some(vector),
        Err(e) => {
            tracing::warn!(target: "embed", "dropping '{label}' embedding: {e}");
            None
        }
    }
}

/// Cosine similarity; zero when either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
