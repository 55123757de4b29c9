//! Document-level metadata built from processed chunks.
//!
//! Aggregation is a pure function of the chunk list: the same chunks always
//! produce the same [`DocumentMetadata`], and every run replaces the previous
//! result wholesale.

use super::ProcessedChunk;
use crate::extraction::{ActionItem, DocumentSection, ImportantEntity};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

pub const MAX_KEY_ENTITIES: usize = 20;
pub const MAX_SECTIONS: usize = 10;
pub const MAX_ACTION_ITEMS: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("Chunk '{chunk_id}' belongs to document '{found}', expected '{expected}'")]
    MixedDocuments {
        chunk_id: String,
        expected: String,
        found: String,
    },

    #[error("Chunk index {0} appears more than once")]
    DuplicateIndex(u32),
}

/// Plurality document type across chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTypeSummary {
    pub primary_type: String,
    /// Number of chunks listing each type, in first-seen order.
    pub confidence_scores: IndexMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedInsights {
    pub total_text_length: usize,
    pub average_chunk_length: f64,
    pub document_sections: Vec<DocumentSection>,
    pub action_items: Vec<ActionItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub successful_extractions: usize,
    pub failed_extractions: usize,
    /// Schemas requested on successfully analyzed chunks, sorted.
    pub schemas_applied: Vec<String>,
    /// Document types detected on any chunk, sorted.
    pub detected_types: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub total_chunks: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type_indicators: Option<DocumentTypeSummary>,

    #[serde(default)]
    pub key_entities: Vec<ImportantEntity>,

    #[serde(default)]
    pub content_insights: AggregatedInsights,

    #[serde(default)]
    pub extraction_summary: ExtractionSummary,

    /// Set when aggregation itself failed; the chunk count is still reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentMetadata {
    pub fn failed(error: impl Into<String>, total_chunks: usize) -> Self {
        Self {
            total_chunks,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn primary_type(&self) -> Option<&str> {
        self.document_type_indicators
            .as_ref()
            .map(|d| d.primary_type.as_str())
    }
}

/// Aggregate chunks, recording any failure in-band.
pub fn aggregate(chunks: &[ProcessedChunk]) -> DocumentMetadata {
    match try_aggregate(chunks) {
        Ok(metadata) => {
            tracing::debug!(
                target: "pipeline",
                "aggregated metadata from {} chunks",
                chunks.len()
            );
            metadata
        }
        Err(e) => {
            tracing::error!(target: "pipeline", "failed to aggregate document metadata: {e}");
            DocumentMetadata::failed(e.to_string(), chunks.len())
        }
    }
}

pub fn try_aggregate(chunks: &[ProcessedChunk]) -> Result<DocumentMetadata, AggregationError> {
    check_chunk_set(chunks)?;

    let mut total_text_length = 0;
    let mut successful = 0;
    let mut entities = Vec::new();
    let mut sections = Vec::new();
    let mut action_items = Vec::new();
    let mut schemas_applied = BTreeSet::new();
    let mut detected_types = BTreeSet::new();
    let mut type_counts: IndexMap<String, usize> = IndexMap::new();

    for processed in chunks {
        total_text_length += processed.chunk.content.chars().count();

        let metadata = &processed.extracted_metadata;
        if !metadata.is_success() {
            continue;
        }
        successful += 1;

        let insights = &metadata.content_insights;
        entities.extend(insights.important_entities.iter().cloned());
        sections.extend(insights.document_sections.iter().cloned());
        action_items.extend(insights.action_items.iter().cloned());

        schemas_applied.extend(metadata.schemas_applied.iter().cloned());
        for likely in &metadata.text_analysis.document_type_indicators.likely_types {
            detected_types.insert(likely.clone());
            *type_counts.entry(likely.clone()).or_insert(0) += 1;
        }
    }

    let average_chunk_length = if chunks.is_empty() {
        0.0
    } else {
        total_text_length as f64 / chunks.len() as f64
    };

    let mut key_entities = deduplicate_entities(entities);
    key_entities.truncate(MAX_KEY_ENTITIES);
    sections.truncate(MAX_SECTIONS);
    action_items.truncate(MAX_ACTION_ITEMS);

    Ok(DocumentMetadata {
        total_chunks: chunks.len(),
        document_type_indicators: plurality(type_counts),
        key_entities,
        content_insights: AggregatedInsights {
            total_text_length,
            average_chunk_length,
            document_sections: sections,
            action_items,
        },
        extraction_summary: ExtractionSummary {
            successful_extractions: successful,
            failed_extractions: chunks.len() - successful,
            schemas_applied: schemas_applied.into_iter().collect(),
            detected_types: detected_types.into_iter().collect(),
        },
        error: None,
    })
}

fn check_chunk_set(chunks: &[ProcessedChunk]) -> Result<(), AggregationError> {
    let Some(first) = chunks.first() else {
        return Ok(());
    };

    let expected = &first.chunk.document_id;
    let mut seen = HashSet::new();
    for processed in chunks {
        let chunk = &processed.chunk;
        if &chunk.document_id != expected {
            return Err(AggregationError::MixedDocuments {
                chunk_id: chunk.chunk_id.clone(),
                expected: expected.clone(),
                found: chunk.document_id.clone(),
            });
        }
        if !seen.insert(chunk.chunk_index) {
            return Err(AggregationError::DuplicateIndex(chunk.chunk_index));
        }
    }
    Ok(())
}

/// Most frequent type; ties go to the type seen first.
fn plurality(type_counts: IndexMap<String, usize>) -> Option<DocumentTypeSummary> {
    let mut best: Option<(&String, usize)> = None;
    for (name, count) in &type_counts {
        if best.is_none_or(|(_, top)| *count > top) {
            best = Some((name, *count));
        }
    }
    let primary_type = best?.0.clone();

    Some(DocumentTypeSummary {
        primary_type,
        confidence_scores: type_counts,
    })
}

/// Keep the first occurrence of each entity text, compared case-insensitively.
fn deduplicate_entities(entities: Vec<ImportantEntity>) -> Vec<ImportantEntity> {
    let mut seen = HashSet::new();
    entities
        .into_iter()
        .filter(|e| seen.insert(e.text.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{Chunk, ChunkMetadata, ContentType};
    use crate::embedding::ChunkEmbeddings;
    use crate::extraction::{EntitySource, ExtractedMetadata};

    fn chunk(doc: &str, index: u32, content: &str) -> Chunk {
        Chunk {
            chunk_id: format!("{doc}_chunk_{index:03}"),
            document_id: doc.to_string(),
            chunk_index: index,
            content: content.to_string(),
            content_type: ContentType::Text,
            chunk_metadata: ChunkMetadata::default(),
        }
    }

    fn entity(text: &str) -> ImportantEntity {
        ImportantEntity {
            text: text.to_string(),
            label: "PERSON".to_string(),
            confidence: 0.8,
            source: EntitySource::Extractor,
        }
    }

    fn processed(index: u32, content: &str, types: &[&str], entities: &[&str]) -> ProcessedChunk {
        let mut metadata = ExtractedMetadata {
            schemas_applied: vec!["invoice".to_string()],
            ..Default::default()
        };
        metadata.text_analysis.document_type_indicators.likely_types =
            types.iter().map(|t| t.to_string()).collect();
        metadata.content_insights.important_entities = entities.iter().map(|e| entity(e)).collect();
        ProcessedChunk {
            chunk: chunk("doc", index, content),
            extracted_metadata: metadata,
            embeddings: ChunkEmbeddings::default(),
        }
    }

    #[test]
    fn test_aggregate_counts_and_types() {
        let mut failed = processed(2, "zz", &[], &[]);
        failed.extracted_metadata = ExtractedMetadata::failed("no content to analyze");

        let chunks = vec![
            processed(0, "abcd", &["invoice", "contract"], &["Jane Smith"]),
            processed(1, "abcdef", &["contract"], &["jane smith", "Bob Ray"]),
            failed,
        ];
        let metadata = aggregate(&chunks);

        assert_eq!(metadata.total_chunks, 3);
        assert_eq!(metadata.content_insights.total_text_length, 12);
        assert!((metadata.content_insights.average_chunk_length - 4.0).abs() < 1e-9);
        assert_eq!(metadata.extraction_summary.successful_extractions, 2);
        assert_eq!(metadata.extraction_summary.failed_extractions, 1);
        assert_eq!(metadata.extraction_summary.schemas_applied, vec!["invoice"]);
        assert_eq!(metadata.extraction_summary.detected_types, vec!["contract", "invoice"]);
        assert_eq!(metadata.primary_type(), Some("contract"));

        let names: Vec<&str> = metadata.key_entities.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(names, vec!["Jane Smith", "Bob Ray"]);
    }

    #[test]
    fn test_plurality_tie_goes_to_first_seen() {
        let chunks = vec![
            processed(0, "a", &["refund_case"], &[]),
            processed(1, "b", &["support_case"], &[]),
        ];
        assert_eq!(aggregate(&chunks).primary_type(), Some("refund_case"));
    }

    #[test]
    fn test_aggregate_caps_entities() {
        let names: Vec<String> = (0..30).map(|i| format!("Entity{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let metadata = aggregate(&[processed(0, "x", &[], &refs)]);
        assert_eq!(metadata.key_entities.len(), MAX_KEY_ENTITIES);
        assert!(metadata.document_type_indicators.is_none());
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let chunks = vec![
            processed(0, "first chunk", &["invoice"], &["Ann Lee"]),
            processed(1, "second chunk", &["invoice", "refund_case"], &["Cal Poe"]),
        ];
        let first = serde_json::to_string(&aggregate(&chunks)).unwrap();
        let second = serde_json::to_string(&aggregate(&chunks)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_aggregate_errors_are_in_band() {
        let mut stray = processed(1, "b", &[], &[]);
        stray.chunk.document_id = "other".to_string();
        let metadata = aggregate(&[processed(0, "a", &[], &[]), stray]);
        assert_eq!(metadata.total_chunks, 2);
        assert!(metadata.error.unwrap().contains("other"));

        let duplicate = try_aggregate(&[processed(0, "a", &[], &[]), processed(0, "b", &[], &[])]);
        assert_eq!(duplicate, Err(AggregationError::DuplicateIndex(0)));
    }

    #[test]
    fn test_aggregate_empty() {
        let metadata = aggregate(&[]);
        assert_eq!(metadata.total_chunks, 0);
        assert_eq!(metadata.content_insights.average_chunk_length, 0.0);
        assert!(metadata.error.is_none());
    }
}
