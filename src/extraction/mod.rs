//! Schema-driven field extraction.
//!
//! This module provides:
//! - Per-field strategies selected by field name and type
//! - The extractor that applies schemas to chunk text
//! - Entity, category and key-phrase detection
//! - Enhanced per-chunk metadata (text analysis and content insights)

pub mod confidence;
pub mod extractor;
pub mod insights;
pub mod patterns;
pub mod strategies;

pub use extractor::{
    Category, Entity, ExtractionError, ExtractionOptions, ExtractionResult, FieldExtractor,
    SchemaMatch, extract_entities, extract_key_phrases,
};
pub use insights::{
    ActionItem, ContentInsights, DEFAULT_SCHEMAS, DocumentSection, EntitySource,
    ExtractedMetadata, ImportantEntity, MetadataExtractor, TextAnalysis,
};
pub use strategies::{FieldContext, FieldMatch, FieldStrategy, FieldValue, StrategyTable};
