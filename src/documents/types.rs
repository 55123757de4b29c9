//! Core types for document chunking.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of content a chunk carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Table,
    Image,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Table => "table",
            ContentType::Image => "image",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(ContentType::Text),
            "table" => Some(ContentType::Table),
            "image" => Some(ContentType::Image),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table or image block produced by an external document converter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub content: String,

    /// Converter-specific attributes, carried through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl ContentBlock {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: serde_json::Value::Null,
        }
    }
}

/// Output of document conversion: the chunker's only input shape.
///
/// A missing `text` key deserializes to an empty string and yields no text chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvertedContent {
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub tables: Vec<ContentBlock>,

    #[serde(default)]
    pub images: Vec<ContentBlock>,
}

impl ConvertedContent {
    /// Plain text input with no tables or images.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
            && self.tables.iter().all(|t| t.content.trim().is_empty())
            && self.images.is_empty()
    }
}

/// Simple pattern-based entities found in a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleEntities {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phones: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
}

impl SimpleEntities {
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty() && self.urls.is_empty() && self.names.is_empty()
    }
}

/// Attributes derived from a chunk's content when the chunk is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub chunk_type: ContentType,

    /// Character count of the content.
    pub length: usize,

    pub word_count: usize,

    pub chunk_index: u32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub numbers: Vec<String>,

    #[serde(default, skip_serializing_if = "SimpleEntities::is_empty")]
    pub entities: SimpleEntities,

    /// Number of undersized chunks folded into this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_chunks: Option<u32>,

    /// Id of the oversized chunk this piece was split from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_chunk: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_chunk_index: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_index: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_index: Option<usize>,

    /// Converter metadata for table and image chunks, or caller metadata for adapted chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_metadata: Option<serde_json::Value>,
}

/// A bounded unit of document content, ready for extraction and embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique within the owning document.
    pub chunk_id: String,

    pub document_id: String,

    /// Ordering key. Text chunks are consecutive from zero; tables and images
    /// are offset so they sort after all text.
    pub chunk_index: u32,

    /// Never empty.
    pub content: String,

    pub content_type: ContentType,

    pub chunk_metadata: ChunkMetadata,
}

impl Chunk {
    /// Get character count.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// Get a preview of the content (first N characters).
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.content.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}
