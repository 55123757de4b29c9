//! Document intake and chunking.
//!
//! This module provides:
//! - Text normalization and paragraph splitting
//! - Paragraph-greedy chunking with overlap and split/merge optimization
//! - Per-chunk content analysis (headers, dates, amounts, contacts)
//! - File loading and the adapter for externally chunked input

pub mod adapter;
pub mod analysis;
pub mod chunker;
pub mod config;
pub mod loader;
pub mod normalizer;
pub mod types;

pub use adapter::{ExternalChunk, adapt};
pub use chunker::{Chunker, ParagraphChunker};
pub use config::{ChunkConfig, ChunkConfigError};
pub use loader::{LoadError, LoadedDocument, SourceKind, load_file};
pub use types::{Chunk, ChunkMetadata, ContentBlock, ContentType, ConvertedContent, SimpleEntities};
