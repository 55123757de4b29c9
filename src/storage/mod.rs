//! Persistence boundary for documents and their chunks.
//!
//! Re-processing a document goes through [`ChunkStore::replace_document`],
//! which removes every previous chunk before inserting the new set so readers
//! never see a mix of old and new chunks.

pub mod error;
pub mod memory;
pub mod record;
pub mod schema;
pub mod tantivy;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryChunkStore;
pub use record::{
    ChunkRecord, DocumentRecord, DocumentStatus, RejectReason, RejectedChunk, SearchHit,
    StorageBatch,
};
pub use tantivy::TantivyChunkStore;

use crate::embedding::cosine_similarity;

pub trait ChunkStore: Send + Sync {
    /// Delete the document's existing chunks, then store `document` and `chunks`.
    fn replace_document(&self, document: &DocumentRecord, chunks: &[ChunkRecord]) -> StorageResult<()>;

    /// Insert or update the document record alone, keeping its chunks.
    fn upsert_document(&self, document: &DocumentRecord) -> StorageResult<()>;

    /// Remove a document and its chunks. Returns whether it existed.
    fn delete_document(&self, document_id: &str) -> StorageResult<bool>;

    fn get_document(&self, document_id: &str) -> StorageResult<Option<DocumentRecord>>;

    /// All documents, ordered by id.
    fn list_documents(&self) -> StorageResult<Vec<DocumentRecord>>;

    /// Chunks of one document in `chunk_index` order.
    fn document_chunks(&self, document_id: &str) -> StorageResult<Vec<ChunkRecord>>;

    /// Up to `limit` chunks with cosine similarity at or above `threshold`, best first.
    fn search_similar(&self, query: &[f32], limit: usize, threshold: f32) -> StorageResult<Vec<SearchHit>>;
}

/// Score `chunks` against `query` and keep the nearest `limit` above `threshold`.
pub(crate) fn rank_by_similarity(
    chunks: impl IntoIterator<Item = ChunkRecord>,
    query: &[f32],
    limit: usize,
    threshold: f32,
) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = chunks
        .into_iter()
        .filter(|chunk| chunk.embedding.len() == query.len())
        .map(|chunk| {
            let score = cosine_similarity(query, &chunk.embedding);
            SearchHit { chunk, score }
        })
        .filter(|hit| hit.score >= threshold)
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.chunk.chunk_id.cmp(&b.chunk.chunk_id))
    });
    hits.truncate(limit);
    hits
}
