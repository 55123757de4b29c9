//! In-process chunk store.

use super::{ChunkRecord, ChunkStore, DocumentRecord, SearchHit, StorageResult, rank_by_similarity};
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct Inner {
    documents: BTreeMap<String, DocumentRecord>,
    chunks: BTreeMap<String, Vec<ChunkRecord>>,
}

/// Store backed by maps behind one lock, so a replace is a single critical section.
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    inner: RwLock<Inner>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk_count(&self) -> usize {
        self.inner.read().chunks.values().map(Vec::len).sum()
    }
}

impl ChunkStore for MemoryChunkStore {
    fn replace_document(&self, document: &DocumentRecord, chunks: &[ChunkRecord]) -> StorageResult<()> {
        let mut sorted = chunks.to_vec();
        sorted.sort_by_key(|c| c.chunk_index);

        let mut inner = self.inner.write();
        inner.chunks.insert(document.document_id.clone(), sorted);
        inner
            .documents
            .insert(document.document_id.clone(), document.clone());
        Ok(())
    }

    fn upsert_document(&self, document: &DocumentRecord) -> StorageResult<()> {
        self.inner
            .write()
            .documents
            .insert(document.document_id.clone(), document.clone());
        Ok(())
    }

    fn delete_document(&self, document_id: &str) -> StorageResult<bool> {
        let mut inner = self.inner.write();
        let had_chunks = inner.chunks.remove(document_id).is_some();
        let had_document = inner.documents.remove(document_id).is_some();
        Ok(had_chunks || had_document)
    }

    fn get_document(&self, document_id: &str) -> StorageResult<Option<DocumentRecord>> {
        Ok(self.inner.read().documents.get(document_id).cloned())
    }

    fn list_documents(&self) -> StorageResult<Vec<DocumentRecord>> {
        Ok(self.inner.read().documents.values().cloned().collect())
    }

    fn document_chunks(&self, document_id: &str) -> StorageResult<Vec<ChunkRecord>> {
        Ok(self
            .inner
            .read()
            .chunks
            .get(document_id)
            .cloned()
            .unwrap_or_default())
    }

    fn search_similar(&self, query: &[f32], limit: usize, threshold: f32) -> StorageResult<Vec<SearchHit>> {
        let inner = self.inner.read();
        let candidates = inner.chunks.values().flatten().cloned();
        Ok(rank_by_similarity(candidates, query, limit, threshold))
    }
}
