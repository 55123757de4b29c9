//! Tantivy-backed chunk store.

use super::schema::{KIND_CHUNK, KIND_DOCUMENT, StoreSchema};
use super::{
    ChunkRecord, ChunkStore, DocumentRecord, SearchHit, StorageError, StorageResult,
    rank_by_similarity,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tantivy::{
    Index, IndexReader, IndexSettings, IndexWriter, ReloadPolicy, TantivyDocument as Document, Term,
    collector::{DocSetCollector, TopDocs},
    directory::MmapDirectory,
    query::{BooleanQuery, Occur, Query, QueryParser, TermQuery},
    schema::{IndexRecordOption, Value},
};

const WRITER_HEAP_BYTES: usize = 50_000_000;

pub struct TantivyChunkStore {
    index: Index,
    reader: IndexReader,
    schema: StoreSchema,
    index_path: PathBuf,
    writer: Mutex<Option<IndexWriter<Document>>>,
}

impl std::fmt::Debug for TantivyChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivyChunkStore")
            .field("index_path", &self.index_path)
            .field("schema", &self.schema)
            .finish()
    }
}

impl TantivyChunkStore {
    /// Open the index at `index_path`, creating it when absent.
    pub fn open(index_path: impl AsRef<Path>) -> StorageResult<Self> {
        let index_path = index_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&index_path)?;

        let (schema, store_schema) = StoreSchema::build();
        let index = if index_path.join("meta.json").exists() {
            Index::open_in_dir(&index_path)?
        } else {
            let dir = MmapDirectory::open(&index_path)?;
            Index::create(dir, schema, IndexSettings::default())?
        };

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        tracing::debug!(target: "storage", "opened chunk index at {}", index_path.display());

        Ok(Self {
            index,
            reader,
            schema: store_schema,
            index_path,
            writer: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.index_path
    }

    /// Run `f` with the shared writer, commit, and reload the reader.
    fn write<F>(&self, operation: &str, f: F) -> StorageResult<()>
    where
        F: FnOnce(&mut IndexWriter<Document>, &StoreSchema) -> StorageResult<()>,
    {
        let mut guard = self.writer.lock();
        if guard.is_none() {
            *guard = Some(self.index.writer::<Document>(WRITER_HEAP_BYTES)?);
        }
        let writer = guard.as_mut().ok_or_else(|| StorageError::TantivyOperation {
            operation: operation.to_string(),
            cause: "index writer unavailable".to_string(),
        })?;

        if let Err(e) = f(writer, &self.schema) {
            writer.rollback()?;
            return Err(e);
        }
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    fn term_query(&self, field: tantivy::schema::Field, value: &str) -> Box<dyn Query> {
        Box::new(TermQuery::new(
            Term::from_field_text(field, value),
            IndexRecordOption::Basic,
        ))
    }

    fn kind_query(&self, kind: &str, document_id: Option<&str>) -> Box<dyn Query> {
        let kind_query = self.term_query(self.schema.kind, kind);
        match document_id {
            None => kind_query,
            Some(id) => Box::new(BooleanQuery::new(vec![
                (Occur::Must, kind_query),
                (Occur::Must, self.term_query(self.schema.document_id, id)),
            ])),
        }
    }

    /// Decode the `payload` of every document matching `query`.
    fn collect<T: DeserializeOwned>(&self, query: &dyn Query) -> StorageResult<Vec<T>> {
        let searcher = self.reader.searcher();
        let addresses = searcher.search(query, &DocSetCollector)?;

        let mut records = Vec::with_capacity(addresses.len());
        for address in addresses {
            let doc: Document = searcher.doc(address)?;
            records.push(self.decode(&doc)?);
        }
        Ok(records)
    }

    fn decode<T: DeserializeOwned>(&self, doc: &Document) -> StorageResult<T> {
        let payload = doc
            .get_first(self.schema.payload)
            .and_then(|v| v.as_str())
            .ok_or_else(|| StorageError::InvalidFieldValue {
                field: "payload".to_string(),
                reason: "missing stored payload".to_string(),
            })?;
        Ok(serde_json::from_str(payload)?)
    }

    fn document_doc(&self, record: &DocumentRecord) -> StorageResult<Document> {
        let mut doc = Document::new();
        doc.add_text(self.schema.kind, KIND_DOCUMENT);
        doc.add_text(self.schema.document_id, &record.document_id);
        doc.add_text(self.schema.payload, serde_json::to_string(record)?);
        Ok(doc)
    }

    fn chunk_doc(&self, record: &ChunkRecord) -> StorageResult<Document> {
        let mut doc = Document::new();
        doc.add_text(self.schema.kind, KIND_CHUNK);
        doc.add_text(self.schema.document_id, &record.document_id);
        doc.add_text(self.schema.chunk_id, &record.chunk_id);
        doc.add_u64(self.schema.chunk_index, u64::from(record.chunk_index));
        doc.add_text(self.schema.content, &record.content);
        doc.add_text(self.schema.payload, serde_json::to_string(record)?);
        Ok(doc)
    }

    /// Keyword search over chunk content, for when no embedding gateway is configured.
    pub fn search_text(&self, query: &str, limit: usize) -> StorageResult<Vec<SearchHit>> {
        let parser = QueryParser::for_index(&self.index, vec![self.schema.content]);
        let parsed = parser
            .parse_query(query)
            .map_err(|e| StorageError::InvalidFieldValue {
                field: "query".to_string(),
                reason: e.to_string(),
            })?;

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&*parsed, &TopDocs::with_limit(limit))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: Document = searcher.doc(address)?;
            hits.push(SearchHit {
                chunk: self.decode(&doc)?,
                score,
            });
        }
        Ok(hits)
    }

    pub fn chunk_count(&self) -> StorageResult<usize> {
        let searcher = self.reader.searcher();
        let query = self.kind_query(KIND_CHUNK, None);
        Ok(searcher.search(&*query, &DocSetCollector)?.len())
    }
}

impl ChunkStore for TantivyChunkStore {
    fn replace_document(&self, document: &DocumentRecord, chunks: &[ChunkRecord]) -> StorageResult<()> {
        let document_doc = self.document_doc(document)?;
        let chunk_docs = chunks
            .iter()
            .map(|c| self.chunk_doc(c))
            .collect::<StorageResult<Vec<_>>>()?;

        self.write("replace_document", |writer, schema| {
            writer.delete_term(Term::from_field_text(schema.document_id, &document.document_id));
            writer.add_document(document_doc)?;
            for doc in chunk_docs {
                writer.add_document(doc)?;
            }
            Ok(())
        })?;

        tracing::info!(
            target: "storage",
            "stored document {} with {} chunks",
            document.document_id,
            chunks.len()
        );
        Ok(())
    }

    fn upsert_document(&self, document: &DocumentRecord) -> StorageResult<()> {
        let doc = self.document_doc(document)?;
        self.write("upsert_document", |writer, schema| {
            writer.delete_query(Box::new(BooleanQuery::new(vec![
                (
                    Occur::Must,
                    Box::new(TermQuery::new(
                        Term::from_field_text(schema.kind, KIND_DOCUMENT),
                        IndexRecordOption::Basic,
                    )) as Box<dyn Query>,
                ),
                (
                    Occur::Must,
                    Box::new(TermQuery::new(
                        Term::from_field_text(schema.document_id, &document.document_id),
                        IndexRecordOption::Basic,
                    )),
                ),
            ])))?;
            writer.add_document(doc)?;
            Ok(())
        })
    }

    fn delete_document(&self, document_id: &str) -> StorageResult<bool> {
        let existed = self.get_document(document_id)?.is_some()
            || !self.document_chunks(document_id)?.is_empty();
        if existed {
            self.write("delete_document", |writer, schema| {
                writer.delete_term(Term::from_field_text(schema.document_id, document_id));
                Ok(())
            })?;
        }
        Ok(existed)
    }

    fn get_document(&self, document_id: &str) -> StorageResult<Option<DocumentRecord>> {
        let query = self.kind_query(KIND_DOCUMENT, Some(document_id));
        Ok(self.collect(&*query)?.into_iter().next())
    }

    fn list_documents(&self) -> StorageResult<Vec<DocumentRecord>> {
        let query = self.kind_query(KIND_DOCUMENT, None);
        let mut documents: Vec<DocumentRecord> = self.collect(&*query)?;
        documents.sort_by(|a, b| a.document_id.cmp(&b.document_id));
        Ok(documents)
    }

    fn document_chunks(&self, document_id: &str) -> StorageResult<Vec<ChunkRecord>> {
        let query = self.kind_query(KIND_CHUNK, Some(document_id));
        let mut chunks: Vec<ChunkRecord> = self.collect(&*query)?;
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    fn search_similar(&self, query: &[f32], limit: usize, threshold: f32) -> StorageResult<Vec<SearchHit>> {
        let chunks: Vec<ChunkRecord> = self.collect(&*self.kind_query(KIND_CHUNK, None))?;
        Ok(rank_by_similarity(chunks, query, limit, threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{ChunkMetadata, ContentType};
    use crate::extraction::ExtractedMetadata;
    use crate::storage::DocumentStatus;
    use tempfile::TempDir;

    fn record(doc: &str, index: u32, content: &str, embedding: Vec<f32>) -> ChunkRecord {
        ChunkRecord {
            chunk_id: format!("{doc}_chunk_{index:03}"),
            document_id: doc.to_string(),
            chunk_index: index,
            content: content.to_string(),
            content_type: ContentType::Text,
            embedding,
            all_embeddings: "{}".to_string(),
            extracted_metadata: ExtractedMetadata::default(),
            chunk_metadata: ChunkMetadata::default(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_store_creation() {
        let temp_dir = TempDir::new().unwrap();
        let store = TantivyChunkStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.chunk_count().unwrap(), 0);
        assert!(store.list_documents().unwrap().is_empty());
    }

    #[test]
    fn test_replace_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let document = DocumentRecord::new("doc", "invoice.txt", "txt", 42);
        {
            let store = TantivyChunkStore::open(temp_dir.path()).unwrap();
            store
                .replace_document(
                    &document,
                    &[
                        record("doc", 1, "second chunk", vec![0.0, 1.0]),
                        record("doc", 0, "first chunk", vec![1.0, 0.0]),
                    ],
                )
                .unwrap();
            store
                .replace_document(&document, &[record("doc", 0, "only chunk", vec![1.0, 0.0])])
                .unwrap();
        }

        let store = TantivyChunkStore::open(temp_dir.path()).unwrap();
        let chunks = store.document_chunks("doc").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "only chunk");
        assert_eq!(store.get_document("doc").unwrap().unwrap().filename, "invoice.txt");
    }

    #[test]
    fn test_upsert_keeps_chunks() {
        let temp_dir = TempDir::new().unwrap();
        let store = TantivyChunkStore::open(temp_dir.path()).unwrap();
        let mut document = DocumentRecord::new("doc", "a.txt", "txt", 1);
        store
            .replace_document(&document, &[record("doc", 0, "text", vec![1.0])])
            .unwrap();

        document.mark_failed("later failure");
        store.upsert_document(&document).unwrap();

        assert_eq!(store.list_documents().unwrap().len(), 1);
        assert_eq!(
            store.get_document("doc").unwrap().unwrap().status,
            DocumentStatus::Failed
        );
        assert_eq!(store.chunk_count().unwrap(), 1);
    }

    #[test]
    fn test_search_similar_and_text() {
        let temp_dir = TempDir::new().unwrap();
        let store = TantivyChunkStore::open(temp_dir.path()).unwrap();
        store
            .replace_document(
                &DocumentRecord::new("doc", "a.txt", "txt", 1),
                &[
                    record("doc", 0, "router firmware update", vec![1.0, 0.0]),
                    record("doc", 1, "refund for damaged parcel", vec![0.0, 1.0]),
                ],
            )
            .unwrap();

        let hits = store.search_similar(&[0.9, 0.1], 5, 0.5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.chunk_index, 0);

        let hits = store.search_text("refund", 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.chunk_id, "doc_chunk_001");
    }

    #[test]
    fn test_delete_document() {
        let temp_dir = TempDir::new().unwrap();
        let store = TantivyChunkStore::open(temp_dir.path()).unwrap();
        store
            .replace_document(
                &DocumentRecord::new("doc", "a.txt", "txt", 1),
                &[record("doc", 0, "text", vec![1.0])],
            )
            .unwrap();

        assert!(store.delete_document("doc").unwrap());
        assert!(!store.delete_document("doc").unwrap());
        assert_eq!(store.chunk_count().unwrap(), 0);
    }
}
