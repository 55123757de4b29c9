//! Tantivy schema for the chunk store.
//!
//! Documents and chunks share one index, told apart by `kind`. Keys are
//! indexed as raw strings for exact-match deletes and lookups; the full record
//! (vectors included) lives as JSON in the stored-only `payload` field.

use tantivy::schema::{
    FAST, Field, IndexRecordOption, STORED, STRING, Schema, SchemaBuilder, TextFieldIndexing,
    TextOptions,
};

pub const KIND_DOCUMENT: &str = "document";
pub const KIND_CHUNK: &str = "chunk";

#[derive(Debug, Clone)]
pub struct StoreSchema {
    pub kind: Field,
    pub document_id: Field,
    pub chunk_id: Field,
    pub chunk_index: Field,
    pub content: Field,
    pub payload: Field,
}

impl StoreSchema {
    pub fn build() -> (Schema, StoreSchema) {
        let mut builder = SchemaBuilder::default();

        let kind = builder.add_text_field("kind", STRING | STORED);
        let document_id = builder.add_text_field("document_id", STRING | STORED);
        let chunk_id = builder.add_text_field("chunk_id", STRING | STORED);
        let chunk_index = builder.add_u64_field("chunk_index", STORED | FAST);

        let text_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("default")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );
        let content = builder.add_text_field("content", text_options);

        let payload = builder.add_text_field("payload", STORED);

        let schema = builder.build();
        let store_schema = StoreSchema {
            kind,
            document_id,
            chunk_id,
            chunk_index,
            content,
            payload,
        };

        (schema, store_schema)
    }
}
