//! Boundary adapter for chunks produced by an external chunker.
//!
//! Upstream tools hand over chunk lists in several loose JSON shapes. This
//! module normalizes all of them into [`ExternalChunk`] once, so the rest of
//! the pipeline only ever sees the canonical shape.
//!
//! Accepted inputs:
//! - an object with a `data` array (wrapper emitted by flow tools)
//! - a bare array of chunks
//! - a single chunk object or a plain string
//!
//! Each chunk object takes its text from `text` or `content`, its id from `id`
//! or `chunk_id`, and its document from `document_id` or `doc_id`. Missing ids
//! fall back to `chunk_{i}` / `doc_{i}` by position.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const TEXT_KEYS: [&str; 2] = ["text", "content"];
const CHUNK_ID_KEYS: [&str; 2] = ["id", "chunk_id"];
const DOCUMENT_ID_KEYS: [&str; 2] = ["document_id", "doc_id"];

/// A chunk of text handed over by an external chunker, in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalChunk {
    pub text: String,
    pub document_id: String,
    pub chunk_id: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

/// Normalize any accepted representation into a list of chunks.
///
/// Entries whose text is empty after trimming are dropped.
pub fn adapt(input: &Value) -> Vec<ExternalChunk> {
    let items: Vec<&Value> = match input {
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(inner @ Value::Object(_)) => vec![inner],
            _ => vec![input],
        },
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    };

    let chunks: Vec<ExternalChunk> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| adapt_item(i, item))
        .collect();

    tracing::debug!(target: "pipeline", "adapted {} external chunks", chunks.len());
    chunks
}

fn adapt_item(position: usize, item: &Value) -> Option<ExternalChunk> {
    let (text, chunk_id, document_id, metadata) = match item {
        Value::Object(map) => {
            let text = first_string(map, &TEXT_KEYS).unwrap_or_else(|| item.to_string());
            let chunk_id = first_string(map, &CHUNK_ID_KEYS);
            let document_id = first_string(map, &DOCUMENT_ID_KEYS);
            (text, chunk_id, document_id, chunk_metadata(map))
        }
        Value::String(s) => (s.clone(), None, None, Value::Null),
        Value::Null => return None,
        other => (other.to_string(), None, None, Value::Null),
    };

    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    Some(ExternalChunk {
        text: text.to_string(),
        chunk_id: chunk_id.unwrap_or_else(|| format!("chunk_{position}")),
        document_id: document_id.unwrap_or_else(|| format!("doc_{position}")),
        metadata,
    })
}

/// First present key rendered as a string; numeric ids are accepted.
fn first_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Explicit `metadata`, or every non-identifying key when that is absent or empty.
fn chunk_metadata(map: &Map<String, Value>) -> Value {
    match map.get("metadata") {
        Some(Value::Object(m)) if !m.is_empty() => return Value::Object(m.clone()),
        Some(other) if !other.is_null() && !matches!(other, Value::Object(_)) => {
            return other.clone();
        }
        _ => {}
    }

    let rest: Map<String, Value> = map
        .iter()
        .filter(|(key, _)| {
            !TEXT_KEYS.contains(&key.as_str())
                && !CHUNK_ID_KEYS.contains(&key.as_str())
                && !DOCUMENT_ID_KEYS.contains(&key.as_str())
                && key.as_str() != "metadata"
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if rest.is_empty() {
        Value::Null
    } else {
        Value::Object(rest)
    }
}
