//! Common utilities shared across modules.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Hex characters of the content hash kept in a document id.
const DOCUMENT_ID_LEN: usize = 16;

/// Current time as an RFC 3339 string, the format stored on records.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Render a stored RFC 3339 timestamp for display, falling back to the raw value.
pub fn display_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// SHA-256 of `bytes` as lowercase hex.
pub fn calculate_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Stable document id derived from file content, so re-processing the same
/// bytes replaces the same document.
pub fn document_id_for(bytes: &[u8]) -> String {
    let mut hash = calculate_hash(bytes);
    hash.truncate(DOCUMENT_ID_LEN);
    hash
}
