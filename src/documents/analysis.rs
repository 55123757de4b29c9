//! Lightweight per-chunk content analysis.
//!
//! Computes the `chunk_metadata` attached to every chunk at creation time:
//! size counters plus regex-detected headers, dates, amounts and contact-style
//! entities.

use super::types::{ChunkMetadata, ContentType, SimpleEntities};
use crate::patterns::{self, CURRENCY_AMOUNT, EMAIL, NUMBER, PERSON_NAME, PHONE, URL};

const HEADER_SCAN_LINES: usize = 5;
const MAX_HEADERS: usize = 3;
const MAX_DATES: usize = 5;
const MAX_NUMBERS: usize = 10;
const MAX_NAMES: usize = 5;
const MAX_CONTACTS: usize = 10;

/// Analyze text content and build its metadata.
pub fn analyze(content: &str, chunk_index: u32) -> ChunkMetadata {
    ChunkMetadata {
        chunk_type: ContentType::Text,
        length: content.chars().count(),
        word_count: content.split_whitespace().count(),
        chunk_index,
        headers: extract_headers(content),
        dates: patterns::find_dates(content, MAX_DATES),
        numbers: extract_numbers(content),
        entities: extract_entities(content),
        ..Default::default()
    }
}

/// Metadata for a table or image chunk: counters only, no text heuristics.
pub fn describe_block(
    content: &str,
    chunk_type: ContentType,
    chunk_index: u32,
    source_metadata: &serde_json::Value,
) -> ChunkMetadata {
    ChunkMetadata {
        chunk_type,
        length: content.chars().count(),
        word_count: content.split_whitespace().count(),
        chunk_index,
        source_metadata: (!source_metadata.is_null()).then(|| source_metadata.clone()),
        ..Default::default()
    }
}

/// Short lines near the top of a chunk that read like headings.
pub fn extract_headers(content: &str) -> Vec<String> {
    content
        .lines()
        .take(HEADER_SCAN_LINES)
        .map(str::trim)
        .filter(|line| looks_like_header(line))
        .take(MAX_HEADERS)
        .map(str::to_string)
        .collect()
}

pub(crate) fn looks_like_header(line: &str) -> bool {
    !line.is_empty()
        && line.chars().count() < 100
        && line.split_whitespace().count() <= 10
        && (is_upper_case(line) || is_title_case(line))
}

/// At least one cased character and no lowercase ones.
pub(crate) fn is_upper_case(text: &str) -> bool {
    let mut cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

/// Every cased run starts with an uppercase letter followed only by lowercase ones.
pub(crate) fn is_title_case(text: &str) -> bool {
    let mut cased = false;
    let mut previous_cased = false;
    for c in text.chars() {
        if c.is_uppercase() {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            cased = true;
        } else if c.is_lowercase() {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            cased = true;
        } else {
            previous_cased = false;
        }
    }
    cased
}

fn extract_numbers(content: &str) -> Vec<String> {
    let mut numbers = patterns::unique_matches(&CURRENCY_AMOUNT, content, MAX_NUMBERS);
    for number in patterns::unique_matches(&NUMBER, content, MAX_NUMBERS) {
        if numbers.len() >= MAX_NUMBERS {
            break;
        }
        if !numbers.contains(&number) {
            numbers.push(number);
        }
    }
    numbers
}

fn extract_entities(content: &str) -> SimpleEntities {
    SimpleEntities {
        emails: patterns::unique_matches(&EMAIL, content, MAX_CONTACTS),
        phones: patterns::unique_matches(&PHONE, content, MAX_CONTACTS),
        urls: patterns::unique_matches(&URL, content, MAX_CONTACTS),
        names: patterns::unique_matches(&PERSON_NAME, content, MAX_NAMES),
    }
}
