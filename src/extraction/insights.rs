//! Enhanced per-chunk metadata.
//!
//! Wraps a schema extraction with heuristic text analysis (language, likely
//! document type, density) and content insights (topics, entities, sections,
//! action items). The aggregator builds document-level metadata from these.

use super::confidence;
use super::extractor::{ExtractionOptions, ExtractionResult, FieldExtractor};
use super::patterns::ACTION_PATTERNS;
use crate::documents::analysis::{is_title_case, is_upper_case};
use crate::patterns::{CURRENCY_AMOUNT, EMAIL, PHONE};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Schemas applied when the caller names none.
pub const DEFAULT_SCHEMAS: [&str; 3] = ["invoice", "support_case", "refund_case"];

const MAX_TOPICS: usize = 10;
const MAX_SECTIONS: usize = 10;
const MAX_ACTION_ITEMS: usize = 10;
const ACTIONS_PER_PATTERN: usize = 3;
const MAX_EMAILS: usize = 3;
const MAX_PHONES: usize = 3;
const MAX_AMOUNTS: usize = 5;
const SECTION_PREVIEW_CHARS: usize = 100;
const SECTION_PREVIEW_MIN_CHARS: usize = 20;
const LIKELY_TYPE_FLOOR: f64 = 0.1;

const ENGLISH_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];
const SPANISH_WORDS: &[&str] = &[
    "el", "la", "de", "que", "y", "a", "en", "un", "es", "se", "no", "te", "lo", "le",
];
const FRENCH_WORDS: &[&str] = &[
    "le", "la", "de", "et", "à", "un", "il", "que", "ne", "se", "ce", "pas",
];

const DOCUMENT_TYPES: [(&str, &[&str]); 4] = [
    (
        "invoice",
        &["invoice", "bill", "payment", "amount", "total", "due date", "invoice number"],
    ),
    (
        "contract",
        &["agreement", "contract", "terms", "conditions", "parties", "signature", "effective date"],
    ),
    (
        "support_case",
        &["support", "ticket", "issue", "problem", "help", "assistance", "complaint"],
    ),
    (
        "refund_case",
        &["refund", "return", "cancel", "reimbursement", "money back"],
    ),
];

const TOPIC_STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "may", "might", "can", "this", "that", "these", "those", "i",
    "you", "he", "she", "it", "we", "they",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageIndicators {
    pub primary_language: String,
    pub confidence: f64,
}

impl Default for LanguageIndicators {
    fn default() -> Self {
        Self {
            primary_language: "en".to_string(),
            confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTypeIndicators {
    /// Types scoring above the floor, best first.
    pub likely_types: Vec<String>,
    /// Keyword hit ratio per type.
    pub confidence_scores: IndexMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentDensity {
    /// Non-whitespace share of all characters.
    pub information_density: f64,
    /// Share of lines that are bullets, numbered items or `key: value` pairs.
    pub structure_score: f64,
    pub average_sentence_length: f64,
    pub sentence_count: usize,
    pub paragraph_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub language_indicators: LanguageIndicators,
    pub document_type_indicators: DocumentTypeIndicators,
    pub content_density: ContentDensity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitySource {
    Extractor,
    Pattern,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportantEntity {
    pub text: String,
    pub label: String,
    pub confidence: f64,
    pub source: EntitySource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSection {
    pub title: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content_preview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub text: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentInsights {
    pub key_topics: Vec<String>,
    pub important_entities: Vec<ImportantEntity>,
    pub document_sections: Vec<DocumentSection>,
    pub action_items: Vec<ActionItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub text_length: usize,
    pub word_count: usize,
    pub sentence_count: usize,
}

/// Everything extracted from one chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub extraction: ExtractionResult,
    pub text_analysis: TextAnalysis,
    pub content_insights: ContentInsights,
    pub processing: ProcessingStats,
    pub schemas_applied: Vec<String>,
    /// Set when the chunk could not be analyzed; such chunks count as failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractedMetadata {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs schema extraction and the heuristic analyses over chunk text.
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    extractor: FieldExtractor,
    options: ExtractionOptions,
}

impl MetadataExtractor {
    pub fn new(extractor: FieldExtractor, options: ExtractionOptions) -> Self {
        Self { extractor, options }
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    pub fn field_extractor(&self) -> &FieldExtractor {
        &self.extractor
    }

    /// Analyze `text` with `schemas`, or [`DEFAULT_SCHEMAS`] when empty.
    pub fn extract_metadata<S: AsRef<str>>(&self, text: &str, schemas: &[S]) -> ExtractedMetadata {
        if text.trim().is_empty() {
            return ExtractedMetadata::failed("no content to analyze");
        }

        let schemas_applied: Vec<String> = if schemas.is_empty() {
            DEFAULT_SCHEMAS.iter().map(|s| s.to_string()).collect()
        } else {
            schemas.iter().map(|s| s.as_ref().to_string()).collect()
        };

        let extraction = self.extractor.extract(text, &schemas_applied, &self.options);
        let content_insights = content_insights(text, &extraction);

        ExtractedMetadata {
            text_analysis: analyze_text(text),
            content_insights,
            processing: processing_stats(text),
            extraction,
            schemas_applied,
            error: None,
        }
    }
}

pub fn analyze_text(text: &str) -> TextAnalysis {
    TextAnalysis {
        language_indicators: detect_language(text),
        document_type_indicators: detect_document_type(text),
        content_density: content_density(text),
    }
}

fn content_insights(text: &str, extraction: &ExtractionResult) -> ContentInsights {
    ContentInsights {
        key_topics: key_topics(text),
        important_entities: important_entities(text, extraction),
        document_sections: document_sections(text),
        action_items: action_items(text),
    }
}

fn processing_stats(text: &str) -> ProcessingStats {
    ProcessingStats {
        text_length: text.chars().count(),
        word_count: text.split_whitespace().count(),
        sentence_count: sentences(text).count(),
    }
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split('.').map(str::trim).filter(|s| !s.is_empty())
}

/// Stop-word presence per language; English at 0.5 when nothing stands out.
pub fn detect_language(text: &str) -> LanguageIndicators {
    let words: HashSet<String> = text
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    let hits = |list: &[&str]| list.iter().filter(|w| words.contains(**w)).count();

    let english = hits(ENGLISH_WORDS);
    let spanish = hits(SPANISH_WORDS);
    let french = hits(FRENCH_WORDS);
    let score = |count: usize| (count as f64 / 10.0).min(0.9);

    let (language, count) = if english > spanish && english > french {
        ("en", english)
    } else if spanish > french {
        ("es", spanish)
    } else if french > 0 {
        ("fr", french)
    } else {
        return LanguageIndicators::default();
    };

    LanguageIndicators {
        primary_language: language.to_string(),
        confidence: score(count),
    }
}

pub fn detect_document_type(text: &str) -> DocumentTypeIndicators {
    let lower = text.to_lowercase();
    let confidence_scores: IndexMap<String, f64> = DOCUMENT_TYPES
        .iter()
        .map(|(name, keywords)| {
            let hits = keywords.iter().filter(|k| lower.contains(**k)).count();
            (name.to_string(), hits as f64 / keywords.len() as f64)
        })
        .collect();

    let mut ranked: Vec<(&String, &f64)> = confidence_scores
        .iter()
        .filter(|(_, score)| **score > LIKELY_TYPE_FLOOR)
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(a.1));

    DocumentTypeIndicators {
        likely_types: ranked.into_iter().map(|(name, _)| name.clone()).collect(),
        confidence_scores,
    }
}

fn is_structured_line(line: &str) -> bool {
    let line = line.trim_start();
    if line.is_empty() {
        return false;
    }
    let numbered = line
        .split_once('.')
        .is_some_and(|(n, _)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
    line.starts_with(['•', '-', '*']) || numbered || line.contains(':')
}

pub fn content_density(text: &str) -> ContentDensity {
    let total = text.chars().count();
    if total == 0 {
        return ContentDensity::default();
    }

    let non_whitespace = text.chars().filter(|c| !c.is_whitespace()).count();
    let lines: Vec<&str> = text.split('\n').collect();
    let structured = lines.iter().filter(|l| is_structured_line(l)).count();

    let sentence_words: Vec<usize> = sentences(text)
        .map(|s| s.split_whitespace().count())
        .collect();
    let average_sentence_length = if sentence_words.is_empty() {
        0.0
    } else {
        sentence_words.iter().sum::<usize>() as f64 / sentence_words.len() as f64
    };

    ContentDensity {
        information_density: non_whitespace as f64 / total as f64,
        structure_score: structured as f64 / lines.len() as f64,
        average_sentence_length,
        sentence_count: sentence_words.len(),
        paragraph_count: text.split("\n\n").filter(|p| !p.trim().is_empty()).count(),
    }
}

/// Repeated non-trivial words, most frequent first.
pub fn key_topics(text: &str) -> Vec<String> {
    let mut frequency: IndexMap<String, usize> = IndexMap::new();
    for raw in text.split_whitespace() {
        let word = raw
            .to_lowercase()
            .trim_matches(|c: char| ".,!?;:\"()[]{}".contains(c))
            .to_string();
        if word.chars().count() > 3 && !TOPIC_STOPWORDS.contains(&word.as_str()) {
            *frequency.entry(word).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = frequency.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(MAX_TOPICS)
        .filter(|(_, count)| *count > 1)
        .map(|(word, _)| word)
        .collect()
}

fn important_entities(text: &str, extraction: &ExtractionResult) -> Vec<ImportantEntity> {
    let mut entities: Vec<ImportantEntity> = extraction
        .entities
        .iter()
        .map(|e| ImportantEntity {
            text: e.text.clone(),
            label: e.label.clone(),
            confidence: e.confidence,
            source: EntitySource::Extractor,
        })
        .collect();

    let patterned = [
        (&*EMAIL, "EMAIL", MAX_EMAILS, confidence::EMAIL_ENTITY),
        (&*PHONE, "PHONE", MAX_PHONES, confidence::PHONE_ENTITY),
        (&*CURRENCY_AMOUNT, "MONEY", MAX_AMOUNTS, confidence::MONEY_ENTITY),
    ];
    for (pattern, label, cap, score) in patterned {
        entities.extend(pattern.find_iter(text).take(cap).map(|m| ImportantEntity {
            text: m.as_str().to_string(),
            label: label.to_string(),
            confidence: score,
            source: EntitySource::Pattern,
        }));
    }

    entities
}

fn looks_like_section_title(line: &str) -> bool {
    line.chars().count() < 100
        && line.split_whitespace().count() <= 10
        && (is_upper_case(line) || is_title_case(line))
        && !line.ends_with('.')
        && !line.ends_with(',')
}

fn preview(line: &str) -> String {
    if line.chars().count() > SECTION_PREVIEW_CHARS {
        let head: String = line.chars().take(SECTION_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        line.to_string()
    }
}

/// Heading-like lines and the span of lines each one covers.
pub fn document_sections(text: &str) -> Vec<DocumentSection> {
    let mut sections = Vec::new();
    let mut current: Option<DocumentSection> = None;

    for (i, raw) in text.split('\n').enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if looks_like_section_title(line) {
            if let Some(done) = current.take() {
                sections.push(done);
            }
            current = Some(DocumentSection {
                title: line.to_string(),
                start_line: i,
                end_line: i,
                content_preview: String::new(),
            });
        } else if let Some(section) = current.as_mut() {
            section.end_line = i;
            if section.content_preview.is_empty()
                && line.chars().count() > SECTION_PREVIEW_MIN_CHARS
            {
                section.content_preview = preview(line);
            }
        }
    }

    sections.extend(current);
    sections.truncate(MAX_SECTIONS);
    sections
}

pub fn action_items(text: &str) -> Vec<ActionItem> {
    let mut items = Vec::new();
    for pattern in ACTION_PATTERNS.iter() {
        for caps in pattern.captures_iter(text).take(ACTIONS_PER_PATTERN) {
            if let Some(m) = caps.get(1) {
                items.push(ActionItem {
                    text: m.as_str().trim().to_string(),
                    confidence: confidence::ACTION_ITEM,
                });
            }
        }
    }
    items.truncate(MAX_ACTION_ITEMS);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;
    use std::sync::Arc;

    #[test]
    fn test_detect_language() {
        let en = detect_language("The cat sat on the mat with a hat and a bat for fun");
        assert_eq!(en.primary_language, "en");
        assert!((en.confidence - 0.5).abs() < 1e-9);

        let es = detect_language("El perro de la casa es que no lo se");
        assert_eq!(es.primary_language, "es");

        let unknown = detect_language("12345 67890");
        assert_eq!(unknown, LanguageIndicators::default());
    }

    #[test]
    fn test_detect_document_type() {
        let indicators = detect_document_type(
            "Invoice number 42. Payment of the total amount is due. Bill attached.",
        );
        assert_eq!(indicators.likely_types.first().map(String::as_str), Some("invoice"));
        assert_eq!(indicators.confidence_scores.len(), 4);
        assert!(!indicators.likely_types.contains(&"refund_case".to_string()));
    }

    #[test]
    fn test_content_density() {
        let density = content_density("Name: Jane\n- item one\nplain line\n\nSecond para. More.");
        assert_eq!(density.paragraph_count, 2);
        assert!((density.structure_score - 0.4).abs() < 1e-9);
        assert!(density.information_density > 0.5 && density.information_density < 1.0);
        assert_eq!(density.sentence_count, 2);
    }

    #[test]
    fn test_key_topics_need_repeats() {
        let topics = key_topics("Router router ROUTER firmware firmware. Once only words here.");
        assert_eq!(topics, vec!["router", "firmware"]);
    }

    #[test]
    fn test_document_sections() {
        let text = "SERVICE AGREEMENT\nThis agreement covers managed network services.\n\nPayment Terms\nNet thirty days from the invoice date applies.\nshort";
        let sections = document_sections(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "SERVICE AGREEMENT");
        assert_eq!(sections[0].start_line, 0);
        assert_eq!(sections[0].end_line, 1);
        assert_eq!(
            sections[0].content_preview,
            "This agreement covers managed network services."
        );
        assert_eq!(sections[1].title, "Payment Terms");
        assert_eq!(sections[1].end_line, 5);
    }

    #[test]
    fn test_action_items() {
        let items = action_items("Please reset the router. Next step: call the ISP. Deadline Friday noon.");
        let texts: Vec<&str> = items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["reset the router.", "call the ISP.", "Friday noon."]);
        assert!(items.iter().all(|i| i.confidence == confidence::ACTION_ITEM));
    }

    #[test]
    fn test_extract_metadata_empty_and_defaults() {
        let extractor = FieldExtractor::new(Arc::new(SchemaRegistry::empty()));
        let metadata = MetadataExtractor::new(extractor, ExtractionOptions::default());

        let failed = metadata.extract_metadata::<&str>("   ", &[]);
        assert!(!failed.is_success());

        let result = metadata.extract_metadata::<&str>("Contact jane@example.com about the refund.", &[]);
        assert!(result.is_success());
        assert_eq!(result.schemas_applied, DEFAULT_SCHEMAS.map(String::from).to_vec());
        assert!(result
            .content_insights
            .important_entities
            .iter()
            .any(|e| e.label == "EMAIL" && e.source == EntitySource::Pattern));
        assert_eq!(result.processing.word_count, 5);
    }
}
