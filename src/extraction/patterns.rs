//! Regex tables for field extraction.
//!
//! Fixed patterns are compiled once. Patterns built from a field name are
//! compiled on first use and memoized.

use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Amount with optional thousands separators and decimals, as a capture body.
const AMOUNT: &str = r"(\d+(?:,\d{3})*(?:\.\d+)?)";

/// Fixed span patterns, keyed by field name.
pub static SPAN_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("payment_terms", r"(?i)\bpayment\s+terms?[:\s]+([^.\n]+)"),
        ("termination_clause", r"(?i)\btermination(?:\s+clause)?[:\s]+([^.\n]+)"),
        ("governing_law", r"(?i)\bgoverning\s+law[:\s]+([^.\n]+)"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("Invalid regex")))
    .collect()
});

/// `Invoice #INV-1`, `Invoice No. 42`, `invoice number: A-7`.
pub static INVOICE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?i:invoice(?:\s+(?:no|number|nr))?)\.?\s*[:#]?\s*([A-Z0-9][A-Z0-9-]*)")
        .expect("Invalid regex")
});

/// `Ref: ABC-123`, `Reference No. 9`.
pub static GENERIC_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?i:ref(?:erence)?(?:\s+(?:no|number))?)\.?\s*[:#]?\s*([A-Z0-9][A-Z0-9-]*)")
        .expect("Invalid regex")
});

pub static CURRENCY_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\$€£¥₹]").expect("Invalid regex"));

pub static CURRENCY_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(USD|EUR|GBP|NGN|CNY|JPY|INR|CAD|AUD|CHF)\b").expect("Invalid regex")
});

/// Customer labels, tried in order.
pub static CUSTOMER_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)\bcustomer\s*:\s*([^.\n]+)").expect("Invalid regex"),
        Regex::new(r"(?i)\bbill\s+to\s*:\s*([^.\n]+)").expect("Invalid regex"),
        Regex::new(r"(?i)\bsold\s+to\s*:\s*([^.\n]+)").expect("Invalid regex"),
        Regex::new(r"(?i)\bclient\s*:\s*([^.\n]+)").expect("Invalid regex"),
    ]
});

/// Contract party phrasings. Every capture group is a party candidate;
/// `parties:` lists are split further by the caller.
pub static PARTY_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    const NAME: &str = r"([A-Z][\w&.'-]*(?:\s+[A-Z][\w&.'-]*)*)";
    [
        Regex::new(r"(?i)\bbetween\s+([^,\n]+?)\s+and\s+([^,.;\n]+)").expect("Invalid regex"),
        Regex::new(r"(?i)\bparties\s*:\s*([^.\n]+)").expect("Invalid regex"),
        Regex::new(&format!(r"{NAME}\s+and\s+{NAME}\s+(?:hereby\s+)?agree"))
            .expect("Invalid regex"),
        Regex::new(&format!(r"{NAME}\s*,\s*{NAME}\s+hereby")).expect("Invalid regex"),
    ]
});

/// Separators inside a `parties:` list.
pub static PARTY_LIST_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:,|;|\band\b)\s*").expect("Invalid regex"));

/// Amount after any total-like keyword.
pub static TOTAL_FAMILY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:grand\s+total|total|amount|sum)\b[:\s]*[\$€£¥₹]?\s*{AMOUNT}"
    ))
    .expect("Invalid regex")
});

pub static KEY_PHRASE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)\b(?:payment\s+terms|termination\s+clause|governing\s+law)\b")
            .expect("Invalid regex"),
        Regex::new(r"(?i)\b(?:effective\s+date|due\s+date|issue\s+date)\b")
            .expect("Invalid regex"),
        Regex::new(r"(?i)\b(?:parties|signatures|renewal)\b").expect("Invalid regex"),
    ]
});

/// Imperative requests, labeled tasks and deadlines.
pub static ACTION_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)\b(?:please|kindly|should|must|need\s+to|required\s+to)\s+([^.!?]+[.!?])")
            .expect("Invalid regex"),
        Regex::new(r"(?i)\b(?:action|task|todo|follow.?up|next\s+step)[:\s]+([^.!?]+[.!?])")
            .expect("Invalid regex"),
        Regex::new(r"(?i)\b(?:deadline|due\s+date|by)\s+([^.!?]+[.!?])").expect("Invalid regex"),
    ]
});

static DERIVED: LazyLock<RwLock<HashMap<String, Regex>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Compile `pattern`, reusing an earlier compilation when available.
fn cached(pattern: String) -> Option<Regex> {
    if let Some(re) = DERIVED.read().get(&pattern) {
        return Some(re.clone());
    }

    match Regex::new(&pattern) {
        Ok(re) => {
            DERIVED.write().insert(pattern, re.clone());
            Some(re)
        }
        Err(e) => {
            tracing::warn!(target: "extract", "cannot compile derived pattern: {e}");
            None
        }
    }
}

/// `effective_date` becomes `effective\s+date`.
pub fn field_words(field_name: &str) -> String {
    field_name
        .split('_')
        .filter(|part| !part.is_empty())
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}

/// `Field Name: value` up to the end of the sentence or line.
pub fn label_pattern(field_name: &str) -> Option<Regex> {
    let words = field_words(field_name);
    if words.is_empty() {
        return None;
    }
    cached(format!(r"(?i)\b{words}\s*:\s*([^.\n]+)"))
}

/// The field's words as a standalone phrase.
pub fn phrase_pattern(field_name: &str) -> Option<Regex> {
    let words = field_words(field_name);
    if words.is_empty() {
        return None;
    }
    cached(format!(r"(?i)\b{words}\b"))
}

/// An amount, optionally currency-prefixed, right after `keyword`.
pub fn keyword_amount_pattern(keyword: &str) -> Option<Regex> {
    cached(format!(r"(?i)\b{keyword}\b[:\s]*[\$€£¥₹]?\s*{AMOUNT}"))
}
