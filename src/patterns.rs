//! Regex tables shared by chunk analysis and field extraction.

use regex::Regex;
use std::sync::LazyLock;

/// Date formats, tried in order: numeric day-first or month-first,
/// ISO-like year-first, and spelled-out month names.
pub static DATE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b").expect("Invalid regex"),
        Regex::new(r"\b\d{4}[/-]\d{1,2}[/-]\d{1,2}\b").expect("Invalid regex"),
        Regex::new(
            r"(?i)\b(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+\d{1,2},?\s+\d{4}\b",
        )
        .expect("Invalid regex"),
    ]
});

/// Currency symbol followed by an amount, e.g. `$1,250.00`.
pub static CURRENCY_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\$€£¥₹]\s*\d+(?:,\d{3})*(?:\.\d+)?").expect("Invalid regex")
});

/// Bare number with optional thousands separators and decimals.
pub static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+(?:,\d{3})*(?:\.\d+)?\b").expect("Invalid regex"));

pub static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("Invalid regex")
});

pub static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?\(?\b[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b")
        .expect("Invalid regex")
});

pub static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).expect("Invalid regex"));

/// Two adjacent capitalized words.
pub static PERSON_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+\s+[A-Z][a-z]+\b").expect("Invalid regex"));

/// Collect distinct matches in order of first appearance, up to `cap`.
pub fn unique_matches(pattern: &Regex, text: &str, cap: usize) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in pattern.find_iter(text) {
        if found.len() >= cap {
            break;
        }
        let value = m.as_str().trim();
        if !value.is_empty() && !found.iter().any(|f| f == value) {
            found.push(value.to_string());
        }
    }
    found
}

/// Distinct date strings across all date formats, up to `cap`.
pub fn find_dates(text: &str, cap: usize) -> Vec<String> {
    let mut dates: Vec<String> = Vec::new();
    for pattern in DATE_PATTERNS.iter() {
        for date in unique_matches(pattern, text, cap) {
            if dates.len() >= cap {
                return dates;
            }
            if !dates.contains(&date) {
                dates.push(date);
            }
        }
    }
    dates
}

/// Parse a matched amount such as `1,250.00` into a float.
pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}
