//! Text cleanup and paragraph splitting ahead of chunking.
//!
//! Normalization keeps blank lines so paragraph boundaries survive:
//! line endings become `\n`, control characters are dropped, and runs of
//! horizontal whitespace inside a line collapse to a single space.

use regex::Regex;
use std::sync::LazyLock;

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("Invalid regex"));

/// C0/C1 control characters other than tab, line feed and carriage return.
fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0b}' | '\u{0c}' | '\u{0e}'..='\u{1f}' | '\u{7f}'..='\u{9f}')
}

/// Clean raw extracted text.
///
/// Returns an empty string for empty or whitespace-only input.
pub fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let lines: Vec<String> = unified
        .split('\n')
        .map(|line| {
            let cleaned: String = line.chars().filter(|c| !is_stripped_control(*c)).collect();
            cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .collect();

    lines.join("\n").trim().to_string()
}

/// Split text into paragraphs on blank-line boundaries, dropping empty ones.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Count characters the way chunk sizes are measured.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_normalize_collapses_whitespace_within_lines() {
        assert_eq!(normalize("  too   many\t\tspaces  "), "too many spaces");
    }

    #[test]
    fn test_normalize_strips_control_characters() {
        assert_eq!(normalize("bell\u{07}ed\u{0c} text\u{85}"), "belled text");
    }

    #[test]
    fn test_normalize_keeps_paragraph_breaks() {
        let text = "First paragraph.\n   \n\n\tSecond   paragraph.";
        let normalized = normalize(text);
        assert_eq!(normalized, "First paragraph.\n\n\nSecond paragraph.");
        assert_eq!(
            split_paragraphs(&normalized),
            vec!["First paragraph.", "Second paragraph."]
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n\t\r\n "), "");
        assert!(split_paragraphs("").is_empty());
        assert!(split_paragraphs("\n\n  \n").is_empty());
    }

    #[test]
    fn test_char_len_counts_characters() {
        assert_eq!(char_len("naïve"), 5);
        assert_eq!("naïve".len(), 6);
    }
}
