//! Table rendering for terminal output.

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

/// A table with the shared preset and the given header.
pub fn new_table<I, S>(header: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<comfy_table::Cell>,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// First `max_chars` characters of `text` on one line.
pub fn one_line(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = flat.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_line_flattens_and_truncates() {
        assert_eq!(one_line("a\n\nb   c", 10), "a b c");
        assert_eq!(one_line("abcdef", 3), "abc...");
    }

    #[test]
    fn test_new_table_renders_header() {
        let mut table = new_table(["Id", "Name"]);
        table.add_row(vec!["1", "invoice"]);
        let rendered = table.to_string();
        assert!(rendered.contains("Id"));
        assert!(rendered.contains("invoice"));
    }
}
