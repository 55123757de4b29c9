use docmill::documents::chunker::overlap_tail;
use docmill::documents::{ContentBlock, ContentType};
use docmill::{ChunkConfig, Chunker, ConvertedContent, ParagraphChunker};

/// Sentences of about 47 characters each until `target_len` is reached.
fn paragraph(seed: usize, target_len: usize) -> String {
    let mut text = format!("Section {seed} opens here.");
    let mut n = 0;
    while text.chars().count() < target_len {
        text.push_str(&format!(" The quarterly report line {n} lists costs."));
        n += 1;
    }
    text
}

fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<docmill::Chunk> {
    ParagraphChunker::new()
        .chunk(&ConvertedContent::from_text(text), "doc", config)
        .unwrap()
}

#[test]
fn test_empty_input_yields_no_chunks() {
    let config = ChunkConfig::default();
    assert!(chunk_text("", &config).is_empty());
    assert!(chunk_text(" \n\n\t  \n", &config).is_empty());

    let missing_text: ConvertedContent = serde_json::from_str(r#"{"tables": []}"#).unwrap();
    let chunks = ParagraphChunker::new()
        .chunk(&missing_text, "doc", &config)
        .unwrap();
    assert!(chunks.is_empty());
}

#[test]
fn test_short_then_long_paragraph() {
    let first = paragraph(0, 50);
    let second = paragraph(1, 2000);
    let text = format!("{first}\n\n{second}");
    let config = ChunkConfig::with_sizes(1000, 200, 100);

    let chunks = chunk_text(&text, &config);

    assert!(chunks.len() >= 3, "got {} chunks", chunks.len());
    let tail = overlap_tail(&chunks[0].content, 100);
    assert!(!tail.is_empty());
    assert!(chunks[1].content.starts_with(&tail));
    assert!(chunks.iter().all(|c| c.char_count() <= 1000));
}

#[test]
fn test_paragraph_coverage_in_order() {
    let paragraphs: Vec<String> = (0..12).map(|i| paragraph(i, 300)).collect();
    let text = paragraphs.join("\n\n");
    let chunks = chunk_text(&text, &ChunkConfig::default());

    let mut last_seen = 0usize;
    for p in &paragraphs {
        let position = chunks
            .iter()
            .position(|c| c.content.contains(p.as_str()))
            .unwrap_or_else(|| panic!("paragraph dropped: {p}"));
        assert!(position >= last_seen, "paragraph out of order");
        last_seen = position;
    }
}

/// Small deterministic generator for mixed-length documents.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

const WORDS: [&str; 12] = [
    "invoice", "router", "delivery", "the", "customer", "reported", "a", "refund",
    "quarterly", "contract", "terms", "status",
];

/// Paragraphs from a few words up to several hundred characters.
fn mixed_document(seed: u64) -> String {
    let mut rng = Lcg(seed);
    let paragraph_count = 2 + rng.next(20);
    let mut paragraphs = Vec::with_capacity(paragraph_count);

    for _ in 0..paragraph_count {
        let target = match rng.next(4) {
            0 => 10 + rng.next(40),
            1 => 50 + rng.next(150),
            2 => 200 + rng.next(300),
            _ => 400 + rng.next(900),
        };
        let mut paragraph = String::new();
        while paragraph.chars().count() < target {
            let words = 3 + rng.next(12);
            let sentence: Vec<&str> = (0..words).map(|_| WORDS[rng.next(WORDS.len())]).collect();
            if !paragraph.is_empty() {
                paragraph.push(' ');
            }
            paragraph.push_str(&sentence.join(" "));
            paragraph.push('.');
        }
        paragraphs.push(paragraph);
    }

    paragraphs.join("\n\n")
}

#[test]
fn test_size_bounds_except_last() {
    for seed in 0..200u64 {
        let max = 300 + (seed as usize * 37) % 201;
        let overlap = 40 + (seed as usize * 13) % 21;
        let config = ChunkConfig::with_sizes(max, 80, overlap);
        let chunks = chunk_text(&mixed_document(seed), &config);
        assert!(!chunks.is_empty(), "seed {seed}: no chunks");

        let (last, rest) = chunks.split_last().unwrap();
        for chunk in rest {
            let len = chunk.char_count();
            assert!(
                (config.min_chunk_size..=config.max_chunk_size).contains(&len),
                "seed {seed}: chunk {}/{} has length {len}",
                chunk.chunk_index,
                chunks.len()
            );
        }
        assert!(last.char_count() <= config.max_chunk_size, "seed {seed}: last chunk too long");
    }
}

#[test]
fn test_short_chunk_between_long_ones_is_absorbed() {
    let config = ChunkConfig::with_sizes(400, 80, 50);
    let text = [paragraph(0, 380), "Short note.".to_string(), paragraph(1, 390), paragraph(2, 300)]
        .join("\n\n");
    let chunks = chunk_text(&text, &config);

    let (_, rest) = chunks.split_last().unwrap();
    assert!(rest.iter().all(|c| c.char_count() >= 80));
    assert!(chunks.iter().any(|c| c.content.contains("Short note.")));
}

#[test]
fn test_oversized_paragraph_respects_max() {
    let config = ChunkConfig::with_sizes(500, 100, 50);
    let chunks = chunk_text(&paragraph(7, 4000), &config);

    assert!(chunks.len() >= 8);
    assert!(chunks.iter().all(|c| c.char_count() <= 500));
    assert!(
        chunks
            .iter()
            .all(|c| c.chunk_metadata.parent_chunk.as_deref() == Some("doc_chunk_000"))
    );
}

#[test]
fn test_overlap_only_when_split() {
    let config = ChunkConfig::default();

    let short = format!("{}\n\n{}", paragraph(0, 200), paragraph(1, 200));
    let single = chunk_text(&short, &config);
    assert_eq!(single.len(), 1);

    let paragraphs: Vec<String> = (0..8).map(|i| paragraph(i, 300)).collect();
    let chunks = chunk_text(&paragraphs.join("\n\n"), &config);
    assert!(chunks.len() > 1);
    for pair in chunks.windows(2) {
        let tail = overlap_tail(&pair[0].content, config.overlap_size);
        assert!(!tail.is_empty());
        assert!(
            pair[1].content.starts_with(&tail),
            "chunk {} does not start with the tail of its predecessor",
            pair[1].chunk_index
        );
    }
}

#[test]
fn test_indices_contiguous_and_tables_images_after_text() {
    let paragraphs: Vec<String> = (0..10).map(|i| paragraph(i, 300)).collect();
    let content = ConvertedContent {
        text: paragraphs.join("\n\n"),
        tables: vec![ContentBlock::new("| a | b |\n| 1 | 2 |")],
        images: vec![ContentBlock::new("chart of revenue")],
    };
    let chunks = ParagraphChunker::new()
        .chunk(&content, "doc", &ChunkConfig::default())
        .unwrap();

    let text: Vec<_> = chunks
        .iter()
        .filter(|c| c.content_type == ContentType::Text)
        .collect();
    for (i, chunk) in text.iter().enumerate() {
        assert_eq!(chunk.chunk_index, i as u32);
        assert_eq!(chunk.chunk_metadata.chunk_index, i as u32);
    }

    let table = chunks
        .iter()
        .find(|c| c.content_type == ContentType::Table)
        .unwrap();
    let image = chunks
        .iter()
        .find(|c| c.content_type == ContentType::Image)
        .unwrap();
    assert_eq!(table.chunk_index, 1000);
    assert_eq!(image.chunk_index, 2000);
    assert_eq!(image.content, "Image 1: chart of revenue");
    assert!(chunks.windows(2).all(|w| w[0].chunk_index < w[1].chunk_index));
}

#[test]
fn test_invalid_config_is_an_error() {
    let result = ParagraphChunker::new().chunk(
        &ConvertedContent::from_text("text"),
        "doc",
        &ChunkConfig::with_sizes(100, 100, 10),
    );
    assert!(result.is_err());
}
