use ragdb_chunk::{ChunkingEngine, Strategy};
use ragdb_core::config::ChunkSettings;

fn engine(chunk_size: usize, chunk_overlap: usize, min_chunk_size: usize) -> ChunkingEngine {
    ChunkingEngine::new(ChunkSettings {
        chunk_size,
        chunk_overlap,
        min_chunk_size,
        respect_sentences: true,
    })
}

fn sample_text() -> String {
    let mut paragraphs = Vec::new();
    for i in 0..8 {
        paragraphs.push(format!(
            "Paragraph {i} explains one networking idea in a couple of \
             sentences. It keeps going long enough to be worth indexing on \
             its own, mentioning routers, switches, and subnet masks."
        ));
    }
    paragraphs.join("\n\n")
}

#[test]
fn coverage_is_preserved_across_strategies() {
    let text = sample_text();
    for strategy in [Strategy::Paragraph, Strategy::Sentence, Strategy::Fixed] {
        let e = engine(300, 50, 20);
        let chunks = e.chunk_text(&text, 1, strategy);
        assert!(!chunks.is_empty(), "{strategy:?} produced chunks");

        // Concatenated content covers the text up to overlap duplication and
        // dropped-tiny-chunk bytes; nothing degenerate slips through.
        let total: usize = chunks.iter().map(|c| c.content.len()).sum();
        assert!(
            total + 50 * chunks.len() >= text.trim().len(),
            "{strategy:?}: coverage {total} too small for {}",
            text.len()
        );
        for c in &chunks {
            assert!(c.start_char < c.end_char, "{strategy:?}: empty span");
            assert!(c.end_char <= text.trim().len() + 500);
        }
    }
}

#[test]
fn indices_are_contiguous_for_every_strategy() {
    let text = sample_text();
    for strategy in [Strategy::Paragraph, Strategy::Sentence, Strategy::Fixed] {
        let chunks = engine(250, 40, 30).chunk_text(&text, 1, strategy);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i, "{strategy:?}: gap at {i}");
        }
    }
}

#[test]
fn paragraph_example_from_three_even_paragraphs() {
    // chunk_size=500, overlap=50: three 300-char paragraphs group into
    // {p1,p2} and {p3} with deterministic offsets.
    let p1 = "a".repeat(300);
    let p2 = "b".repeat(300);
    let p3 = "c".repeat(300);
    let text = format!("{p1}\n\n{p2}\n\n{p3}");

    let chunks = engine(500, 50, 50).chunk_text(&text, 1, Strategy::Paragraph);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].chunk_index, 0);
    assert_eq!(chunks[1].chunk_index, 1);
    assert_eq!(chunks[0].content.len(), 602);
    assert_eq!((chunks[0].start_char, chunks[0].end_char), (0, 602));
    assert_eq!((chunks[1].start_char, chunks[1].end_char), (604, 904));
}

#[test]
fn sentence_overlap_carries_trailing_sentences() {
    let text = "First sentence about routing tables. Second sentence about \
                switch fabrics. Third sentence about subnet design. Fourth \
                sentence about firewall rules.";
    let chunks = engine(80, 45, 10).chunk_text(text, 1, Strategy::Sentence);
    assert!(chunks.len() >= 2);

    // Consecutive chunks share their boundary sentence.
    for pair in chunks.windows(2) {
        let first_tail = pair[0]
            .content
            .rsplit(". ")
            .next()
            .map(|t| t.trim_end_matches('.').to_string())
            .filter(|t| t.len() <= 45);
        if let Some(tail) = first_tail {
            assert!(
                pair[1].content.contains(&tail),
                "overlap not carried: {tail:?} vs {:?}",
                pair[1].content
            );
        }
    }
}

#[test]
fn fixed_windows_advance_by_size_minus_overlap() {
    let text = "z".repeat(1000);
    let chunks = engine(200, 50, 10).chunk_text(&text, 1, Strategy::Fixed);

    // No sentence boundaries: raw windows, stride 150.
    assert!(chunks.len() >= 6);
    for pair in chunks.windows(2) {
        assert_eq!(pair[1].start_char, pair[0].end_char - 50);
    }
    assert_eq!(chunks[0].start_char, 0);
    assert_eq!(chunks[0].end_char, 200);
}

#[test]
fn multi_page_documents_get_monotonic_pages() {
    let text = sample_text();
    let chunks = engine(300, 0, 20).chunk_text(&text, 4, Strategy::Paragraph);
    assert!(!chunks.is_empty());

    let pages: Vec<u32> = chunks
        .iter()
        .map(|c| c.page_number.expect("page assigned"))
        .collect();
    assert!(pages.windows(2).all(|w| w[0] <= w[1]), "pages monotonic: {pages:?}");
    assert!(*pages.last().expect("pages") <= 4);
    assert_eq!(pages[0], 1);
}
