use retrieval_core::chunking::{
    Chunker, FixedSizeChunker, ParagraphChunker, SectionChunker, SentenceChunker, SENTENCE_RANGE_META_KEY,
};

fn contents(chunker: &dyn Chunker, text: &str) -> Vec<String> {
    chunker.chunk("doc", text).into_iter().map(|c| c.content).collect()
}

#[test]
fn sections_split_at_header_lines() {
    let text = "## Intro\nThe cat sat.\n## Risks\nFinancial risk is high.\n";
    let chunks = SectionChunker::default().chunk("report.md", text);

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].content, "## Intro\nThe cat sat.");
    assert_eq!(chunks[0].section_label, "## Intro");
    assert_eq!(chunks[1].content, "## Risks\nFinancial risk is high.");
    assert_eq!(chunks[1].section_label, "## Risks");
    assert_eq!(chunks[1].sequence_index, 1);
    assert_eq!(chunks[1].id, "report.md:1");
}

#[test]
fn preamble_before_first_header_is_its_own_chunk() {
    let text = "Executive summary here.\n\n## Details\nMore.";
    assert_eq!(
        contents(&SectionChunker::default(), text),
        ["Executive summary here.", "## Details\nMore."]
    );
}

#[test]
fn no_markers_yields_single_trimmed_chunk() {
    let text = "\n\n  just some text\nacross lines  \n";
    assert_eq!(contents(&SectionChunker::default(), text), ["just some text\nacross lines"]);
}

#[test]
fn blank_input_yields_no_chunks() {
    assert!(SectionChunker::default().chunk("d", "").is_empty());
    assert!(SectionChunker::default().chunk("d", "  \n\t\n").is_empty());
}

#[test]
fn empty_sections_are_dropped() {
    let text = "   \n## A\nalpha\n## B\n## C\ngamma";
    let got = contents(&SectionChunker::default(), text);
    assert_eq!(got, ["## A\nalpha", "## B", "## C\ngamma"]);
}

#[test]
fn deeper_headers_and_indented_markers_do_not_split() {
    let text = "## Top\n### Sub\ntext\n  ## indented\nmore";
    assert_eq!(contents(&SectionChunker::default(), text).len(), 1);
}

#[test]
fn rechunking_joined_chunks_is_idempotent() {
    let text = "Preface line\n\n## Intro\nThe cat sat.\n\n\n## Risks\nFinancial risk is high.\n## Outlook\n\nStable.\n";
    let chunker = SectionChunker::default();
    let first = contents(&chunker, text);
    let rejoined = first.join("\n");
    let second = contents(&chunker, &rejoined);
    assert_eq!(first, second);
}

#[test]
fn chunking_is_deterministic() {
    let text = "## A\none\n## B\ntwo";
    let chunker = SectionChunker::default();
    assert_eq!(chunker.chunk("d", text), chunker.chunk("d", text));
}

#[test]
fn long_paragraphs_are_windowed_with_overlap() {
    let words: Vec<String> = (0..25).map(|i| format!("w{i}")).collect();
    let text = format!("short one\n\n{}", words.join(" "));
    let chunker = ParagraphChunker { max_words: 10, overlap_percent: 0.2 };
    let got = contents(&chunker, &text);

    assert_eq!(got[0], "short one");
    // windows of 10 words, stepping 8
    assert_eq!(got[1].split_whitespace().count(), 10);
    assert!(got[1].starts_with("w0 "));
    assert!(got[2].starts_with("w8 "));
    assert!(got.last().unwrap().ends_with("w24"));
}

#[test]
fn fixed_windows_overlap_and_cover_text() {
    let text: String = "abcdefghij".repeat(3);
    let chunker = FixedSizeChunker { chunk_chars: 12, overlap_chars: 2 };
    let got = contents(&chunker, &text);

    assert_eq!(got[0], "abcdefghijab");
    assert_eq!(got[1], "abcdefghijab", "second window starts 10 chars later");
    assert!(text.ends_with(got.last().unwrap().as_str()));
}

#[test]
fn fixed_windows_always_advance_when_overlap_exceeds_window() {
    let chunker = FixedSizeChunker { chunk_chars: 3, overlap_chars: 10 };
    let got = contents(&chunker, "abcdef");
    assert_eq!(got, ["abc", "bcd", "cde", "def"]);
}

#[test]
fn fixed_windows_respect_multibyte_chars() {
    let chunker = FixedSizeChunker { chunk_chars: 2, overlap_chars: 0 };
    assert_eq!(contents(&chunker, "héllo"), ["hé", "ll", "o"]);
}

#[test]
fn sentences_split_after_terminal_punctuation() {
    let sentences = SentenceChunker::split_sentences("Revenue grew.  Costs fell!\nWhy? Version 1.5 shipped");
    assert_eq!(sentences, ["Revenue grew.", "Costs fell!", "Why?", "Version 1.5 shipped"]);
    assert!(SentenceChunker::split_sentences("  \n ").is_empty());
}

#[test]
fn sentences_are_grouped_with_their_range() {
    let text = "One. Two. Three. Four. Five.";
    let chunks = SentenceChunker::default().chunk("notes", text);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].content, "One. Two. Three.");
    assert_eq!(chunks[1].content, "Four. Five.");
    assert_eq!(chunks[0].meta[SENTENCE_RANGE_META_KEY], "0-3");
    assert_eq!(chunks[1].meta[SENTENCE_RANGE_META_KEY], "3-5");
    assert_eq!(chunks[1].id, "notes:1");

    let singles = contents(&SentenceChunker { sentences_per_chunk: 1 }, "A. B.\n\nC! ");
    assert_eq!(singles, ["A.", "B.", "C!"]);
    assert!(SentenceChunker::default().chunk("e", "").is_empty());
    assert_eq!(SentenceChunker::default().name(), "sentence");
}

