use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use retrieval_core::chunking::{ParagraphChunker, SectionChunker};
use retrieval_core::corpus::CorpusLoader;
use retrieval_core::oracle::{FnOracle, TimeoutOracle};
use retrieval_core::{Error, TextOracle};

#[test]
fn load_directory_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let file_path = dir.join("a.md");
    let mut f = fs::File::create(&file_path).unwrap();
    writeln!(f, "Short text").unwrap();

    let loader = CorpusLoader::default();
    let docs = loader.load_directory(dir).expect("load");

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].doc_id, "a.md");
    assert_eq!(docs[0].chunks.len(), 1, "one section-less document becomes one chunk");
    assert_eq!(docs[0].chunks[0].content, "Short text");
    assert_eq!(docs[0].chunks[0].id, "a.md:0");
}

#[test]
fn load_directory_limited_two_files_limit_one() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "alpha bravo").unwrap();
    fs::write(dir.join("b.txt"), "charlie delta").unwrap();

    let loader = CorpusLoader::default();
    let docs = loader.load_directory_limited(dir, 1).expect("load limited");

    assert_eq!(docs.len(), 1, "limited to one source document");
    assert_eq!(docs[0].doc_id, "a.txt", "files are visited in sorted order");
}

#[test]
fn load_directory_skips_non_text_and_uses_relative_ids() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("reports/q1")).unwrap();
    fs::write(dir.join("reports/q1/summary.md"), "## Revenue\nUp.\n## Costs\nDown.").unwrap();
    fs::write(dir.join("image.png"), [0u8, 1, 2]).unwrap();

    let docs = CorpusLoader::default().load_directory(dir).expect("load");

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].doc_id, "reports/q1/summary.md");
    let labels: Vec<&str> = docs[0].chunks.iter().map(|c| c.section_label.as_str()).collect();
    assert_eq!(labels, ["## Revenue", "## Costs"]);
    assert_eq!(docs[0].chunks[1].id, "reports/q1/summary.md:1");
    assert!(docs[0].chunks[0].meta.contains_key("path"));
}

#[test]
fn load_directory_empty_dir_yields_nothing() {
    let tmp = TempDir::new().unwrap();
    let docs = CorpusLoader::default().load_directory(tmp.path()).expect("load");
    assert!(docs.is_empty());
}

#[test]
fn load_text_with_paragraph_strategy() {
    let loader = CorpusLoader::new(Box::new(ParagraphChunker::default()));
    let doc = loader.load_text("notes", "notes.txt".into(), "first para\n\nsecond para".to_string());
    assert_eq!(doc.chunks.len(), 2);
    assert_eq!(loader.chunker().name(), "paragraph");
    assert_eq!(doc.chunks[1].sequence_index, 1);
}

#[test]
fn timeout_oracle_passes_through_fast_answers() {
    let inner: Arc<dyn TextOracle> = Arc::new(FnOracle(|p: &str| -> retrieval_core::Result<String> { Ok(format!("echo: {p}")) }));
    let oracle = TimeoutOracle::new(inner, Duration::from_secs(5));
    assert_eq!(oracle.complete("hi").unwrap(), "echo: hi");
}

#[test]
fn timeout_oracle_fails_slow_answers() {
    let inner: Arc<dyn TextOracle> = Arc::new(FnOracle(|_: &str| -> retrieval_core::Result<String> {
        std::thread::sleep(Duration::from_millis(500));
        Ok("too late".to_string())
    }));
    let oracle = TimeoutOracle::new(inner, Duration::from_millis(20));
    match oracle.complete("hi") {
        Err(Error::Oracle(msg)) => assert!(msg.contains("timed out"), "{msg}"),
        other => panic!("expected oracle timeout, got {other:?}"),
    }
}

#[test]
fn timeout_oracle_propagates_inner_errors() {
    let inner: Arc<dyn TextOracle> = Arc::new(FnOracle(|_: &str| -> retrieval_core::Result<String> { Err(Error::Oracle("boom".into())) }));
    let oracle = TimeoutOracle::new(inner, Duration::from_secs(1));
    assert!(matches!(oracle.complete("x"), Err(Error::Oracle(m)) if m == "boom"));
}

#[test]
fn section_chunker_marker_is_configurable() {
    let chunker = SectionChunker::new("# ");
    let sections = chunker.split_sections("intro\n# One\nbody\n# Two\n");
    assert_eq!(sections, ["intro\n", "# One\nbody\n", "# Two\n"]);
}
