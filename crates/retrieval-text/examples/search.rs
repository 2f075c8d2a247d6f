use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use retrieval_core::corpus::CorpusLoader;
use retrieval_text::Bm25Index;

// BM25-only search over a directory of markdown/text files.
// Usage:
//   cargo run -p retrieval-text --example search -- --dir ./docs "financial risk"

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut data_dir = PathBuf::from(".");
    let mut query: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--dir" => {
                if i + 1 >= args.len() { eprintln!("--dir requires a path"); std::process::exit(2); }
                data_dir = PathBuf::from(&args[i + 1]);
                i += 2;
                continue;
            }
            s if s.starts_with('-') => {
                eprintln!("Unknown flag: {}", s);
                std::process::exit(2);
            }
            s => {
                query = Some(s.to_string());
                i += 1;
            }
        }
    }
    let Some(query) = query else {
        eprintln!("Usage: search --dir <path> \"<query>\"");
        std::process::exit(1);
    };

    let mut index = Bm25Index::new();
    for doc in CorpusLoader::default().load_directory(&data_dir)? {
        for chunk in doc.chunks {
            index.add_chunk(Arc::new(chunk));
        }
    }
    println!("Indexed {} chunks (avgdl {:.1})", index.len(), index.avg_doc_len());
    for (rank, hit) in index.search(&query, 10).iter().enumerate() {
        println!("{:>2}. bm25={:.4}  {}  [{}]", rank + 1, -hit.score, hit.chunk.section_label, hit.chunk.id);
    }
    Ok(())
}
