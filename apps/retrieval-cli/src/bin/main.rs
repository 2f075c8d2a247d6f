use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use retrieval_core::config::{expand_path, Config, Settings};
use retrieval_core::corpus::CorpusLoader;
use retrieval_core::logging::init_tracing;
use retrieval_core::{Chunk, Embedder, SearchHit, TextOracle};
use retrieval_embed::load_embedder;
use retrieval_hybrid::rerank::rerank;
use retrieval_hybrid::{ContextualEnricher, RerankingRetriever};
use retrieval_cli::{build_oracle, Snapshot};

const EMBED_BATCH: usize = 64;
const USAGE: &str = "Usage:
  retrieval ingest [dir] [--contextual] [--limit N]
  retrieval query \"<text>\" [--top-k N] [--rerank] [--doc <doc_id>]";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i + 1).map(String::as_str).with_context(|| format!("{flag} requires a value"))
}

fn main() -> Result<()> {
    let settings = Config::load()
        .and_then(|c| c.settings())
        .context("loading configuration")?;
    init_tracing(&settings.logging);
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => ingest(&settings, &args),
        "query" => query(&settings, &args),
        "-h" | "--help" | "help" => {
            println!("{USAGE}");
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
    }
}

fn progress_bar(len: usize, unit: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let template = format!("{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {unit} ({{percent}}%) {{msg}}");
    if let Ok(style) = ProgressStyle::default_bar().template(&template) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn ingest(settings: &Settings, args: &[String]) -> Result<()> {
    let mut data_dir: Option<PathBuf> = None;
    let mut contextual = false;
    let mut limit = usize::MAX;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--contextual" => contextual = true,
            "--limit" => {
                limit = flag_value(args, i, "--limit")?.parse().context("--limit requires a number")?;
                i += 1;
            }
            s if s.starts_with('-') => bail!("unknown flag {s}\n{USAGE}"),
            s => data_dir = Some(PathBuf::from(s)),
        }
        i += 1;
    }
    let data_dir = data_dir.unwrap_or_else(|| expand_path(&settings.data.docs_dir));
    println!("Ingesting from {}", data_dir.display());

    let loader = CorpusLoader::new(settings.chunking.build());
    let documents = loader.load_directory_limited(&data_dir, limit)?;
    if documents.is_empty() {
        bail!("no .md/.markdown/.txt documents under {}", data_dir.display());
    }

    let chunks: Vec<Chunk> = if contextual {
        let oracle = build_oracle(&settings.oracle)?;
        if oracle.is_none() {
            tracing::warn!("--contextual given but no oracle.command configured, indexing plain chunks");
        }
        let enricher = ContextualEnricher::new(oracle, settings.enrich);
        let total: usize = documents.iter().map(|d| d.chunks.len()).sum();
        let pb = progress_bar(total, "chunks enriched");
        let mut out = Vec::with_capacity(total);
        for doc in &documents {
            pb.set_message(doc.doc_id.clone());
            out.extend(enricher.enrich_document(&doc.text, &doc.chunks));
            pb.inc(doc.chunks.len() as u64);
        }
        pb.finish_with_message("enrichment done");
        out
    } else {
        documents.into_iter().flat_map(|d| d.chunks).collect()
    };

    let embedder = load_embedder(&settings.embedding)?;
    println!("Embedding {} chunks with {}", chunks.len(), embedder.id());
    let mut snapshot = Snapshot::new(embedder.as_ref());
    let pb = progress_bar(chunks.len(), "chunks");
    for batch in chunks.chunks(EMBED_BATCH) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let embeddings = embedder.embed_batch(&texts)?;
        for (chunk, embedding) in batch.iter().zip(embeddings) {
            snapshot.push(chunk.clone(), embedding)?;
        }
        pb.inc(batch.len() as u64);
    }
    pb.finish_with_message("embedding done");

    let snapshot_path = expand_path(&settings.data.snapshot_path);
    snapshot.save(&snapshot_path)?;
    println!("Ingest complete: {} chunks -> {}", snapshot.len(), snapshot_path.display());
    Ok(())
}

fn query(settings: &Settings, args: &[String]) -> Result<()> {
    let mut text: Option<String> = None;
    let mut top_k = 5usize;
    let mut use_rerank = false;
    let mut doc: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--top-k" | "-k" => {
                top_k = flag_value(args, i, "--top-k")?.parse().context("--top-k requires a number")?;
                i += 1;
            }
            "--rerank" => use_rerank = true,
            "--doc" => {
                doc = Some(flag_value(args, i, "--doc")?.to_string());
                i += 1;
            }
            s if s.starts_with('-') => bail!("unknown flag {s}\n{USAGE}"),
            s => text = Some(s.to_string()),
        }
        i += 1;
    }
    let Some(text) = text else { bail!("missing query text\n{USAGE}") };

    let snapshot = Snapshot::load(&expand_path(&settings.data.snapshot_path))?;
    let embedder = load_embedder(&settings.embedding)?;
    snapshot.ensure_compatible(embedder.as_ref())?;
    let retriever = snapshot.into_retriever(settings)?;
    let query_vec = embedder.embed_one(&text)?;

    let oracle: Option<Arc<dyn TextOracle>> = if use_rerank { build_oracle(&settings.oracle)? } else { None };
    if use_rerank && oracle.is_none() {
        tracing::warn!("--rerank given but no oracle.command configured, showing hybrid order");
    }

    let hits: Vec<SearchHit> = match (doc.as_deref(), use_rerank) {
        (Some(doc_id), false) => retriever.search_in_document(&text, &query_vec, top_k, doc_id)?,
        (Some(doc_id), true) => {
            let fetch = top_k.saturating_mul(settings.rerank.candidate_multiplier);
            let candidates = retriever.search_in_document(&text, &query_vec, fetch, doc_id)?;
            let mut ranked = rerank(oracle.as_deref(), &text, candidates, settings.rerank.content_chars);
            ranked.truncate(top_k);
            ranked
        }
        (None, false) => retriever.search(&text, &query_vec, top_k)?,
        (None, true) => RerankingRetriever::new(retriever, oracle)
            .with_config(settings.rerank)
            .search_with_reranking(&text, &query_vec, top_k)?,
    };

    print_hits(&text, &hits);
    Ok(())
}

fn print_hits(query: &str, hits: &[SearchHit]) {
    println!("\nFound {} results for: \"{}\"", hits.len(), query);
    for (rank, hit) in hits.iter().enumerate() {
        println!("\n  {}. rrf={:.5}  {}  [{}]", rank + 1, hit.score, hit.chunk.section_label, hit.chunk.id);
        let snippet: String = hit.chunk.content.chars().take(200).collect();
        println!("     {}", snippet.replace('\n', " "));
    }
}
