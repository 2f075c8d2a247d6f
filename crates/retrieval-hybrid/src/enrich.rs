//! Contextual enrichment: prefixes each chunk with a short oracle-written
//! description of where it sits in its document, before indexing.

use std::sync::Arc;

use retrieval_core::config::EnrichConfig;
use retrieval_core::traits::TextOracle;
use retrieval_core::Chunk;

/// Meta key holding the situating context of an enriched chunk.
pub const CONTEXT_META_KEY: &str = "context";

/// What the oracle is shown about the surrounding document.
#[derive(Debug, Clone, Copy)]
pub enum DocumentContext<'a> {
    /// The whole source text.
    Full(&'a str),
    /// The first `starter_chunks` chunks plus the `nearby_chunks` chunks right
    /// before `index`, in document order, without the target itself.
    Bounded { chunks: &'a [Chunk], index: usize, starter_chunks: usize, nearby_chunks: usize },
}

impl<'a> DocumentContext<'a> {
    /// Full text when the document is at most `full_document_chars` long,
    /// otherwise the bounded window around `chunks[index]`.
    pub fn select(document_text: &'a str, chunks: &'a [Chunk], index: usize, config: &EnrichConfig) -> Self {
        if document_text.chars().count() <= config.full_document_chars {
            DocumentContext::Full(document_text)
        } else {
            DocumentContext::Bounded {
                chunks,
                index,
                starter_chunks: config.starter_chunks,
                nearby_chunks: config.nearby_chunks,
            }
        }
    }

    pub fn render(&self) -> String {
        match *self {
            DocumentContext::Full(text) => text.to_string(),
            DocumentContext::Bounded { chunks, index, starter_chunks, nearby_chunks } => {
                let index = index.min(chunks.len());
                let mut picked: Vec<usize> = (0..starter_chunks.min(chunks.len())).filter(|&i| i != index).collect();
                for i in index.saturating_sub(nearby_chunks)..index {
                    if !picked.contains(&i) {
                        picked.push(i);
                    }
                }
                picked.iter().map(|&i| chunks[i].content.as_str()).collect::<Vec<_>>().join("\n\n")
            }
        }
    }
}

pub fn enrichment_prompt(chunk: &str, context: &str) -> String {
    format!(
        "Here is a chunk from a larger document:

<chunk>
{chunk}
</chunk>

Here is context from the larger document:

<document>
{context}
</document>

Please write a short, succinct context (2-3 sentences) to situate this chunk within the overall document. \
This context will help with retrieval later.

Focus on:
- What section/topic this chunk covers
- How it relates to other sections
- Key concepts or entities mentioned

Context:"
    )
}

/// Asks the oracle for the situating context of `chunk`. `None` when there is
/// no oracle, it fails, or it answers with blank text.
pub fn situating_context(chunk: &str, context: &DocumentContext<'_>, oracle: Option<&dyn TextOracle>) -> Option<String> {
    let oracle = oracle?;
    match oracle.complete(&enrichment_prompt(chunk, &context.render())) {
        Ok(answer) if !answer.trim().is_empty() => Some(answer.trim().to_string()),
        Ok(_) => {
            tracing::warn!("oracle returned an empty context, keeping chunk as is");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "contextual enrichment failed, keeping chunk as is");
            None
        }
    }
}

/// `situating_context + "\n\n" + chunk`, or `chunk` unchanged when no context
/// could be produced.
pub fn enrich(chunk: &str, context: &DocumentContext<'_>, oracle: Option<&dyn TextOracle>) -> String {
    match situating_context(chunk, context, oracle) {
        Some(added) => format!("{added}\n\n{chunk}"),
        None => chunk.to_string(),
    }
}

/// Enriches whole documents chunk by chunk.
pub struct ContextualEnricher {
    oracle: Option<Arc<dyn TextOracle>>,
    config: EnrichConfig,
}

impl ContextualEnricher {
    pub fn new(oracle: Option<Arc<dyn TextOracle>>, config: EnrichConfig) -> Self {
        Self { oracle, config }
    }

    pub fn has_oracle(&self) -> bool {
        self.oracle.is_some()
    }

    /// Returns `chunks` with enriched content. Ids, labels and order are kept;
    /// enriched chunks also carry their context under [`CONTEXT_META_KEY`].
    pub fn enrich_document(&self, document_text: &str, chunks: &[Chunk]) -> Vec<Chunk> {
        let mut enriched_count = 0usize;
        let out: Vec<Chunk> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let context = DocumentContext::select(document_text, chunks, i, &self.config);
                match situating_context(&chunk.content, &context, self.oracle.as_deref()) {
                    Some(added) => {
                        enriched_count += 1;
                        chunk
                            .with_content(format!("{added}\n\n{}", chunk.content))
                            .with_meta(CONTEXT_META_KEY, added)
                    }
                    None => chunk.clone(),
                }
            })
            .collect();
        tracing::debug!(chunks = chunks.len(), enriched = enriched_count, "enriched document");
        out
    }
}
