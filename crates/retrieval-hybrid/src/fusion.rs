use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use retrieval_core::{Chunk, SearchHit, SourceKind};

/// Standard RRF damping constant (Cormack et al., SIGIR 2009).
pub const DEFAULT_RRF_K: f32 = 60.0;

/// Merges ranked lists with `score(d) = Σ 1 / (k + rank(d))`, ranks 1-based.
///
/// Hits are identified by `chunk.id`. Each input list must already be ordered
/// best first; its own scores are ignored. The result is sorted by descending
/// fused score (`SourceKind::Fused`, higher is better) and ties keep the order
/// in which documents were first seen across `lists`.
pub fn reciprocal_rank_fusion(lists: &[Vec<SearchHit>], k: f32) -> Vec<SearchHit> {
    let mut slot_of: HashMap<&str, usize> = HashMap::new();
    let mut fused: Vec<(Arc<Chunk>, f32)> = Vec::new();

    for list in lists {
        for (rank, hit) in list.iter().enumerate() {
            let contribution = 1.0 / (k + (rank + 1) as f32);
            match slot_of.get(hit.id()) {
                Some(&slot) => fused[slot].1 += contribution,
                None => {
                    slot_of.insert(hit.id(), fused.len());
                    fused.push((Arc::clone(&hit.chunk), contribution));
                }
            }
        }
    }

    let mut merged: Vec<SearchHit> =
        fused.into_iter().map(|(chunk, score)| SearchHit::new(chunk, score, SourceKind::Fused)).collect();
    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    merged
}
