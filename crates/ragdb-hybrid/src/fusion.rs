//! Reciprocal Rank Fusion: score(d) = Σ 1/(k + rank) over the ranked lists
//! containing d, rank 1-based. Rank-only, so no score normalization is
//! needed across retrieval methods.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use ragdb_core::types::{ChunkId, RankedResult, ResultSource};

/// Transient per-candidate bookkeeping during fusion: the summed RRF score
/// and the originating rank in each source list.
#[derive(Debug, Clone)]
struct FusionCandidate {
    result: RankedResult,
    rrf_score: f64,
    lexical_rank: Option<usize>,
    semantic_rank: Option<usize>,
}

/// Fuse a lexical and a semantic ranking. Ids present in both lists sum
/// both contributions and come out tagged `Hybrid`; ids in a single list
/// keep their one contribution and source tag. The result is ordered by
/// descending RRF score (stable: ties keep lexical-then-semantic insertion
/// order) and every `score` field is the RRF score.
pub fn reciprocal_rank_fusion(
    lexical: Vec<RankedResult>,
    semantic: Vec<RankedResult>,
    k: u32,
) -> Vec<RankedResult> {
    let k = f64::from(k);
    let mut order: Vec<ChunkId> = Vec::new();
    let mut by_id: HashMap<ChunkId, FusionCandidate> = HashMap::new();

    for (i, mut result) in lexical.into_iter().enumerate() {
        let rank = i + 1;
        result.source = ResultSource::Lexical;
        order.push(result.id.clone());
        by_id.insert(
            result.id.clone(),
            FusionCandidate {
                result,
                rrf_score: 1.0 / (k + rank as f64),
                lexical_rank: Some(rank),
                semantic_rank: None,
            },
        );
    }

    for (i, mut result) in semantic.into_iter().enumerate() {
        let rank = i + 1;
        let contribution = 1.0 / (k + rank as f64);
        match by_id.entry(result.id.clone()) {
            Entry::Occupied(mut e) => {
                let candidate = e.get_mut();
                candidate.rrf_score += contribution;
                candidate.semantic_rank = Some(rank);
                candidate.result.source = ResultSource::Hybrid;
            }
            Entry::Vacant(e) => {
                result.source = ResultSource::Semantic;
                order.push(result.id.clone());
                e.insert(FusionCandidate {
                    result,
                    rrf_score: contribution,
                    lexical_rank: None,
                    semantic_rank: Some(rank),
                });
            }
        }
    }

    let mut fused: Vec<FusionCandidate> =
        order.into_iter().filter_map(|id| by_id.remove(&id)).collect();
    fused.sort_by(|a, b| {
        b.rrf_score
            .partial_cmp(&a.rrf_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    fused
        .into_iter()
        .map(|c| {
            debug_assert!(c.lexical_rank.is_some() || c.semantic_rank.is_some());
            let mut result = c.result;
            result.score = c.rrf_score;
            result
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, score: f64) -> RankedResult {
        RankedResult {
            id: id.to_string(),
            content: format!("content of {id}"),
            score,
            source: ResultSource::Lexical,
            chunk_index: 0,
            page_number: None,
            document_id: "doc".to_string(),
            filename: "doc.txt".to_string(),
            original_name: None,
        }
    }

    fn list() -> Vec<RankedResult> {
        vec![result("A", 9.0), result("B", 7.5), result("C", 2.0)]
    }

    #[test]
    fn identical_lists_keep_order_and_double_scores() {
        let single = reciprocal_rank_fusion(list(), Vec::new(), 60);
        let doubled = reciprocal_rank_fusion(list(), list(), 60);

        let ids = |v: &[RankedResult]| v.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&single), vec!["A", "B", "C"]);
        assert_eq!(ids(&doubled), ids(&single));

        for (s, d) in single.iter().zip(&doubled) {
            assert!((d.score - 2.0 * s.score).abs() < 1e-15);
            assert_eq!(d.source, ResultSource::Hybrid);
            assert_eq!(s.source, ResultSource::Lexical);
        }
    }

    #[test]
    fn fusing_against_empty_list_preserves_single_contributions() {
        let fused = reciprocal_rank_fusion(list(), Vec::new(), 60);
        assert_eq!(fused.len(), 3);
        assert!((fused[0].score - 1.0 / 61.0).abs() < 1e-15);
        assert!((fused[1].score - 1.0 / 62.0).abs() < 1e-15);
        assert!((fused[2].score - 1.0 / 63.0).abs() < 1e-15);
    }

    #[test]
    fn both_lists_empty_yield_nothing() {
        assert!(reciprocal_rank_fusion(Vec::new(), Vec::new(), 60).is_empty());
    }

    #[test]
    fn documents_in_both_lists_outrank_single_source_peers() {
        let lexical = vec![result("A", 9.0), result("B", 7.5), result("C", 2.0)];
        let semantic = vec![result("C", 0.9), result("D", 0.8)];

        let fused = reciprocal_rank_fusion(lexical, semantic, 60);
        // C: 1/(60+3) + 1/(60+1) beats A's 1/(60+1).
        assert_eq!(fused[0].id, "C");
        assert_eq!(fused[0].source, ResultSource::Hybrid);

        let d = fused.iter().find(|r| r.id == "D").expect("semantic-only result kept");
        assert_eq!(d.source, ResultSource::Semantic);
        let a = fused.iter().find(|r| r.id == "A").expect("lexical-only result kept");
        assert_eq!(a.source, ResultSource::Lexical);
    }

    #[test]
    fn final_score_field_is_the_rrf_score() {
        let fused = reciprocal_rank_fusion(vec![result("A", 123.0)], vec![result("A", 0.4)], 60);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - (1.0 / 61.0 + 1.0 / 61.0)).abs() < 1e-15);
    }
}
