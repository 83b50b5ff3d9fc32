//! Whole-batch deduplication applied at every commit site: promotion,
//! orphan rescue, snapshot expiry, and final-suffix append.

use transcript_telemetry::AccumulatorMetrics;

/// Filter `candidate` against the tail of `stable` (case-folded). Returns
/// the tokens that should actually be committed.
///
/// - Full-duplicate block: if `candidate` (case-folded) appears as a
///   contiguous subsequence of the recent stable window, nothing commits.
/// - Boundary overlap: otherwise, the largest prefix of `candidate` that
///   duplicates the tail of the recent window is dropped.
pub fn deduplicate_before_commit(
    stable: &[String],
    candidate: &[String],
    enabled: bool,
    window_size: usize,
    metrics: &AccumulatorMetrics,
) -> Vec<String> {
    if !enabled || candidate.is_empty() || stable.is_empty() {
        return candidate.to_vec();
    }

    let window = window_size.max(3 * candidate.len());
    let recent_start = stable.len().saturating_sub(window);
    let recent = &stable[recent_start..];

    let cand_lower: Vec<String> = candidate.iter().map(|t| t.to_lowercase()).collect();
    let recent_lower: Vec<String> = recent.iter().map(|t| t.to_lowercase()).collect();

    if cand_lower.len() <= recent_lower.len() {
        let window_len = cand_lower.len();
        for start in 0..=(recent_lower.len() - window_len) {
            if recent_lower[start..start + window_len] == cand_lower[..] {
                metrics.incr_dedup_full_blocks();
                metrics.add_dedup_tokens_removed(candidate.len() as u64);
                return Vec::new();
            }
        }
    }

    let max_overlap = cand_lower.len().min(recent_lower.len());
    let mut best_overlap = 0usize;
    for k in 1..=max_overlap {
        if recent_lower[recent_lower.len() - k..] == cand_lower[..k] {
            best_overlap = k;
        }
    }

    if best_overlap > 0 {
        metrics.incr_dedup_partial_overlaps();
        metrics.add_dedup_tokens_removed(best_overlap as u64);
        return candidate[best_overlap..].to_vec();
    }

    candidate.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_candidate_passes_through() {
        let m = AccumulatorMetrics::new();
        let stable = toks(&["foo", "bar"]);
        let out = deduplicate_before_commit(&stable, &[], true, 30, &m);
        assert!(out.is_empty());
    }

    #[test]
    fn no_overlap_passes_through_unchanged() {
        let m = AccumulatorMetrics::new();
        let stable = toks(&["foo", "bar"]);
        let cand = toks(&["baz", "qux"]);
        let out = deduplicate_before_commit(&stable, &cand, true, 30, &m);
        assert_eq!(out, cand);
    }

    #[test]
    fn full_duplicate_is_blocked() {
        let m = AccumulatorMetrics::new();
        let stable = toks(&["the", "quick", "brown", "fox"]);
        let cand = toks(&["quick", "brown"]);
        let out = deduplicate_before_commit(&stable, &cand, true, 30, &m);
        assert!(out.is_empty());
        assert_eq!(m.snapshot().dedup_full_blocks, 1);
        assert_eq!(m.snapshot().dedup_tokens_removed, 2);
    }

    #[test]
    fn boundary_overlap_trims_prefix() {
        let m = AccumulatorMetrics::new();
        let stable = toks(&["foo", "bar", "baz"]);
        let cand = toks(&["bar", "baz", "qux"]);
        let out = deduplicate_before_commit(&stable, &cand, true, 30, &m);
        assert_eq!(out, toks(&["qux"]));
        assert_eq!(m.snapshot().dedup_partial_overlaps, 1);
        assert_eq!(m.snapshot().dedup_tokens_removed, 2);
    }

    #[test]
    fn comparison_is_case_insensitive() {
        let m = AccumulatorMetrics::new();
        let stable = toks(&["Foo", "Bar"]);
        let cand = toks(&["bar"]);
        let out = deduplicate_before_commit(&stable, &cand, true, 30, &m);
        assert!(out.is_empty());
    }

    #[test]
    fn disabled_passes_everything_through_even_on_full_duplicate() {
        let m = AccumulatorMetrics::new();
        let stable = toks(&["the", "quick", "brown", "fox"]);
        let cand = toks(&["quick", "brown"]);
        let out = deduplicate_before_commit(&stable, &cand, false, 30, &m);
        assert_eq!(out, cand);
        assert_eq!(m.snapshot().dedup_full_blocks, 0);
    }

    #[test]
    fn largest_boundary_overlap_wins() {
        let m = AccumulatorMetrics::new();
        let stable = toks(&["a", "b", "a", "b"]);
        let cand = toks(&["a", "b", "c"]);
        // recent tail "a b a b"; candidate prefixes "a", "a b" both match some
        // suffix of recent -> largest is "a b" (k=2) matching recent[-2..] = "a b"
        let out = deduplicate_before_commit(&stable, &cand, true, 30, &m);
        assert_eq!(out, toks(&["c"]));
    }
}
