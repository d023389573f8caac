//! Threshold selection: turning a label -> confidence map into a tag set.
//!
//! Two modes: a fixed cutoff, and MCut (Maximum Cut) adaptive thresholding,
//! which separates a high-confidence cluster from the long tail by cutting
//! at the largest gap between adjacent sorted confidence values.

use serde::{Deserialize, Serialize};

use crate::types::ScoreMap;

/// Threshold mode for one tag category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOptions {
    /// Fixed cutoff in [0, 1]; labels with confidence >= threshold are kept.
    pub threshold: f32,

    /// Use MCut instead of the fixed cutoff.
    pub use_mcut: bool,
}

impl Default for ThresholdOptions {
    fn default() -> Self {
        Self {
            threshold: 0.35,
            use_mcut: false,
        }
    }
}

/// Select tags from a confidence map, sorted by confidence descending.
///
/// Ties keep the map's iteration order (lexicographic), so output is fully
/// deterministic for a given input.
pub fn select_tags(scores: &ScoreMap, options: ThresholdOptions) -> Vec<(String, f32)> {
    let mut sorted: Vec<(String, f32)> = scores
        .iter()
        .map(|(tag, &confidence)| (tag.clone(), confidence))
        .collect();
    sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    if options.use_mcut {
        let cut = mcut_threshold(&sorted);
        sorted.retain(|(_, confidence)| *confidence > cut);
    } else {
        sorted.retain(|(_, confidence)| *confidence >= options.threshold);
    }

    sorted
}

/// Compute the MCut cut point for confidences sorted descending.
///
/// The cut is the midpoint of the largest gap between adjacent values.
/// Selection is strictly-greater-than, so with near-equal confidences the
/// cut lands at (or above) the maximum and nothing is selected. A
/// single-entry input has no gap: the cut is the value itself, which
/// excludes the entry.
fn mcut_threshold(sorted: &[(String, f32)]) -> f32 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0].1,
        _ => {
            let mut best_gap = f32::NEG_INFINITY;
            let mut cut = sorted[0].1;
            for pair in sorted.windows(2) {
                let gap = pair[0].1 - pair[1].1;
                if gap > best_gap {
                    best_gap = gap;
                    cut = (pair[0].1 + pair[1].1) / 2.0;
                }
            }
            cut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f32)]) -> ScoreMap {
        pairs
            .iter()
            .map(|(tag, confidence)| (tag.to_string(), *confidence))
            .collect()
    }

    fn fixed(threshold: f32) -> ThresholdOptions {
        ThresholdOptions {
            threshold,
            use_mcut: false,
        }
    }

    fn mcut() -> ThresholdOptions {
        ThresholdOptions {
            threshold: 0.0,
            use_mcut: true,
        }
    }

    #[test]
    fn fixed_selects_at_or_above_threshold() {
        let map = scores(&[("a", 0.9), ("b", 0.35), ("c", 0.1)]);
        let selected = select_tags(&map, fixed(0.35));
        let names: Vec<&str> = selected.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn fixed_is_monotonic_in_threshold() {
        let map = scores(&[("a", 0.92), ("b", 0.7), ("c", 0.41), ("d", 0.05)]);
        let mut previous = usize::MAX;
        for step in 0..=20 {
            let t = step as f32 / 20.0;
            let count = select_tags(&map, fixed(t)).len();
            assert!(count <= previous, "raising t must never grow the set");
            previous = count;
        }
    }

    #[test]
    fn fixed_output_sorted_descending() {
        let map = scores(&[("low", 0.4), ("high", 0.9), ("mid", 0.6)]);
        let selected = select_tags(&map, fixed(0.0));
        let names: Vec<&str> = selected.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(names, vec!["high", "mid", "low"]);
    }

    #[test]
    fn mcut_cuts_at_largest_gap() {
        // Gap between 0.85 and 0.2 dominates; exactly the top two survive.
        let map = scores(&[("a", 0.9), ("b", 0.85), ("c", 0.2), ("d", 0.15)]);
        let selected = select_tags(&map, mcut());
        let names: Vec<&str> = selected.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn mcut_near_equal_confidences_select_nothing_or_little() {
        let map = scores(&[("a", 0.500), ("b", 0.500), ("c", 0.500)]);
        let selected = select_tags(&map, mcut());
        assert!(selected.is_empty());
    }

    #[test]
    fn mcut_single_entry_selects_nothing() {
        let map = scores(&[("only", 0.99)]);
        assert!(select_tags(&map, mcut()).is_empty());
    }

    #[test]
    fn fixed_single_entry_respects_threshold() {
        let map = scores(&[("only", 0.5)]);
        assert_eq!(select_tags(&map, fixed(0.5)).len(), 1);
        assert!(select_tags(&map, fixed(0.6)).is_empty());
    }

    #[test]
    fn empty_map_selects_nothing_in_both_modes() {
        let map = ScoreMap::new();
        assert!(select_tags(&map, fixed(0.0)).is_empty());
        assert!(select_tags(&map, mcut()).is_empty());
    }

    #[test]
    fn ties_keep_lexicographic_order() {
        let map = scores(&[("zebra", 0.5), ("apple", 0.5), ("mango", 0.5)]);
        let selected = select_tags(&map, fixed(0.1));
        let names: Vec<&str> = selected.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(names, vec!["apple", "mango", "zebra"]);
    }
}
