//! Quintile scoring and the segment-label rule table.

use std::cmp::Ordering;

/// Requested number of quantile bins per metric. Duplicate bin edges
/// collapse, so the effective level count can be lower.
pub const QUANTILE_BINS: usize = 5;

/// Fallback label when no rule matches.
pub const SEGMENT_OTHER: &str = "Other";

/// One entry of the priority-ordered segment rule table.
pub struct SegmentRule {
    pub label: &'static str,
    pub applies: fn(u8, u8, u8) -> bool,
}

/// The rule table, evaluated top to bottom; the first matching rule
/// wins. Rules overlap on purpose, so the ordering is a contract.
pub const SEGMENT_RULES: &[SegmentRule] = &[
    SegmentRule { label: "Champions", applies: |r, f, m| r >= 4 && f >= 4 && m >= 4 },
    SegmentRule { label: "Loyal Customers", applies: |r, f, _| r >= 4 && f >= 3 },
    SegmentRule { label: "Potential Loyalists", applies: |r, _, m| r >= 3 && m >= 3 },
    SegmentRule { label: "Big Spenders", applies: |r, _, m| r <= 2 && m >= 3 },
    SegmentRule { label: "At Risk", applies: |r, f, _| r <= 2 && f <= 2 },
    SegmentRule { label: "Needs Attention", applies: |r, f, _| r >= 3 && f <= 2 },
];

/// Resolve the segment label for a scored row.
pub fn segment_label(r_score: u8, f_score: u8, m_score: u8) -> &'static str {
    SEGMENT_RULES
        .iter()
        .find(|rule| (rule.applies)(r_score, f_score, m_score))
        .map(|rule| rule.label)
        .unwrap_or(SEGMENT_OTHER)
}

/// Quintile-score a metric column.
///
/// Bin edges are linear-interpolated quantiles; duplicate edges collapse
/// so a column with few distinct values yields fewer effective levels
/// instead of erroring. Ascending metrics (Frequency, Monetary) score
/// 1..=n_eff from the lowest bin up; descending metrics (Recency) score
/// n_eff..=1 so the smallest values (most recent) earn the top score.
pub fn quantile_scores(values: &[f64], descending: bool) -> Vec<u8> {
    if values.is_empty() {
        return Vec::new();
    }

    let edges = quantile_edges(values, QUANTILE_BINS);
    let bin_count = edges.len().saturating_sub(1).max(1);

    values
        .iter()
        .map(|value| {
            let bin = assign_bin(*value, &edges, bin_count);
            if descending {
                (bin_count - bin) as u8
            } else {
                (bin + 1) as u8
            }
        })
        .collect()
}

/// Quantile edges at 0, 1/q, ..., 1 with duplicates collapsed.
fn quantile_edges(values: &[f64], q: usize) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mut edges: Vec<f64> =
        (0..=q).map(|step| quantile(&sorted, step as f64 / q as f64)).collect();
    edges.dedup();
    edges
}

/// Linear-interpolated quantile over a sorted slice.
fn quantile(sorted: &[f64], fraction: f64) -> f64 {
    let last = sorted.len() - 1;
    let position = fraction * last as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = position - lower as f64;
        sorted[lower] + weight * (sorted[upper] - sorted[lower])
    }
}

/// Right-closed bin lookup: a value equal to an interior edge falls in
/// the lower bin; the first bin includes the minimum.
fn assign_bin(value: f64, edges: &[f64], bin_count: usize) -> usize {
    if edges.len() < 2 {
        return 0;
    }
    for (index, edge) in edges.iter().enumerate().skip(1) {
        if value <= *edge {
            return index - 1;
        }
    }
    bin_count - 1
}

#[cfg(test)]
mod tests {
    use super::{quantile_scores, segment_label};

    #[test]
    fn quintiles_spread_distinct_values_across_five_scores() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let scores = quantile_scores(&values, false);

        assert_eq!(scores.first(), Some(&1));
        assert_eq!(scores.last(), Some(&5));
        for window in scores.windows(2) {
            assert!(window[0] <= window[1]);
        }
    }

    #[test]
    fn descending_scores_rank_smallest_values_highest() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let scores = quantile_scores(&values, true);

        assert_eq!(scores.first(), Some(&5));
        assert_eq!(scores.last(), Some(&1));
    }

    #[test]
    fn degenerate_identical_column_collapses_to_one_level() {
        let values = vec![7.0; 12];
        let ascending = quantile_scores(&values, false);
        let descending = quantile_scores(&values, true);

        assert!(ascending.iter().all(|score| *score == 1));
        assert!(descending.iter().all(|score| *score == 1));
    }

    #[test]
    fn heavily_tied_column_yields_fewer_effective_levels() {
        // Ten zeros and two distinct tails collapse most quantile edges.
        let mut values = vec![0.0; 10];
        values.push(5.0);
        values.push(9.0);

        let scores = quantile_scores(&values, false);
        assert_eq!(scores.len(), values.len());
        let max = scores.iter().max().copied().unwrap_or(0);
        assert!(max < 5, "collapsed edges must yield fewer than five levels, got {max}");
        assert!(scores.iter().all(|score| *score >= 1));
    }

    #[test]
    fn first_matching_rule_wins_over_later_overlaps() {
        // R=4, F=3, M=3 satisfies both "Loyal Customers" and "Potential
        // Loyalists"; the earlier rule must win.
        assert_eq!(segment_label(4, 3, 3), "Loyal Customers");
    }

    #[test]
    fn high_recency_low_monetary_is_not_champions_or_big_spenders() {
        // Champions requires M >= 4; Big Spenders requires R <= 2.
        assert_eq!(segment_label(5, 5, 1), "Loyal Customers");
    }

    #[test]
    fn rule_table_covers_the_documented_segments() {
        assert_eq!(segment_label(5, 5, 5), "Champions");
        assert_eq!(segment_label(3, 1, 3), "Potential Loyalists");
        assert_eq!(segment_label(1, 5, 4), "Big Spenders");
        assert_eq!(segment_label(1, 1, 1), "At Risk");
        assert_eq!(segment_label(4, 2, 2), "Needs Attention");
        assert_eq!(segment_label(2, 3, 2), "Other");
    }
}
