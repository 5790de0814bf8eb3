//! Turns "percent of operations slower than X" into histogram-style counts.
//!
//! The node only reports, per threshold, the share of operations that took
//! longer than that threshold plus the total ops/sec. Histogram consumers want
//! absolute cumulative counts and a sum, so both are estimated here:
//!
//! - `greater = ops * pct / 100`, `leq = ops - greater`
//! - `sum += cutoff_ms * greater` for each threshold, in order
//! - operations below the smallest threshold are assumed to take 0.5ms
//!
//! The overflow (`+Inf`) bucket count is `ops` itself.

use crate::info::latency::LatencyBlock;

/// Average latency assumed for operations under the smallest cutoff.
const BELOW_SMALLEST_MS: f64 = 0.5;

/// Estimate for one threshold with a numeric cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketEstimate {
    /// Label as reported, e.g. `>8ms`
    pub label: String,
    /// Numeric run of the label, e.g. `8`, used as the `le` bound
    pub bound: String,
    pub cutoff_ms: f64,
    pub percentage: f64,
    /// Operations slower than the cutoff
    pub greater_count: f64,
    /// Operations at or below the cutoff
    pub leq_count: f64,
}

/// Histogram view of one source for one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramEstimate {
    pub ops_per_sec: f64,
    pub buckets: Vec<BucketEstimate>,
    pub weighted_sum: f64,
}

impl HistogramEstimate {
    /// Count of the implicit `+Inf` bucket.
    pub fn overflow_count(&self) -> f64 {
        self.ops_per_sec
    }
}

/// Estimate from a decoded block, or `None` when it has no `ops/sec` column.
pub fn estimate_block(block: &LatencyBlock) -> Option<HistogramEstimate> {
    let ops = block.ops_per_sec()?;
    Some(estimate(ops, block.thresholds()))
}

/// Estimate from `(label, percentage)` pairs. Labels without a numeric run
/// produce no bucket.
pub fn estimate<'a, I>(ops_per_sec: f64, thresholds: I) -> HistogramEstimate
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let buckets: Vec<BucketEstimate> = thresholds
        .into_iter()
        .filter_map(|(label, percentage)| {
            let (bound, cutoff_ms) = cutoff(label)?;
            let greater_count = ops_per_sec * percentage / 100.0;
            Some(BucketEstimate {
                label: label.to_string(),
                bound: bound.to_string(),
                cutoff_ms,
                percentage,
                greater_count,
                leq_count: ops_per_sec - greater_count,
            })
        })
        .collect();

    let smallest = smallest_cutoff_index(&buckets);

    let mut weighted_sum = 0.0;
    for (i, bucket) in buckets.iter().enumerate() {
        weighted_sum += bucket.cutoff_ms * bucket.greater_count;
        if Some(i) == smallest {
            weighted_sum += BELOW_SMALLEST_MS * (ops_per_sec - bucket.greater_count);
        }
    }

    HistogramEstimate {
        ops_per_sec,
        buckets,
        weighted_sum,
    }
}

/// First bucket holding the minimum cutoff.
fn smallest_cutoff_index(buckets: &[BucketEstimate]) -> Option<usize> {
    buckets
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, b)| match best {
            Some((_, min)) if min <= b.cutoff_ms => best,
            _ => Some((i, b.cutoff_ms)),
        })
        .map(|(i, _)| i)
}

/// Leading numeric run of a threshold label: `>8ms` → `("8", 8.0)`.
pub fn cutoff(label: &str) -> Option<(&str, f64)> {
    let is_num = |c: char| c.is_ascii_digit() || c == '.';
    let start = label.find(is_num)?;
    let rest = &label[start..];
    let end = rest.find(|c: char| !is_num(c)).unwrap_or(rest.len());
    let bound = &rest[..end];
    let value = bound.parse::<f64>().ok()?;
    Some((bound, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::latency;

    const EPS: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_cutoff_extraction() {
        assert_eq!(cutoff(">1ms"), Some(("1", 1.0)));
        assert_eq!(cutoff(">64ms"), Some(("64", 64.0)));
        assert_eq!(cutoff(">0.5ms"), Some(("0.5", 0.5)));
        assert_eq!(cutoff("ops/sec"), None);
        assert_eq!(cutoff(">.ms"), None);
    }

    #[test]
    fn test_single_threshold_scenario() {
        let est = estimate(54.4, [(">1ms", 1.10)]);
        let b = &est.buckets[0];
        assert!(approx(b.greater_count, 0.5984));
        assert!(approx(b.leq_count, 53.8016));
        // 1 * 0.5984 + 0.5 * 53.8016
        assert!(approx(est.weighted_sum, 0.5984 + 26.9008));
    }

    #[test]
    fn test_weighted_sum_across_thresholds() {
        let est = estimate(54.4, [(">1ms", 1.10), (">8ms", 0.55), (">64ms", 0.0)]);
        let greater_1 = 54.4 * 1.10 / 100.0;
        let greater_8 = 54.4 * 0.55 / 100.0;
        let expected = greater_1 + 0.5 * (54.4 - greater_1) + 8.0 * greater_8;
        assert!(approx(est.weighted_sum, expected));
        assert_eq!(
            est.buckets.iter().map(|b| b.bound.as_str()).collect::<Vec<_>>(),
            vec!["1", "8", "64"]
        );
    }

    #[test]
    fn test_counts_are_complementary() {
        let est = estimate(
            2586.8,
            [(">1ms", 1.58), (">8ms", 0.77), (">64ms", 0.0), (">512ms", 100.0)],
        );
        for b in &est.buckets {
            assert!((b.greater_count + b.leq_count - est.ops_per_sec).abs() < EPS);
        }
        assert_eq!(est.overflow_count(), 2586.8);
    }

    #[test]
    fn test_below_smallest_applied_once() {
        // smallest cutoff is not first, and a duplicate 1ms column appears later
        let est = estimate(100.0, [(">8ms", 10.0), (">1ms", 20.0), (">1ms", 20.0)]);
        let expected = 8.0 * 10.0 + 1.0 * 20.0 + 0.5 * 80.0 + 1.0 * 20.0;
        assert!(approx(est.weighted_sum, expected));
    }

    #[test]
    fn test_non_numeric_labels_skipped() {
        let est = estimate(10.0, [("weird", 50.0), (">2ms", 50.0)]);
        assert_eq!(est.buckets.len(), 1);
        assert_eq!(est.buckets[0].label, ">2ms");
        assert!(approx(est.weighted_sum, 2.0 * 5.0 + 0.5 * 5.0));
    }

    #[test]
    fn test_no_thresholds() {
        let est = estimate(12.0, std::iter::empty());
        assert!(est.buckets.is_empty());
        assert_eq!(est.weighted_sum, 0.0);
        assert_eq!(est.overflow_count(), 12.0);
    }

    #[test]
    fn test_block_without_ops_is_skipped() {
        let blocks = latency::decode("{sys}-read:1,>1ms,>8ms;2,1.0,0.5").unwrap();
        assert!(estimate_block(&blocks[0].1).is_none());

        let blocks = latency::decode("{sys}-read:1,ops/sec,>1ms;2,54.4,1.10").unwrap();
        let est = estimate_block(&blocks[0].1).unwrap();
        assert_eq!(est.ops_per_sec, 54.4);
        assert_eq!(est.buckets.len(), 1);
    }
}
