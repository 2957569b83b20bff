//! Streaming response-time statistics.
//!
//! Count, mean and exact min/max are tracked directly. Percentiles come from
//! an HDR histogram of microseconds with three significant figures (0.1%
//! relative error), so memory stays bounded no matter how many samples a run
//! produces.

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

/// Significant figures kept by the latency histogram.
pub const SIGNIFICANT_FIGURES: u8 = 3;

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// One fixed-width histogram bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    /// Inclusive lower edge (seconds)
    pub start: f64,
    /// Upper edge (seconds)
    pub end: f64,
    /// Samples falling into the bucket
    pub count: u64,
}

fn to_micros(secs: f64) -> u64 {
    (secs.max(0.0) * MICROS_PER_SEC).round() as u64
}

fn to_secs(micros: u64) -> f64 {
    micros as f64 / MICROS_PER_SEC
}

/// Bounded-memory latency accumulator.
#[derive(Debug, Clone)]
pub struct ResponseTimeStats {
    histogram: Histogram<u64>,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Default for ResponseTimeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseTimeStats {
    /// Create empty stats.
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        // Auto-resizing, so any latency is trackable.
        let histogram = Histogram::new(SIGNIFICANT_FIGURES)
            .expect("3 significant figures is a valid histogram precision");
        Self {
            histogram,
            sum: 0.0,
            min: None,
            max: None,
        }
    }

    /// Record one sample (seconds).
    pub fn add(&mut self, value: f64) {
        self.histogram.saturating_record(to_micros(value));
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Number of samples.
    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    /// Mean of all samples, `0.0` when empty.
    pub fn avg(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.sum / n as f64,
        }
    }

    /// Smallest sample, if any.
    pub fn min_val(&self) -> Option<f64> {
        self.min
    }

    /// Largest sample, if any.
    pub fn max_val(&self) -> Option<f64> {
        self.max
    }

    /// Estimated value at percentile `q` (0-100 scale).
    ///
    /// Within 0.1% relative error of the exact order statistic, and never
    /// outside `[min_val, max_val]`.
    pub fn percentile(&self, q: f64) -> Option<f64> {
        let (lo, hi) = (self.min?, self.max?);
        let quantile = (q / 100.0).clamp(0.0, 1.0);
        let estimate = to_secs(self.histogram.value_at_quantile(quantile));
        Some(estimate.clamp(lo, hi))
    }

    /// Fold `other` into `self`.
    pub fn merge(&mut self, other: &Self) {
        if other.count() == 0 {
            return;
        }
        // Auto-resizing histograms accept any recorded range.
        let _ = self.histogram.add(&other.histogram);
        self.sum += other.sum;
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    /// Combined copy of `self` and `other`, leaving both untouched.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut combined = self.clone();
        combined.merge(other);
        combined
    }

    /// Fixed-width histogram spanning `[min_val, max_val]`.
    ///
    /// Counts are attributed from the recorded HDR buckets, so a sample may
    /// land one bucket off when it sits within 0.1% of an edge. Counts always
    /// sum to [`count`](Self::count).
    pub fn histogram(&self, num_buckets: usize) -> Vec<HistogramBucket> {
        let (Some(lo), Some(hi)) = (self.min, self.max) else {
            return Vec::new();
        };
        if num_buckets == 0 {
            return Vec::new();
        }
        if hi <= lo {
            return vec![HistogramBucket {
                start: lo,
                end: hi,
                count: self.count(),
            }];
        }

        let width = (hi - lo) / num_buckets as f64;
        let mut buckets: Vec<HistogramBucket> = (0..num_buckets)
            .map(|i| HistogramBucket {
                start: lo + width * i as f64,
                end: lo + width * (i + 1) as f64,
                count: 0,
            })
            .collect();

        for step in self.histogram.iter_recorded() {
            let micros = self.histogram.median_equivalent(step.value_iterated_to());
            let value = to_secs(micros).clamp(lo, hi);
            let idx = (((value - lo) / width) as usize).min(num_buckets - 1);
            buckets[idx].count += step.count_since_last_iteration();
        }
        buckets
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_stats() {
        let stats = ResponseTimeStats::new();
        assert_eq!(stats.count(), 0);
        assert_eq!(stats.avg(), 0.0);
        assert_eq!(stats.min_val(), None);
        assert_eq!(stats.max_val(), None);
        assert_eq!(stats.percentile(50.0), None);
        assert_eq!(stats.percentile(99.0), None);
    }

    #[test]
    fn test_single_value() {
        let mut stats = ResponseTimeStats::new();
        stats.add(5.0);
        assert_eq!(stats.count(), 1);
        assert_eq!(stats.avg(), 5.0);
        assert_eq!(stats.min_val(), Some(5.0));
        assert_eq!(stats.max_val(), Some(5.0));
        let median = stats.percentile(50.0).unwrap();
        assert!((4.95..=5.05).contains(&median));
        let p99 = stats.percentile(99.0).unwrap();
        assert!((4.95..=5.05).contains(&p99));
    }

    #[test]
    fn test_multiple_values() {
        let mut stats = ResponseTimeStats::new();
        stats.add(1.0);
        stats.add(2.0);
        stats.add(3.0);
        assert_eq!(stats.count(), 3);
        assert_eq!(stats.avg(), 2.0);
        assert_eq!(stats.min_val(), Some(1.0));
        assert_eq!(stats.max_val(), Some(3.0));
    }

    #[test]
    fn test_percentiles_with_many_values() {
        let mut stats = ResponseTimeStats::new();
        for i in 1..=100 {
            stats.add(f64::from(i));
        }
        assert_eq!(stats.count(), 100);
        assert_eq!(stats.min_val(), Some(1.0));
        assert_eq!(stats.max_val(), Some(100.0));

        let median = stats.percentile(50.0).unwrap();
        assert!((49.5..=51.5).contains(&median), "median={median}");
        let p99 = stats.percentile(99.0).unwrap();
        assert!((98.0..=100.0).contains(&p99), "p99={p99}");
    }

    #[test]
    fn test_percentile_clamped_to_observed_range() {
        let mut stats = ResponseTimeStats::new();
        stats.add(2.0);
        stats.add(2.0);
        assert_eq!(stats.percentile(0.0), Some(2.0));
        assert_eq!(stats.percentile(100.0), Some(2.0));
    }

    #[test]
    fn test_merge() {
        let mut a = ResponseTimeStats::new();
        a.add(1.0);
        a.add(2.0);
        let mut b = ResponseTimeStats::new();
        b.add(3.0);
        b.add(4.0);

        a.merge(&b);
        assert_eq!(a.count(), 4);
        assert_eq!(a.avg(), 2.5);
        assert_eq!(a.min_val(), Some(1.0));
        assert_eq!(a.max_val(), Some(4.0));
    }

    #[test]
    fn test_merge_empty() {
        let mut a = ResponseTimeStats::new();
        a.add(1.0);
        a.merge(&ResponseTimeStats::new());
        assert_eq!(a.count(), 1);
        assert_eq!(a.min_val(), Some(1.0));
        assert_eq!(a.max_val(), Some(1.0));
    }

    #[test]
    fn test_merge_into_empty() {
        let mut a = ResponseTimeStats::new();
        let mut b = ResponseTimeStats::new();
        b.add(7.0);
        a.merge(&b);
        assert_eq!(a.count(), 1);
        assert_eq!(a.min_val(), Some(7.0));
        assert_eq!(a.avg(), 7.0);
    }

    #[test]
    fn test_merged_leaves_operands_untouched() {
        let mut a = ResponseTimeStats::new();
        a.add(1.0);
        let mut b = ResponseTimeStats::new();
        b.add(3.0);
        let c = a.merged(&b);
        assert_eq!(c.count(), 2);
        assert_eq!(c.avg(), 2.0);
        assert_eq!(a.count(), 1);
        assert_eq!(b.count(), 1);
    }

    #[test]
    fn test_histogram_empty() {
        assert!(ResponseTimeStats::new().histogram(10).is_empty());
    }

    #[test]
    fn test_histogram_single_value() {
        let mut stats = ResponseTimeStats::new();
        stats.add(5.0);
        let histogram = stats.histogram(10);
        assert_eq!(
            histogram,
            vec![HistogramBucket {
                start: 5.0,
                end: 5.0,
                count: 1
            }]
        );
    }

    #[test]
    fn test_histogram_with_data() {
        let mut stats = ResponseTimeStats::new();
        for _ in 0..80 {
            stats.add(1.0);
        }
        for _ in 0..20 {
            stats.add(10.0);
        }

        let histogram = stats.histogram(10);
        assert_eq!(histogram.len(), 10);
        assert_eq!(histogram.iter().map(|b| b.count).sum::<u64>(), 100);
        assert_eq!(histogram[0].count, 80);
        assert_eq!(histogram[9].count, 20);
        assert!(histogram[1..9].iter().all(|b| b.count == 0));

        let width = histogram[0].end - histogram[0].start;
        for (i, bucket) in histogram.iter().enumerate() {
            assert!((bucket.start - (1.0 + width * i as f64)).abs() < 0.01);
            assert!((bucket.end - bucket.start - width).abs() < 0.01);
        }
    }

    #[test]
    fn test_percentile_relative_error() {
        let mut stats = ResponseTimeStats::new();
        for ms in 1..=1000 {
            stats.add(f64::from(ms) / 1000.0);
        }
        let p50 = stats.percentile(50.0).unwrap();
        assert!((p50 - 0.5).abs() / 0.5 < 0.002, "p50={p50}");
        let p90 = stats.percentile(90.0).unwrap();
        assert!((p90 - 0.9).abs() / 0.9 < 0.002, "p90={p90}");
    }

    #[test]
    fn test_sub_microsecond_samples() {
        let mut stats = ResponseTimeStats::new();
        stats.add(0.0);
        stats.add(0.000_000_1);
        assert_eq!(stats.count(), 2);
        assert_eq!(stats.percentile(50.0), Some(0.0));
        assert_eq!(stats.histogram(4).iter().map(|b| b.count).sum::<u64>(), 2);
    }

    #[test]
    fn test_slow_samples_are_tracked() {
        let mut stats = ResponseTimeStats::new();
        stats.add(0.01);
        stats.add(3600.0);
        assert_eq!(stats.count(), 2);
        assert_eq!(stats.percentile(100.0), Some(3600.0));
    }

    proptest! {
        #[test]
        fn prop_percentiles_bounded_and_ordered(
            samples in prop::collection::vec(0.0f64..120.0, 1..400),
        ) {
            let mut stats = ResponseTimeStats::new();
            for &s in &samples {
                stats.add(s);
            }
            let lo = stats.min_val().unwrap();
            let hi = stats.max_val().unwrap();
            let mut previous = lo;
            for q in [0.0, 25.0, 50.0, 90.0, 95.0, 99.0, 100.0] {
                let v = stats.percentile(q).unwrap();
                prop_assert!(v >= lo && v <= hi);
                prop_assert!(v >= previous);
                previous = v;
            }
            let total: u64 = stats.histogram(10).iter().map(|b| b.count).sum();
            prop_assert_eq!(total, samples.len() as u64);
        }
    }
}
