//! Reduce a sequence of [`BenchmarkSample`]s to the summary statistics of
//! §4.6: min/max/mean/median/p95/p99, throughput, success rate.

use crate::sample::BenchmarkSample;

#[derive(Debug, Clone, Copy, Default)]
pub struct BenchmarkStats {
    pub count: usize,
    pub successful: usize,
    pub min_ms: u64,
    pub max_ms: u64,
    pub mean_ms: f64,
    pub median_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub tokens_per_second: f64,
    pub requests_per_second: f64,
    pub success_rate: f64,
}

/// Nearest-rank percentile: index `⌈p/100 · n⌉ − 1` into the sorted
/// ascending sequence, clamped to `[0, n-1]`.
fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let n = sorted.len();
    let rank = ((p / 100.0) * n as f64).ceil() as isize - 1;
    let index = rank.clamp(0, n as isize - 1) as usize;
    sorted[index]
}

pub fn reduce(samples: &[BenchmarkSample]) -> BenchmarkStats {
    if samples.is_empty() {
        return BenchmarkStats::default();
    }

    let count = samples.len();
    // Latency stats (min/max/mean/median/p95/p99) are computed over the
    // successful subset only (§8 scenario 2); a failed request's elapsed
    // time doesn't represent a completed response.
    let mut successful_elapsed: Vec<u64> = samples
        .iter()
        .filter(|s| s.success)
        .map(|s| s.elapsed_ms)
        .collect();
    successful_elapsed.sort_unstable();
    let successful = successful_elapsed.len();

    let total_ms: u64 = samples.iter().map(|s| s.elapsed_ms).sum();
    let total_tokens: u64 = samples
        .iter()
        .filter(|s| s.success)
        .map(|s| s.output_token_estimate as u64)
        .sum();
    let total_seconds = total_ms as f64 / 1000.0;

    let (min_ms, max_ms, mean_ms) = if successful > 0 {
        let sum: u64 = successful_elapsed.iter().sum();
        (
            successful_elapsed[0],
            successful_elapsed[successful - 1],
            sum as f64 / successful as f64,
        )
    } else {
        (0, 0, 0.0)
    };

    BenchmarkStats {
        count,
        successful,
        min_ms,
        max_ms,
        mean_ms,
        median_ms: percentile(&successful_elapsed, 50.0),
        p95_ms: percentile(&successful_elapsed, 95.0),
        p99_ms: percentile(&successful_elapsed, 99.0),
        tokens_per_second: if total_seconds > 0.0 {
            total_tokens as f64 / total_seconds
        } else {
            0.0
        },
        requests_per_second: if total_seconds > 0.0 {
            successful as f64 / total_seconds
        } else {
            0.0
        },
        success_rate: successful as f64 / count as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ms: u64, ok: bool) -> BenchmarkSample {
        BenchmarkSample::new(ms, 10, ok)
    }

    #[test]
    fn test_percentile_of_ten_elements_matches_nearest_rank() {
        let sorted: Vec<u64> = (1..=10).collect();
        assert_eq!(percentile(&sorted, 50.0), 5);
        assert_eq!(percentile(&sorted, 95.0), 10);
        assert_eq!(percentile(&sorted, 99.0), 10);
    }

    #[test]
    fn test_percentile_of_empty_sequence_is_zero() {
        assert_eq!(percentile(&[], 95.0), 0);
    }

    #[test]
    fn test_reduce_computes_min_max_mean_and_success_rate() {
        let samples = vec![sample(100, true), sample(200, true), sample(300, false)];
        let stats = reduce(&samples);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.successful, 2);
        // Latency stats are computed over the successful subset only, so
        // the failed 300ms sample doesn't move min/max/mean.
        assert_eq!(stats.min_ms, 100);
        assert_eq!(stats.max_ms, 200);
        assert!((stats.mean_ms - 150.0).abs() < f64::EPSILON);
        assert!((stats.success_rate - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_latency_stats_exclude_failed_samples_scenario_2() {
        // §8 scenario 2: concurrent=10, number=10, every 3rd request fails;
        // latency stats are computed over the 7 successes only.
        let mut samples = Vec::new();
        for i in 1..=10u64 {
            samples.push(sample(i * 10, i % 3 != 0));
        }
        let stats = reduce(&samples);
        assert_eq!(stats.count, 10);
        assert_eq!(stats.successful, 7);
        assert!((stats.success_rate - 0.7).abs() < 1e-9);
        // failures were at i=3,6,9 (30,60,90ms); successes are the rest.
        let successes: Vec<u64> = (1..=10)
            .filter(|i| i % 3 != 0)
            .map(|i: u64| i * 10)
            .collect();
        assert_eq!(stats.min_ms, *successes.iter().min().unwrap());
        assert_eq!(stats.max_ms, *successes.iter().max().unwrap());
    }

    #[test]
    fn test_reduce_of_empty_samples_is_all_zero() {
        let stats = reduce(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn test_tokens_per_second_only_counts_successful_samples() {
        let samples = vec![sample(1000, true), sample(1000, false)];
        let stats = reduce(&samples);
        // total duration = 2s, only one successful sample contributes tokens
        assert!((stats.tokens_per_second - 5.0).abs() < 1e-9);
    }
}
