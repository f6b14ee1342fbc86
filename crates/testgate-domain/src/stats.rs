use testgate_types::{DurationBucket, MetricRecord, Stats};

/// Bucket labels with their exclusive upper bound in microseconds.
/// Lower bounds are inclusive; the last bucket is open-ended.
pub const BUCKET_LABELS: [(&str, u64); 5] = [
    ("<1ms", 1_000),
    ("1-10ms", 10_000),
    ("10-100ms", 100_000),
    ("100ms-1s", 1_000_000),
    (">1s", u64::MAX),
];

/// Summarize the durations of `records`.
///
/// Records without a duration are skipped. An empty input (or one where no
/// record has a duration) yields `Stats::default()`, so `average_duration_micros`
/// is always safe to read.
pub fn compute_statistics(records: &[MetricRecord]) -> Stats {
    let mut durations: Vec<u64> = records.iter().filter_map(|r| r.duration_micros).collect();
    if durations.is_empty() {
        return Stats::default();
    }
    durations.sort_unstable();

    let count = durations.len() as u64;
    let total: u128 = durations.iter().map(|d| u128::from(*d)).sum();

    Stats {
        count,
        min_duration_micros: durations[0],
        max_duration_micros: durations[durations.len() - 1],
        median_duration_micros: median_sorted(&durations),
        p95_duration_micros: percentile_nearest_rank(&durations, 95),
        average_duration_micros: (total / u128::from(count)) as u64,
        total_duration_micros: u64::try_from(total).unwrap_or(u64::MAX),
    }
}

fn median_sorted(sorted: &[u64]) -> u64 {
    debug_assert!(!sorted.is_empty());
    let n = sorted.len();
    let mid = n / 2;
    if n % 2 == 1 {
        sorted[mid]
    } else {
        // average, rounding down
        (sorted[mid - 1] / 2) + (sorted[mid] / 2) + ((sorted[mid - 1] % 2 + sorted[mid] % 2) / 2)
    }
}

/// Nearest-rank percentile over an ascending slice: the value at
/// `ceil(pct/100 * (n - 1))`. Integer arithmetic keeps it deterministic.
pub fn percentile_nearest_rank(sorted: &[u64], pct: u64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let last = (sorted.len() - 1) as u64;
    let idx = (pct.min(100) * last).div_ceil(100);
    sorted[idx.min(last) as usize]
}

/// Count records per fixed duration bucket, in bucket order.
///
/// Records without a duration are not counted anywhere.
pub fn bucket_by_duration(records: &[MetricRecord]) -> Vec<DurationBucket> {
    let mut counts = [0u64; BUCKET_LABELS.len()];
    for d in records.iter().filter_map(|r| r.duration_micros) {
        let idx = BUCKET_LABELS
            .iter()
            .position(|(_, upper)| d < *upper)
            .unwrap_or(BUCKET_LABELS.len() - 1);
        counts[idx] += 1;
    }

    BUCKET_LABELS
        .iter()
        .zip(counts)
        .map(|((label, _), count)| DurationBucket {
            label: (*label).to_string(),
            count,
        })
        .collect()
}
