//! Derived views over a run's records: slow tests, violations, per-file
//! groups, memory and the in-run trend series.

use std::collections::{BTreeMap, VecDeque};
use testgate_types::{
    FileSummary, MemorySummary, MetricRecord, Outcome, SlowTest, TrendPoint, ViolationEntry,
    TREND_WINDOW,
};

/// Records strictly over `threshold_micros`, slowest first. Ties keep record order.
pub fn slow_tests(records: &[MetricRecord], threshold_micros: u64) -> Vec<SlowTest> {
    let mut slow: Vec<SlowTest> = records
        .iter()
        .filter_map(|r| {
            r.duration_micros
                .filter(|d| *d > threshold_micros)
                .map(|d| SlowTest {
                    test: r.id.clone(),
                    duration_micros: d,
                })
        })
        .collect();
    slow.sort_by(|a, b| b.duration_micros.cmp(&a.duration_micros));
    slow
}

/// Flatten the violations embedded in each record, keeping record order.
pub fn collect_violations(records: &[MetricRecord]) -> Vec<ViolationEntry> {
    records
        .iter()
        .flat_map(|r| {
            r.violations.iter().map(move |v| ViolationEntry {
                test: r.id.clone(),
                duration_micros: r.duration_micros.unwrap_or(0),
                violation: v.clone(),
            })
        })
        .collect()
}

pub fn group_by_file(records: &[MetricRecord]) -> Vec<FileSummary> {
    let mut groups: BTreeMap<&str, FileSummary> = BTreeMap::new();

    for r in records {
        let g = groups.entry(r.id.file.as_str()).or_insert_with(|| FileSummary {
            file: r.id.file.clone(),
            tests: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            total_duration_micros: 0,
            average_duration_micros: 0,
        });
        g.tests += 1;
        match r.outcome {
            Outcome::Passed => g.passed += 1,
            Outcome::Failed => g.failed += 1,
            Outcome::Skipped | Outcome::Pending => g.skipped += 1,
        }
        g.total_duration_micros = g
            .total_duration_micros
            .saturating_add(r.duration_micros.unwrap_or(0));
    }

    groups
        .into_values()
        .map(|mut g| {
            g.average_duration_micros = g.total_duration_micros / g.tests.max(1);
            g
        })
        .collect()
}

/// `None` when no record carried a memory snapshot.
pub fn memory_summary(records: &[MetricRecord]) -> Option<MemorySummary> {
    let mut samples = 0u64;
    let mut used_total: u128 = 0;
    let mut heap_limit = 0u64;
    let mut peak: Option<(&MetricRecord, u64)> = None;

    for r in records {
        let Some(mem) = r.memory else { continue };
        samples += 1;
        used_total += u128::from(mem.used_heap_bytes);
        heap_limit = heap_limit.max(mem.heap_limit_bytes);
        if peak.is_none_or(|(_, used)| mem.used_heap_bytes > used) {
            peak = Some((r, mem.used_heap_bytes));
        }
    }

    let (peak_record, peak_used) = peak?;
    Some(MemorySummary {
        samples,
        peak_used_bytes: peak_used,
        peak_test: peak_record.id.clone(),
        average_used_bytes: (used_total / u128::from(samples)) as u64,
        heap_limit_bytes: heap_limit,
    })
}

/// Completion-ordered durations with a rolling average over [`TREND_WINDOW`] records.
pub fn trend(records: &[MetricRecord]) -> Vec<TrendPoint> {
    let mut window: VecDeque<u64> = VecDeque::with_capacity(TREND_WINDOW);
    let mut sum: u128 = 0;
    let mut points = Vec::new();

    for r in records {
        let Some(d) = r.duration_micros else { continue };
        if window.len() == TREND_WINDOW
            && let Some(oldest) = window.pop_front()
        {
            sum -= u128::from(oldest);
        }
        window.push_back(d);
        sum += u128::from(d);

        points.push(TrendPoint {
            sequence: points.len() as u64 + 1,
            test: r.id.clone(),
            duration_micros: d,
            rolling_average_micros: (sum / window.len() as u128) as u64,
        });
    }

    points
}
