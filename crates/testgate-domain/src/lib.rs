//! Domain logic for testgate.
//!
//! This crate is intentionally I/O-free: it does math and policy over
//! collections of [`MetricRecord`](testgate_types::MetricRecord)s.

mod aggregate;
mod budget;
mod stats;

pub use aggregate::{collect_violations, group_by_file, memory_summary, slow_tests, trend};
pub use budget::{default_rule, evaluate, evaluate_duration, rule_matches, rules_for};
pub use stats::{
    bucket_by_duration, compute_statistics, percentile_nearest_rank, BUCKET_LABELS,
};

/// Render microseconds as milliseconds with two decimals, e.g. `1500.00ms`.
pub fn format_millis(micros: u64) -> String {
    format!("{}.{:02}ms", micros / 1000, (micros % 1000) / 10)
}
