//! Structure-aware fuzzing of the suite statistics and duration buckets.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use testgate_types::{MetricRecord, Outcome, TestId};

#[derive(Arbitrary, Debug)]
struct FuzzRecord {
    duration_micros: Option<u64>,
    failed: bool,
}

fuzz_target!(|input: Vec<FuzzRecord>| {
    let records: Vec<MetricRecord> = input
        .iter()
        .enumerate()
        .map(|(i, r)| MetricRecord {
            id: TestId::new("fuzz.test.ts", format!("t{i}")),
            duration_micros: r.duration_micros,
            completed_at: String::new(),
            outcome: if r.failed {
                Outcome::Failed
            } else {
                Outcome::Passed
            },
            violations: Vec::new(),
            memory: None,
        })
        .collect();

    let stats = testgate_domain::compute_statistics(&records);
    let timed = records.iter().filter(|r| r.duration_micros.is_some()).count() as u64;
    assert_eq!(stats.count, timed);
    if timed > 0 {
        assert!(stats.min_duration_micros <= stats.median_duration_micros);
        assert!(stats.median_duration_micros <= stats.p95_duration_micros);
        assert!(stats.p95_duration_micros <= stats.max_duration_micros);
        assert!(stats.average_duration_micros <= stats.max_duration_micros);
    }

    let buckets = testgate_domain::bucket_by_duration(&records);
    assert_eq!(buckets.iter().map(|b| b.count).sum::<u64>(), timed);
});
