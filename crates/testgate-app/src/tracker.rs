//! Thread-safe store of completed-test records for one run.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use testgate_error::TestgateError;
use testgate_types::{MetricRecord, OutcomeCounts, TestId};

#[derive(Debug, Default)]
struct Inner {
    records: Vec<MetricRecord>,
    index: HashMap<TestId, usize>,
    counts: OutcomeCounts,
}

/// Records completed tests in completion order. Each test identifier is
/// recorded at most once; the first record wins.
#[derive(Debug, Default)]
pub struct Tracker {
    inner: Mutex<Inner>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `record`. A second record for the same test is rejected with
    /// [`TestgateError::DuplicateTest`] and leaves the tracker unchanged.
    pub fn record(&self, record: MetricRecord) -> Result<(), TestgateError> {
        let mut inner = self.lock();
        if inner.index.contains_key(&record.id) {
            return Err(TestgateError::DuplicateTest {
                test: record.id.to_string(),
            });
        }
        let pos = inner.records.len();
        inner.counts.add(record.outcome);
        inner.index.insert(record.id.clone(), pos);
        inner.records.push(record);
        Ok(())
    }

    pub fn contains(&self, id: &TestId) -> bool {
        self.lock().index.contains_key(id)
    }

    pub fn get(&self, id: &TestId) -> Option<MetricRecord> {
        let inner = self.lock();
        inner.index.get(id).map(|&i| inner.records[i].clone())
    }

    /// Snapshot of every record, in completion order. Later recordings do not
    /// affect a snapshot already taken.
    pub fn all(&self) -> Vec<MetricRecord> {
        self.lock().records.clone()
    }

    pub fn counts(&self) -> OutcomeCounts {
        self.lock().counts.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every record and counter.
    pub fn reset(&self) {
        *self.lock() = Inner::default();
    }
}
