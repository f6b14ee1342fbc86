//! Run lifecycle: turns test-engine notifications into metric records, then
//! summarizes and exports them when the run finishes.
//!
//! ```text
//! Idle --start--> Running --finish--> Finalizing --> Done
//! ```
//!
//! A finished reporter stays `Done`; a new run needs a new reporter.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use testgate_domain::{collect_violations, compute_statistics, evaluate_duration, rules_for};
use testgate_error::TestgateError;
use testgate_render::{build_report, render_console, ConsoleOptions, ReportMeta};
use testgate_types::{
    BudgetRule, MetricRecord, Outcome, ReporterConfig, RunEvent, SlowTest, TaskKind, TaskUpdate,
    TestId, TestRunReport, ToolInfo,
};

use crate::config::validate_rules;
use crate::console::ConsoleSink;
use crate::export::{plan_exports, write_exports, ExportOutcome, ExportTarget};
use crate::tracker::Tracker;
use crate::{Clock, SystemClock};

/// Notification interface driven by the test-execution engine. Calls may come
/// from several threads at once.
pub trait TestRunListener: Send + Sync {
    fn on_run_start(&self);
    fn on_task_update(&self, updates: &[TaskUpdate]);
    fn on_run_finished(&self, files: &[String], errors: &[String]);
}

/// Route one wire event to the matching listener method.
pub fn dispatch<L: TestRunListener + ?Sized>(listener: &L, event: &RunEvent) {
    match event {
        RunEvent::RunStart => listener.on_run_start(),
        RunEvent::TaskUpdate { updates } => listener.on_task_update(updates),
        RunEvent::RunFinished { files, errors } => listener.on_run_finished(files, errors),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Finalizing,
    Done,
}

/// Everything produced when a run finishes.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: TestRunReport,
    /// The text written to the console sink.
    pub console: String,
    pub warnings: Vec<String>,
    /// Files the background export will write, empty when export is disabled.
    pub export_paths: Vec<PathBuf>,
}

enum ExportTask {
    Running(JoinHandle<ExportOutcome>),
    Finished(ExportOutcome),
}

struct RunState {
    phase: Phase,
    started_at: Option<String>,
    /// Set when recording began before any run-start notification.
    implicit_start: bool,
    starts: HashMap<TestId, u64>,
    slow: Vec<SlowTest>,
    warnings: Vec<String>,
    export: Option<ExportTask>,
    summary: Option<RunSummary>,
}

impl RunState {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            started_at: None,
            implicit_start: false,
            starts: HashMap::new(),
            slow: Vec::new(),
            warnings: Vec::new(),
            export: None,
            summary: None,
        }
    }

    fn warn(&mut self, err: TestgateError) {
        tracing::warn!(error = %err, "test metrics skipped");
        self.warnings.push(err.to_string());
    }
}

pub struct RunReporter<C: Clock = SystemClock> {
    config: ReporterConfig,
    rules: Vec<BudgetRule>,
    tool: ToolInfo,
    clock: C,
    console: Arc<dyn ConsoleSink>,
    tracker: Arc<Tracker>,
    state: Mutex<RunState>,
}

impl<C: Clock> RunReporter<C> {
    /// Build a reporter for one run. Fails only on a malformed budget rule.
    pub fn new(
        config: ReporterConfig,
        tool: ToolInfo,
        clock: C,
        console: Arc<dyn ConsoleSink>,
    ) -> Result<Self, TestgateError> {
        validate_rules(&config.report.budget_rules)?;
        let rules = rules_for(&config.report);
        Ok(Self {
            config,
            rules,
            tool,
            clock,
            console,
            tracker: Arc::new(Tracker::new()),
            state: Mutex::new(RunState::new()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Snapshot of the records collected so far, in completion order.
    pub fn records(&self) -> Vec<MetricRecord> {
        self.tracker.all()
    }

    fn begin(&self, st: &mut RunState, implicit: bool) {
        st.phase = Phase::Running;
        st.started_at = Some(self.clock.now_rfc3339());
        st.implicit_start = implicit;
    }

    /// Begin a run. A second start discards the partial results of the first;
    /// records collected before the first start are kept.
    pub fn start(&self) {
        let mut st = self.lock();
        match st.phase {
            Phase::Finalizing | Phase::Done => {
                tracing::warn!("run start after the run finished; ignored");
                return;
            }
            Phase::Running if st.implicit_start => {
                tracing::debug!(
                    records = self.tracker.len(),
                    "run start after early records; keeping them"
                );
                st.implicit_start = false;
                return;
            }
            Phase::Running => {
                tracing::warn!("run started twice; discarding partial results");
                st.starts.clear();
                st.slow.clear();
                st.warnings.clear();
                self.tracker.reset();
            }
            Phase::Idle => {}
        }
        self.begin(&mut st, false);
        tracing::debug!("run started");
    }

    /// Move an idle run to `Running`. False once the run has finished.
    fn accepting(&self, st: &mut RunState) -> bool {
        match st.phase {
            Phase::Running => true,
            Phase::Idle => {
                tracing::debug!("recording before run start; starting run");
                self.begin(st, true);
                true
            }
            Phase::Finalizing | Phase::Done => false,
        }
    }

    /// Apply a batch of task updates. Problems with one test never affect the
    /// others in the batch.
    pub fn update(&self, updates: &[TaskUpdate]) {
        let mut st = self.lock();
        if !self.accepting(&mut st) {
            tracing::warn!(updates = updates.len(), "task updates after run finished; ignored");
            return;
        }
        for update in updates {
            if let Err(err) = self.apply(&mut st, update) {
                st.warn(err);
            }
        }
    }

    fn apply(&self, st: &mut RunState, update: &TaskUpdate) -> Result<(), TestgateError> {
        if update.kind != TaskKind::Test {
            return Ok(());
        }
        let id = update.test_id();

        let Some(outcome) = update.state.outcome() else {
            match update.timestamp_micros {
                Some(t) => {
                    st.starts.insert(id, t);
                }
                None => tracing::debug!(test = %id, "start signal without timestamp ignored"),
            }
            return Ok(());
        };

        if self.tracker.contains(&id) {
            st.starts.remove(&id);
            return Err(TestgateError::DuplicateTest {
                test: id.to_string(),
            });
        }

        let started = st.starts.remove(&id);
        let duration_micros = match outcome {
            Outcome::Passed | Outcome::Failed => {
                let start = started.ok_or_else(|| TestgateError::MissingStartTime {
                    test: id.to_string(),
                })?;
                let end = update
                    .timestamp_micros
                    .ok_or_else(|| TestgateError::MissingCompletionTime {
                        test: id.to_string(),
                    })?;
                let d = end
                    .checked_sub(start)
                    .ok_or_else(|| TestgateError::NegativeDuration {
                        test: id.to_string(),
                        started_micros: start,
                        completed_micros: end,
                    })?;
                Some(d)
            }
            // skipped and todo tests may never have started
            Outcome::Skipped | Outcome::Pending => match (started, update.timestamp_micros) {
                (Some(start), Some(end)) if end < start => {
                    st.warn(TestgateError::NegativeDuration {
                        test: id.to_string(),
                        started_micros: start,
                        completed_micros: end,
                    });
                    None
                }
                (Some(start), Some(end)) => Some(end - start),
                _ => None,
            },
        };

        self.insert(
            st,
            MetricRecord {
                id,
                duration_micros,
                completed_at: self.clock.now_rfc3339(),
                outcome,
                violations: Vec::new(),
                memory: update.memory,
            },
        )
    }

    /// Evaluate budgets for `record`, store it and note it as slow when over
    /// the threshold.
    fn insert(&self, st: &mut RunState, mut record: MetricRecord) -> Result<(), TestgateError> {
        record.violations = evaluate_duration(&record.id, record.duration_micros, &self.rules);
        let slow = record
            .duration_micros
            .filter(|&d| d > self.config.report.slow_test_threshold_micros)
            .map(|d| SlowTest {
                test: record.id.clone(),
                duration_micros: d,
            });
        self.tracker.record(record)?;
        st.slow.extend(slow);
        Ok(())
    }

    /// Record a completed test measured outside the task-update stream.
    ///
    /// Budgets are evaluated here, replacing any violations already on
    /// `record`. A duplicate is rejected and noted as a warning; a record
    /// arriving after the run finished is dropped.
    pub fn record(&self, record: MetricRecord) -> Result<(), TestgateError> {
        let mut st = self.lock();
        if !self.accepting(&mut st) {
            tracing::warn!(test = %record.id, "record after run finished; ignored");
            return Ok(());
        }
        self.insert(&mut st, record).inspect_err(|err| {
            tracing::warn!(error = %err, "test metrics skipped");
            st.warnings.push(err.to_string());
        })
    }

    /// Summarize the run, print it, and start the background export.
    ///
    /// Works from any phase. Calling it again returns the first summary.
    pub fn finish(&self, files: &[String], errors: &[String]) -> RunSummary {
        let mut st = self.lock();
        if let Some(summary) = &st.summary {
            tracing::warn!("run already finished; returning the existing summary");
            return summary.clone();
        }
        if st.phase == Phase::Idle {
            tracing::debug!("finishing a run that never started");
        }
        st.phase = Phase::Finalizing;

        let records = self.tracker.all();
        let stats = compute_statistics(&records);
        let violations = collect_violations(&records);
        let meta = ReportMeta {
            tool: self.tool.clone(),
            generated_at: self.clock.now_rfc3339(),
            started_at: st.started_at.clone(),
            run_errors: errors.to_vec(),
            slow_tests: Some(st.slow.clone()),
            counts: Some(self.tracker.counts()),
        };
        let report = build_report(&records, &stats, &violations, &self.config.report, meta);

        let opts = ConsoleOptions {
            detailed_timing: self.config.detailed_timing,
            budget_warnings: self.config.budget_warnings,
            include_memory: self.config.report.include_memory,
        };
        let console = render_console(&report, opts, &st.warnings);
        self.console.write(&console);

        tracing::info!(
            tests = report.counts.total,
            files = files.len(),
            violations = report.violations.len(),
            run_errors = errors.len(),
            "run finished"
        );

        let mut export_paths = Vec::new();
        if let Some(path) = &self.config.export_path {
            let targets = plan_exports(path, self.config.report.format);
            export_paths = targets.iter().map(|t| t.path.clone()).collect();
            st.export = Some(self.spawn_export(report.clone(), targets));
        }

        let summary = RunSummary {
            report,
            console,
            warnings: st.warnings.clone(),
            export_paths,
        };
        st.summary = Some(summary.clone());
        st.phase = Phase::Done;
        summary
    }

    fn spawn_export(&self, report: TestRunReport, targets: Vec<ExportTarget>) -> ExportTask {
        let console = Arc::clone(&self.console);
        let first = targets.first().map(|t| t.path.clone()).unwrap_or_default();
        let job = move || {
            let outcome = write_exports(&report, &targets);
            for failure in &outcome.failures {
                tracing::warn!(error = %failure, "report export failed");
                console.write(&format!("⚠️ testgate: {failure}\n"));
            }
            outcome
        };

        match std::thread::Builder::new()
            .name("testgate-export".to_string())
            .spawn(job)
        {
            Ok(handle) => ExportTask::Running(handle),
            Err(source) => {
                let err = TestgateError::ExportWrite {
                    path: first,
                    source,
                };
                tracing::warn!(error = %err, "could not start export thread");
                self.console.write(&format!("⚠️ testgate: {err}\n"));
                ExportTask::Finished(ExportOutcome {
                    written: Vec::new(),
                    failures: vec![err],
                })
            }
        }
    }

    /// Block until the background export completes. `None` when no export was
    /// started or it was already collected.
    pub fn wait_for_export(&self) -> Option<ExportOutcome> {
        let task = self.lock().export.take()?;
        match task {
            ExportTask::Finished(outcome) => Some(outcome),
            ExportTask::Running(handle) => match handle.join() {
                Ok(outcome) => Some(outcome),
                Err(_) => {
                    tracing::error!("export thread panicked");
                    None
                }
            },
        }
    }
}

impl<C: Clock> TestRunListener for RunReporter<C> {
    fn on_run_start(&self) {
        self.start();
    }

    fn on_task_update(&self, updates: &[TaskUpdate]) {
        self.update(updates);
    }

    fn on_run_finished(&self, files: &[String], errors: &[String]) {
        self.finish(files, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferConsole;
    use crate::FixedClock;
    use testgate_types::{MemoryUsage, Severity, TaskState};

    fn tool() -> ToolInfo {
        ToolInfo {
            name: "testgate".to_string(),
            version: "0.0.0".to_string(),
        }
    }

    fn reporter(config: ReporterConfig) -> (RunReporter<FixedClock>, Arc<BufferConsole>) {
        let console = Arc::new(BufferConsole::new());
        let r = RunReporter::new(
            config,
            tool(),
            FixedClock("2026-01-01T00:00:00Z".to_string()),
            console.clone(),
        )
        .unwrap();
        (r, console)
    }

    fn upd(file: &str, name: &str, state: TaskState, ts: Option<u64>) -> TaskUpdate {
        TaskUpdate {
            kind: TaskKind::Test,
            file: file.to_string(),
            name: name.to_string(),
            state,
            timestamp_micros: ts,
            memory: None,
        }
    }

    /// Start at `at`, pass after `d` microseconds.
    fn timed(name: &str, at: u64, d: u64) -> [TaskUpdate; 2] {
        [
            upd("a.test.ts", name, TaskState::Run, Some(at)),
            upd("a.test.ts", name, TaskState::Pass, Some(at + d)),
        ]
    }

    #[test]
    fn slow_tests_are_sorted_descending() {
        let (r, console) = reporter(ReporterConfig::default());
        r.start();
        r.update(&timed("fast", 0, 500));
        r.update(&timed("medium", 0, 1_500_000));
        r.update(&timed("slowest", 0, 2_000_000));
        let s = r.finish(&[], &[]);

        let slow: Vec<u64> = s.report.slow_tests.iter().map(|t| t.duration_micros).collect();
        assert_eq!(slow, vec![2_000_000, 1_500_000]);
        assert!(console.contents().contains("Slow Tests (2 over 1000.00ms)"));
        assert_eq!(r.phase(), Phase::Done);
    }

    #[test]
    fn empty_run_summarizes_zero_tests() {
        let (r, console) = reporter(ReporterConfig::default());
        r.start();
        let s = r.finish(&[], &[]);
        assert_eq!(s.report.counts.total, 0);
        assert_eq!(s.report.stats.average_duration_micros, 0);
        assert!(console.contents().contains("Total Tests: 0"));
    }

    #[test]
    fn custom_rule_violation_uses_configured_message() {
        let mut config = ReporterConfig::default();
        config.report.budget_rules.push(BudgetRule {
            pattern: "checkout".to_string(),
            budget_micros: 200_000,
            message: "checkout flow too slow".to_string(),
            severity: Severity::Error,
        });
        let (r, _) = reporter(config);
        r.start();
        r.update(&timed("checkout-flow", 10, 300_000));
        let s = r.finish(&[], &[]);

        assert_eq!(s.report.violations.len(), 1);
        let v = &s.report.violations[0].violation;
        assert_eq!(v.message, "checkout flow too slow");
        assert_eq!(v.severity, Severity::Error);
    }

    #[test]
    fn missing_start_time_skips_only_that_test() {
        let (r, _) = reporter(ReporterConfig::default());
        r.start();
        r.update(&timed("ok-1", 0, 100));
        r.update(&[upd("a.test.ts", "orphan", TaskState::Pass, Some(50))]);
        r.update(&timed("ok-2", 0, 200));
        let s = r.finish(&[], &[]);

        assert_eq!(s.report.records.len(), 2);
        assert!(s.report.records.iter().all(|rec| rec.id.name != "orphan"));
        assert_eq!(s.warnings.len(), 1);
        assert!(s.warnings[0].contains("no start time recorded"));
        assert!(s.console.contains("Warnings (1)"));
    }

    #[test]
    fn missing_completion_and_negative_duration_are_warnings() {
        let (r, _) = reporter(ReporterConfig::default());
        r.start();
        r.update(&[
            upd("a.test.ts", "no-end", TaskState::Run, Some(10)),
            upd("a.test.ts", "no-end", TaskState::Fail, None),
            upd("a.test.ts", "backwards", TaskState::Run, Some(100)),
            upd("a.test.ts", "backwards", TaskState::Pass, Some(40)),
        ]);
        let s = r.finish(&[], &[]);
        assert!(s.report.records.is_empty());
        assert_eq!(s.warnings.len(), 2);
        assert!(s.warnings[1].contains("before its start"));
    }

    #[test]
    fn duplicate_completion_keeps_first_record() {
        let (r, _) = reporter(ReporterConfig::default());
        r.start();
        r.update(&timed("retried", 0, 100));
        r.update(&timed("retried", 1_000, 900));
        let s = r.finish(&[], &[]);
        assert_eq!(s.report.records.len(), 1);
        assert_eq!(s.report.records[0].duration_micros, Some(100));
        assert!(s.warnings[0].contains("duplicate"));
    }

    #[test]
    fn skipped_and_todo_tests_are_recorded_without_duration() {
        let (r, _) = reporter(ReporterConfig::default());
        r.start();
        r.update(&[
            upd("a.test.ts", "skipped", TaskState::Skip, Some(5)),
            upd("a.test.ts", "later", TaskState::Todo, None),
        ]);
        let s = r.finish(&[], &[]);
        assert_eq!(s.report.records.len(), 2);
        assert!(s.report.records.iter().all(|rec| rec.duration_micros.is_none()));
        assert_eq!(s.report.counts.skipped, 1);
        assert_eq!(s.report.counts.pending, 1);
        assert_eq!(s.report.stats.count, 0);
        assert!(s.warnings.is_empty());
    }

    #[test]
    fn suite_and_file_updates_are_ignored() {
        let (r, _) = reporter(ReporterConfig::default());
        r.start();
        let mut u = upd("a.test.ts", "suite", TaskState::Pass, Some(5));
        u.kind = TaskKind::Suite;
        r.update(&[u]);
        let s = r.finish(&[], &[]);
        assert!(s.report.records.is_empty());
        assert!(s.warnings.is_empty());
    }

    #[test]
    fn memory_snapshot_is_kept_on_the_record() {
        let (r, _) = reporter(ReporterConfig::default());
        r.start();
        let [start, mut end] = timed("heavy", 0, 10);
        end.memory = Some(MemoryUsage {
            used_heap_bytes: 1_048_576,
            total_heap_bytes: 2_097_152,
            heap_limit_bytes: 4_194_304,
        });
        r.update(&[start, end]);
        let s = r.finish(&[], &[]);
        assert_eq!(s.report.memory.as_ref().map(|m| m.peak_used_bytes), Some(1_048_576));
        assert!(s.console.contains("Memory Usage"));
    }

    #[test]
    fn run_errors_are_listed() {
        let (r, _) = reporter(ReporterConfig::default());
        r.start();
        let s = r.finish(&["a.test.ts".to_string()], &["worker crashed".to_string()]);
        assert_eq!(s.report.run_errors, vec!["worker crashed".to_string()]);
        assert!(s.console.contains("Run Errors (1)"));
    }

    #[test]
    fn finish_without_start_still_reports() {
        let (r, console) = reporter(ReporterConfig::default());
        let s = r.finish(&[], &[]);
        assert_eq!(s.report.counts.total, 0);
        assert!(console.contents().contains("Suite Statistics"));
    }

    #[test]
    fn second_finish_returns_first_summary_and_updates_are_ignored() {
        let (r, console) = reporter(ReporterConfig::default());
        r.start();
        r.update(&timed("one", 0, 10));
        let first = r.finish(&[], &[]);
        r.update(&timed("two", 0, 10));
        r.start();
        let second = r.finish(&[], &[]);
        assert_eq!(first.report, second.report);
        assert_eq!(second.report.records.len(), 1);
        assert_eq!(console.contents().matches("Suite Statistics").count(), 1);
    }

    #[test]
    fn restart_discards_partial_run() {
        let (r, _) = reporter(ReporterConfig::default());
        r.start();
        r.update(&timed("stale", 0, 10));
        r.start();
        r.update(&timed("fresh", 0, 10));
        let s = r.finish(&[], &[]);
        assert_eq!(s.report.records.len(), 1);
        assert_eq!(s.report.records[0].id.name, "fresh");
    }

    fn direct(name: &str, d: u64) -> MetricRecord {
        MetricRecord {
            id: TestId::new("bench.rs", name),
            duration_micros: Some(d),
            completed_at: "2026-01-01T00:00:00Z".to_string(),
            outcome: Outcome::Passed,
            violations: vec![],
            memory: None,
        }
    }

    #[test]
    fn directly_recorded_tests_get_budgets_and_slow_list() {
        let (r, console) = reporter(ReporterConfig::default());
        r.start();
        r.record(direct("bulk insert", 2_000_000)).unwrap();
        r.update(&timed("quick", 0, 10));
        let s = r.finish(&[], &[]);

        assert_eq!(s.report.records.len(), 2);
        assert_eq!(s.report.slow_tests.len(), 1);
        assert_eq!(s.report.slow_tests[0].test.name, "bulk insert");
        assert_eq!(s.report.violations.len(), 1);
        assert_eq!(s.report.violations[0].test.name, "bulk insert");
        assert_eq!(s.report.counts.total, 2);
        assert!(console.contents().contains("Slow Tests (1 over 1000.00ms)"));
    }

    #[test]
    fn direct_duplicate_is_rejected_with_a_warning() {
        let (r, _) = reporter(ReporterConfig::default());
        r.record(direct("once", 5)).unwrap();
        let err = r.record(direct("once", 7)).unwrap_err();
        assert!(matches!(err, TestgateError::DuplicateTest { .. }));
        let s = r.finish(&[], &[]);
        assert_eq!(s.report.records.len(), 1);
        assert_eq!(s.report.records[0].duration_micros, Some(5));
        assert_eq!(s.warnings.len(), 1);
    }

    #[test]
    fn direct_record_after_finish_is_dropped() {
        let (r, _) = reporter(ReporterConfig::default());
        r.start();
        r.finish(&[], &[]);
        r.record(direct("late", 5)).unwrap();
        assert!(r.records().is_empty());
    }

    #[test]
    fn records_before_run_start_are_kept() {
        let (r, _) = reporter(ReporterConfig::default());
        r.record(direct("early", 5)).unwrap();
        r.update(&timed("early-update", 0, 10));
        assert_eq!(r.phase(), Phase::Running);
        r.start();
        r.update(&timed("after", 0, 10));
        let s = r.finish(&[], &[]);
        let names: Vec<&str> = s.report.records.iter().map(|rec| rec.id.name.as_str()).collect();
        assert_eq!(names, vec!["early", "early-update", "after"]);
    }

    #[test]
    fn run_start_time_is_captured() {
        let (r, console) = reporter(ReporterConfig::default());
        r.start();
        let s = r.finish(&[], &[]);
        assert_eq!(s.report.started_at.as_deref(), Some("2026-01-01T00:00:00Z"));
        assert!(console.contents().contains("Started: 2026-01-01T00:00:00Z"));
        let json = testgate_render::render_json(&s.report).unwrap();
        assert!(json.contains("\"started_at\": \"2026-01-01T00:00:00Z\""));
    }

    #[test]
    fn implicit_start_captures_start_time() {
        let (r, _) = reporter(ReporterConfig::default());
        r.update(&timed("early", 0, 10));
        let s = r.finish(&[], &[]);
        assert_eq!(s.report.started_at.as_deref(), Some("2026-01-01T00:00:00Z"));
    }

    #[test]
    fn run_that_never_started_has_no_start_time() {
        let (r, console) = reporter(ReporterConfig::default());
        let s = r.finish(&[], &[]);
        assert_eq!(s.report.started_at, None);
        assert!(!console.contents().contains("Started:"));
    }

    #[test]
    fn skipped_test_completed_before_start_is_a_warning() {
        let (r, _) = reporter(ReporterConfig::default());
        r.start();
        r.update(&[
            upd("a.test.ts", "flaky-skip", TaskState::Run, Some(100)),
            upd("a.test.ts", "flaky-skip", TaskState::Skip, Some(40)),
        ]);
        let s = r.finish(&[], &[]);
        assert_eq!(s.report.records.len(), 1);
        assert_eq!(s.report.records[0].duration_micros, None);
        assert_eq!(s.report.counts.skipped, 1);
        assert_eq!(s.warnings.len(), 1);
        assert!(s.warnings[0].contains("before its start"));
    }

    #[test]
    fn report_counts_match_recorded_outcomes() {
        let (r, _) = reporter(ReporterConfig::default());
        r.start();
        r.update(&timed("ok", 0, 10));
        r.update(&[
            upd("a.test.ts", "bad", TaskState::Run, Some(0)),
            upd("a.test.ts", "bad", TaskState::Fail, Some(5)),
            upd("a.test.ts", "later", TaskState::Todo, None),
        ]);
        let s = r.finish(&[], &[]);
        assert_eq!(s.report.counts.total, 3);
        assert_eq!(s.report.counts.passed, 1);
        assert_eq!(s.report.counts.failed, 1);
        assert_eq!(s.report.counts.pending, 1);
    }

    #[test]
    fn malformed_rule_fails_construction() {
        let mut config = ReporterConfig::default();
        config.report.budget_rules.push(BudgetRule {
            pattern: String::new(),
            budget_micros: 1,
            message: "x".to_string(),
            severity: Severity::Warning,
        });
        let err = RunReporter::new(
            config,
            tool(),
            FixedClock(String::new()),
            Arc::new(BufferConsole::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, TestgateError::MalformedConfig(_)));
    }

    #[test]
    fn csv_export_writes_csv_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReporterConfig {
            export_path: Some(dir.path().join("out/report.json")),
            report: testgate_types::ReportConfig {
                format: testgate_types::ReportFormat::Csv,
                ..Default::default()
            },
            ..Default::default()
        };
        let (r, _) = reporter(config);
        r.start();
        r.update(&timed("one", 0, 10));
        let s = r.finish(&[], &[]);
        assert_eq!(s.export_paths.len(), 2);

        let outcome = r.wait_for_export().unwrap();
        assert!(outcome.is_success());
        let csv = std::fs::read_to_string(dir.path().join("out/report.csv")).unwrap();
        assert!(csv.contains("a.test.ts > one"));
        assert!(dir.path().join("out/report.json").exists());
        assert!(r.wait_for_export().is_none());
    }

    #[test]
    fn export_failure_is_reported_on_console() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let config = ReporterConfig {
            export_path: Some(blocker.join("report")),
            ..Default::default()
        };
        let (r, console) = reporter(config);
        r.start();
        r.finish(&[], &[]);
        let outcome = r.wait_for_export().unwrap();
        assert_eq!(outcome.failures.len(), 1);
        assert!(console.contents().contains("failed to write export"));
    }

    #[test]
    fn concurrent_updates_record_every_test() {
        let (r, _) = reporter(ReporterConfig::default());
        let r = Arc::new(r);
        r.start();
        let handles: Vec<_> = (0..4)
            .map(|w| {
                let r = Arc::clone(&r);
                std::thread::spawn(move || {
                    for i in 0..25u64 {
                        let file = format!("w{w}.test.ts");
                        let name = format!("t{i}");
                        r.on_task_update(&[upd(&file, &name, TaskState::Run, Some(i))]);
                        r.on_task_update(&[upd(&file, &name, TaskState::Pass, Some(i * 2))]);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let s = r.finish(&[], &[]);
        assert_eq!(s.report.records.len(), 100);
        assert_eq!(s.report.counts.passed, 100);
    }

    #[test]
    fn dispatch_routes_wire_events() {
        let (r, _) = reporter(ReporterConfig::default());
        let events: Vec<RunEvent> = [
            r#"{"event":"run_start"}"#,
            r#"{"event":"task_update","updates":[{"kind":"test","file":"a.ts","name":"x","state":"run","timestamp_micros":0}]}"#,
            r#"{"event":"task_update","updates":[{"kind":"test","file":"a.ts","name":"x","state":"pass","timestamp_micros":42}]}"#,
            r#"{"event":"run_finished"}"#,
        ]
        .iter()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
        for e in &events {
            dispatch(&r, e);
        }
        assert_eq!(r.phase(), Phase::Done);
        let records = r.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, TestId::new("a.ts", "x"));
        assert_eq!(records[0].duration_micros, Some(42));
    }
}
