//! Shared types for testgate.
//!
//! Design goal: versioned, explicit, boring.
//! These structs travel between the tracker, the renderers and the structured
//! report that downstream tooling diffs between runs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use testgate_error::ConfigError;

pub const REPORT_SCHEMA_V1: &str = "testgate.report.v1";

/// Default slow-test threshold (1s).
pub const DEFAULT_SLOW_TEST_THRESHOLD_MICROS: u64 = 1_000_000;

/// How many slow tests the human-facing renderers list before the "+N more" trailer.
pub const SLOW_TEST_DISPLAY_LIMIT: usize = 10;

/// Window size for the rolling average in the in-run trend series.
pub const TREND_WINDOW: usize = 5;

/// Rule name used by the built-in slow-test budget.
pub const SLOW_TEST_RULE: &str = "slow test";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// Composite test identifier: source file plus test name.
#[derive(
    Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct TestId {
    pub file: String,
    pub name: String,
}

impl TestId {
    pub fn new(file: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} > {}", self.file, self.name)
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
    Pending,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed => "failed",
            Outcome::Skipped => "skipped",
            Outcome::Pending => "pending",
        }
    }
}

/// Heap snapshot captured when a test completed.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MemoryUsage {
    pub used_heap_bytes: u64,
    pub total_heap_bytes: u64,
    pub heap_limit_bytes: u64,
}

#[derive(
    Debug, Copy, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl FromStr for Severity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(ConfigError::UnknownSeverity(s.to_string())),
        }
    }
}

/// A duration budget applied to every test whose identifier matches `pattern`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct BudgetRule {
    /// Substring of `"<file> > <name>"`, or a glob when it contains `*`, `?` or `[`.
    pub pattern: String,

    pub budget_micros: u64,

    /// Message template; `{test}`, `{duration}`, `{budget}` and `{over}` are substituted.
    pub message: String,

    #[serde(default)]
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Violation {
    pub severity: Severity,
    pub message: String,
    pub rule: BudgetRule,
}

/// One immutable measurement per completed test.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MetricRecord {
    pub id: TestId,

    /// Absent for skipped/todo tests that never started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_micros: Option<u64>,

    /// Wall-clock completion time (RFC 3339).
    pub completed_at: String,

    pub outcome: Outcome,

    #[serde(default)]
    pub violations: Vec<Violation>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryUsage>,
}

/// A violation flattened out of its record, for report call-outs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ViolationEntry {
    pub test: TestId,
    pub duration_micros: u64,
    pub violation: Violation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Stats {
    pub count: u64,
    pub min_duration_micros: u64,
    pub max_duration_micros: u64,
    pub median_duration_micros: u64,
    pub p95_duration_micros: u64,
    pub average_duration_micros: u64,
    pub total_duration_micros: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DurationBucket {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub pending: u64,
}

impl OutcomeCounts {
    pub fn add(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Passed => self.passed += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Pending => self.pending += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SlowTest {
    pub test: TestId,
    pub duration_micros: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct FileSummary {
    pub file: String,
    pub tests: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub total_duration_micros: u64,
    pub average_duration_micros: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TrendPoint {
    pub sequence: u64,
    pub test: TestId,
    pub duration_micros: u64,
    pub rolling_average_micros: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MemorySummary {
    pub samples: u64,
    pub peak_used_bytes: u64,
    pub peak_test: TestId,
    pub average_used_bytes: u64,
    pub heap_limit_bytes: u64,
}

/// Closed set of report encodings.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// Structured data (JSON).
    #[default]
    Json,
    /// Delimited text (CSV).
    Csv,
    /// Styled markup (HTML).
    Html,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
            ReportFormat::Html => "html",
        }
    }

    pub fn is_structured(self) -> bool {
        matches!(self, ReportFormat::Json)
    }
}

impl FromStr for ReportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" | "structured-data" => Ok(ReportFormat::Json),
            "csv" | "delimited-text" => Ok(ReportFormat::Csv),
            "html" | "styled-markup" => Ok(ReportFormat::Html),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Report-shaping options, embedded verbatim in the structured report.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReportConfig {
    pub format: ReportFormat,
    pub slow_test_threshold_micros: u64,
    pub include_memory: bool,
    pub group_by_file: bool,
    pub include_trends: bool,
    #[serde(default)]
    pub budget_rules: Vec<BudgetRule>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Json,
            slow_test_threshold_micros: DEFAULT_SLOW_TEST_THRESHOLD_MICROS,
            include_memory: true,
            group_by_file: true,
            include_trends: false,
            budget_rules: Vec::new(),
        }
    }
}

/// Full reporter configuration: report shape plus console/export switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterConfig {
    pub detailed_timing: bool,
    pub budget_warnings: bool,
    pub export_path: Option<PathBuf>,
    pub report: ReportConfig,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            detailed_timing: true,
            budget_warnings: true,
            export_path: None,
            report: ReportConfig::default(),
        }
    }
}

/// The structured-data report document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TestRunReport {
    pub schema: String,
    pub tool: ToolInfo,

    /// Excluded from idempotence comparisons.
    pub generated_at: String,

    /// RFC 3339 time the run started; absent when no start was observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,

    pub stats: Stats,
    pub counts: OutcomeCounts,
    pub buckets: Vec<DurationBucket>,
    pub records: Vec<MetricRecord>,

    /// Every record over the slow-test threshold, slowest first.
    pub slow_tests: Vec<SlowTest>,

    pub violations: Vec<ViolationEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileSummary>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<Vec<TrendPoint>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemorySummary>,

    #[serde(default)]
    pub run_errors: Vec<String>,

    pub config: ReportConfig,
}

// ----------------------------
// Test-execution engine events
// ----------------------------

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Test,
    Suite,
    File,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// The test started; `timestamp_micros` is its start time.
    Run,
    Pass,
    Fail,
    Skip,
    Todo,
}

impl TaskState {
    /// Terminal outcome for this state, `None` while the test is still running.
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            TaskState::Run => None,
            TaskState::Pass => Some(Outcome::Passed),
            TaskState::Fail => Some(Outcome::Failed),
            TaskState::Skip => Some(Outcome::Skipped),
            TaskState::Todo => Some(Outcome::Pending),
        }
    }
}

/// One task-result delta as delivered by the test-execution engine.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TaskUpdate {
    pub kind: TaskKind,
    pub file: String,
    pub name: String,
    pub state: TaskState,

    /// Monotonic timestamp in microseconds: start time for `run`, completion time otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_micros: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryUsage>,
}

impl TaskUpdate {
    pub fn test_id(&self) -> TestId {
        TestId::new(self.file.clone(), self.name.clone())
    }
}

/// Wire form of the run lifecycle notifications (one JSON object per line).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStart,
    TaskUpdate {
        updates: Vec<TaskUpdate>,
    },
    RunFinished {
        #[serde(default)]
        files: Vec<String>,
        #[serde(default)]
        errors: Vec<String>,
    },
}

// ----------------------------
// Optional config file schema
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_timing: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_warnings: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_path: Option<String>,

    /// `json`, `csv` or `html`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Duration string parseable by humantime, e.g. "500ms".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slow_test_threshold: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_memory: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by_file: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_trends: Option<bool>,

    #[serde(default, rename = "budget")]
    pub budgets: Vec<BudgetRuleFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BudgetRuleFile {
    pub pattern: String,

    /// Duration string parseable by humantime, e.g. "200ms".
    pub budget: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}
