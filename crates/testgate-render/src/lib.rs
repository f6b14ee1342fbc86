//! Rendering for testgate reports.
//!
//! Every renderer reads the same [`TestRunReport`], so the numbers in the JSON,
//! CSV, HTML and console outputs always agree; only presentation differs.
//! Nothing here mutates its inputs or fails on an empty run.

mod console;
mod csv;
mod html;

pub use console::{render_console, ConsoleOptions};
pub use csv::{csv_escape, render_csv, CSV_HEADER};
pub use html::render_html;

use testgate_domain::{
    bucket_by_duration, group_by_file, memory_summary, slow_tests, trend,
};
use testgate_types::{
    MetricRecord, OutcomeCounts, ReportConfig, ReportFormat, SlowTest, Stats, TestRunReport,
    ToolInfo, ViolationEntry, REPORT_SCHEMA_V1,
};

/// Run-level metadata that is not derived from the records.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub tool: ToolInfo,
    pub generated_at: String,
    /// When the run began, if it was observed.
    pub started_at: Option<String>,
    pub run_errors: Vec<String>,

    /// Slow tests already collected during the run. Computed from the records when absent.
    pub slow_tests: Option<Vec<SlowTest>>,
    /// Outcome counters kept while recording. Counted from the records when absent.
    pub counts: Option<OutcomeCounts>,
}

/// Assemble the report document from a run's records and aggregates.
pub fn build_report(
    records: &[MetricRecord],
    stats: &Stats,
    violations: &[ViolationEntry],
    config: &ReportConfig,
    meta: ReportMeta,
) -> TestRunReport {
    let counts = meta.counts.unwrap_or_else(|| {
        let mut counts = OutcomeCounts::default();
        for r in records {
            counts.add(r.outcome);
        }
        counts
    });

    let slow = match meta.slow_tests {
        Some(mut slow) => {
            slow.sort_by(|a, b| b.duration_micros.cmp(&a.duration_micros));
            slow
        }
        None => slow_tests(records, config.slow_test_threshold_micros),
    };

    TestRunReport {
        schema: REPORT_SCHEMA_V1.to_string(),
        tool: meta.tool,
        generated_at: meta.generated_at,
        started_at: meta.started_at,
        stats: stats.clone(),
        counts,
        buckets: bucket_by_duration(records),
        records: records.to_vec(),
        slow_tests: slow,
        violations: violations.to_vec(),
        files: config.group_by_file.then(|| group_by_file(records)),
        trend: config.include_trends.then(|| trend(records)),
        memory: if config.include_memory {
            memory_summary(records)
        } else {
            None
        },
        run_errors: meta.run_errors,
        config: config.clone(),
    }
}

/// Render `report` in the requested encoding.
pub fn render(report: &TestRunReport, format: ReportFormat) -> anyhow::Result<String> {
    match format {
        ReportFormat::Json => render_json(report),
        ReportFormat::Csv => Ok(render_csv(report)),
        ReportFormat::Html => render_html(report),
    }
}

/// Build and render in one step, using `config.format`.
pub fn render_report(
    records: &[MetricRecord],
    stats: &Stats,
    violations: &[ViolationEntry],
    config: &ReportConfig,
    meta: ReportMeta,
) -> anyhow::Result<String> {
    let report = build_report(records, stats, violations, config, meta);
    render(&report, config.format)
}

pub fn render_json(report: &TestRunReport) -> anyhow::Result<String> {
    let mut out = serde_json::to_string_pretty(report)?;
    out.push('\n');
    Ok(out)
}

/// Parse a structured report produced by [`render_json`].
pub fn parse_json(s: &str) -> anyhow::Result<TestRunReport> {
    Ok(serde_json::from_str(s)?)
}
