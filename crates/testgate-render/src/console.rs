use crate::html::format_bytes;
use testgate_domain::format_millis;
use testgate_types::{Severity, TestRunReport, SLOW_TEST_DISPLAY_LIMIT};

/// Which optional console sections to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleOptions {
    pub detailed_timing: bool,
    pub budget_warnings: bool,
    pub include_memory: bool,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            detailed_timing: true,
            budget_warnings: true,
            include_memory: true,
        }
    }
}

/// Plain-text end-of-run summary.
pub fn render_console(
    report: &TestRunReport,
    opts: ConsoleOptions,
    warnings: &[String],
) -> String {
    let mut out = String::new();
    let c = &report.counts;
    let s = &report.stats;

    out.push_str("Suite Statistics\n");
    if let Some(started) = &report.started_at {
        out.push_str(&format!("  Started: {started}\n"));
    }
    out.push_str(&format!("  Total Tests: {}\n", c.total));
    out.push_str(&format!(
        "  Passed: {}  Failed: {}  Skipped: {}  Pending: {}\n",
        c.passed, c.failed, c.skipped, c.pending
    ));
    if report.records.is_empty() {
        out.push_str("  No tests were recorded.\n");
    }
    out.push_str(&format!(
        "  Total Duration: {}\n",
        format_millis(s.total_duration_micros)
    ));
    out.push_str(&format!(
        "  Average: {}  Median: {}  P95: {}\n",
        format_millis(s.average_duration_micros),
        format_millis(s.median_duration_micros),
        format_millis(s.p95_duration_micros)
    ));
    out.push_str(&format!(
        "  Min: {}  Max: {}\n",
        format_millis(s.min_duration_micros),
        format_millis(s.max_duration_micros)
    ));

    if opts.detailed_timing {
        out.push_str("\nDetailed Timing\n");
        for b in &report.buckets {
            out.push_str(&format!("  {:<10} {}\n", b.label, b.count));
        }
        if let Some(files) = report.files.as_ref().filter(|f| !f.is_empty()) {
            out.push_str("  By file:\n");
            for f in files {
                out.push_str(&format!(
                    "    {}  {} tests  {} total ({} avg)\n",
                    f.file,
                    f.tests,
                    format_millis(f.total_duration_micros),
                    format_millis(f.average_duration_micros)
                ));
            }
        }
    }

    if !report.slow_tests.is_empty() {
        out.push_str(&format!(
            "\n⚠️ Slow Tests ({} over {})\n",
            report.slow_tests.len(),
            format_millis(report.config.slow_test_threshold_micros)
        ));
        for t in report.slow_tests.iter().take(SLOW_TEST_DISPLAY_LIMIT) {
            out.push_str(&format!(
                "  {:>12}  {}\n",
                format_millis(t.duration_micros),
                t.test
            ));
        }
        let more = report.slow_tests.len().saturating_sub(SLOW_TEST_DISPLAY_LIMIT);
        if more > 0 {
            out.push_str(&format!("  +{more} more\n"));
        }
    }

    if opts.budget_warnings && !report.violations.is_empty() {
        out.push_str(&format!("\nBudget Violations ({})\n", report.violations.len()));
        for v in &report.violations {
            let icon = match v.violation.severity {
                Severity::Warning => "⚠️",
                Severity::Error => "❌",
            };
            out.push_str(&format!(
                "  {icon} [{}] {}: {}\n",
                v.violation.severity.as_str(),
                v.test,
                v.violation.message
            ));
        }
    }

    if opts.include_memory
        && let Some(m) = &report.memory
    {
        out.push_str("\nMemory Usage\n");
        out.push_str(&format!(
            "  Peak used heap: {} ({})\n",
            format_bytes(m.peak_used_bytes),
            m.peak_test
        ));
        out.push_str(&format!(
            "  Average used heap: {} over {} samples\n",
            format_bytes(m.average_used_bytes),
            m.samples
        ));
        out.push_str(&format!("  Heap limit: {}\n", format_bytes(m.heap_limit_bytes)));
    }

    if !report.run_errors.is_empty() {
        out.push_str(&format!("\nRun Errors ({})\n", report.run_errors.len()));
        for e in &report.run_errors {
            out.push_str(&format!("  - {e}\n"));
        }
    }

    if !warnings.is_empty() {
        out.push_str(&format!("\nWarnings ({})\n", warnings.len()));
        for w in warnings {
            out.push_str(&format!("  - {w}\n"));
        }
    }

    out
}
