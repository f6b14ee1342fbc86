//! Self-contained HTML report rendered through a handlebars template.

use handlebars::Handlebars;
use serde_json::{json, Value};
use testgate_domain::format_millis;
use testgate_types::{TestRunReport, SLOW_TEST_DISPLAY_LIMIT};

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>testgate report</title>
<style>
body { font-family: system-ui, sans-serif; margin: 2rem; color: #1f2328; }
table { border-collapse: collapse; margin-bottom: 1.5rem; }
th, td { border: 1px solid #d0d7de; padding: 0.3rem 0.7rem; text-align: left; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
.callout { border-left: 4px solid #bf8700; background: #fff8c5; padding: 0.4rem 0.8rem; margin: 0.4rem 0; }
.callout.error { border-color: #cf222e; background: #ffebe9; }
.empty, .more { font-style: italic; color: #57606a; }
</style>
</head>
<body>
<h1>Test run report</h1>
<p class="meta">{{#if started_at}}Run started {{started_at}}. {{/if}}Generated at {{generated_at}} by {{tool}}</p>
{{#if empty}}
<p class="empty">No tests were recorded in this run.</p>
{{/if}}
<h2>Suite statistics</h2>
<table class="stats">
<tr><th>Total tests</th><td class="num">{{counts.total}}</td></tr>
<tr><th>Passed</th><td class="num">{{counts.passed}}</td></tr>
<tr><th>Failed</th><td class="num">{{counts.failed}}</td></tr>
<tr><th>Skipped</th><td class="num">{{counts.skipped}}</td></tr>
<tr><th>Pending</th><td class="num">{{counts.pending}}</td></tr>
{{#each timings}}
<tr><th>{{label}}</th><td class="num" data-us="{{micros}}">{{millis}}</td></tr>
{{/each}}
</table>
<h2>Duration buckets</h2>
<table class="buckets">
<thead><tr><th>Range</th><th>Tests</th></tr></thead>
<tbody>
{{#each buckets}}
<tr><td>{{label}}</td><td class="num">{{count}}</td></tr>
{{/each}}
</tbody>
</table>
{{#if slow}}
<h2>Slow tests</h2>
<table class="slow">
<thead><tr><th>Test</th><th>Duration</th></tr></thead>
<tbody>
{{#each slow}}
<tr><td>{{test}}</td><td class="num" data-us="{{micros}}">{{millis}}</td></tr>
{{/each}}
</tbody>
</table>
{{#if slow_more}}
<p class="more">+{{slow_more}} more</p>
{{/if}}
{{/if}}
{{#if violations}}
<h2>Budget violations</h2>
{{#each violations}}
<div class="callout {{severity}}"><strong>{{severity}}</strong> <code>{{test}}</code>: {{message}} <span data-us="{{micros}}">({{millis}})</span></div>
{{/each}}
{{/if}}
{{#if files}}
<h2>By file</h2>
<table class="files">
<thead><tr><th>File</th><th>Tests</th><th>Passed</th><th>Failed</th><th>Skipped</th><th>Total</th><th>Average</th></tr></thead>
<tbody>
{{#each files}}
<tr><td>{{file}}</td><td class="num">{{tests}}</td><td class="num">{{passed}}</td><td class="num">{{failed}}</td><td class="num">{{skipped}}</td><td class="num">{{total}}</td><td class="num">{{average}}</td></tr>
{{/each}}
</tbody>
</table>
{{/if}}
{{#if trend}}
<h2>Trend</h2>
<table class="trend">
<thead><tr><th>#</th><th>Test</th><th>Duration</th><th>Rolling average</th></tr></thead>
<tbody>
{{#each trend}}
<tr><td class="num">{{sequence}}</td><td>{{test}}</td><td class="num">{{duration}}</td><td class="num">{{average}}</td></tr>
{{/each}}
</tbody>
</table>
{{/if}}
{{#if memory}}
<h2>Memory usage</h2>
<table class="memory">
<tr><th>Samples</th><td class="num">{{memory.samples}}</td></tr>
<tr><th>Peak used heap</th><td class="num">{{memory.peak}} ({{memory.peak_test}})</td></tr>
<tr><th>Average used heap</th><td class="num">{{memory.average}}</td></tr>
<tr><th>Heap limit</th><td class="num">{{memory.limit}}</td></tr>
</table>
{{/if}}
{{#if run_errors}}
<h2>Run errors</h2>
<ul>
{{#each run_errors}}
<li>{{this}}</li>
{{/each}}
</ul>
{{/if}}
</body>
</html>
"#;

pub fn render_html(report: &TestRunReport) -> anyhow::Result<String> {
    let mut hb = Handlebars::new();
    hb.register_template_string("report", TEMPLATE)
        .map_err(|e| anyhow::anyhow!("invalid html template: {e}"))?;
    hb.render("report", &template_data(report))
        .map_err(|e| anyhow::anyhow!("render html report: {e}"))
}

fn timing(label: &str, micros: u64) -> Value {
    json!({ "label": label, "micros": micros, "millis": format_millis(micros) })
}

fn template_data(report: &TestRunReport) -> Value {
    let s = &report.stats;

    let slow: Vec<Value> = report
        .slow_tests
        .iter()
        .take(SLOW_TEST_DISPLAY_LIMIT)
        .map(|t| {
            json!({
                "test": t.test.to_string(),
                "micros": t.duration_micros,
                "millis": format_millis(t.duration_micros),
            })
        })
        .collect();

    let violations: Vec<Value> = report
        .violations
        .iter()
        .map(|v| {
            json!({
                "severity": v.violation.severity.as_str(),
                "test": v.test.to_string(),
                "message": v.violation.message,
                "micros": v.duration_micros,
                "millis": format_millis(v.duration_micros),
            })
        })
        .collect();

    let files: Vec<Value> = report
        .files
        .iter()
        .flatten()
        .map(|f| {
            json!({
                "file": f.file,
                "tests": f.tests,
                "passed": f.passed,
                "failed": f.failed,
                "skipped": f.skipped,
                "total": format_millis(f.total_duration_micros),
                "average": format_millis(f.average_duration_micros),
            })
        })
        .collect();

    let trend: Vec<Value> = report
        .trend
        .iter()
        .flatten()
        .map(|p| {
            json!({
                "sequence": p.sequence,
                "test": p.test.to_string(),
                "duration": format_millis(p.duration_micros),
                "average": format_millis(p.rolling_average_micros),
            })
        })
        .collect();

    let memory = report.memory.as_ref().map(|m| {
        json!({
            "samples": m.samples,
            "peak": format_bytes(m.peak_used_bytes),
            "peak_test": m.peak_test.to_string(),
            "average": format_bytes(m.average_used_bytes),
            "limit": format_bytes(m.heap_limit_bytes),
        })
    });

    json!({
        "generated_at": report.generated_at,
        "started_at": report.started_at,
        "tool": format!("{} {}", report.tool.name, report.tool.version),
        "empty": report.records.is_empty(),
        "counts": report.counts,
        "timings": [
            timing("Total duration", s.total_duration_micros),
            timing("Average", s.average_duration_micros),
            timing("Median", s.median_duration_micros),
            timing("P95", s.p95_duration_micros),
            timing("Min", s.min_duration_micros),
            timing("Max", s.max_duration_micros),
        ],
        "buckets": report.buckets,
        "slow": slow,
        "slow_more": report.slow_tests.len().saturating_sub(SLOW_TEST_DISPLAY_LIMIT),
        "violations": violations,
        "files": files,
        "trend": trend,
        "memory": memory,
        "run_errors": report.run_errors,
    })
}

/// Human-readable byte count (binary units, one decimal).
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
