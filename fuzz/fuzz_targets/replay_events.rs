//! Feeds arbitrary JSON lines through a run reporter.
//!
//! Malformed lines are dropped the same way `testgate replay` drops them;
//! whatever parses must never panic the reporter or any renderer.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use testgate_app::{dispatch, BufferConsole, FixedClock, RunReporter};
use testgate_types::{ReportFormat, ReporterConfig, RunEvent, ToolInfo};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(reporter) = RunReporter::new(
        ReporterConfig::default(),
        ToolInfo {
            name: "testgate".to_string(),
            version: "fuzz".to_string(),
        },
        FixedClock("2026-01-01T00:00:00Z".to_string()),
        Arc::new(BufferConsole::new()),
    ) else {
        return;
    };

    for line in text.lines() {
        if let Ok(event) = serde_json::from_str::<RunEvent>(line) {
            dispatch(&reporter, &event);
        }
    }

    let summary = reporter.finish(&[], &[]);
    assert_eq!(summary.report.counts.total as usize, summary.report.records.len());
    for format in [ReportFormat::Json, ReportFormat::Csv, ReportFormat::Html] {
        let _ = testgate_render::render(&summary.report, format);
    }
});
