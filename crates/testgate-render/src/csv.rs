use testgate_types::TestRunReport;

pub const CSV_HEADER: &str = "test_id,file,name,duration_us,outcome,violations\n";

/// One row per test (RFC 4180), in record order. Tests without a duration
/// leave `duration_us` empty.
pub fn render_csv(report: &TestRunReport) -> String {
    let mut output = String::from(CSV_HEADER);

    for r in &report.records {
        output.push_str(&csv_escape(&r.id.to_string()));
        output.push(',');
        output.push_str(&csv_escape(&r.id.file));
        output.push(',');
        output.push_str(&csv_escape(&r.id.name));
        output.push(',');
        output.push_str(&r.duration_micros.map_or(String::new(), |d| d.to_string()));
        output.push(',');
        output.push_str(r.outcome.as_str());
        output.push(',');
        output.push_str(&r.violations.len().to_string());
        output.push('\n');
    }

    output
}

/// Quote a CSV field (RFC 4180) when it holds a comma, a double quote, or a
/// line break (`\n` or `\r`); embedded quotes are doubled.
pub fn csv_escape(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
