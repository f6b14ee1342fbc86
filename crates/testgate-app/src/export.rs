//! Best-effort export of a finished report to disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use testgate_error::TestgateError;
use testgate_render::render;
use testgate_types::{ReportFormat, TestRunReport};

/// One file to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub path: PathBuf,
    pub format: ReportFormat,
}

/// What an export attempt did. Failures never abort the run.
#[derive(Debug, Default)]
pub struct ExportOutcome {
    pub written: Vec<PathBuf>,
    pub failures: Vec<TestgateError>,
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Files to write for `path` in `format`. The configured format gets the
/// matching extension; HTML and CSV exports also get a structured `.json`
/// sibling so the run can be re-rendered later.
pub fn plan_exports(path: &Path, format: ReportFormat) -> Vec<ExportTarget> {
    let mut targets = vec![ExportTarget {
        path: path.with_extension(format.extension()),
        format,
    }];
    if !format.is_structured() {
        targets.push(ExportTarget {
            path: path.with_extension(ReportFormat::Json.extension()),
            format: ReportFormat::Json,
        });
    }
    targets
}

/// Render and write every target. Each failure is recorded and the remaining
/// targets are still attempted.
pub fn write_exports(report: &TestRunReport, targets: &[ExportTarget]) -> ExportOutcome {
    let mut outcome = ExportOutcome::default();
    for target in targets {
        let result = render(report, target.format)
            .map_err(|e| std::io::Error::other(e.to_string()))
            .and_then(|text| atomic_write(&target.path, text.as_bytes()));
        match result {
            Ok(()) => {
                tracing::info!(path = %target.path.display(), format = %target.format, "report exported");
                outcome.written.push(target.path.clone());
            }
            Err(source) => outcome.failures.push(TestgateError::ExportWrite {
                path: target.path.clone(),
                source,
            }),
        }
    }
    outcome
}

/// Write via a uniquely named temp file in the destination directory, then
/// rename over `path`. Missing parent directories are created.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let tmp = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all().ok();
    }

    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}
