//! Application layer for testgate.
//!
//! The app layer owns the run-scoped state (tracker, start times, slow-test list)
//! and drives the domain and render crates from test-engine notifications.
//! It does not parse CLI flags; the only filesystem I/O is config loading and
//! the best-effort report export.

mod config;
mod console;
mod export;
mod reporter;
mod tracker;

pub use config::{load_config, resolve_config, validate_rules};
pub use console::{BufferConsole, ConsoleSink, StdoutConsole};
pub use export::{atomic_write, plan_exports, write_exports, ExportOutcome, ExportTarget};
pub use reporter::{dispatch, Phase, RunReporter, RunSummary, TestRunListener};
pub use tracker::Tracker;

pub trait Clock: Send + Sync {
    fn now_rfc3339(&self) -> String;
}

#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        use time::format_description::well_known::Rfc3339;
        time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }
}

/// A clock that always reports the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn now_rfc3339(&self) -> String {
        self.0.clone()
    }
}
