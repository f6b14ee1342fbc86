//! Error taxonomy for testgate.
//!
//! Only [`TestgateError::MalformedConfig`] is allowed to abort anything, and only
//! while a reporter is being constructed. Everything else is contained to a single
//! test record or to the export step and surfaces as a warning.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TestgateError {
    /// The same test identifier completed twice in one run.
    #[error("duplicate completion for test '{test}' ignored (first record kept)")]
    DuplicateTest { test: String },

    /// A terminal task update arrived without a prior "test started" signal.
    #[error("no start time recorded for test '{test}'; metrics skipped")]
    MissingStartTime { test: String },

    /// A terminal task update did not carry a completion timestamp.
    #[error("task update for test '{test}' has no completion timestamp; metrics skipped")]
    MissingCompletionTime { test: String },

    /// Completion was reported before the recorded start.
    #[error("test '{test}' completed at {completed_micros}us before its start at {started_micros}us; metrics skipped")]
    NegativeDuration {
        test: String,
        started_micros: u64,
        completed_micros: u64,
    },

    #[error("failed to write export {}: {source}", path.display())]
    ExportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    MalformedConfig(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown report format '{0}' (expected json, csv or html)")]
    UnknownFormat(String),

    #[error("invalid duration for {field}: '{value}'")]
    InvalidDuration { field: String, value: String },

    #[error("budget rule #{index} has an empty pattern")]
    EmptyPattern { index: usize },

    #[error("budget rule #{index} has an invalid glob pattern '{pattern}'")]
    InvalidPattern { index: usize, pattern: String },

    #[error("unknown severity '{0}' (expected warning or error)")]
    UnknownSeverity(String),

    #[error("failed to parse config file: {0}")]
    Parse(String),
}
