//! Testgate workspace-level test utilities.
//!
//! This crate exists solely to support workspace-level integration tests,
//! particularly the BDD/cucumber tests in `tests/cucumber.rs`.
//!
//! The actual testgate functionality is in the workspace member crates:
//! - `testgate-error`: Error taxonomy
//! - `testgate-types`: Shared types, events and JSON schemas
//! - `testgate-domain`: Statistics, budgets and aggregates
//! - `testgate-render`: JSON, CSV, HTML and console renderers
//! - `testgate-app`: Tracker, run reporter, config and export
//! - `testgate-cli`: The `testgate` binary
