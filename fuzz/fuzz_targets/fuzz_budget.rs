//! Arbitrary patterns and test names must never panic budget evaluation, and a
//! violation is only ever raised for a duration over its budget.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use testgate_types::{BudgetRule, Severity, TestId};

#[derive(Arbitrary, Debug)]
struct BudgetInput {
    pattern: String,
    message: String,
    budget_micros: u64,
    file: String,
    name: String,
    duration_micros: Option<u64>,
}

fuzz_target!(|input: BudgetInput| {
    let rule = BudgetRule {
        pattern: input.pattern,
        budget_micros: input.budget_micros,
        message: input.message,
        severity: Severity::Warning,
    };
    let id = TestId::new(input.file, input.name);

    let _ = testgate_domain::rule_matches(&rule, &id);
    let violations =
        testgate_domain::evaluate_duration(&id, input.duration_micros, std::slice::from_ref(&rule));
    if let Some(v) = violations.first() {
        assert!(input.duration_micros.is_some_and(|d| d > v.rule.budget_micros));
    }
});
