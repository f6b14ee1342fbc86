use crate::format_millis;
use testgate_types::{
    BudgetRule, MetricRecord, ReportConfig, Severity, TestId, Violation, SLOW_TEST_RULE,
};

const GLOB_META: [char; 3] = ['*', '?', '['];

/// The built-in rule: anything over the global slow-test threshold is a warning.
pub fn default_rule(slow_test_threshold_micros: u64) -> BudgetRule {
    BudgetRule {
        pattern: "*".to_string(),
        budget_micros: slow_test_threshold_micros,
        message: format!("{SLOW_TEST_RULE}: {{duration}} exceeds threshold {{budget}}"),
        severity: Severity::Warning,
    }
}

/// Built-in rule first, then the custom rules in declaration order.
pub fn rules_for(config: &ReportConfig) -> Vec<BudgetRule> {
    let mut rules = Vec::with_capacity(config.budget_rules.len() + 1);
    rules.push(default_rule(config.slow_test_threshold_micros));
    rules.extend(config.budget_rules.iter().cloned());
    rules
}

/// Substring match against `"<file> > <name>"`, or glob match when the pattern
/// contains a wildcard. An unparsable glob matches nothing.
pub fn rule_matches(rule: &BudgetRule, id: &TestId) -> bool {
    let haystack = id.to_string();
    if rule.pattern.contains(GLOB_META) {
        glob::Pattern::new(&rule.pattern)
            .map(|p| p.matches(&haystack))
            .unwrap_or(false)
    } else {
        haystack.contains(&rule.pattern)
    }
}

/// Evaluate a record against `rules`. Violation order mirrors rule order.
pub fn evaluate(record: &MetricRecord, rules: &[BudgetRule]) -> Vec<Violation> {
    evaluate_duration(&record.id, record.duration_micros, rules)
}

/// Same as [`evaluate`], for a record that has not been built yet.
pub fn evaluate_duration(
    id: &TestId,
    duration_micros: Option<u64>,
    rules: &[BudgetRule],
) -> Vec<Violation> {
    let Some(duration) = duration_micros else {
        return Vec::new();
    };

    rules
        .iter()
        .filter(|rule| duration > rule.budget_micros && rule_matches(rule, id))
        .map(|rule| Violation {
            severity: rule.severity,
            message: render_message(&rule.message, id, duration, rule.budget_micros),
            rule: rule.clone(),
        })
        .collect()
}

fn render_message(template: &str, id: &TestId, duration: u64, budget: u64) -> String {
    template
        .replace("{test}", &id.to_string())
        .replace("{duration}", &format_millis(duration))
        .replace("{budget}", &format_millis(budget))
        .replace("{over}", &format_millis(duration.saturating_sub(budget)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use testgate_types::Outcome;

    fn record(file: &str, name: &str, duration: Option<u64>) -> MetricRecord {
        MetricRecord {
            id: TestId::new(file, name),
            duration_micros: duration,
            completed_at: "2026-01-01T00:00:00Z".to_string(),
            outcome: Outcome::Passed,
            violations: vec![],
            memory: None,
        }
    }

    fn rule(pattern: &str, budget: u64, message: &str) -> BudgetRule {
        BudgetRule {
            pattern: pattern.to_string(),
            budget_micros: budget,
            message: message.to_string(),
            severity: Severity::Warning,
        }
    }

    #[test]
    fn custom_rule_flags_over_budget_test() {
        let r = record("cart.test.ts", "checkout-flow", Some(300_000));
        let rules = vec![rule("checkout", 200_000, "checkout flow too slow")];
        let v = evaluate(&r, &rules);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].severity, Severity::Warning);
        assert_eq!(v[0].message, "checkout flow too slow");
        assert_eq!(v[0].rule, rules[0]);
    }

    #[test]
    fn message_template_references_overage() {
        let r = record("cart.test.ts", "checkout-flow", Some(300_000));
        let mut rules = vec![rule("checkout", 200_000, "{test} over by {over} ({duration} > {budget})")];
        rules[0].severity = Severity::Error;
        let v = evaluate(&r, &rules);
        assert_eq!(
            v[0].message,
            "cart.test.ts > checkout-flow over by 100.00ms (300.00ms > 200.00ms)"
        );
        assert_eq!(v[0].severity, Severity::Error);
    }

    #[test]
    fn budget_is_exclusive() {
        let r = record("a.ts", "t", Some(200_000));
        assert!(evaluate(&r, &[rule("t", 200_000, "m")]).is_empty());
    }

    #[test]
    fn no_duration_means_no_violations() {
        let r = record("a.ts", "skipped", None);
        assert!(evaluate(&r, &[rule("*", 0, "m")]).is_empty());
    }

    #[test]
    fn glob_patterns_match_the_full_identifier() {
        let id = TestId::new("src/api/users.test.ts", "lists users");
        assert!(rule_matches(&rule("src/api/*", 0, "m"), &id));
        assert!(rule_matches(&rule("*users*", 0, "m"), &id));
        assert!(!rule_matches(&rule("src/ui/*", 0, "m"), &id));
        // brackets open a character class; an unterminated one never matches
        assert!(!rule_matches(&rule("[", 0, "m"), &id));
        assert!(rule_matches(&rule("api/users", 0, "m"), &id));
    }

    #[test]
    fn default_rule_tags_slow_tests() {
        let rules = rules_for(&ReportConfig::default());
        assert_eq!(rules.len(), 1);
        let slow = record("a.ts", "big", Some(1_500_000));
        let v = evaluate(&slow, &rules);
        assert_eq!(v.len(), 1);
        assert!(v[0].message.starts_with(SLOW_TEST_RULE));
        assert!(v[0].message.contains("1500.00ms"));
        assert!(evaluate(&record("a.ts", "quick", Some(10)), &rules).is_empty());
    }

    #[test]
    fn built_in_rule_precedes_custom_rules() {
        let config = ReportConfig {
            budget_rules: vec![rule("big", 10, "custom")],
            ..ReportConfig::default()
        };
        let v = evaluate(&record("a.ts", "big", Some(2_000_000)), &rules_for(&config));
        assert_eq!(v.len(), 2);
        assert!(v[0].message.starts_with(SLOW_TEST_RULE));
        assert_eq!(v[1].message, "custom");
    }

    proptest! {
        /// Violations appear in rule declaration order, one per matching rule.
        #[test]
        fn prop_violations_follow_rule_order(
            budgets in prop::collection::vec(0u64..1_000, 0..20),
            duration in 0u64..1_000,
        ) {
            let rules: Vec<BudgetRule> = budgets
                .iter()
                .enumerate()
                .map(|(i, b)| rule("t", *b, &format!("rule-{i}")))
                .collect();
            let v = evaluate(&record("a.ts", "t", Some(duration)), &rules);

            let expected: Vec<String> = budgets
                .iter()
                .enumerate()
                .filter(|(_, b)| duration > **b)
                .map(|(i, _)| format!("rule-{i}"))
                .collect();
            let actual: Vec<String> = v.into_iter().map(|v| v.message).collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn prop_unmatched_record_has_no_violations(duration in any::<u64>()) {
            let rules = vec![rule("nothing-matches-this", 0, "m")];
            prop_assert!(evaluate(&record("a.ts", "t", Some(duration)), &rules).is_empty());
        }
    }
}
