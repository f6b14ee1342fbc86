//! Resolution of the optional `testgate.toml` file into a [`ReporterConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use testgate_error::ConfigError;
use testgate_types::{
    BudgetRule, BudgetRuleFile, ConfigFile, ReportConfig, ReporterConfig, ReportFormat, Severity,
};

const DEFAULT_RULE_MESSAGE: &str = "{test} took {duration}, over its {budget} budget by {over}";

/// Read and parse a TOML config file. The result still has to go through
/// [`resolve_config`].
pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Parse(format!("read {}: {e}", path.display())))?;
    toml::from_str(&text).map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))
}

/// Apply a parsed config file over the defaults.
pub fn resolve_config(file: ConfigFile) -> Result<ReporterConfig, ConfigError> {
    let defaults = ReporterConfig::default();
    let report_defaults = ReportConfig::default();

    let format = match file.format.as_deref() {
        Some(f) => f.parse::<ReportFormat>()?,
        None => report_defaults.format,
    };

    let slow_test_threshold_micros = match file.slow_test_threshold.as_deref() {
        Some(s) => parse_micros("slow_test_threshold", s)?,
        None => report_defaults.slow_test_threshold_micros,
    };

    let budget_rules = file
        .budgets
        .iter()
        .enumerate()
        .map(|(i, r)| budget_rule(i, r))
        .collect::<Result<Vec<_>, _>>()?;
    validate_rules(&budget_rules)?;

    Ok(ReporterConfig {
        detailed_timing: file.detailed_timing.unwrap_or(defaults.detailed_timing),
        budget_warnings: file.budget_warnings.unwrap_or(defaults.budget_warnings),
        export_path: file.export_path.map(PathBuf::from),
        report: ReportConfig {
            format,
            slow_test_threshold_micros,
            include_memory: file.include_memory.unwrap_or(report_defaults.include_memory),
            group_by_file: file.group_by_file.unwrap_or(report_defaults.group_by_file),
            include_trends: file.include_trends.unwrap_or(report_defaults.include_trends),
            budget_rules,
        },
    })
}

/// Reject rules whose pattern is empty or is an invalid glob.
pub fn validate_rules(rules: &[BudgetRule]) -> Result<(), ConfigError> {
    for (index, rule) in rules.iter().enumerate() {
        if rule.pattern.trim().is_empty() {
            return Err(ConfigError::EmptyPattern { index });
        }
        if rule.pattern.contains(['*', '?', '['])
            && glob::Pattern::new(&rule.pattern).is_err()
        {
            return Err(ConfigError::InvalidPattern {
                index,
                pattern: rule.pattern.clone(),
            });
        }
    }
    Ok(())
}

fn budget_rule(index: usize, r: &BudgetRuleFile) -> Result<BudgetRule, ConfigError> {
    let severity = match r.severity.as_deref() {
        Some(s) => s.parse::<Severity>()?,
        None => Severity::default(),
    };
    Ok(BudgetRule {
        pattern: r.pattern.clone(),
        budget_micros: parse_micros(&format!("budget[{index}].budget"), &r.budget)?,
        message: r
            .message
            .clone()
            .unwrap_or_else(|| DEFAULT_RULE_MESSAGE.to_string()),
        severity,
    })
}

fn parse_micros(field: &str, value: &str) -> Result<u64, ConfigError> {
    let d: Duration = humantime::parse_duration(value.trim()).map_err(|_| {
        ConfigError::InvalidDuration {
            field: field.to_string(),
            value: value.to_string(),
        }
    })?;
    Ok(u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
}
