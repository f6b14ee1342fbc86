use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use testgate_app::{
    atomic_write, dispatch, load_config, resolve_config, Phase, RunReporter, StdoutConsole,
    SystemClock,
};
use testgate_error::{ConfigError, TestgateError};
use testgate_render::{parse_json, render};
use testgate_types::{ConfigFile, ReportFormat, ReporterConfig, RunEvent, ToolInfo};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_CONFIG: &str = "testgate.toml";
const LOG_ENV: &str = "TESTGATE_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "testgate",
    version,
    about = "Test-run timing reports and performance budgets for CI"
)]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, clap::Args)]
struct ConfigArgs {
    /// Config file (defaults to ./testgate.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay a recorded event stream (JSON lines) through the reporter.
    Replay {
        /// Event file, one run event per line; "-" reads stdin
        #[arg(long)]
        events: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Export format: json, csv or html (overrides the config file)
        #[arg(long)]
        format: Option<String>,

        /// Export base path (overrides the config file)
        #[arg(long)]
        export: Option<PathBuf>,

        /// Slow-test threshold, e.g. "500ms" (overrides the config file)
        #[arg(long)]
        slow_threshold: Option<String>,
    },

    /// Re-render a structured JSON report in another format.
    Render {
        #[arg(long)]
        report: PathBuf,

        /// Output format: json, csv or html
        #[arg(long, default_value = "html")]
        format: String,

        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Validate a config file and print the resolved settings.
    CheckConfig {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    if let Err(err) = real_main(cli) {
        eprintln!("{err:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn real_main(cli: Cli) -> anyhow::Result<()> {
    match cli.cmd {
        Command::Replay {
            events,
            config,
            format,
            export,
            slow_threshold,
        } => {
            let mut cfg = reporter_config(config.config.as_deref())?;
            if let Some(f) = format {
                cfg.report.format = f.parse::<ReportFormat>().map_err(TestgateError::from)?;
            }
            if let Some(path) = export {
                cfg.export_path = Some(path);
            }
            if let Some(s) = slow_threshold {
                cfg.report.slow_test_threshold_micros = parse_micros(&s)?;
            }

            let reporter = RunReporter::new(cfg, tool_info(), SystemClock, Arc::new(StdoutConsole))?;
            let replayed = replay(&events, &reporter)?;
            tracing::debug!(events = replayed, "event stream replayed");

            // the stream may end without a run_finished event
            if reporter.phase() != Phase::Done {
                reporter.finish(&[], &[]);
            }
            if let Some(outcome) = reporter.wait_for_export() {
                for path in &outcome.written {
                    eprintln!("wrote {}", path.display());
                }
            }
            Ok(())
        }

        Command::Render {
            report,
            format,
            out,
        } => {
            let format = format.parse::<ReportFormat>().map_err(TestgateError::from)?;
            let text = fs::read_to_string(&report)
                .with_context(|| format!("read {}", report.display()))?;
            let parsed = parse_json(&text)
                .with_context(|| format!("parse report {}", report.display()))?;
            let rendered = render(&parsed, format)?;
            match out {
                Some(path) => atomic_write(&path, rendered.as_bytes())
                    .with_context(|| format!("write {}", path.display()))?,
                None => print!("{rendered}"),
            }
            Ok(())
        }

        Command::CheckConfig { config } => {
            let cfg = reporter_config(config.config.as_deref())?;
            print_config(&cfg);
            Ok(())
        }
    }
}

/// Resolve the reporter config from an explicit file, `./testgate.toml`, or
/// the defaults, in that order.
fn reporter_config(path: Option<&Path>) -> anyhow::Result<ReporterConfig> {
    let file = match path {
        Some(p) => load_config(p).map_err(TestgateError::from)?,
        None if Path::new(DEFAULT_CONFIG).is_file() => {
            load_config(Path::new(DEFAULT_CONFIG)).map_err(TestgateError::from)?
        }
        None => ConfigFile::default(),
    };
    Ok(resolve_config(file).map_err(TestgateError::from)?)
}

fn parse_micros(s: &str) -> anyhow::Result<u64> {
    let d = humantime::parse_duration(s.trim()).map_err(|_| {
        TestgateError::from(ConfigError::InvalidDuration {
            field: "--slow-threshold".to_string(),
            value: s.to_string(),
        })
    })?;
    Ok(u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
}

/// Feed every event in `path` to `reporter`. Unparseable lines are logged and
/// skipped. Returns the number of events dispatched.
fn replay(path: &Path, reporter: &RunReporter) -> anyhow::Result<usize> {
    let reader: Box<dyn BufRead> = if path.as_os_str() == "-" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let f = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
        Box::new(BufReader::new(f))
    };

    let mut dispatched = 0;
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RunEvent>(&line) {
            Ok(event) => {
                dispatch(reporter, &event);
                dispatched += 1;
            }
            Err(err) => {
                tracing::warn!(line = i + 1, error = %err, "skipping malformed event");
            }
        }
    }
    Ok(dispatched)
}

fn print_config(cfg: &ReporterConfig) {
    let r = &cfg.report;
    println!("format: {}", r.format);
    println!(
        "slow_test_threshold: {}",
        humantime::format_duration(std::time::Duration::from_micros(r.slow_test_threshold_micros))
    );
    println!("detailed_timing: {}", cfg.detailed_timing);
    println!("budget_warnings: {}", cfg.budget_warnings);
    println!("include_memory: {}", r.include_memory);
    println!("group_by_file: {}", r.group_by_file);
    println!("include_trends: {}", r.include_trends);
    match &cfg.export_path {
        Some(p) => println!("export_path: {}", p.display()),
        None => println!("export_path: (none)"),
    }
    println!("budgets: {}", r.budget_rules.len());
    for rule in &r.budget_rules {
        println!(
            "  {} <= {} [{}]",
            rule.pattern,
            humantime::format_duration(std::time::Duration::from_micros(rule.budget_micros)),
            rule.severity.as_str()
        );
    }
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "testgate".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}
