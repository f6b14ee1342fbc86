use anyhow::Context;
use clap::{Parser, Subcommand};
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Repo automation for testgate")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// (Re)generate JSON Schemas for the report, event stream and config file.
    Schema {
        /// Output directory
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,

        /// Fail instead of writing when a committed schema is out of date
        #[arg(long, default_value_t = false)]
        check: bool,
    },

    /// Run the "usual" repo checks (fmt, clippy, test, schema drift).
    Ci,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Schema { out_dir, check } => cmd_schema(&out_dir, check),
        Command::Ci => cmd_ci(),
    }
}

fn cmd_ci() -> anyhow::Result<()> {
    run("cargo", ["fmt", "--all", "--", "--check"])?;
    run(
        "cargo",
        ["clippy", "--all-targets", "--all-features", "--", "-D", "warnings"],
    )?;
    run("cargo", ["test", "--all"])?;
    run("cargo", ["run", "-p", "xtask", "--", "schema", "--check"])?;
    Ok(())
}

fn run<const N: usize>(bin: &str, args: [&str; N]) -> anyhow::Result<()> {
    let status = std::process::Command::new(bin)
        .args(args)
        .status()
        .with_context(|| format!("running {bin}"))?;
    if !status.success() {
        anyhow::bail!("{bin} failed: {status}");
    }
    Ok(())
}

fn cmd_schema(out_dir: &Path, check: bool) -> anyhow::Result<()> {
    let schemas = [
        (
            "testgate.report.v1.schema.json",
            serde_json::to_vec_pretty(&schema_for!(testgate_types::TestRunReport))?,
        ),
        (
            "testgate.event.v1.schema.json",
            serde_json::to_vec_pretty(&schema_for!(testgate_types::RunEvent))?,
        ),
        (
            "testgate.config.v1.schema.json",
            serde_json::to_vec_pretty(&schema_for!(testgate_types::ConfigFile))?,
        ),
    ];

    if check {
        let stale: Vec<&str> = schemas
            .iter()
            .filter(|(name, json)| fs::read(out_dir.join(name)).ok().as_ref() != Some(json))
            .map(|(name, _)| *name)
            .collect();
        if !stale.is_empty() {
            anyhow::bail!(
                "schemas out of date: {} (run `cargo run -p xtask -- schema`)",
                stale.join(", ")
            );
        }
        return Ok(());
    }

    fs::create_dir_all(out_dir).with_context(|| format!("create dir {}", out_dir.display()))?;
    for (name, json) in &schemas {
        let path = out_dir.join(name);
        fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
    }
    Ok(())
}
