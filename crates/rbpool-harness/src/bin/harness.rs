//! CLI entrypoint for the rbpool harness.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::json;

use rbpool_core::config::log_level_from_str_loose;
use rbpool_core::log::{LogLevel, LogRecord};
use rbpool_core::{OomPolicy, PoolConfig};
use rbpool_harness::{HarnessError, LogEmitter, LogEntry, StormKind, run_demo, run_storm};

/// Demo and stress tooling for the rbpool allocator and tree.
#[derive(Debug, Parser)]
#[command(name = "rbpool-harness")]
#[command(about = "Demo and allocation-storm harness for rbpool")]
struct Cli {
    /// OOM policy when no handler is installed (`abort` or `error`).
    #[arg(long, global = true, default_value = "error")]
    oom_policy: String,
    /// Minimum allocator log level kept (`trace` .. `fatal`, or `off`).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// Write allocator lifecycle records here as JSONL.
    #[arg(long, global = true)]
    log: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Insert the canonical key sequence and print the in-order walk with colors.
    Demo {
        /// Output JSON report path (if omitted, prints the walk to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Drive a pool with a deterministic alloc/free storm.
    Storm {
        /// Storm kind (`sawtooth`, `random_churn`, `size_class_thrash`,
        /// `tree_churn`, or `all`).
        #[arg(long, default_value = "all")]
        kind: String,
        /// Root seed (decimal or 0x...).
        #[arg(long, default_value = "0xDEAD_BEEF")]
        seed: String,
        /// Operations per storm.
        #[arg(long, default_value_t = 100_000)]
        ops: usize,
        /// Output JSON report path (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn parse_seed(raw: &str) -> Result<u64, String> {
    let cleaned = raw.trim().replace('_', "");
    let parsed = match cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => cleaned.parse::<u64>(),
    };
    parsed.map_err(|err| format!("invalid seed '{raw}': {err}"))
}

fn write_report(output: Option<&Path>, report: &serde_json::Value) -> Result<(), HarnessError> {
    let body = serde_json::to_string_pretty(report)?;
    match output {
        Some(path) => {
            std::fs::write(path, body)?;
            eprintln!("Wrote report to {}", path.display());
        }
        None => println!("{body}"),
    }
    Ok(())
}

fn export_records(path: Option<&Path>, run_id: &str, runs: &[(&str, &[LogRecord])]) -> Result<(), HarnessError> {
    let Some(path) = path else {
        return Ok(());
    };
    let mut emitter = LogEmitter::to_file(path, run_id)?;
    let mut written = 0;
    for (name, records) in runs {
        emitter.emit_entry(
            LogEntry::new("", LogLevel::Info, "run_start").with_details(json!({ "run": name })),
        )?;
        written += emitter.emit_records(records)?;
    }
    emitter.flush()?;
    eprintln!("Wrote {written} allocator records to {}", path.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = PoolConfig::default()
        .with_oom_policy(OomPolicy::from_str_loose(&cli.oom_policy))
        .with_log_level(log_level_from_str_loose(&cli.log_level));

    match cli.command {
        Command::Demo { output } => {
            let report = run_demo(config)?;
            if output.is_none() {
                println!("{}", report.size_before);
                println!("{}", report.size_after);
                println!("{}", report.render_line());
            } else {
                write_report(output.as_deref(), &serde_json::to_value(&report)?)?;
            }
            export_records(cli.log.as_deref(), "demo", &[("demo", report.records.as_slice())])?;
        }
        Command::Storm {
            kind,
            seed,
            ops,
            output,
        } => {
            let seed = parse_seed(&seed)?;
            let kinds: Vec<StormKind> = if kind.eq_ignore_ascii_case("all") {
                StormKind::all().to_vec()
            } else {
                vec![kind.parse::<StormKind>()?]
            };

            let mut reports = Vec::with_capacity(kinds.len());
            for kind in kinds {
                eprintln!("Running {} storm ({ops} ops, seed {seed:#x})", kind.as_str());
                reports.push(run_storm(kind, seed, ops, config)?);
            }

            let summary = json!({
                "seed": seed,
                "ops": ops,
                "storms": reports,
            });
            write_report(output.as_deref(), &summary)?;

            let runs: Vec<(&str, &[LogRecord])> = reports
                .iter()
                .map(|r| (r.storm, r.records.as_slice()))
                .collect();
            export_records(cli.log.as_deref(), "storm", &runs)?;
        }
    }

    Ok(())
}
