#![forbid(unsafe_code)]

mod cmd;
mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use waymark_core::config::load_user_config;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "waymark: fold agent progress into sessions, diff work items",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output format: pretty, text or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Replay persisted history",
        long_about = "Rebuild one session per history record and render them in record order.",
        after_help = "EXAMPLES:\n    # Replay a history file\n    wm replay history.json\n\n    # Show every session expanded\n    wm replay history.json --expanded\n\n    # Emit machine-readable output\n    wm replay history.json --format json"
    )]
    Replay(cmd::replay::ReplayArgs),

    #[command(
        about = "Fold a live event stream",
        long_about = "Fold a JSON-lines event stream into a single live session.",
        after_help = "EXAMPLES:\n    # Fold a captured stream\n    wm fold events.jsonl\n\n    # Pin the clock for reproducible output\n    wm fold events.jsonl --at 2025-10-09T08:00:00Z\n\n    # Read from stdin and fail on malformed lines\n    tail -f events.jsonl | wm fold - --strict"
    )]
    Fold(cmd::fold::FoldArgs),

    #[command(
        about = "Diff two work item snapshots",
        long_about = "Compute a field-by-field structural diff of two work item snapshots.",
        after_help = "EXAMPLES:\n    # Show what changed\n    wm diff before.json after.json\n\n    # Use in scripts: exit 1 when the snapshots differ\n    wm diff before.json after.json --exit-code"
    )]
    Diff(cmd::diff::DiffArgs),

    #[command(
        about = "Show effective configuration",
        after_help = "EXAMPLES:\n    # Show merged config\n    wm config\n\n    # Show the project config as TOML\n    wm config --project"
    )]
    Config(cmd::config::ConfigArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("WAYMARK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "waymark=debug,info"
        } else {
            "waymark=info,warn"
        })
    });

    let format = env::var("WAYMARK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<ExitCode> {
    let project_root = env::current_dir().context("Failed to resolve working directory")?;

    match &cli.command {
        Commands::Replay(args) => cmd::replay::run_replay(args, output, &project_root)?,
        Commands::Fold(args) => cmd::fold::run_fold(args, output, &project_root)?,
        Commands::Diff(args) => {
            let differs = cmd::diff::run_diff(args, output)?;
            if differs && args.exit_code {
                return Ok(ExitCode::from(1));
            }
        }
        Commands::Config(args) => cmd::config::run_config(args, output, &project_root)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let user = load_user_config();
    let user_output = user.as_ref().ok().and_then(|u| u.output.as_deref());
    let output = resolve_output_mode(cli.format, cli.json, user_output);

    match user.and_then(|_| run(&cli, output)) {
        Ok(code) => code,
        Err(err) => {
            if let Err(render_err) = render_error(output, &CliError::from(&err)) {
                eprintln!("error: {err:#} ({render_err})");
            }
            ExitCode::from(2)
        }
    }
}
