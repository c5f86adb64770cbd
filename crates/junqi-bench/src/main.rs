use std::path::PathBuf;

use clap::Parser;

use junqi_bench::config::{BenchmarkConfig, ResolvedOutputs};
use junqi_bench::harness::HarnessRunner;
use junqi_bench::logging::init_logging;

/// Scores belief engine profiles against the true hidden state of seeded games.
#[derive(Debug, Parser)]
#[command(
    name = "junqi-bench",
    author,
    version,
    about = "Deterministic belief accuracy harness for four-player military chess"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substituted into `output_dir`).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of games to play.
    #[arg(long, value_name = "GAMES")]
    games: Option<usize>,

    /// Override the RNG seed for game generation.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the per-game move cap.
    #[arg(long, value_name = "MOVES")]
    max_moves: Option<usize>,

    /// Exit after validating the configuration (no games are played).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }
    if let Some(games) = cli.games {
        config.games.count = games;
    }
    if let Some(seed) = cli.seed {
        config.games.seed = Some(seed);
    }
    if let Some(max_moves) = cli.max_moves {
        config.games.max_moves = max_moves;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let profile_count = config.profiles.len();
    let run_id = config.run_id.clone();
    let games = config.games.count;
    let observer = config.observer;

    println!(
        "Loaded configuration '{run_id}' with {profile_count} profile{} ({games} games, observer {observer})",
        if profile_count == 1 { "" } else { "s" }
    );

    let _logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = HarnessRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: no games played.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Run complete for '{run_id}': {} games → {} rows at {}",
        summary.games_played,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(plot_path) = summary.plot_path.as_ref() {
        println!("Accuracy delta plot: {}", plot_path.display());
    }
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }
    if let Some(outputs) = summary.telemetry_outputs.as_ref() {
        println!("Telemetry summary (JSON): {}", outputs.json_path.display());
        println!(
            "Telemetry summary (Markdown): {}",
            outputs.markdown_path.display()
        );
        println!(
            "  Belief updates: {} events across {} games",
            outputs.summary.updates.count, outputs.summary.games.count
        );
        if !outputs.summary.updates.branch_counts.is_empty() {
            println!("  Branches: {:?}", outputs.summary.updates.branch_counts);
        }
    }

    Ok(())
}
