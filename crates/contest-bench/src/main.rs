use std::path::PathBuf;

use clap::Parser;

use contest_bench::config::{ResolvedOutputs, RunConfig};
use contest_bench::logging::init_logging;
use contest_bench::pipeline::LeaderboardRunner;

/// Leaderboard harness for multi-round contests.
#[derive(Debug, Parser)]
#[command(
    name = "contest-bench",
    author,
    version,
    about = "Deterministic contest ranking and leaderboard harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/leaderboard.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the seed of a synthetic source.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Read records from a JSON snapshot instead of the configured source.
    #[arg(long, value_name = "FILE")]
    snapshot: Option<String>,

    /// Exit after validating the configuration (no stage is run).
    #[arg(long)]
    validate_only: bool,

    /// Force structured logging at the given level (trace, debug, info, warn, error).
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = RunConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(snapshot) = cli.snapshot {
        config.source.snapshot = Some(snapshot);
        config.source.synthetic = None;
    }

    if let Some(seed) = cli.seed {
        if let Some(synthetic) = config.source.synthetic.as_mut() {
            synthetic.seed = seed;
        }
    }

    if let Some(level) = cli.log_level {
        config.logging.enable_structured = true;
        config.logging.tracing_level = level;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let source = match (config.resolved_snapshot(), config.source.synthetic.as_ref()) {
        (Some(path), _) => format!("snapshot {}", path.display()),
        (None, Some(synthetic)) => format!(
            "synthetic seed {} ({} contestants, {} judges)",
            synthetic.seed, synthetic.contestants, synthetic.judges
        ),
        (None, None) => "no source".to_string(),
    };

    println!("Loaded configuration '{run_id}' from {source}");

    let _logging_guard = init_logging(&config.logging, &outputs, &run_id)?;
    let runner = LeaderboardRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: leaderboard run skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Leaderboard complete for '{run_id}': {} stages → {} rows at {}",
        summary.stages,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    if let Some(leader) = summary.leader.as_ref() {
        println!("Leader: {leader}");
    }
    if summary.cutoff_fallbacks > 0 {
        println!(
            "Cutoffs that fell back to first-stage ranking: {}",
            summary.cutoff_fallbacks
        );
    }
    println!(
        "Pairings: {} undecided, {} hard ties",
        summary.undecided_pairings, summary.hard_ties
    );
    if summary.writeback_failures > 0 {
        println!("Composite write-back failures: {}", summary.writeback_failures);
    }
    if summary.stage_failures > 0 {
        println!(
            "Stages skipped after engine errors: {} (see the WARN events)",
            summary.stage_failures
        );
    }
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(plot_path) = summary.plot_path.as_ref() {
        println!("Final score plot: {}", plot_path.display());
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
            "  Cutoff events: {} selections, {} fallbacks",
            outputs.summary.cutoff.selections, outputs.summary.cutoff.fallbacks
        );
    }

    Ok(())
}
