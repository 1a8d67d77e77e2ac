//! Structured JSON logging for leaderboard runs.
//!
//! Engine and harness events land in `telemetry.jsonl` beside the summary
//! table, where [`crate::telemetry`] picks them up after the run.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LoggingConfig, ResolvedOutputs};

pub const TELEMETRY_FILE: &str = "telemetry.jsonl";

/// Overrides the configured level with a full filter directive.
pub const FILTER_ENV: &str = "CONTEST_LOG";

/// Holds the background writer of a run. Drop it before reading the log back.
pub struct LoggingGuard {
    _guard: WorkerGuard,
    pub telemetry_path: PathBuf,
}

/// Directory shared by the summary table and the event log.
pub fn telemetry_dir(outputs: &ResolvedOutputs) -> PathBuf {
    outputs
        .summary_md
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn telemetry_path(outputs: &ResolvedOutputs) -> PathBuf {
    telemetry_dir(outputs).join(TELEMETRY_FILE)
}

/// Only the engine and the harness log; dependency chatter stays out of the file.
fn contest_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("contest_core={level},contest_bench={level}")
}

/// Route engine events for `run_id` into the run's event log.
/// Returns `None` when structured logging is off.
pub fn init_logging(
    logging: &LoggingConfig,
    outputs: &ResolvedOutputs,
    run_id: &str,
) -> Result<Option<LoggingGuard>> {
    if !logging.enable_structured {
        return Ok(None);
    }

    let dir = telemetry_dir(outputs);
    fs::create_dir_all(&dir)
        .with_context(|| format!("preparing event log directory {}", dir.display()))?;
    let telemetry_path = telemetry_path(outputs);
    let log_file = File::create(&telemetry_path)
        .with_context(|| format!("opening event log {}", telemetry_path.display()))?;

    let (writer, guard) = non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(log_file);

    let level = logging.level().unwrap_or(Level::INFO);
    let filter = EnvFilter::try_from_env(FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(contest_directives(level)));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .json()
        .with_current_span(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer)
        .finish();

    // Integration tests share one process-wide subscriber; the first run keeps it.
    let _ = tracing::subscriber::set_global_default(subscriber);
    tracing::info!(target: "contest_bench::stage", run_id, stage = "logging", "event log opened");

    Ok(Some(LoggingGuard {
        _guard: guard,
        telemetry_path,
    }))
}
