use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse telemetry JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize)]
pub struct TelemetrySummary {
    pub events: usize,
    pub stage_events: BTreeMap<String, usize>,
    pub cutoff: CutoffTelemetry,
    pub pairing: PairingTelemetry,
    pub writeback_failures: usize,
    /// Runner warnings: rounds or pairings skipped after an engine error.
    pub stage_warnings: usize,
    /// Lines that did not decode, e.g. a record cut short mid-flush.
    pub unreadable_lines: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct CutoffTelemetry {
    pub selections: usize,
    pub fallbacks: usize,
    pub fallback_rounds: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct PairingTelemetry {
    pub resolved: u64,
    pub undecided: u64,
    pub hard_ties: u64,
}

fn level_is(payload: &Value, level: &str) -> bool {
    payload
        .get("level")
        .and_then(Value::as_str)
        .is_some_and(|value| value.eq_ignore_ascii_case(level))
}

/// Aggregate the engine and runner events of a structured run log.
pub fn summarise_telemetry(path: &Path) -> Result<TelemetrySummary, TelemetryError> {
    if !path.exists() {
        return Ok(TelemetrySummary::default());
    }

    let file = File::open(path).map_err(|source| TelemetryError::Io {
        context: "opening telemetry log",
        source,
    })?;
    let reader = BufReader::new(file);
    let mut summary = TelemetrySummary::default();

    for line in reader.lines() {
        let line = line.map_err(|source| TelemetryError::Io {
            context: "reading telemetry line",
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let Ok(payload) = serde_json::from_str::<Value>(&line) else {
            summary.unreadable_lines += 1;
            continue;
        };
        summary.events += 1;
        let target = payload
            .get("target")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let fields = payload
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        match target {
            "contest_core::cutoff" if level_is(&payload, "WARN") => {
                summary.cutoff.fallbacks += 1;
                if let Some(round) = fields.get("round").and_then(Value::as_str) {
                    summary.cutoff.fallback_rounds.push(round.to_string());
                }
            }
            "contest_core::cutoff" => summary.cutoff.selections += 1,
            "contest_core::composite" if level_is(&payload, "WARN") => {
                summary.writeback_failures += 1;
            }
            "contest_bench::stage" if level_is(&payload, "WARN") => {
                summary.stage_warnings += 1;
            }
            "contest_bench::stage" => {
                let stage = fields
                    .get("stage")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or("<unset>");
                *summary.stage_events.entry(stage.to_string()).or_insert(0) += 1;

                if stage == "pairing" {
                    let count = |key: &str| fields.get(key).and_then(Value::as_u64).unwrap_or(0);
                    summary.pairing.resolved += count("resolved");
                    summary.pairing.undecided += count("undecided");
                    summary.pairing.hard_ties += count("hard_ties");
                }
            }
            _ => {}
        }
    }

    Ok(summary)
}

pub fn write_summary_outputs(
    telemetry_path: &Path,
    output_dir: &Path,
) -> Result<Option<TelemetryOutputs>, TelemetryError> {
    if !telemetry_path.exists() {
        return Ok(None);
    }

    let summary = summarise_telemetry(telemetry_path)?;
    let json_path = output_dir.join("telemetry_summary.json");
    let md_path = output_dir.join("telemetry_summary.md");

    std::fs::write(
        &json_path,
        serde_json::to_vec_pretty(&summary).map_err(TelemetryError::from)?,
    )
    .map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary json",
        source,
    })?;

    let markdown = render_markdown(&summary, telemetry_path);
    std::fs::write(&md_path, markdown).map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary markdown",
        source,
    })?;

    Ok(Some(TelemetryOutputs {
        summary,
        json_path,
        markdown_path: md_path,
    }))
}

pub fn append_highlights_to_markdown(
    summary_path: &Path,
    outputs: &TelemetryOutputs,
) -> Result<(), TelemetryError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(summary_path)
        .map_err(|source| TelemetryError::Io {
            context: "opening summary markdown for telemetry append",
            source,
        })?;

    let summary = &outputs.summary;
    let mut section = String::new();
    section.push_str("\n## Telemetry Highlights\n");
    section.push_str(&format!("- Events captured: {}\n", summary.events));
    section.push_str(&format!(
        "- Cutoff selections: {} ({} fell back to first-stage ranking)\n",
        summary.cutoff.selections, summary.cutoff.fallbacks
    ));
    section.push_str(&format!(
        "- Pairings: {} resolved, {} undecided, {} hard ties\n",
        summary.pairing.resolved, summary.pairing.undecided, summary.pairing.hard_ties
    ));
    if summary.writeback_failures > 0 {
        section.push_str(&format!(
            "- Composite write-back failures: {}\n",
            summary.writeback_failures
        ));
    }
    if summary.stage_warnings > 0 {
        section.push_str(&format!("- Stage warnings: {}\n", summary.stage_warnings));
    }

    write!(file, "{section}").map_err(|source| TelemetryError::Io {
        context: "writing telemetry highlights",
        source,
    })?;

    Ok(())
}

fn render_markdown(summary: &TelemetrySummary, telemetry_path: &Path) -> String {
    let mut output = String::new();
    output.push_str("# Telemetry Summary\n\n");
    output.push_str(&format!("- Source: `{}`\n", telemetry_path.display()));
    output.push_str(&format!("- Events: {}\n", summary.events));
    output.push('\n');

    output.push_str("## Stages\n");
    if summary.stage_events.is_empty() {
        output.push_str("- <none>\n");
    } else {
        for (stage, count) in &summary.stage_events {
            output.push_str(&format!("- {stage}: {count}\n"));
        }
    }
    output.push('\n');

    output.push_str("## Cutoffs\n");
    output.push_str(&format!("- Selections: {}\n", summary.cutoff.selections));
    output.push_str(&format!("- Fallbacks: {}\n", summary.cutoff.fallbacks));
    for round in &summary.cutoff.fallback_rounds {
        output.push_str(&format!("  - {round}\n"));
    }
    output.push('\n');

    output.push_str("## Pairings\n");
    output.push_str(&format!("- Resolved: {}\n", summary.pairing.resolved));
    output.push_str(&format!("- Undecided: {}\n", summary.pairing.undecided));
    output.push_str(&format!("- Hard ties: {}\n", summary.pairing.hard_ties));
    output.push('\n');

    output.push_str("## Write-backs\n");
    output.push_str(&format!("- Failures: {}\n", summary.writeback_failures));
    output.push('\n');

    output.push_str("## Runner\n");
    output.push_str(&format!("- Stage warnings: {}\n", summary.stage_warnings));
    output.push_str(&format!("- Unreadable lines: {}\n", summary.unreadable_lines));
    output
}

#[derive(Debug)]
pub struct TelemetryOutputs {
    pub summary: TelemetrySummary,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}
