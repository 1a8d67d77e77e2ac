use std::fs;
use std::path::{Path, PathBuf};

use contest_core::{CutoffMode, CutoffResult, FinalEntry};
use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;
use thiserror::Error;

const CONFIDENCE_LEVEL: f64 = 0.95;
const PLOTTED_FINALISTS: usize = 16;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("statistics failure: {0}")]
    Stats(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
}

/// Collects per-stage score distributions while the runner walks the rounds.
pub struct AnalyticsCollector {
    run_id: String,
    stages: Vec<(String, Vec<f64>)>,
    cutoffs: Vec<CutoffNote>,
    leaderboard: Vec<LeaderRow>,
}

impl AnalyticsCollector {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            stages: Vec::new(),
            cutoffs: Vec::new(),
            leaderboard: Vec::new(),
        }
    }

    pub fn record_stage(&mut self, label: impl Into<String>, values: impl IntoIterator<Item = f64>) {
        self.stages.push((label.into(), values.into_iter().collect()));
    }

    pub fn record_cutoff(&mut self, result: &CutoffResult) {
        let (mode, prior) = match &result.mode {
            CutoffMode::FirstStage => ("first stage", None),
            CutoffMode::Chained { prior } => ("chained", Some(prior.to_string())),
        };
        self.cutoffs.push(CutoffNote {
            round: result.round.to_string(),
            top_limit: result.top_limit,
            selected: result.entries.len(),
            mode,
            prior,
            fallback_from: result.fallback.as_ref().map(|f| f.prior.to_string()),
        });
    }

    pub fn record_final(&mut self, entries: &[FinalEntry]) {
        self.leaderboard = entries
            .iter()
            .map(|entry| LeaderRow {
                rank: entry.rank,
                contestant: entry.contestant.to_string(),
                final_score: entry.final_score,
                hearts: entry.heart_count,
                star_avg: entry.signals.star_avg,
                exec_avg: entry.signals.exec_avg,
            })
            .collect();
    }

    pub fn finalize(self) -> Result<AnalyticsSummary, AnalyticsError> {
        let normal = Normal::new(0.0, 1.0).map_err(|err| AnalyticsError::Stats(err.to_string()))?;
        let z = normal.inverse_cdf(0.5 + CONFIDENCE_LEVEL / 2.0);

        let stages = self
            .stages
            .into_iter()
            .map(|(label, values)| StageReport::from_values(label, &values, z))
            .collect();

        Ok(AnalyticsSummary {
            run_id: self.run_id,
            stages,
            cutoffs: self.cutoffs,
            leaderboard: self.leaderboard,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub label: String,
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub ci95: (f64, f64),
}

impl StageReport {
    fn from_values(label: String, values: &[f64], z: f64) -> Self {
        if values.is_empty() {
            return Self {
                label,
                count: 0,
                mean: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                ci95: (0.0, 0.0),
            };
        }

        let mean = values.iter().mean();
        let std_dev = if values.len() < 2 {
            0.0
        } else {
            values.iter().std_dev()
        };
        let margin = z * std_dev / (values.len() as f64).sqrt();
        Self {
            label,
            count: values.len(),
            mean,
            std_dev,
            min: Statistics::min(values.iter()),
            max: Statistics::max(values.iter()),
            ci95: (mean - margin, mean + margin),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CutoffNote {
    pub round: String,
    pub top_limit: usize,
    pub selected: usize,
    pub mode: &'static str,
    pub prior: Option<String>,
    pub fallback_from: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderRow {
    pub rank: usize,
    pub contestant: String,
    pub final_score: i64,
    pub hearts: u32,
    pub star_avg: Option<f64>,
    pub exec_avg: Option<f64>,
}

fn fixed(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_else(|| "-".to_string())
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub run_id: String,
    pub stages: Vec<StageReport>,
    pub cutoffs: Vec<CutoffNote>,
    pub leaderboard: Vec<LeaderRow>,
}

impl AnalyticsSummary {
    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Leaderboard Summary\n\n");
        rows.push_str(&format!("Run: `{}`\n\n", self.run_id));

        rows.push_str("## Stage Scores\n\n");
        rows.push_str("| Stage | Entries | Mean | Std dev | Min | Max | 95% CI |\n");
        rows.push_str("|-------|---------|------|---------|-----|-----|--------|\n");
        for stage in &self.stages {
            rows.push_str(&format!(
                "| {label} | {count} | {mean:.2} | {sd:.2} | {min:.2} | {max:.2} | [{lo:.2}, {hi:.2}] |\n",
                label = stage.label,
                count = stage.count,
                mean = stage.mean,
                sd = stage.std_dev,
                min = stage.min,
                max = stage.max,
                lo = stage.ci95.0,
                hi = stage.ci95.1,
            ));
        }

        if !self.cutoffs.is_empty() {
            rows.push_str("\n## Cutoffs\n\n");
            rows.push_str("| Round | Top | Selected | Mode | Prior round | Fallback |\n");
            rows.push_str("|-------|-----|----------|------|-------------|----------|\n");
            for cutoff in &self.cutoffs {
                rows.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} |\n",
                    cutoff.round,
                    cutoff.top_limit,
                    cutoff.selected,
                    cutoff.mode,
                    cutoff.prior.as_deref().unwrap_or("-"),
                    cutoff
                        .fallback_from
                        .as_deref()
                        .map(|prior| format!("empty chain on {prior}"))
                        .unwrap_or_else(|| "No".to_string()),
                ));
            }
        }

        rows.push_str("\n## Final Leaderboard\n\n");
        rows.push_str("| Rank | Contestant | Final | Hearts | Star avg | Exec avg |\n");
        rows.push_str("|------|------------|-------|--------|----------|----------|\n");
        for row in self.leaderboard.iter().take(10) {
            rows.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                row.rank,
                row.contestant,
                row.final_score,
                row.hearts,
                fixed(row.star_avg, 1),
                fixed(row.exec_avg, 2),
            ));
        }

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }

    pub fn render_plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AnalyticsError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| AnalyticsError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }

        let output_path = dir.join("final_scores.png");
        let finalists: Vec<LeaderRow> = self
            .leaderboard
            .iter()
            .take(PLOTTED_FINALISTS)
            .cloned()
            .collect();

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let root = BitMapBackend::new(&output_path, (800, 480)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            let y_max = finalists
                .iter()
                .map(|row| row.final_score as f64)
                .fold(0.0f64, f64::max);
            let margin = (y_max * 0.1).max(1.0);

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .caption("Final score by contestant", ("sans-serif", 22))
                .set_label_area_size(LabelAreaPosition::Left, 50)
                .set_label_area_size(LabelAreaPosition::Bottom, 60)
                .build_cartesian_2d(0..finalists.len().max(1), 0.0..(y_max + margin))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .configure_mesh()
                .disable_mesh()
                .y_desc("Final score")
                .x_desc("Contestant")
                .x_label_formatter(&|idx| {
                    finalists
                        .get(*idx)
                        .map(|row| row.contestant.clone())
                        .unwrap_or_default()
                })
                .draw()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .draw_series(finalists.iter().enumerate().map(|(idx, row)| {
                    let color = if row.rank == 1 {
                        &BLUE
                    } else if row.hearts > 0 {
                        &RED
                    } else {
                        &GREEN
                    };
                    Rectangle::new(
                        [(idx, 0.0), (idx + 1, row.final_score as f64)],
                        color.filled(),
                    )
                }))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(chart);

            root.present()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(root);

            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(AnalyticsError::Plot(
                "plotters panicked while rendering (missing font support?)".into(),
            )),
        }
    }
}
