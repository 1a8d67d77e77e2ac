mod rows;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contest_core::model::{JudgeId, Round, RoundKind};
use contest_core::{
    CompositeSink, CutoffMode, EngineError, PairOutcome, PairingState, Scope, Snapshot,
    compose_final, composite_scores, publish_composites, rank_totals, resolve_round_pairings,
    select_cutoff_for_round, tally_popular_votes,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event, warn};

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use crate::config::{ResolvedOutputs, RunConfig};
use crate::logging::{telemetry_dir, telemetry_path};
use crate::store::{RecordStore, StoreError};
use crate::synth;
use crate::telemetry::{
    TelemetryError, TelemetryOutputs, append_highlights_to_markdown, write_summary_outputs,
};

use rows::{CutoffRow, FinalRow, PairingRow, PopularityRow, RankingRow};

/// Walks a competition round by round and streams every derived result to JSONL.
pub struct LeaderboardRunner {
    config: RunConfig,
    outputs: ResolvedOutputs,
    store: RecordStore,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub stages: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: Option<PathBuf>,
    pub telemetry_path: Option<PathBuf>,
    pub telemetry_outputs: Option<TelemetryOutputs>,
    pub leader: Option<String>,
    pub cutoff_fallbacks: usize,
    pub undecided_pairings: usize,
    pub hard_ties: usize,
    pub writeback_failures: usize,
    /// Stages abandoned after an engine error; later rounds still ran.
    pub stage_failures: usize,
}

#[derive(Default)]
struct Tally {
    stages: usize,
    rows: usize,
    cutoff_fallbacks: usize,
    undecided: usize,
    hard_ties: usize,
    writeback_failures: usize,
    stage_failures: usize,
}

impl Tally {
    /// An engine error ends one stage of one round, never the run.
    fn absorb(
        &mut self,
        stage: &'static str,
        round: &Round,
        result: Result<(), RunnerError>,
    ) -> Result<(), RunnerError> {
        match result {
            Err(RunnerError::Engine(err)) => {
                self.stage_failures += 1;
                warn!(
                    target: "contest_bench::stage",
                    stage,
                    round = %round.id,
                    error = %err,
                    "stage skipped"
                );
                Ok(())
            }
            other => other,
        }
    }
}

impl LeaderboardRunner {
    /// Build a runner from a validated configuration, loading or generating
    /// the record snapshot up front.
    pub fn new(config: RunConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let store = match (config.resolved_snapshot(), config.source.synthetic.as_ref()) {
            (Some(path), _) => RecordStore::load(path)?,
            (None, Some(synthetic)) => RecordStore::new(synth::generate(synthetic)),
            (None, None) => return Err(RunnerError::MissingSource),
        };
        Ok(Self::with_store(config, outputs, store))
    }

    pub fn with_snapshot(config: RunConfig, outputs: ResolvedOutputs, snapshot: Snapshot) -> Self {
        Self::with_store(config, outputs, RecordStore::new(snapshot))
    }

    fn with_store(config: RunConfig, outputs: ResolvedOutputs, store: RecordStore) -> Self {
        Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            store,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Execute every stage in round order, then the final leaderboard.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if !self.outputs.plots_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.outputs.plots_dir)?;
        }

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut analytics = AnalyticsCollector::new(self.config.run_id.clone());
        let mut tally = Tally::default();

        let rounds: Vec<Round> = self
            .store
            .snapshot()
            .competition()
            .ordered_rounds()
            .into_iter()
            .cloned()
            .collect();

        for round in &rounds {
            match &round.kind {
                RoundKind::Ordinary => {
                    let ranked = self.rank_round(&mut writer, &mut analytics, &mut tally, round);
                    tally.absorb("ranking", round, ranked)?;
                }
                RoundKind::HeadToHead { .. } => {
                    let resolved = self.resolve_round(&mut writer, &mut tally, round);
                    tally.absorb("pairing", round, resolved)?;
                    let ranked = self.rank_round(&mut writer, &mut analytics, &mut tally, round);
                    tally.absorb("ranking", round, ranked)?;
                }
                RoundKind::ExecutiveCutoff { .. } => {
                    let cut = self.cut_round(&mut writer, &mut analytics, &mut tally, round);
                    tally.absorb("cutoff", round, cut)?;
                }
            }
        }

        let leader = self.final_stage(&mut writer, &mut analytics, &mut tally)?;
        writer.flush()?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md)?;
        let plot_path = match summary.render_plot(&self.outputs.plots_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                eprintln!("WARN: {}", err);
                None
            }
        };

        let telemetry_path = self
            .logging_enabled
            .then(|| telemetry_path(&self.outputs));

        let telemetry_outputs = if let Some(path) = telemetry_path.as_ref() {
            write_summary_outputs(path, &telemetry_dir(&self.outputs))?
        } else {
            None
        };

        if let Some(outputs) = telemetry_outputs.as_ref() {
            append_highlights_to_markdown(&self.outputs.summary_md, outputs)?;
        }

        Ok(RunSummary {
            stages: tally.stages,
            rows_written: tally.rows,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_path,
            telemetry_path,
            telemetry_outputs,
            leader,
            cutoff_fallbacks: tally.cutoff_fallbacks,
            undecided_pairings: tally.undecided,
            hard_ties: tally.hard_ties,
            writeback_failures: tally.writeback_failures,
            stage_failures: tally.stage_failures,
        })
    }

    fn rank_round(
        &self,
        writer: &mut BufWriter<File>,
        analytics: &mut AnalyticsCollector,
        tally: &mut Tally,
        round: &Round,
    ) -> Result<(), RunnerError> {
        let snapshot = self.store.snapshot();
        let ranking = rank_totals(&snapshot, &Scope::Round(round.id.clone()))?;
        let items: Vec<_> = snapshot
            .competition()
            .items_in_round(&round.id)
            .into_iter()
            .map(|item| item.id.clone())
            .collect();

        for entry in &ranking {
            let row = RankingRow::new(&self.config.run_id, &snapshot, &round.id, &items, entry);
            write_row(writer, &row)?;
        }
        tally.rows += ranking.len();
        tally.stages += 1;
        analytics.record_stage(
            round.id.to_string(),
            ranking.iter().map(|entry| entry.total_score),
        );

        if self.logging_enabled && tracing::enabled!(Level::INFO) {
            event!(
                target: "contest_bench::stage",
                Level::INFO,
                run_id = %self.config.run_id,
                stage = "ranking",
                round = %round.id,
                entries = ranking.len() as u64,
                leader = %ranking.first().map(|e| e.contestant.to_string()).unwrap_or_default()
            );
        }
        Ok(())
    }

    fn resolve_round(
        &self,
        writer: &mut BufWriter<File>,
        tally: &mut Tally,
        round: &Round,
    ) -> Result<(), RunnerError> {
        let snapshot = self.store.snapshot();
        let mut outcomes: Vec<PairOutcome> = Vec::new();
        let mut failures = 0usize;
        for result in resolve_round_pairings(&snapshot, &round.id) {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    failures += 1;
                    warn!(target: "contest_bench::stage", round = %round.id, error = %err, "pairing skipped");
                }
            }
        }

        let mut awards = Vec::new();
        let (mut resolved, mut undecided, mut hard_ties) = (0u64, 0u64, 0u64);
        for outcome in &outcomes {
            match outcome.state() {
                PairingState::Collecting => undecided += 1,
                PairingState::Resolved => resolved += 1,
            }
            if outcome.is_hard_tie() {
                hard_ties += 1;
            }
            let outcome_awards = outcome.awards();
            write_row(writer, &PairingRow::new(&self.config.run_id, outcome, &outcome_awards))?;
            awards.extend(outcome_awards);
        }
        tally.rows += outcomes.len();
        tally.stages += 1;
        tally.undecided += undecided as usize;
        tally.hard_ties += hard_ties as usize;

        let mut written = 0usize;
        if self.config.stages.pair_writeback && !awards.is_empty() {
            let judge = JudgeId::new(self.config.stages.pair_judge.as_str());
            let mut sink = &self.store;
            written = sink.record_pair_awards(&awards, &judge)?;
        }

        if self.logging_enabled && tracing::enabled!(Level::INFO) {
            event!(
                target: "contest_bench::stage",
                Level::INFO,
                run_id = %self.config.run_id,
                stage = "pairing",
                round = %round.id,
                resolved,
                undecided,
                hard_ties,
                failures = failures as u64,
                awards_written = written as u64
            );
        }
        Ok(())
    }

    fn cut_round(
        &self,
        writer: &mut BufWriter<File>,
        analytics: &mut AnalyticsCollector,
        tally: &mut Tally,
        round: &Round,
    ) -> Result<(), RunnerError> {
        let snapshot = self.store.snapshot();
        let cutoff = select_cutoff_for_round(&snapshot, &round.id)?;
        if cutoff.fallback.is_some() {
            tally.cutoff_fallbacks += 1;
        }

        for entry in &cutoff.entries {
            write_row(writer, &CutoffRow::new(&self.config.run_id, &cutoff, entry))?;
        }
        tally.rows += cutoff.entries.len();
        tally.stages += 1;
        analytics.record_cutoff(&cutoff);
        analytics.record_stage(
            format!("{} cutoff", round.id),
            cutoff.entries.iter().map(|entry| entry.total_score),
        );

        let mut failures = 0usize;
        let mut published = 0usize;
        if self.config.stages.composite_writeback {
            let composites: Vec<_> = composite_scores(&snapshot, &round.id)?
                .into_iter()
                .filter(|composite| cutoff.contains(&composite.contestant))
                .collect();
            let mut sink = &self.store;
            for result in publish_composites(&mut sink, &composites) {
                match result {
                    Ok(_) => published += 1,
                    Err(_) => failures += 1,
                }
            }
        }
        tally.writeback_failures += failures;

        if self.logging_enabled && tracing::enabled!(Level::INFO) {
            let mode = match &cutoff.mode {
                CutoffMode::FirstStage => "first_stage",
                CutoffMode::Chained { .. } => "chained",
            };
            event!(
                target: "contest_bench::stage",
                Level::INFO,
                run_id = %self.config.run_id,
                stage = "cutoff",
                round = %round.id,
                mode,
                entries = cutoff.entries.len() as u64,
                composites_published = published as u64,
                writeback_failures = failures as u64
            );
        }
        Ok(())
    }

    fn final_stage(
        &self,
        writer: &mut BufWriter<File>,
        analytics: &mut AnalyticsCollector,
        tally: &mut Tally,
    ) -> Result<Option<String>, RunnerError> {
        let snapshot = self.store.snapshot();
        let leaderboard = compose_final(&snapshot);
        for entry in &leaderboard {
            write_row(writer, &FinalRow::new(&self.config.run_id, entry))?;
        }
        tally.rows += leaderboard.len();
        analytics.record_final(&leaderboard);
        analytics.record_stage("final", leaderboard.iter().map(|e| e.final_score as f64));

        let shares = tally_popular_votes(&snapshot);
        for share in &shares {
            write_row(writer, &PopularityRow::new(&self.config.run_id, share))?;
        }
        tally.rows += shares.len();
        tally.stages += 2;

        let leader = leaderboard.first().map(|entry| entry.contestant.to_string());
        if self.logging_enabled && tracing::enabled!(Level::INFO) {
            event!(
                target: "contest_bench::stage",
                Level::INFO,
                run_id = %self.config.run_id,
                stage = "final",
                entries = leaderboard.len() as u64,
                voters = shares.iter().map(|s| u64::from(s.votes)).sum::<u64>(),
                leader = %leader.as_deref().unwrap_or_default()
            );
        }
        Ok(leader)
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_row<T: Serialize>(writer: &mut BufWriter<File>, row: &T) -> Result<(), RunnerError> {
    serde_json::to_writer(&mut *writer, row)?;
    writer.write_all(b"\n")?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("configuration names no record source")]
    MissingSource,
    #[error("ranking engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("record store error: {0}")]
    Store(#[from] StoreError),
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("telemetry summarisation failed: {0}")]
    Telemetry(#[from] TelemetryError),
}
