//! JSONL row shapes, one per stage. Every row carries `run_id` and `stage`.

use contest_core::model::{ItemId, RoundId};
use contest_core::{
    CutoffMode, CutoffResult, FinalEntry, PairAward, PairOutcome, PairingState, RankedEntry,
    Snapshot, VoteShare, aggregate_item, format_mmss,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(super) struct ItemCell {
    item: String,
    avg_score: Option<f64>,
    best_time: Option<u32>,
    time_mmss: String,
}

#[derive(Debug, Serialize)]
pub(super) struct RankingRow {
    run_id: String,
    stage: &'static str,
    round: String,
    rank: usize,
    contestant: String,
    total_score: f64,
    published_total: i64,
    total_time_seconds: Option<u64>,
    time_mmss: String,
    items: Vec<ItemCell>,
}

impl RankingRow {
    pub(super) fn new(
        run_id: &str,
        snapshot: &Snapshot,
        round: &RoundId,
        items: &[ItemId],
        entry: &RankedEntry,
    ) -> Self {
        let items = items
            .iter()
            .map(|item| {
                let aggregate = aggregate_item(snapshot, &entry.contestant, item);
                ItemCell {
                    item: item.to_string(),
                    avg_score: aggregate.avg_score,
                    best_time: aggregate.best_time,
                    time_mmss: format_mmss(aggregate.best_time.map(u64::from)),
                }
            })
            .collect();

        Self {
            run_id: run_id.to_string(),
            stage: "ranking",
            round: round.to_string(),
            rank: entry.rank,
            contestant: entry.contestant.to_string(),
            total_score: entry.total_score,
            published_total: entry.published_total(),
            total_time_seconds: entry.total_time_seconds,
            time_mmss: format_mmss(entry.total_time_seconds),
            items,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct AwardCell {
    member: String,
    contestant: String,
    points: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct PairingRow {
    run_id: String,
    stage: &'static str,
    round: String,
    pairing: String,
    item: String,
    state: PairingState,
    winner: Option<String>,
    hard_tie: bool,
    awards: Vec<AwardCell>,
}

impl PairingRow {
    pub(super) fn new(run_id: &str, outcome: &PairOutcome, awards: &[PairAward]) -> Self {
        Self {
            run_id: run_id.to_string(),
            stage: "pairing",
            round: outcome.round.to_string(),
            pairing: outcome.pairing.to_string(),
            item: outcome.item.to_string(),
            state: outcome.state(),
            winner: outcome.winner().map(ToString::to_string),
            hard_tie: outcome.is_hard_tie(),
            awards: awards
                .iter()
                .map(|award| AwardCell {
                    member: award.member.to_string(),
                    contestant: award.contestant.to_string(),
                    points: award.points,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct CutoffRow {
    run_id: String,
    stage: &'static str,
    round: String,
    top_limit: usize,
    mode: &'static str,
    prior: Option<String>,
    fallback_from: Option<String>,
    rank: usize,
    contestant: String,
    /// Score in the prior elimination round; absent for first-stage cuts.
    prior_score: Option<f64>,
    total_score: f64,
    total_time_seconds: Option<u64>,
    time_mmss: String,
}

impl CutoffRow {
    pub(super) fn new(run_id: &str, cutoff: &CutoffResult, entry: &RankedEntry) -> Self {
        let (mode, prior, prior_score) = match &cutoff.mode {
            CutoffMode::FirstStage => ("first_stage", None, None),
            CutoffMode::Chained { prior } => (
                "chained",
                Some(prior.to_string()),
                entry.sort_key.scores.first().copied(),
            ),
        };
        Self {
            run_id: run_id.to_string(),
            stage: "cutoff",
            round: cutoff.round.to_string(),
            top_limit: cutoff.top_limit,
            mode,
            prior,
            fallback_from: cutoff.fallback.as_ref().map(|f| f.prior.to_string()),
            rank: entry.rank,
            contestant: entry.contestant.to_string(),
            prior_score,
            total_score: entry.total_score,
            total_time_seconds: entry.total_time_seconds,
            time_mmss: format_mmss(entry.total_time_seconds),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct FinalRow {
    run_id: String,
    stage: &'static str,
    rank: usize,
    contestant: String,
    final_score: i64,
    hearts: u32,
    star_avg: Option<String>,
    star_votes: usize,
    exec_avg: Option<String>,
    exec_panel: usize,
}

impl FinalRow {
    pub(super) fn new(run_id: &str, entry: &FinalEntry) -> Self {
        Self {
            run_id: run_id.to_string(),
            stage: "final",
            rank: entry.rank,
            contestant: entry.contestant.to_string(),
            final_score: entry.final_score,
            hearts: entry.heart_count,
            star_avg: entry.signals.star_avg.map(|avg| format!("{avg:.1}")),
            star_votes: entry.signals.star_votes,
            exec_avg: entry.signals.exec_avg.map(|avg| format!("{avg:.2}")),
            exec_panel: entry.signals.exec_panel,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PopularityRow {
    run_id: String,
    stage: &'static str,
    contestant: String,
    votes: u32,
    percent: String,
}

impl PopularityRow {
    pub(super) fn new(run_id: &str, share: &VoteShare) -> Self {
        Self {
            run_id: run_id.to_string(),
            stage: "popularity",
            contestant: share.contestant.to_string(),
            votes: share.votes,
            percent: format!("{:.2}", share.percent),
        }
    }
}
