use serde::Serialize;
use tracing::{Level, event, warn};

use crate::aggregate::{Scope, field, scope_items, scope_total, scope_totals};
use crate::error::EngineError;
use crate::model::{ContestantId, RoundId};
use crate::ranking::{RankedEntry, SortKey, assign_ranks, entry_from_total};
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CutoffMode {
    /// No earlier elimination round: rank on the non-elimination rounds.
    FirstStage,
    /// Only contestants with a positive score in `prior` are eligible.
    Chained { prior: RoundId },
}

/// Why a chained selection was abandoned for a first-stage one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CutoffFallback {
    pub prior: RoundId,
    pub reason: String,
}

/// The finalists advancing into `round`, best first. Everyone else is gone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutoffResult {
    pub round: RoundId,
    pub top_limit: usize,
    pub mode: CutoffMode,
    pub fallback: Option<CutoffFallback>,
    pub entries: Vec<RankedEntry>,
}

impl CutoffResult {
    pub fn contains(&self, contestant: &ContestantId) -> bool {
        self.entries.iter().any(|entry| &entry.contestant == contestant)
    }
}

fn first_stage_ranking(snapshot: &Snapshot) -> Result<Vec<RankedEntry>, EngineError> {
    let rounds = snapshot
        .competition()
        .ordered_rounds()
        .into_iter()
        .filter(|round| !round.is_elimination())
        .map(|round| round.id.clone())
        .collect();
    let totals = scope_totals(snapshot, &Scope::Rounds(rounds))?;
    Ok(assign_ranks(totals.into_iter().map(entry_from_total).collect()))
}

fn chained_ranking(snapshot: &Snapshot, prior: &RoundId) -> Result<Vec<RankedEntry>, EngineError> {
    let prior_items = scope_items(snapshot, &Scope::Round(prior.clone()))?;
    let lifetime_items = scope_items(snapshot, &Scope::Competition)?;

    let mut eligible = Vec::new();
    for contestant in field(snapshot) {
        let prior_score = scope_total(snapshot, &contestant, &prior_items).total_score;
        if prior_score <= 0.0 {
            continue;
        }
        let lifetime = scope_total(snapshot, &contestant, &lifetime_items);
        let key = SortKey::new(
            vec![prior_score, lifetime.total_score],
            lifetime.total_time_seconds,
            contestant,
        );
        eligible.push(RankedEntry::unranked(
            key,
            lifetime.total_score,
            lifetime.total_time_seconds,
        ));
    }
    Ok(assign_ranks(eligible))
}

/// Top-`k` contestants advancing into `round`.
///
/// With an earlier elimination round the selection is chained on it; when
/// that leaves nobody eligible the selection falls back to first-stage mode,
/// logs a warning and records the fallback on the result.
pub fn select_cutoff(snapshot: &Snapshot, round: &RoundId, k: usize) -> Result<CutoffResult, EngineError> {
    let competition = snapshot.competition();
    if competition.round(round).is_none() {
        return Err(EngineError::UnknownRound(round.clone()));
    }

    let (mode, fallback, mut entries) = match competition.prior_elimination_round(round) {
        None => (CutoffMode::FirstStage, None, first_stage_ranking(snapshot)?),
        Some(prior) => {
            let chained = chained_ranking(snapshot, &prior.id)?;
            if chained.is_empty() {
                warn!(
                    target: "contest_core::cutoff",
                    round = %round,
                    prior = %prior.id,
                    "no contestant has a positive score in the prior elimination round; falling back to first-stage ranking"
                );
                let fallback = CutoffFallback {
                    prior: prior.id.clone(),
                    reason: "no contestant scored above zero in the prior elimination round".to_string(),
                };
                (CutoffMode::FirstStage, Some(fallback), first_stage_ranking(snapshot)?)
            } else {
                (
                    CutoffMode::Chained {
                        prior: prior.id.clone(),
                    },
                    None,
                    chained,
                )
            }
        }
    };
    entries.truncate(k);

    event!(
        target: "contest_core::cutoff",
        Level::INFO,
        round = %round,
        top_limit = k,
        selected = entries.len(),
        chained = matches!(mode, CutoffMode::Chained { .. }),
        fallback = fallback.is_some(),
        "cutoff selected"
    );

    Ok(CutoffResult {
        round: round.clone(),
        top_limit: k,
        mode,
        fallback,
        entries,
    })
}

/// [`select_cutoff`] using the round's own `top_limit`.
pub fn select_cutoff_for_round(snapshot: &Snapshot, round: &RoundId) -> Result<CutoffResult, EngineError> {
    let top_limit = snapshot
        .competition()
        .round(round)
        .ok_or_else(|| EngineError::UnknownRound(round.clone()))?
        .top_limit()
        .ok_or_else(|| EngineError::NoTopLimit(round.clone()))?;
    select_cutoff(snapshot, round, top_limit)
}
