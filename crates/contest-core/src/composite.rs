//! Composite executive scores and the write-backs that publish derived results.
//!
//! An executive round is scored by a panel, but ranking reads ordinary score
//! records. The panel's average is therefore published as one record under a
//! representative judge. Deciding *what* to publish is pure; the publication
//! itself goes through a [`CompositeSink`] owned by the caller.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::error::EngineError;
use crate::model::{ContestantId, ItemId, JudgeId, RoundId, ScoreRecord};
use crate::pairing::PairAward;
use crate::scoring::round_half_up;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeScore {
    pub contestant: ContestantId,
    pub round: RoundId,
    pub item: ItemId,
    /// `round_half_up(exec_avg)`; the value that gets published.
    pub value: i64,
    pub exec_avg: f64,
    pub panel_size: usize,
}

impl CompositeScore {
    pub fn to_record(&self, judge: JudgeId) -> ScoreRecord {
        ScoreRecord {
            contestant: self.contestant.clone(),
            judge,
            item: self.item.clone(),
            round: self.round.clone(),
            points: self.value as f64,
            elapsed_seconds: None,
        }
    }
}

/// One composite per contestant holding at least one executive score,
/// targeting the first exam item of `round`.
pub fn composite_scores(snapshot: &Snapshot, round: &RoundId) -> Result<Vec<CompositeScore>, EngineError> {
    let competition = snapshot.competition();
    if competition.round(round).is_none() {
        return Err(EngineError::UnknownRound(round.clone()));
    }
    let item = competition
        .items_in_round(round)
        .first()
        .map(|item| item.id.clone())
        .ok_or_else(|| EngineError::EmptyRound(round.clone()))?;

    let mut panels: BTreeMap<&ContestantId, (u64, usize)> = BTreeMap::new();
    for score in snapshot.executive_scores() {
        let panel = panels.entry(&score.contestant).or_insert((0, 0));
        panel.0 += u64::from(score.score);
        panel.1 += 1;
    }

    Ok(panels
        .into_iter()
        .map(|(contestant, (sum, panel_size))| {
            let exec_avg = sum as f64 / panel_size as f64;
            CompositeScore {
                contestant: contestant.clone(),
                round: round.clone(),
                item: item.clone(),
                value: round_half_up(exec_avg),
                exec_avg,
                panel_size,
            }
        })
        .collect())
}

/// Judge the composite is filed under: the item's configured representative,
/// else the smallest judge already holding a record on the item.
pub fn representative_judge(snapshot: &Snapshot, composite: &CompositeScore) -> Result<JudgeId, EngineError> {
    let configured = snapshot
        .competition()
        .item(&composite.item)
        .and_then(|item| item.representative_judge.clone());
    configured
        .or_else(|| snapshot.first_judge_on_item(&composite.item).cloned())
        .ok_or_else(|| EngineError::AmbiguousRepresentativeJudge {
            round: composite.round.clone(),
            item: composite.item.clone(),
            contestant: composite.contestant.clone(),
        })
}

/// Destination for derived results that feed back into ranking.
pub trait CompositeSink {
    type Error: From<EngineError>;

    /// Replace every record for the composite's `(contestant, item)` with
    /// exactly one record under the representative judge. Must be atomic:
    /// no reader may observe zero or several representative records.
    fn replace_composite(&mut self, composite: &CompositeScore) -> Result<ScoreRecord, Self::Error>;

    /// Upsert each award as a score record under `judge`.
    fn record_pair_awards(&mut self, awards: &[PairAward], judge: &JudgeId) -> Result<usize, Self::Error>;
}

impl CompositeSink for Snapshot {
    type Error = EngineError;

    fn replace_composite(&mut self, composite: &CompositeScore) -> Result<ScoreRecord, EngineError> {
        let judge = representative_judge(self, composite)?;
        let record = composite.to_record(judge);
        self.remove_records_for(&composite.contestant, &composite.item);
        self.upsert_score(record.clone());
        Ok(record)
    }

    fn record_pair_awards(&mut self, awards: &[PairAward], judge: &JudgeId) -> Result<usize, EngineError> {
        for award in awards {
            self.upsert_score(award.to_record(judge));
        }
        Ok(awards.len())
    }
}

/// Publish each composite independently. A failure is logged and returned in
/// its slot; it never stops the remaining contestants.
pub fn publish_composites<S: CompositeSink>(
    sink: &mut S,
    composites: &[CompositeScore],
) -> Vec<Result<ScoreRecord, S::Error>>
where
    S::Error: std::fmt::Display,
{
    composites
        .iter()
        .map(|composite| {
            let result = sink.replace_composite(composite);
            if let Err(err) = &result {
                warn!(
                    target: "contest_core::composite",
                    contestant = %composite.contestant,
                    item = %composite.item,
                    error = %err,
                    "composite write-back failed"
                );
            }
            result
        })
        .collect()
}
