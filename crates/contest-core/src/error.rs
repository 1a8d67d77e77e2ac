use thiserror::Error;

use crate::model::{ContestantId, ItemId, JudgeId, MemberId, PairingId, RoundId};

/// Failures surfaced by the engine. Insufficient head-to-head data and empty
/// chained cutoffs are not errors: they are `PairOutcome::Undecided` and
/// `CutoffResult::fallback` respectively.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid score {value} for item {item}: {reason}")]
    InvalidScore {
        item: ItemId,
        value: f64,
        reason: String,
    },
    #[error("star vote of {stars} by {judge} on entry {entry} is outside 1..=5")]
    InvalidStarVote {
        judge: JudgeId,
        entry: MemberId,
        stars: u8,
    },
    #[error(
        "no representative judge for composite score of {contestant} on item {item} (round {round})"
    )]
    AmbiguousRepresentativeJudge {
        round: RoundId,
        item: ItemId,
        contestant: ContestantId,
    },
    #[error("unknown round {0}")]
    UnknownRound(RoundId),
    #[error("unknown exam item {0}")]
    UnknownItem(ItemId),
    #[error("unknown pairing {0}")]
    UnknownPairing(PairingId),
    #[error("exam item {item} does not belong to round {round}")]
    ItemNotInRound { item: ItemId, round: RoundId },
    #[error("round {0} has no exam items")]
    EmptyRound(RoundId),
    #[error("round {0} is not an elimination round and has no top limit")]
    NoTopLimit(RoundId),
}

impl EngineError {
    pub(crate) fn invalid_score(item: &ItemId, value: f64, reason: impl Into<String>) -> Self {
        EngineError::InvalidScore {
            item: item.clone(),
            value,
            reason: reason.into(),
        }
    }
}
