//! Ranking and aggregation engine for multi-round contests.
//!
//! Everything here is a pure function of a [`Snapshot`]: per-item
//! aggregation, round and competition rankings, head-to-head resolution,
//! Top-K cutoffs and the final blended leaderboard. Publishing derived scores
//! back into the record set goes through [`CompositeSink`], owned by the
//! caller.

pub mod aggregate;
pub mod composite;
pub mod cutoff;
pub mod error;
pub mod final_stage;
pub mod model;
pub mod pairing;
pub mod popularity;
pub mod ranking;
pub mod scoring;
pub mod snapshot;

pub use aggregate::{ItemAggregate, RoundAggregate, Scope, ScopeTotal, aggregate_item, round_aggregate, scope_totals};
pub use composite::{CompositeScore, CompositeSink, composite_scores, publish_composites, representative_judge};
pub use cutoff::{CutoffFallback, CutoffMode, CutoffResult, select_cutoff, select_cutoff_for_round};
pub use error::EngineError;
pub use final_stage::{FinalEntry, FinalSignals, compose_final, final_signals};
pub use pairing::{
    PairAward, PairOutcome, PairingState, Resolution, resolve_all, resolve_pairing,
    resolve_round_pairings,
};
pub use popularity::{VoteShare, tally_popular_votes};
pub use ranking::{RankedEntry, SortKey, rank_totals};
pub use scoring::{
    ScoringMode, ValidatedScore, format_mmss, round_half_up, validate_star_vote, validate_submission,
};
pub use snapshot::{Snapshot, SnapshotData};
