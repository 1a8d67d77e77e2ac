use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{ExamItem, ScoringMethod, StarVote};

pub const EXECUTIVE_SCORE_MAX: f64 = 100.0;
pub const STARS: std::ops::RangeInclusive<u8> = 1..=5;

/// Which panel a submission comes from. Passed explicitly instead of being
/// read from ambient session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    Ordinary,
    Executive,
    HeadToHead,
}

/// A submission that passed the boundary checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedScore {
    pub points: f64,
    pub elapsed_seconds: Option<u32>,
}

/// Round half away from zero (2.5 -> 3, -2.5 -> -3), unlike banker's rounding.
pub fn round_half_up(value: f64) -> i64 {
    value.round() as i64
}

/// Reject negative, non-finite or over-cap values before they reach the engine.
pub fn validate_submission(
    mode: ScoringMode,
    item: &ExamItem,
    value: f64,
    elapsed_seconds: Option<i64>,
) -> Result<ValidatedScore, EngineError> {
    if !value.is_finite() {
        return Err(EngineError::invalid_score(&item.id, value, "score must be a finite number"));
    }
    if value < 0.0 {
        return Err(EngineError::invalid_score(&item.id, value, "score must not be negative"));
    }

    let points = match mode {
        ScoringMode::Ordinary => {
            if item.method == ScoringMethod::Points && value > f64::from(item.points_cap) {
                return Err(EngineError::invalid_score(
                    &item.id,
                    value,
                    format!("exceeds the item maximum of {}", item.points_cap),
                ));
            }
            value
        }
        ScoringMode::Executive => {
            if value > EXECUTIVE_SCORE_MAX {
                return Err(EngineError::invalid_score(
                    &item.id,
                    value,
                    "executive scores must lie within 0..=100",
                ));
            }
            round_half_up(value) as f64
        }
        ScoringMode::HeadToHead => value,
    };

    let elapsed_seconds = match elapsed_seconds {
        None => None,
        Some(seconds) if seconds < 0 => {
            return Err(EngineError::invalid_score(
                &item.id,
                value,
                format!("elapsed time {seconds}s must not be negative"),
            ));
        }
        Some(seconds) => Some(u32::try_from(seconds).map_err(|_| {
            EngineError::invalid_score(&item.id, value, format!("elapsed time {seconds}s is out of range"))
        })?),
    };

    Ok(ValidatedScore {
        points,
        elapsed_seconds,
    })
}

/// Star votes carry 1 to 5 stars; anything else is rejected at the boundary.
pub fn validate_star_vote(vote: StarVote) -> Result<StarVote, EngineError> {
    if STARS.contains(&vote.stars) {
        Ok(vote)
    } else {
        Err(EngineError::InvalidStarVote {
            judge: vote.judge,
            entry: vote.entry,
            stars: vote.stars,
        })
    }
}

/// `mm:ss`, or an empty string when the time is absent.
pub fn format_mmss(seconds: Option<u64>) -> String {
    match seconds {
        None => String::new(),
        Some(total) => format!("{:02}:{:02}", total / 60, total % 60),
    }
}
