use serde::{Deserialize, Serialize};

use super::ids::{ContestantId, ExecutiveId, ItemId, JudgeId, MemberId, PairingId, RoundId};

/// A judge's current score for one contestant on one exam item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub contestant: ContestantId,
    pub judge: JudgeId,
    pub item: ItemId,
    pub round: RoundId,
    pub points: f64,
    #[serde(default)]
    pub elapsed_seconds: Option<u32>,
}

impl ScoreRecord {
    /// Uniqueness key, in the order the snapshot stores records.
    pub fn key(&self) -> (ContestantId, ItemId, JudgeId) {
        (
            self.contestant.clone(),
            self.item.clone(),
            self.judge.clone(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
}

/// One slot of a head-to-head pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairMember {
    pub id: MemberId,
    pub contestant: ContestantId,
    pub side: Side,
    #[serde(default = "default_slot")]
    pub slot: u16,
}

fn default_slot() -> u16 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub id: PairingId,
    pub round: RoundId,
    pub members: Vec<PairMember>,
}

/// Raw head-to-head score logged by a judge, before conversion to winner/loser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairScoreLog {
    pub pairing: PairingId,
    pub member: MemberId,
    pub item: ItemId,
    #[serde(default)]
    pub judge: Option<JudgeId>,
    pub raw_score: f64,
    #[serde(default)]
    pub raw_time: Option<u32>,
}

/// 1-5 star vote on a head-to-head entry, optionally flagged as preferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarVote {
    pub judge: JudgeId,
    pub entry: MemberId,
    pub contestant: ContestantId,
    pub stars: u8,
    #[serde(default)]
    pub heart: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutiveScore {
    pub executive: ExecutiveId,
    pub contestant: ContestantId,
    pub score: u32,
}

/// Crowd popularity vote; one current vote per voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularVote {
    pub voter: String,
    pub contestant: ContestantId,
}
