use std::collections::BTreeMap;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::model::{
    Competition, ContestantId, ExecutiveId, ExecutiveScore, ItemId, JudgeId, MemberId,
    PairScoreLog, Pairing, PairingId, PopularVote, ScoreRecord, StarVote,
};

type RecordKey = (ContestantId, ItemId, JudgeId);

/// Flat, serializable form of a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
    pub competition: Competition,
    #[serde(default)]
    pub score_records: Vec<ScoreRecord>,
    #[serde(default)]
    pub pairings: Vec<Pairing>,
    #[serde(default)]
    pub pair_logs: Vec<PairScoreLog>,
    #[serde(default)]
    pub star_votes: Vec<StarVote>,
    #[serde(default)]
    pub executive_scores: Vec<ExecutiveScore>,
    #[serde(default)]
    pub popular_votes: Vec<PopularVote>,
}

/// Immutable-by-convention arena of every record the engine reads.
///
/// Score records are keyed by `(contestant, item, judge)`, so a judge holds at
/// most one current value per contestant and item and a later write replaces
/// the earlier one. Iteration order is the key order, which keeps every
/// derived ranking byte-identical across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SnapshotData", into = "SnapshotData")]
pub struct Snapshot {
    competition: Competition,
    records: BTreeMap<RecordKey, ScoreRecord>,
    pairings: BTreeMap<PairingId, Pairing>,
    pair_logs: Vec<PairScoreLog>,
    star_votes: BTreeMap<(JudgeId, MemberId), StarVote>,
    executive_scores: BTreeMap<(ExecutiveId, ContestantId), ExecutiveScore>,
    popular_votes: BTreeMap<String, PopularVote>,
}

impl Snapshot {
    pub fn new(competition: Competition) -> Self {
        Self {
            competition,
            records: BTreeMap::new(),
            pairings: BTreeMap::new(),
            pair_logs: Vec::new(),
            star_votes: BTreeMap::new(),
            executive_scores: BTreeMap::new(),
            popular_votes: BTreeMap::new(),
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn competition(&self) -> &Competition {
        &self.competition
    }

    pub fn competition_mut(&mut self) -> &mut Competition {
        &mut self.competition
    }

    /// Insert or overwrite the judge's score for `(contestant, item)`.
    pub fn upsert_score(&mut self, record: ScoreRecord) -> Option<ScoreRecord> {
        self.records.insert(record.key(), record)
    }

    pub fn records(&self) -> impl Iterator<Item = &ScoreRecord> {
        self.records.values()
    }

    /// All judges' records for one `(contestant, item)` pair.
    pub fn records_for<'a>(
        &'a self,
        contestant: &ContestantId,
        item: &ItemId,
    ) -> impl Iterator<Item = &'a ScoreRecord> + use<'a> {
        let lower = (contestant.clone(), item.clone(), JudgeId::new(""));
        let contestant = contestant.clone();
        let item = item.clone();
        self.records
            .range((Bound::Included(lower), Bound::Unbounded))
            .take_while(move |((c, i, _), _)| *c == contestant && *i == item)
            .map(|(_, record)| record)
    }

    /// Whether any record at all exists for `item`, and the smallest judge id among them.
    pub fn first_judge_on_item(&self, item: &ItemId) -> Option<&JudgeId> {
        self.records
            .values()
            .filter(|record| &record.item == item)
            .map(|record| &record.judge)
            .min()
    }

    /// Remove every judge's record for `(contestant, item)`; returns how many were dropped.
    pub fn remove_records_for(&mut self, contestant: &ContestantId, item: &ItemId) -> usize {
        let keys: Vec<RecordKey> = self
            .records_for(contestant, item)
            .map(ScoreRecord::key)
            .collect();
        for key in &keys {
            self.records.remove(key);
        }
        keys.len()
    }

    pub fn add_pairing(&mut self, pairing: Pairing) {
        self.pairings.insert(pairing.id.clone(), pairing);
    }

    pub fn pairing(&self, id: &PairingId) -> Option<&Pairing> {
        self.pairings.get(id)
    }

    pub fn pairings(&self) -> impl Iterator<Item = &Pairing> {
        self.pairings.values()
    }

    /// Append a raw head-to-head log. A judged log replaces the same judge's
    /// earlier log for that member and item; anonymous logs accumulate.
    pub fn log_pair_score(&mut self, log: PairScoreLog) {
        if log.judge.is_some() {
            if let Some(existing) = self.pair_logs.iter_mut().find(|existing| {
                existing.pairing == log.pairing
                    && existing.member == log.member
                    && existing.item == log.item
                    && existing.judge == log.judge
            }) {
                *existing = log;
                return;
            }
        }
        self.pair_logs.push(log);
    }

    pub fn pair_logs_for<'a>(
        &'a self,
        pairing: &'a PairingId,
        item: &'a ItemId,
    ) -> impl Iterator<Item = &'a PairScoreLog> + 'a {
        self.pair_logs
            .iter()
            .filter(move |log| &log.pairing == pairing && &log.item == item)
    }

    pub fn pair_logs(&self) -> &[PairScoreLog] {
        &self.pair_logs
    }

    /// One current vote per `(judge, entry)`; a repeated vote overwrites.
    pub fn cast_star_vote(&mut self, vote: StarVote) {
        self.star_votes
            .insert((vote.judge.clone(), vote.entry.clone()), vote);
    }

    pub fn star_votes(&self) -> impl Iterator<Item = &StarVote> {
        self.star_votes.values()
    }

    /// One current score per `(executive, contestant)`; a later submission overwrites.
    pub fn submit_executive_score(&mut self, score: ExecutiveScore) {
        self.executive_scores.insert(
            (score.executive.clone(), score.contestant.clone()),
            score,
        );
    }

    pub fn executive_scores(&self) -> impl Iterator<Item = &ExecutiveScore> {
        self.executive_scores.values()
    }

    pub fn cast_popular_vote(&mut self, vote: PopularVote) {
        self.popular_votes.insert(vote.voter.clone(), vote);
    }

    pub fn revoke_popular_vote(&mut self, voter: &str) -> Option<PopularVote> {
        self.popular_votes.remove(voter)
    }

    pub fn popular_votes(&self) -> impl Iterator<Item = &PopularVote> {
        self.popular_votes.values()
    }
}

impl From<SnapshotData> for Snapshot {
    fn from(data: SnapshotData) -> Self {
        let mut snapshot = Snapshot::new(data.competition);
        for record in data.score_records {
            snapshot.upsert_score(record);
        }
        for pairing in data.pairings {
            snapshot.add_pairing(pairing);
        }
        for log in data.pair_logs {
            snapshot.log_pair_score(log);
        }
        for vote in data.star_votes {
            snapshot.cast_star_vote(vote);
        }
        for score in data.executive_scores {
            snapshot.submit_executive_score(score);
        }
        for vote in data.popular_votes {
            snapshot.cast_popular_vote(vote);
        }
        snapshot
    }
}

impl From<Snapshot> for SnapshotData {
    fn from(snapshot: Snapshot) -> Self {
        SnapshotData {
            competition: snapshot.competition,
            score_records: snapshot.records.into_values().collect(),
            pairings: snapshot.pairings.into_values().collect(),
            pair_logs: snapshot.pair_logs,
            star_votes: snapshot.star_votes.into_values().collect(),
            executive_scores: snapshot.executive_scores.into_values().collect(),
            popular_votes: snapshot.popular_votes.into_values().collect(),
        }
    }
}
