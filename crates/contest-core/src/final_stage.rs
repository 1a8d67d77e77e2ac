use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{Level, event};

use crate::aggregate::field;
use crate::model::ContestantId;
use crate::scoring::round_half_up;
use crate::snapshot::Snapshot;

/// The three independent per-contestant inputs of the final leaderboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinalSignals {
    pub star_avg: Option<f64>,
    pub star_votes: usize,
    pub heart_count: u32,
    pub exec_avg: Option<f64>,
    pub exec_panel: usize,
}

impl FinalSignals {
    /// `round(exec_avg) + round(star_avg)`, each term rounded half-up on its
    /// own; absent signals count as zero.
    pub fn final_score(&self) -> i64 {
        round_half_up(self.exec_avg.unwrap_or(0.0)) + round_half_up(self.star_avg.unwrap_or(0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalEntry {
    pub rank: usize,
    pub contestant: ContestantId,
    pub final_score: i64,
    pub heart_count: u32,
    pub signals: FinalSignals,
}

#[derive(Default)]
struct Tally {
    stars: u64,
    star_votes: usize,
    hearts: u32,
    exec_sum: u64,
    exec_panel: usize,
}

impl Tally {
    fn signals(&self) -> FinalSignals {
        FinalSignals {
            star_avg: (self.star_votes > 0).then(|| self.stars as f64 / self.star_votes as f64),
            star_votes: self.star_votes,
            heart_count: self.hearts,
            exec_avg: (self.exec_panel > 0).then(|| self.exec_sum as f64 / self.exec_panel as f64),
            exec_panel: self.exec_panel,
        }
    }
}

pub fn final_signals(snapshot: &Snapshot) -> BTreeMap<ContestantId, FinalSignals> {
    let mut tallies: BTreeMap<ContestantId, Tally> = field(snapshot)
        .into_iter()
        .map(|contestant| (contestant, Tally::default()))
        .collect();

    for vote in snapshot.star_votes() {
        let tally = tallies.entry(vote.contestant.clone()).or_default();
        tally.stars += u64::from(vote.stars);
        tally.star_votes += 1;
        if vote.heart {
            tally.hearts += 1;
        }
    }
    for score in snapshot.executive_scores() {
        let tally = tallies.entry(score.contestant.clone()).or_default();
        tally.exec_sum += u64::from(score.score);
        tally.exec_panel += 1;
    }

    tallies
        .into_iter()
        .map(|(contestant, tally)| (contestant, tally.signals()))
        .collect()
}

/// Final leaderboard of the whole competition, sorted by
/// `(-final_score, -heart_count, contestant)`. Contestants without any vote
/// or executive score still appear, with a final score of 0.
pub fn compose_final(snapshot: &Snapshot) -> Vec<FinalEntry> {
    let mut entries: Vec<FinalEntry> = final_signals(snapshot)
        .into_iter()
        .map(|(contestant, signals)| FinalEntry {
            rank: 0,
            contestant,
            final_score: signals.final_score(),
            heart_count: signals.heart_count,
            signals,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.final_score
            .cmp(&a.final_score)
            .then_with(|| b.heart_count.cmp(&a.heart_count))
            .then_with(|| a.contestant.cmp(&b.contestant))
    });
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.rank = index + 1;
    }

    event!(
        target: "contest_core::final",
        Level::INFO,
        entries = entries.len(),
        leader = entries.first().map(|e| e.contestant.as_str()).unwrap_or(""),
        "final leaderboard composed"
    );
    entries
}
