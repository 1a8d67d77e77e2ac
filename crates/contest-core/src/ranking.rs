use std::cmp::Ordering;

use serde::Serialize;
use tracing::{Level, event};

use crate::aggregate::{Scope, ScopeTotal, scope_totals};
use crate::error::EngineError;
use crate::model::ContestantId;
use crate::scoring::round_half_up;
use crate::snapshot::Snapshot;

/// Composite ordering key.
///
/// Fields compare in declaration order: every entry of `scores` descending,
/// then `time_seconds` ascending with an absent time sorting after any
/// recorded one, then the contestant id ascending. The trailing id makes the
/// order total, so two distinct contestants never share a key and no two
/// entries ever share a rank.
#[derive(Debug, Clone, Serialize)]
pub struct SortKey {
    pub scores: Vec<f64>,
    pub time_seconds: Option<u64>,
    pub contestant: ContestantId,
}

impl SortKey {
    pub fn new(scores: Vec<f64>, time_seconds: Option<u64>, contestant: ContestantId) -> Self {
        Self {
            scores,
            time_seconds,
            contestant,
        }
    }
}

fn cmp_time(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for (mine, theirs) in self.scores.iter().zip(&other.scores) {
            match theirs.total_cmp(mine) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        self.scores
            .len()
            .cmp(&other.scores.len())
            .then_with(|| cmp_time(self.time_seconds, other.time_seconds))
            .then_with(|| self.contestant.cmp(&other.contestant))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub contestant: ContestantId,
    /// 1-based position; strictly increasing along a ranking.
    pub rank: usize,
    pub sort_key: SortKey,
    pub total_score: f64,
    pub total_time_seconds: Option<u64>,
}

impl RankedEntry {
    pub(crate) fn unranked(sort_key: SortKey, total_score: f64, total_time_seconds: Option<u64>) -> Self {
        Self {
            contestant: sort_key.contestant.clone(),
            rank: 0,
            sort_key,
            total_score,
            total_time_seconds,
        }
    }

    /// Total as published: rounded half-up once, at the display boundary.
    pub fn published_total(&self) -> i64 {
        round_half_up(self.total_score)
    }
}

/// Sort by key and number the entries 1..=N. Equal totals never share a place.
pub fn assign_ranks(mut entries: Vec<RankedEntry>) -> Vec<RankedEntry> {
    entries.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.rank = index + 1;
    }
    entries
}

pub(crate) fn entry_from_total(total: ScopeTotal) -> RankedEntry {
    let key = SortKey::new(
        vec![total.total_score],
        total.total_time_seconds,
        total.contestant,
    );
    RankedEntry::unranked(key, total.total_score, total.total_time_seconds)
}

/// Rank every contestant of the field by `(-total, time or +inf, id)`.
pub fn rank_totals(snapshot: &Snapshot, scope: &Scope) -> Result<Vec<RankedEntry>, EngineError> {
    let totals = scope_totals(snapshot, scope)?;
    let ranked = assign_ranks(totals.into_iter().map(entry_from_total).collect());

    event!(
        target: "contest_core::ranking",
        Level::DEBUG,
        scope = %scope.label(),
        entries = ranked.len(),
        "ranked totals"
    );
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Competition, ExamItem, JudgeId, Round, RoundKind, ScoreRecord};

    fn key(scores: &[f64], time: Option<u64>, id: &str) -> SortKey {
        SortKey::new(scores.to_vec(), time, ContestantId::from(id))
    }

    #[test]
    fn higher_score_sorts_first() {
        assert!(key(&[90.0], Some(500), "B") < key(&[85.0], Some(10), "A"));
    }

    #[test]
    fn missing_time_sorts_after_any_time() {
        assert!(key(&[85.0], Some(9_999), "B") < key(&[85.0], None, "A"));
    }

    #[test]
    fn identifier_breaks_full_ties() {
        assert!(key(&[85.0], None, "A") < key(&[85.0], None, "B"));
        assert_eq!(key(&[85.0], None, "A"), key(&[85.0], None, "A"));
    }

    #[test]
    fn later_score_fields_only_matter_on_earlier_ties() {
        assert!(key(&[50.0, 10.0], None, "B") < key(&[40.0, 99.0], None, "A"));
        assert!(key(&[50.0, 99.0], Some(300), "B") < key(&[50.0, 10.0], Some(1), "A"));
    }

    #[test]
    fn faster_contestant_wins_on_equal_average() {
        let mut competition = Competition::new("CT001", "Qualifier");
        competition.contestants = vec!["A".into(), "B".into()];
        competition.rounds = vec![Round {
            id: "VT001".into(),
            name: "Practical".into(),
            order: 1,
            kind: RoundKind::Ordinary,
        }];
        competition.items = vec![ExamItem::points("BT001", "VT001", 100)];
        let mut snapshot = Snapshot::new(competition);
        for (contestant, judge, points, time) in [
            ("A", "GK1", 80.0, 120),
            ("A", "GK2", 90.0, 150),
            ("B", "GK1", 85.0, 90),
        ] {
            snapshot.upsert_score(ScoreRecord {
                contestant: contestant.into(),
                judge: JudgeId::from(judge),
                item: "BT001".into(),
                round: "VT001".into(),
                points,
                elapsed_seconds: Some(time),
            });
        }

        let ranked = rank_totals(&snapshot, &Scope::Round("VT001".into())).unwrap();
        let order: Vec<(&str, usize)> = ranked
            .iter()
            .map(|e| (e.contestant.as_str(), e.rank))
            .collect();
        assert_eq!(order, vec![("B", 1), ("A", 2)]);
        assert_eq!(ranked[1].total_time_seconds, Some(120));
        assert_eq!(ranked[0].published_total(), 85);
    }

    #[test]
    fn equal_totals_get_distinct_sequential_ranks() {
        let ranked = assign_ranks(vec![
            RankedEntry::unranked(key(&[10.0], None, "C"), 10.0, None),
            RankedEntry::unranked(key(&[10.0], None, "A"), 10.0, None),
            RankedEntry::unranked(key(&[10.0], None, "B"), 10.0, None),
        ]);
        let ranks: Vec<(String, usize)> = ranked
            .iter()
            .map(|e| (e.contestant.to_string(), e.rank))
            .collect();
        assert_eq!(
            ranks,
            vec![("A".into(), 1), ("B".into(), 2), ("C".into(), 3)]
        );
    }
}
