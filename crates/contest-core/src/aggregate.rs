use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{ContestantId, ExamItem, ItemId, RoundId};
use crate::snapshot::Snapshot;

/// Reduction of every judge's record for one `(contestant, item)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ItemAggregate {
    /// Mean of the judges' points; `None` when nobody scored the item.
    pub avg_score: Option<f64>,
    /// Smallest elapsed time among the records; `None` when no record carries one.
    pub best_time: Option<u32>,
    pub judges: usize,
}

impl ItemAggregate {
    pub const EMPTY: ItemAggregate = ItemAggregate {
        avg_score: None,
        best_time: None,
        judges: 0,
    };
}

pub fn aggregate_item(snapshot: &Snapshot, contestant: &ContestantId, item: &ItemId) -> ItemAggregate {
    let mut sum = 0.0;
    let mut judges = 0usize;
    let mut best_time: Option<u32> = None;
    for record in snapshot.records_for(contestant, item) {
        sum += record.points;
        judges += 1;
        if let Some(seconds) = record.elapsed_seconds {
            best_time = Some(best_time.map_or(seconds, |best| best.min(seconds)));
        }
    }

    if judges == 0 {
        return ItemAggregate::EMPTY;
    }

    ItemAggregate {
        avg_score: Some(sum / judges as f64),
        best_time,
        judges,
    }
}

/// Set of rounds a total is computed over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Round(RoundId),
    Rounds(Vec<RoundId>),
    Competition,
}

impl Scope {
    pub fn label(&self) -> String {
        match self {
            Scope::Round(round) => round.to_string(),
            Scope::Rounds(rounds) => rounds
                .iter()
                .map(RoundId::as_str)
                .collect::<Vec<_>>()
                .join("+"),
            Scope::Competition => "competition".to_string(),
        }
    }
}

/// Summed item averages of one contestant over a scope. Not authoritative:
/// always recomputed from the score records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeTotal {
    pub contestant: ContestantId,
    pub total_score: f64,
    /// Sum of per-item best times; `None` when no item in scope had a time.
    pub total_time_seconds: Option<u64>,
    pub items: Vec<(ItemId, ItemAggregate)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundAggregate {
    pub contestant: ContestantId,
    pub round: RoundId,
    pub total_score: f64,
    pub total_time_seconds: Option<u64>,
}

/// Exam items covered by `scope`, ordered by round then item id.
pub fn scope_items<'a>(snapshot: &'a Snapshot, scope: &Scope) -> Result<Vec<&'a ExamItem>, EngineError> {
    let competition = snapshot.competition();
    let rounds: Vec<RoundId> = match scope {
        Scope::Round(round) => vec![round.clone()],
        Scope::Rounds(rounds) => rounds.clone(),
        Scope::Competition => competition
            .ordered_rounds()
            .into_iter()
            .map(|round| round.id.clone())
            .collect(),
    };

    let mut items = Vec::new();
    for round in &rounds {
        if competition.round(round).is_none() {
            return Err(EngineError::UnknownRound(round.clone()));
        }
        items.extend(competition.items_in_round(round));
    }
    Ok(items)
}

/// Everyone who takes part: the roster plus anyone holding a score record.
pub fn field(snapshot: &Snapshot) -> Vec<ContestantId> {
    let mut field = snapshot.competition().roster();
    field.extend(snapshot.records().map(|record| record.contestant.clone()));
    field.sort();
    field.dedup();
    field
}

pub fn scope_total(snapshot: &Snapshot, contestant: &ContestantId, items: &[&ExamItem]) -> ScopeTotal {
    let mut total_score = 0.0;
    let mut total_time: Option<u64> = None;
    let mut per_item = Vec::with_capacity(items.len());

    for item in items {
        let aggregate = aggregate_item(snapshot, contestant, &item.id);
        if let Some(avg) = aggregate.avg_score {
            total_score += avg;
        }
        if let Some(seconds) = aggregate.best_time {
            total_time = Some(total_time.unwrap_or(0) + u64::from(seconds));
        }
        per_item.push((item.id.clone(), aggregate));
    }

    ScopeTotal {
        contestant: contestant.clone(),
        total_score,
        total_time_seconds: total_time,
        items: per_item,
    }
}

/// Totals for every contestant of the field over `scope`, in contestant order.
pub fn scope_totals(snapshot: &Snapshot, scope: &Scope) -> Result<Vec<ScopeTotal>, EngineError> {
    let items = scope_items(snapshot, scope)?;
    Ok(field(snapshot)
        .iter()
        .map(|contestant| scope_total(snapshot, contestant, &items))
        .collect())
}

pub fn round_aggregate(
    snapshot: &Snapshot,
    contestant: &ContestantId,
    round: &RoundId,
) -> Result<RoundAggregate, EngineError> {
    let items = scope_items(snapshot, &Scope::Round(round.clone()))?;
    let total = scope_total(snapshot, contestant, &items);
    Ok(RoundAggregate {
        contestant: total.contestant,
        round: round.clone(),
        total_score: total.total_score,
        total_time_seconds: total.total_time_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Competition, JudgeId, Round, RoundKind, ScoreRecord};

    fn snapshot() -> Snapshot {
        let mut competition = Competition::new("CT001", "Qualifier");
        competition.contestants = vec!["NV2".into(), "NV1".into(), "NV3".into()];
        competition.rounds = vec![Round {
            id: "VT001".into(),
            name: "Written".into(),
            order: 1,
            kind: RoundKind::Ordinary,
        }];
        competition.items = vec![
            ExamItem::points("BT001", "VT001", 100),
            ExamItem::points("BT002", "VT001", 100),
        ];
        Snapshot::new(competition)
    }

    fn score(snapshot: &mut Snapshot, contestant: &str, judge: &str, item: &str, points: f64, time: Option<u32>) {
        snapshot.upsert_score(ScoreRecord {
            contestant: contestant.into(),
            judge: JudgeId::from(judge),
            item: item.into(),
            round: "VT001".into(),
            points,
            elapsed_seconds: time,
        });
    }

    #[test]
    fn item_average_and_best_time() {
        let mut snap = snapshot();
        score(&mut snap, "NV1", "GK1", "BT001", 80.0, Some(130));
        score(&mut snap, "NV1", "GK2", "BT001", 90.0, Some(120));
        score(&mut snap, "NV1", "GK3", "BT001", 85.0, None);

        let agg = aggregate_item(&snap, &"NV1".into(), &"BT001".into());
        assert_eq!(agg.avg_score, Some(85.0));
        assert_eq!(agg.best_time, Some(120));
        assert_eq!(agg.judges, 3);
    }

    #[test]
    fn unscored_item_is_absent_not_zero() {
        let snap = snapshot();
        let agg = aggregate_item(&snap, &"NV1".into(), &"BT001".into());
        assert_eq!(agg, ItemAggregate::EMPTY);
    }

    #[test]
    fn round_total_sums_averages_and_times() {
        let mut snap = snapshot();
        score(&mut snap, "NV1", "GK1", "BT001", 70.0, Some(40));
        score(&mut snap, "NV1", "GK2", "BT001", 71.0, Some(50));
        score(&mut snap, "NV1", "GK1", "BT002", 20.0, Some(30));

        let agg = round_aggregate(&snap, &"NV1".into(), &"VT001".into()).unwrap();
        assert!((agg.total_score - 90.5).abs() < 1e-9);
        assert_eq!(agg.total_time_seconds, Some(70));
    }

    #[test]
    fn missing_time_everywhere_stays_absent() {
        let mut snap = snapshot();
        score(&mut snap, "NV1", "GK1", "BT001", 70.0, None);
        let agg = round_aggregate(&snap, &"NV1".into(), &"VT001".into()).unwrap();
        assert_eq!(agg.total_time_seconds, None);
    }

    #[test]
    fn unknown_round_is_reported() {
        let snap = snapshot();
        let err = round_aggregate(&snap, &"NV1".into(), &"VT999".into()).unwrap_err();
        assert_eq!(err, EngineError::UnknownRound("VT999".into()));
    }

    #[test]
    fn field_merges_roster_and_scored_contestants() {
        let mut snap = snapshot();
        score(&mut snap, "NV9", "GK1", "BT001", 1.0, None);
        let ids: Vec<String> = field(&snap).iter().map(|c| c.to_string()).collect();
        assert_eq!(ids, vec!["NV1", "NV2", "NV3", "NV9"]);
    }
}
