//! Head-to-head resolution.
//!
//! Each `(pairing, item)` is its own little state machine: it stays
//! [`PairingState::Collecting`] until two distinct members have logs for the
//! item, and is [`PairingState::Resolved`] from then on. A resolved pairing is
//! winner-take-all on the first two members that logged: higher mean score
//! wins, then the smaller best time, and an exact tie on both is a hard tie
//! that awards nobody.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{Level, event};

use crate::error::EngineError;
use crate::model::{
    ContestantId, DEFAULT_BONUS_SCORE, ItemId, JudgeId, MemberId, Pairing, PairingId, RoundId,
    ScoreRecord,
};
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingState {
    Collecting,
    Resolved,
}

/// One member's reduction of its own logs; independent of the opponent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberStats {
    pub member: MemberId,
    pub contestant: ContestantId,
    pub avg_score: f64,
    /// `None` reads as +inf when comparing.
    pub best_time: Option<u32>,
    pub logs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// Fewer than two members have logs for the item yet.
    Undecided,
    Winner { member: MemberId },
    /// Same mean and same best time. Both members score 0.
    HardTie,
}

/// Points a member earns for one item of a head-to-head round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairAward {
    pub pairing: PairingId,
    pub member: MemberId,
    pub contestant: ContestantId,
    pub round: RoundId,
    pub item: ItemId,
    pub points: u32,
}

impl PairAward {
    /// The award as an ordinary score record, so it ranks alongside other rounds.
    pub fn to_record(&self, judge: &JudgeId) -> ScoreRecord {
        ScoreRecord {
            contestant: self.contestant.clone(),
            judge: judge.clone(),
            item: self.item.clone(),
            round: self.round.clone(),
            points: f64::from(self.points),
            elapsed_seconds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairOutcome {
    pub pairing: PairingId,
    pub round: RoundId,
    pub item: ItemId,
    pub bonus_score: u32,
    pub resolution: Resolution,
    /// Members with at least one log, in pairing order.
    pub members: Vec<MemberStats>,
}

impl PairOutcome {
    pub fn state(&self) -> PairingState {
        match self.resolution {
            Resolution::Undecided => PairingState::Collecting,
            Resolution::Winner { .. } | Resolution::HardTie => PairingState::Resolved,
        }
    }

    pub fn winner(&self) -> Option<&MemberId> {
        match &self.resolution {
            Resolution::Winner { member } => Some(member),
            _ => None,
        }
    }

    pub fn is_hard_tie(&self) -> bool {
        self.resolution == Resolution::HardTie
    }

    /// Awards for the two compared members. Empty while undecided; otherwise
    /// the points sum to either `bonus_score` or 0.
    pub fn awards(&self) -> Vec<PairAward> {
        if self.resolution == Resolution::Undecided {
            return Vec::new();
        }
        let winner = self.winner();
        self.members
            .iter()
            .take(2)
            .map(|stats| PairAward {
                pairing: self.pairing.clone(),
                member: stats.member.clone(),
                contestant: stats.contestant.clone(),
                round: self.round.clone(),
                item: self.item.clone(),
                points: if winner == Some(&stats.member) {
                    self.bonus_score
                } else {
                    0
                },
            })
            .collect()
    }
}

fn compare_members(a: &MemberStats, b: &MemberStats) -> Ordering {
    a.avg_score
        .total_cmp(&b.avg_score)
        .reverse()
        .then_with(|| match (a.best_time, b.best_time) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

pub fn resolve_pairing(
    snapshot: &Snapshot,
    pairing_id: &PairingId,
    item_id: &ItemId,
) -> Result<PairOutcome, EngineError> {
    let competition = snapshot.competition();
    let pairing = snapshot
        .pairing(pairing_id)
        .ok_or_else(|| EngineError::UnknownPairing(pairing_id.clone()))?;
    let item = competition
        .item(item_id)
        .ok_or_else(|| EngineError::UnknownItem(item_id.clone()))?;
    if item.round != pairing.round {
        return Err(EngineError::ItemNotInRound {
            item: item_id.clone(),
            round: pairing.round.clone(),
        });
    }
    let round = competition
        .round(&pairing.round)
        .ok_or_else(|| EngineError::UnknownRound(pairing.round.clone()))?;

    let mut sums: BTreeMap<&MemberId, (f64, usize, Option<u32>)> = BTreeMap::new();
    for log in snapshot.pair_logs_for(pairing_id, item_id) {
        let entry = sums.entry(&log.member).or_insert((0.0, 0, None));
        entry.0 += log.raw_score;
        entry.1 += 1;
        if let Some(seconds) = log.raw_time {
            entry.2 = Some(entry.2.map_or(seconds, |best| best.min(seconds)));
        }
    }

    let members: Vec<MemberStats> = pairing
        .members
        .iter()
        .filter_map(|member| {
            let (sum, logs, best_time) = *sums.get(&member.id)?;
            Some(MemberStats {
                member: member.id.clone(),
                contestant: member.contestant.clone(),
                avg_score: sum / logs as f64,
                best_time,
                logs,
            })
        })
        .collect();

    let resolution = match members.as_slice() {
        [first, second, ..] => match compare_members(first, second) {
            Ordering::Less => Resolution::Winner {
                member: first.member.clone(),
            },
            Ordering::Greater => Resolution::Winner {
                member: second.member.clone(),
            },
            Ordering::Equal => Resolution::HardTie,
        },
        _ => Resolution::Undecided,
    };

    let outcome = PairOutcome {
        pairing: pairing_id.clone(),
        round: pairing.round.clone(),
        item: item_id.clone(),
        bonus_score: round.bonus_score().unwrap_or(DEFAULT_BONUS_SCORE),
        resolution,
        members,
    };

    if tracing::enabled!(target: "contest_core::pairing", Level::DEBUG) {
        event!(
            target: "contest_core::pairing",
            Level::DEBUG,
            pairing = %outcome.pairing,
            item = %outcome.item,
            state = ?outcome.state(),
            winner = outcome.winner().map(MemberId::as_str).unwrap_or(""),
            hard_tie = outcome.is_hard_tie(),
            scored_members = outcome.members.len(),
            "pairing resolved"
        );
    }

    Ok(outcome)
}

/// Resolve every `(pairing, item)` of the snapshot in parallel.
///
/// Results come back in pairing-id then item-id order regardless of
/// scheduling. A failing pairing yields an `Err` in its slot and does not
/// stop the others.
pub fn resolve_all(snapshot: &Snapshot) -> Vec<Result<PairOutcome, EngineError>> {
    resolve_where(snapshot, |_| true)
}

/// [`resolve_all`] restricted to the pairings of one head-to-head round.
pub fn resolve_round_pairings(
    snapshot: &Snapshot,
    round: &RoundId,
) -> Vec<Result<PairOutcome, EngineError>> {
    resolve_where(snapshot, |pairing| &pairing.round == round)
}

fn resolve_where<F>(snapshot: &Snapshot, keep: F) -> Vec<Result<PairOutcome, EngineError>>
where
    F: Fn(&Pairing) -> bool,
{
    let competition = snapshot.competition();
    let tasks: Vec<(&PairingId, &ItemId)> = snapshot
        .pairings()
        .filter(|pairing| keep(pairing))
        .flat_map(|pairing| {
            competition
                .items_in_round(&pairing.round)
                .into_iter()
                .map(move |item| (&pairing.id, &item.id))
        })
        .collect();

    tasks
        .into_par_iter()
        .map(|(pairing, item)| resolve_pairing(snapshot, pairing, item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Competition, ExamItem, PairMember, PairScoreLog, Pairing, Round, RoundKind, Side,
    };

    fn duel_snapshot(bonus_score: u32) -> Snapshot {
        let mut competition = Competition::new("CT002", "Duels");
        competition.contestants = vec!["X".into(), "Y".into()];
        competition.rounds = vec![Round {
            id: "VT-DUEL".into(),
            name: "Duel".into(),
            order: 2,
            kind: RoundKind::HeadToHead { bonus_score },
        }];
        competition.items = vec![
            ExamItem::points("SPEED", "VT-DUEL", 100),
            ExamItem::points("STYLE", "VT-DUEL", 100),
        ];
        let mut snapshot = Snapshot::new(competition);
        snapshot.add_pairing(Pairing {
            id: "P1".into(),
            round: "VT-DUEL".into(),
            members: vec![
                PairMember {
                    id: "M-X".into(),
                    contestant: "X".into(),
                    side: Side::Left,
                    slot: 1,
                },
                PairMember {
                    id: "M-Y".into(),
                    contestant: "Y".into(),
                    side: Side::Right,
                    slot: 1,
                },
            ],
        });
        snapshot
    }

    fn log(snapshot: &mut Snapshot, member: &str, item: &str, judge: &str, score: f64, time: Option<u32>) {
        snapshot.log_pair_score(PairScoreLog {
            pairing: "P1".into(),
            member: member.into(),
            item: item.into(),
            judge: Some(JudgeId::from(judge)),
            raw_score: score,
            raw_time: time,
        });
    }

    fn points(outcome: &PairOutcome) -> Vec<(String, u32)> {
        outcome
            .awards()
            .iter()
            .map(|a| (a.contestant.to_string(), a.points))
            .collect()
    }

    #[test]
    fn faster_member_wins_speed_test_on_equal_average() {
        let mut snapshot = duel_snapshot(100);
        log(&mut snapshot, "M-X", "SPEED", "GK1", 60.0, Some(40));
        log(&mut snapshot, "M-X", "SPEED", "GK2", 80.0, Some(45));
        log(&mut snapshot, "M-Y", "SPEED", "GK1", 70.0, Some(55));

        let outcome = resolve_pairing(&snapshot, &"P1".into(), &"SPEED".into()).unwrap();
        assert_eq!(outcome.state(), PairingState::Resolved);
        assert_eq!(outcome.winner(), Some(&MemberId::from("M-X")));
        assert_eq!(points(&outcome), vec![("X".into(), 100), ("Y".into(), 0)]);
    }

    #[test]
    fn one_scored_member_stays_collecting() {
        let mut snapshot = duel_snapshot(100);
        log(&mut snapshot, "M-X", "SPEED", "GK1", 60.0, None);

        let outcome = resolve_pairing(&snapshot, &"P1".into(), &"SPEED".into()).unwrap();
        assert_eq!(outcome.state(), PairingState::Collecting);
        assert_eq!(outcome.winner(), None);
        assert!(outcome.awards().is_empty());
    }

    #[test]
    fn exact_tie_awards_nobody() {
        let mut snapshot = duel_snapshot(100);
        log(&mut snapshot, "M-X", "STYLE", "GK1", 70.0, None);
        log(&mut snapshot, "M-Y", "STYLE", "GK1", 70.0, None);

        let outcome = resolve_pairing(&snapshot, &"P1".into(), &"STYLE".into()).unwrap();
        assert!(outcome.is_hard_tie());
        assert_eq!(outcome.state(), PairingState::Resolved);
        assert_eq!(points(&outcome), vec![("X".into(), 0), ("Y".into(), 0)]);
    }

    #[test]
    fn recorded_time_beats_missing_time() {
        let mut snapshot = duel_snapshot(100);
        log(&mut snapshot, "M-X", "STYLE", "GK1", 70.0, None);
        log(&mut snapshot, "M-Y", "STYLE", "GK1", 70.0, Some(600));

        let outcome = resolve_pairing(&snapshot, &"P1".into(), &"STYLE".into()).unwrap();
        assert_eq!(outcome.winner(), Some(&MemberId::from("M-Y")));
    }

    #[test]
    fn configured_bonus_is_awarded() {
        let mut snapshot = duel_snapshot(50);
        log(&mut snapshot, "M-X", "SPEED", "GK1", 10.0, None);
        log(&mut snapshot, "M-Y", "SPEED", "GK1", 20.0, None);

        let outcome = resolve_pairing(&snapshot, &"P1".into(), &"SPEED".into()).unwrap();
        assert_eq!(points(&outcome), vec![("X".into(), 0), ("Y".into(), 50)]);
    }

    #[test]
    fn item_from_another_round_is_rejected() {
        let mut snapshot = duel_snapshot(100);
        snapshot
            .competition_mut()
            .items
            .push(ExamItem::points("OTHER", "VT001", 10));
        let err = resolve_pairing(&snapshot, &"P1".into(), &"OTHER".into()).unwrap_err();
        assert!(matches!(err, EngineError::ItemNotInRound { .. }));
        let err = resolve_pairing(&snapshot, &"P9".into(), &"SPEED".into()).unwrap_err();
        assert_eq!(err, EngineError::UnknownPairing("P9".into()));
    }

    #[test]
    fn resolve_all_covers_every_item_in_order() {
        let mut snapshot = duel_snapshot(100);
        log(&mut snapshot, "M-X", "SPEED", "GK1", 90.0, None);
        log(&mut snapshot, "M-Y", "SPEED", "GK1", 10.0, None);

        let outcomes: Vec<PairOutcome> = resolve_all(&snapshot)
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        let items: Vec<&str> = outcomes.iter().map(|o| o.item.as_str()).collect();
        assert_eq!(items, vec!["SPEED", "STYLE"]);
        assert_eq!(outcomes[0].state(), PairingState::Resolved);
        assert_eq!(outcomes[1].state(), PairingState::Collecting);
    }

    #[test]
    fn round_scoped_resolution_skips_other_rounds() {
        let mut snapshot = duel_snapshot(100);
        snapshot.competition_mut().rounds.push(Round {
            id: "CK-DUEL".into(),
            name: "Second duel".into(),
            order: 3,
            kind: RoundKind::HeadToHead { bonus_score: 50 },
        });
        snapshot
            .competition_mut()
            .items
            .push(ExamItem::points("FINALE", "CK-DUEL", 100));
        snapshot.add_pairing(Pairing {
            id: "P2".into(),
            round: "CK-DUEL".into(),
            members: Vec::new(),
        });

        let first: Vec<PairOutcome> = resolve_round_pairings(&snapshot, &"VT-DUEL".into())
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|o| o.pairing.as_str() == "P1"));

        let second: Vec<PairOutcome> = resolve_round_pairings(&snapshot, &"CK-DUEL".into())
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].item.as_str(), "FINALE");
        assert_eq!(resolve_all(&snapshot).len(), 3);
    }
}
