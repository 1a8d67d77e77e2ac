//! Seeded synthetic competitions.
//!
//! The generator draws every value from one `StdRng` in a fixed iteration
//! order, so the same configuration always yields the same snapshot.

use contest_core::model::{
    Competition, ContestantId, ExamItem, ExecutiveId, ExecutiveScore, JudgeId, MemberId,
    PairMember, PairScoreLog, Pairing, PopularVote, Round, RoundKind, ScoreRecord, ScoringMethod,
    Side, StarVote, TimeRule, DEFAULT_BONUS_SCORE,
};
use contest_core::{ScoringMode, Snapshot, validate_star_vote, validate_submission};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SyntheticConfig;

pub const PANEL_JUDGE: &str = "BGD-PANEL";

const QUALIFIER: &str = "R1";
const DUEL: &str = "DUEL";

fn contestant(index: usize) -> ContestantId {
    ContestantId::new(format!("NV{:03}", index + 1))
}

fn judge(index: usize) -> JudgeId {
    JudgeId::new(format!("GK{:02}", index + 1))
}

fn member(pairing: usize, side: Side) -> MemberId {
    let tag = match side {
        Side::Left => "L",
        Side::Right => "R",
    };
    MemberId::new(format!("P{:02}-{tag}", pairing + 1))
}

fn speed_item() -> ExamItem {
    ExamItem {
        method: ScoringMethod::Time,
        time_rules: vec![
            TimeRule {
                start_seconds: 0,
                end_seconds: 60,
                score: 100,
            },
            TimeRule {
                start_seconds: 61,
                end_seconds: 120,
                score: 70,
            },
            TimeRule {
                start_seconds: 121,
                end_seconds: 300,
                score: 40,
            },
        ],
        ..ExamItem::points("R1-SPEED", QUALIFIER, 0)
    }
}

fn competition(config: &SyntheticConfig) -> Competition {
    let mut competition = Competition::new(
        format!("SYN-{}", config.seed),
        format!("Synthetic skills cup #{}", config.seed),
    );
    competition.contestants = (0..config.contestants).map(contestant).collect();

    competition.rounds.push(Round {
        id: QUALIFIER.into(),
        name: "Qualifier".into(),
        order: 1,
        kind: RoundKind::Ordinary,
    });
    competition
        .items
        .push(ExamItem::points("R1-WRITTEN", QUALIFIER, 100));
    competition.items.push(speed_item());

    if config.pairings > 0 {
        competition.rounds.push(Round {
            id: DUEL.into(),
            name: "Head-to-head".into(),
            order: 2,
            kind: RoundKind::HeadToHead {
                bonus_score: DEFAULT_BONUS_SCORE,
            },
        });
        competition
            .items
            .push(ExamItem::points("DUEL-SPEED", DUEL, 100));
        competition
            .items
            .push(ExamItem::points("DUEL-SHOW", DUEL, 100));
    }

    for (position, top_limit) in config.top_limits.iter().enumerate() {
        let id = format!("TOP{top_limit}-{}", position + 1);
        competition.rounds.push(Round {
            id: id.as_str().into(),
            name: format!("Top {top_limit}"),
            order: 3 + position as u32,
            kind: RoundKind::ExecutiveCutoff {
                top_limit: *top_limit,
            },
        });
        let mut panel = ExamItem::points(format!("{id}-PANEL"), id.as_str(), 100);
        panel.representative_judge = Some(JudgeId::from(PANEL_JUDGE));
        competition.items.push(panel);
    }

    competition
}

pub fn generate(config: &SyntheticConfig) -> Snapshot {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let competition = competition(config);
    let written = competition
        .item(&"R1-WRITTEN".into())
        .cloned()
        .unwrap_or_else(|| ExamItem::points("R1-WRITTEN", QUALIFIER, 100));
    let speed = speed_item();
    let mut snapshot = Snapshot::new(competition);

    for index in 0..config.contestants {
        for judge_index in 0..config.judges {
            let raw = f64::from(rng.gen_range(8..=20u32) * 5);
            if let Ok(score) = validate_submission(ScoringMode::Ordinary, &written, raw, None) {
                snapshot.upsert_score(ScoreRecord {
                    contestant: contestant(index),
                    judge: judge(judge_index),
                    item: written.id.clone(),
                    round: QUALIFIER.into(),
                    points: score.points,
                    elapsed_seconds: score.elapsed_seconds,
                });
            }

            let elapsed = rng.gen_range(30..=240u32);
            snapshot.upsert_score(ScoreRecord {
                contestant: contestant(index),
                judge: judge(judge_index),
                item: speed.id.clone(),
                round: QUALIFIER.into(),
                points: f64::from(speed.score_for_time(elapsed)),
                elapsed_seconds: Some(elapsed),
            });
        }
    }

    for pairing in 0..config.pairings {
        let id = format!("P{:02}", pairing + 1);
        let sides = [
            (member(pairing, Side::Left), contestant(2 * pairing), Side::Left),
            (member(pairing, Side::Right), contestant(2 * pairing + 1), Side::Right),
        ];
        snapshot.add_pairing(Pairing {
            id: id.as_str().into(),
            round: DUEL.into(),
            members: sides
                .iter()
                .map(|(member, contestant, side)| PairMember {
                    id: member.clone(),
                    contestant: contestant.clone(),
                    side: *side,
                    slot: 1,
                })
                .collect(),
        });

        for item in ["DUEL-SPEED", "DUEL-SHOW"] {
            for (member, _, _) in &sides {
                // Occasionally a side never gets scored, leaving the item undecided.
                if rng.gen_bool(0.1) {
                    continue;
                }
                for judge_index in 0..config.judges {
                    let raw_time = (item == "DUEL-SPEED").then(|| rng.gen_range(20..=40u32));
                    snapshot.log_pair_score(PairScoreLog {
                        pairing: id.as_str().into(),
                        member: member.clone(),
                        item: item.into(),
                        judge: Some(judge(judge_index)),
                        raw_score: f64::from(rng.gen_range(6..=10u32) * 10),
                        raw_time,
                    });
                }
            }
        }

        for (member, contestant, _) in &sides {
            for judge_index in 0..config.judges {
                let vote = StarVote {
                    judge: judge(judge_index),
                    entry: member.clone(),
                    contestant: contestant.clone(),
                    stars: rng.gen_range(1..=5u8),
                    heart: rng.gen_bool(0.25),
                };
                if let Ok(vote) = validate_star_vote(vote) {
                    snapshot.cast_star_vote(vote);
                }
            }
        }
    }

    for executive in 0..config.executives {
        for index in 0..config.contestants {
            snapshot.submit_executive_score(ExecutiveScore {
                executive: ExecutiveId::new(format!("BGD{:02}", executive + 1)),
                contestant: contestant(index),
                score: rng.gen_range(50..=100u32),
            });
        }
    }

    for fan in 0..config.contestants * 3 {
        let choice = rng.gen_range(0..config.contestants);
        snapshot.cast_popular_vote(PopularVote {
            voter: format!("fan{:03}@corp.example", fan + 1),
            contestant: contestant(choice),
        });
    }

    snapshot
}
