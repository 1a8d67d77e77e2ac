use serde::{Deserialize, Serialize};

use super::exam::ExamItem;
use super::ids::{ContestantId, ItemId, RoundId};

pub const DEFAULT_BONUS_SCORE: u32 = 100;

fn default_bonus_score() -> u32 {
    DEFAULT_BONUS_SCORE
}

/// Round flavour. Replaces the ambient "current mode" flags of a session with
/// data attached to the round itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundKind {
    #[default]
    Ordinary,
    /// Contestants meet in pairings; the winner of each item takes `bonus_score`.
    HeadToHead {
        #[serde(default = "default_bonus_score")]
        bonus_score: u32,
    },
    /// Elimination round restricted to the Top-`top_limit` of the field,
    /// scored by the executive panel.
    ExecutiveCutoff { top_limit: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub name: String,
    /// Position within the competition; ties fall back to the round id.
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub kind: RoundKind,
}

impl Round {
    pub fn is_elimination(&self) -> bool {
        matches!(self.kind, RoundKind::ExecutiveCutoff { .. })
    }

    pub fn top_limit(&self) -> Option<usize> {
        match self.kind {
            RoundKind::ExecutiveCutoff { top_limit } => Some(top_limit),
            _ => None,
        }
    }

    pub fn bonus_score(&self) -> Option<u32> {
        match self.kind {
            RoundKind::HeadToHead { bonus_score } => Some(bonus_score),
            _ => None,
        }
    }
}

/// Competition metadata: roster, rounds and exam items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competition {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub contestants: Vec<ContestantId>,
    #[serde(default)]
    pub rounds: Vec<Round>,
    #[serde(default)]
    pub items: Vec<ExamItem>,
}

impl Competition {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            contestants: Vec::new(),
            rounds: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn round(&self, id: &RoundId) -> Option<&Round> {
        self.rounds.iter().find(|round| &round.id == id)
    }

    pub fn item(&self, id: &ItemId) -> Option<&ExamItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Rounds in competition order.
    pub fn ordered_rounds(&self) -> Vec<&Round> {
        let mut rounds: Vec<&Round> = self.rounds.iter().collect();
        rounds.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        rounds
    }

    /// Items of `round`, ordered by item id.
    pub fn items_in_round(&self, round: &RoundId) -> Vec<&ExamItem> {
        let mut items: Vec<&ExamItem> = self
            .items
            .iter()
            .filter(|item| &item.round == round)
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }

    /// Roster sorted and de-duplicated.
    pub fn roster(&self) -> Vec<ContestantId> {
        let mut roster = self.contestants.clone();
        roster.sort();
        roster.dedup();
        roster
    }

    /// The closest elimination round that precedes `round` in competition order.
    pub fn prior_elimination_round(&self, round: &RoundId) -> Option<&Round> {
        let ordered = self.ordered_rounds();
        let position = ordered.iter().position(|r| &r.id == round)?;
        ordered[..position]
            .iter()
            .rev()
            .find(|r| r.is_elimination())
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(id: &str, order: u32, kind: RoundKind) -> Round {
        Round {
            id: RoundId::from(id),
            name: id.to_string(),
            order,
            kind,
        }
    }

    #[test]
    fn kind_defaults_to_ordinary_and_bonus_to_hundred() {
        let parsed: Round =
            serde_json::from_str(r#"{"id":"VT001","name":"Warm-up"}"#).unwrap();
        assert_eq!(parsed.kind, RoundKind::Ordinary);

        let h2h: Round = serde_json::from_str(
            r#"{"id":"VT002","name":"Duel","kind":{"type":"head_to_head"}}"#,
        )
        .unwrap();
        assert_eq!(h2h.bonus_score(), Some(DEFAULT_BONUS_SCORE));
    }

    #[test]
    fn prior_elimination_skips_ordinary_rounds() {
        let mut competition = Competition::new("CT001", "Finals");
        competition.rounds = vec![
            round("VT001", 1, RoundKind::Ordinary),
            round("VT002", 2, RoundKind::ExecutiveCutoff { top_limit: 10 }),
            round("VT003", 3, RoundKind::Ordinary),
            round("VT004", 4, RoundKind::ExecutiveCutoff { top_limit: 5 }),
        ];

        let prior = competition.prior_elimination_round(&RoundId::from("VT004"));
        assert_eq!(prior.map(|r| r.id.as_str()), Some("VT002"));
        assert!(
            competition
                .prior_elimination_round(&RoundId::from("VT002"))
                .is_none()
        );
    }
}
