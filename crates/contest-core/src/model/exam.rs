use serde::{Deserialize, Serialize};

use super::ids::{ItemId, JudgeId, RoundId};

/// How judges score an exam item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoringMethod {
    #[default]
    Points,
    Time,
    Template,
}

/// Inclusive `[start_seconds, end_seconds]` bracket awarding `score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRule {
    pub start_seconds: u32,
    pub end_seconds: u32,
    pub score: u32,
}

impl TimeRule {
    pub fn contains(&self, seconds: u32) -> bool {
        self.start_seconds <= seconds && seconds <= self.end_seconds
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateItem {
    pub content: String,
    pub max_score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSection {
    pub title: String,
    #[serde(default)]
    pub items: Vec<TemplateItem>,
}

/// A scoreable unit belonging to exactly one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamItem {
    pub id: ItemId,
    pub round: RoundId,
    pub name: String,
    #[serde(default)]
    pub method: ScoringMethod,
    /// Cap for POINTS items; ignored by the other methods.
    #[serde(default)]
    pub points_cap: u32,
    #[serde(default)]
    pub time_rules: Vec<TimeRule>,
    #[serde(default)]
    pub template: Vec<TemplateSection>,
    /// Judge record that carries the executive composite score for this item.
    #[serde(default)]
    pub representative_judge: Option<JudgeId>,
}

impl ExamItem {
    pub fn points(id: impl Into<ItemId>, round: impl Into<RoundId>, cap: u32) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            round: round.into(),
            method: ScoringMethod::Points,
            points_cap: cap,
            time_rules: Vec::new(),
            template: Vec::new(),
            representative_judge: None,
        }
    }

    /// Maximum attainable score, derived from the scoring method.
    pub fn max_score(&self) -> u32 {
        match self.method {
            ScoringMethod::Points => self.points_cap,
            ScoringMethod::Time => self.time_rules.iter().map(|r| r.score).max().unwrap_or(0),
            ScoringMethod::Template => self
                .template
                .iter()
                .flat_map(|section| section.items.iter())
                .map(|item| item.max_score)
                .sum(),
        }
    }

    /// Score of the first bracket containing `seconds`, brackets ordered by
    /// `(start, end, score)`. Zero when no bracket matches.
    pub fn score_for_time(&self, seconds: u32) -> u32 {
        let mut rules = self.time_rules.clone();
        rules.sort_by_key(|r| (r.start_seconds, r.end_seconds, r.score));
        rules
            .iter()
            .find(|rule| rule.contains(seconds))
            .map(|rule| rule.score)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed_item() -> ExamItem {
        ExamItem {
            method: ScoringMethod::Time,
            time_rules: vec![
                TimeRule {
                    start_seconds: 61,
                    end_seconds: 120,
                    score: 70,
                },
                TimeRule {
                    start_seconds: 0,
                    end_seconds: 60,
                    score: 100,
                },
            ],
            ..ExamItem::points("BT002", "VT001", 0)
        }
    }

    #[test]
    fn points_max_is_the_cap() {
        assert_eq!(ExamItem::points("BT001", "VT001", 30).max_score(), 30);
    }

    #[test]
    fn time_max_is_best_bracket() {
        assert_eq!(timed_item().max_score(), 100);
    }

    #[test]
    fn time_brackets_are_inclusive() {
        let item = timed_item();
        assert_eq!(item.score_for_time(60), 100);
        assert_eq!(item.score_for_time(61), 70);
        assert_eq!(item.score_for_time(120), 70);
        assert_eq!(item.score_for_time(121), 0);
    }

    #[test]
    fn template_max_sums_item_maxima() {
        let item = ExamItem {
            method: ScoringMethod::Template,
            template: vec![
                TemplateSection {
                    title: "Knowledge".into(),
                    items: vec![
                        TemplateItem {
                            content: "Q1".into(),
                            max_score: 10,
                        },
                        TemplateItem {
                            content: "Q2".into(),
                            max_score: 15,
                        },
                    ],
                },
                TemplateSection {
                    title: "Attitude".into(),
                    items: vec![TemplateItem {
                        content: "Greeting".into(),
                        max_score: 5,
                    }],
                },
            ],
            ..ExamItem::points("BT003", "VT001", 0)
        };
        assert_eq!(item.max_score(), 30);
    }

    #[test]
    fn method_deserializes_from_upper_case_tag() {
        let method: ScoringMethod = serde_json::from_str("\"TEMPLATE\"").unwrap();
        assert_eq!(method, ScoringMethod::Template);
    }
}
