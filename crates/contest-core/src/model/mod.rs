pub mod exam;
pub mod ids;
pub mod record;
pub mod round;

pub use exam::{ExamItem, ScoringMethod, TemplateItem, TemplateSection, TimeRule};
pub use ids::{ContestantId, ExecutiveId, ItemId, JudgeId, MemberId, PairingId, RoundId};
pub use record::{
    ExecutiveScore, PairMember, PairScoreLog, Pairing, PopularVote, ScoreRecord, Side, StarVote,
};
pub use round::{Competition, DEFAULT_BONUS_SCORE, Round, RoundKind};
