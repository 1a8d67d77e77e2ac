use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::ContestantId;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteShare {
    pub contestant: ContestantId,
    pub votes: u32,
    pub percent: f64,
}

/// Crowd vote totals for every rostered or voted-for contestant, most
/// votes first, ties by id.
pub fn tally_popular_votes(snapshot: &Snapshot) -> Vec<VoteShare> {
    let mut counts: BTreeMap<ContestantId, u32> = snapshot
        .competition()
        .roster()
        .into_iter()
        .map(|contestant| (contestant, 0))
        .collect();
    let mut total = 0u32;
    for vote in snapshot.popular_votes() {
        *counts.entry(vote.contestant.clone()).or_insert(0) += 1;
        total += 1;
    }

    let mut shares: Vec<VoteShare> = counts
        .into_iter()
        .map(|(contestant, votes)| VoteShare {
            contestant,
            votes,
            percent: if total == 0 {
                0.0
            } else {
                f64::from(votes) * 100.0 / f64::from(total)
            },
        })
        .collect();
    shares.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.contestant.cmp(&b.contestant)));
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Competition, PopularVote};

    fn vote(snapshot: &mut Snapshot, voter: &str, contestant: &str) {
        snapshot.cast_popular_vote(PopularVote {
            voter: voter.to_string(),
            contestant: contestant.into(),
        });
    }

    #[test]
    fn one_vote_per_voter_and_shares_sum_to_hundred() {
        let mut competition = Competition::new("CT005", "Crowd");
        competition.contestants = vec!["A".into(), "B".into(), "C".into()];
        let mut snap = Snapshot::new(competition);
        vote(&mut snap, "a@corp", "A");
        vote(&mut snap, "a@corp", "B");
        vote(&mut snap, "b@corp", "B");
        vote(&mut snap, "c@corp", "A");
        vote(&mut snap, "d@corp", "B");
        snap.revoke_popular_vote("c@corp");

        let shares = tally_popular_votes(&snap);
        let summary: Vec<(&str, u32)> = shares.iter().map(|s| (s.contestant.as_str(), s.votes)).collect();
        assert_eq!(summary, vec![("B", 3), ("A", 0), ("C", 0)]);
        assert_eq!(shares[0].percent, 100.0);
    }

    #[test]
    fn no_votes_means_zero_percent() {
        let mut competition = Competition::new("CT005", "Crowd");
        competition.contestants = vec!["A".into()];
        let shares = tally_popular_votes(&Snapshot::new(competition));
        assert_eq!(shares[0].percent, 0.0);
    }
}
