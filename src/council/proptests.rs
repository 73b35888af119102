//! Property-based tests for the tally engine.

use super::policy::VotingPolicy;
use super::proposal::{Tally, UrgencyClass};
use super::tally::{emergency_outcome, natural_outcome, Outcome};
use proptest::prelude::*;

fn tally_strategy() -> impl Strategy<Value = Tally> {
    (0u64..500, 0u64..500, 0u64..500).prop_map(|(votes_for, votes_against, votes_abstain)| Tally {
        votes_for,
        votes_against,
        votes_abstain,
        total_power_at_snapshot: 0,
    })
}

proptest! {
    /// Property: below quorum the outcome is always Expired, never a decision.
    #[test]
    fn below_quorum_always_expires(
        tally in tally_strategy(),
        extra in 1u64..1000,
    ) {
        let policy = VotingPolicy::default();
        // pick a total strictly more than double the cast power, so
        // participation is under the 50% quorum
        let total = tally.cast_power() * 2 + extra;
        let outcome = natural_outcome(&tally, total, UrgencyClass::Standard, &policy);
        prop_assert_eq!(outcome, Outcome::Expired);
    }

    /// Property: approval implies both quorum and the class threshold held.
    #[test]
    fn approval_implies_thresholds(
        tally in tally_strategy(),
        total in 1u64..2000,
    ) {
        let policy = VotingPolicy::default();
        for class in [UrgencyClass::Standard, UrgencyClass::Emergency] {
            if natural_outcome(&tally, total, class, &policy) == Outcome::Approved {
                prop_assert!(tally.cast_power() * 100 >= total * policy.quorum_pct);
                prop_assert!(tally.votes_for * 100 >= total * policy.approval_pct(class));
            }
        }
    }

    /// Property: with quorum met, the outcome is never Expired.
    #[test]
    fn quorum_met_always_decides(
        tally in tally_strategy(),
    ) {
        let policy = VotingPolicy::default();
        prop_assume!(tally.cast_power() > 0);
        // total equal to cast power: participation is exactly 100%
        let total = tally.cast_power();
        let outcome = natural_outcome(&tally, total, UrgencyClass::Standard, &policy);
        prop_assert_ne!(outcome, Outcome::Expired);
    }

    /// Property: adding approve power never flips Approved back to
    /// Rejected or Expired.
    #[test]
    fn approval_is_monotone_in_approve_power(
        tally in tally_strategy(),
        total in 1u64..2000,
        extra in 1u64..200,
    ) {
        let policy = VotingPolicy::default();
        let before = natural_outcome(&tally, total, UrgencyClass::Standard, &policy);
        prop_assume!(before == Outcome::Approved);

        let more = Tally { votes_for: tally.votes_for + extra, ..tally };
        let after = natural_outcome(&more, total, UrgencyClass::Standard, &policy);
        prop_assert_eq!(after, Outcome::Approved);
    }

    /// Property: the emergency fast-path never decides without a decisive
    /// vote, and never approves below the supermajority share.
    #[test]
    fn emergency_respects_supermajority(
        tally in tally_strategy(),
    ) {
        let policy = VotingPolicy::default();
        match emergency_outcome(&tally, &policy) {
            None => {}
            Some(outcome) => {
                let decisive = tally.decisive_power();
                prop_assert!(decisive > 0);
                match outcome {
                    Outcome::Approved => prop_assert!(
                        tally.votes_for * 100 >= decisive * policy.emergency_supermajority_pct
                    ),
                    Outcome::Rejected => prop_assert!(
                        tally.votes_against * 100 >= decisive * policy.emergency_supermajority_pct
                    ),
                    Outcome::Expired => prop_assert!(false, "fast-path never expires"),
                }
            }
        }
    }

    /// Property: abstentions never change the emergency fast-path decision.
    #[test]
    fn emergency_ignores_abstentions(
        tally in tally_strategy(),
        abstain in 0u64..500,
    ) {
        let policy = VotingPolicy::default();
        let with_abstain = Tally { votes_abstain: abstain, ..tally };
        prop_assert_eq!(
            emergency_outcome(&tally, &policy),
            emergency_outcome(&with_abstain, &policy)
        );
    }
}
