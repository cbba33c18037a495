//! Vote aggregation and threshold policy.
//!
//! Support is measured against the whole group's weight, approval against the
//! weight that actually voted. A call passes only when both reach the multisig's
//! thresholds. A `0`/`0` threshold pair is therefore met as soon as the call exists.
//!
//! Votes from addresses that are no longer members are ignored. A group with no
//! weight has zero support and cannot pass a positive support threshold.

use serde::Serialize;

use crate::calls::ProposedCall;
use crate::config::WeightPolicy;
use crate::multisig::Multisig;
use crate::types::{Percent, Stance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub support: Percent,
    pub approval: Percent,
    pub met: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VoteAggregator {
    policy: WeightPolicy,
}

#[derive(Debug, Default)]
struct Weights {
    approving: u128,
    cast: u128,
}

impl VoteAggregator {
    pub fn new(policy: WeightPolicy) -> Self {
        Self { policy }
    }

    pub fn compute_support(&self, call: &ProposedCall, multisig: &Multisig) -> Percent {
        let weights = self.counted_weights(call, multisig);
        Percent::of(weights.approving, multisig.total_weight())
    }

    pub fn compute_approval(&self, call: &ProposedCall, multisig: &Multisig) -> Percent {
        let weights = self.counted_weights(call, multisig);
        Percent::of(weights.approving, weights.cast)
    }

    pub fn is_threshold_met(&self, call: &ProposedCall, multisig: &Multisig) -> bool {
        self.compute_votes(call, multisig).met
    }

    pub fn compute_votes(&self, call: &ProposedCall, multisig: &Multisig) -> VoteTally {
        let weights = self.counted_weights(call, multisig);
        let support = Percent::of(weights.approving, multisig.total_weight());
        let approval = Percent::of(weights.approving, weights.cast);
        VoteTally {
            support,
            approval,
            met: support >= multisig.minimum_support && approval >= multisig.required_approval,
        }
    }

    fn counted_weights(&self, call: &ProposedCall, multisig: &Multisig) -> Weights {
        call.votes
            .values()
            .filter_map(|vote| {
                let live = multisig.weight_of(&vote.voter)?;
                let weight = match self.policy {
                    WeightPolicy::AtCast => vote.weight,
                    WeightPolicy::Live => live,
                };
                Some((vote.stance, weight))
            })
            .fold(Weights::default(), |mut acc, (stance, weight)| {
                acc.cast = acc.cast.saturating_add(weight);
                if stance == Stance::Approve {
                    acc.approving = acc.approving.saturating_add(weight);
                }
                acc
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::CallRegistry;
    use crate::multisig::Member;
    use crate::types::{Address, CallHash};
    use rand::Rng;

    fn multisig(weights: &[(&str, u128)], support: u8, approval: u8) -> Multisig {
        Multisig::new(
            0,
            weights
                .iter()
                .map(|(a, w)| Member::new(Address::from(*a), *w))
                .collect(),
            Percent::new(support).unwrap(),
            Percent::new(approval).unwrap(),
        )
    }

    fn call_with(votes: &[(&str, Stance, u128)]) -> ProposedCall {
        let mut registry = CallRegistry::new();
        let hash = CallHash([1; 32]);
        registry.open_call(hash, None, None);
        for (voter, stance, weight) in votes {
            registry.upsert_vote(hash, Address::from(*voter), *stance, *weight);
        }
        registry.get_call(&hash).unwrap().clone()
    }

    #[test]
    fn test_majority_holder_passes_alone() {
        let ms = multisig(&[("a", 60), ("b", 30), ("c", 10)], 51, 51);
        let call = call_with(&[("a", Stance::Approve, 60)]);
        let tally = VoteAggregator::default().compute_votes(&call, &ms);
        assert_eq!(tally.support.value(), 60);
        assert_eq!(tally.approval.value(), 100);
        assert!(tally.met);
    }

    #[test]
    fn test_both_thresholds_required() {
        let ms = multisig(&[("a", 60), ("b", 30), ("c", 10)], 51, 51);
        let call = call_with(&[("b", Stance::Approve, 30), ("c", Stance::Approve, 10)]);
        let tally = VoteAggregator::default().compute_votes(&call, &ms);
        assert_eq!(tally.support.value(), 40);
        assert_eq!(tally.approval.value(), 100);
        assert!(!tally.met);
    }

    #[test]
    fn test_rejections_lower_approval_only() {
        let ms = multisig(&[("a", 60), ("b", 30), ("c", 10)], 51, 70);
        let call = call_with(&[("a", Stance::Approve, 60), ("b", Stance::Reject, 30)]);
        let aggregator = VoteAggregator::default();
        assert_eq!(aggregator.compute_support(&call, &ms).value(), 60);
        assert_eq!(aggregator.compute_approval(&call, &ms).value(), 66);
        assert!(!aggregator.is_threshold_met(&call, &ms));
    }

    #[test]
    fn test_approval_is_zero_without_votes() {
        let ms = multisig(&[("a", 60), ("b", 30)], 0, 0);
        let call = call_with(&[]);
        let aggregator = VoteAggregator::default();
        assert_eq!(aggregator.compute_approval(&call, &ms), Percent::ZERO);
        // zero thresholds pass once the call exists
        assert!(aggregator.is_threshold_met(&call, &ms));
    }

    #[test]
    fn test_zero_total_weight_never_passes() {
        let ms = multisig(&[("a", 0), ("b", 0)], 1, 0);
        let call = call_with(&[("a", Stance::Approve, 0)]);
        let aggregator = VoteAggregator::default();
        assert_eq!(aggregator.compute_support(&call, &ms), Percent::ZERO);
        assert!(!aggregator.is_threshold_met(&call, &ms));

        let empty = multisig(&[], 51, 51);
        assert!(!aggregator.is_threshold_met(&call, &empty));
    }

    #[test]
    fn test_stale_votes_are_excluded() {
        let ms = multisig(&[("a", 60), ("b", 40)], 51, 51);
        let call = call_with(&[("gone", Stance::Approve, 500), ("b", Stance::Approve, 40)]);
        let tally = VoteAggregator::default().compute_votes(&call, &ms);
        assert_eq!(tally.support.value(), 40);
        assert!(!tally.met);
    }

    #[test]
    fn test_live_policy_uses_current_weight() {
        let ms = multisig(&[("a", 10), ("b", 90)], 51, 51);
        let call = call_with(&[("b", Stance::Approve, 20)]);
        assert_eq!(
            VoteAggregator::new(WeightPolicy::AtCast).compute_support(&call, &ms).value(),
            20
        );
        assert_eq!(
            VoteAggregator::new(WeightPolicy::Live).compute_support(&call, &ms).value(),
            90
        );
    }

    #[test]
    fn test_support_is_monotonic_in_approvals() {
        let mut rng = rand::thread_rng();
        let aggregator = VoteAggregator::default();
        for _ in 0..50 {
            let count = rng.gen_range(1..12);
            let names: Vec<String> = (0..count).map(|i| format!("m{:02}", i)).collect();
            let weights: Vec<u128> = (0..count).map(|_| rng.gen_range(0..1_000)).collect();
            let ms = Multisig::new(
                0,
                names
                    .iter()
                    .zip(&weights)
                    .map(|(n, w)| Member::new(Address::new(n.clone()), *w))
                    .collect(),
                Percent::new(51).unwrap(),
                Percent::new(51).unwrap(),
            );

            let hash = CallHash([2; 32]);
            let mut registry = CallRegistry::new();
            registry.open_call(hash, None, None);
            let mut previous = Percent::ZERO;
            for (name, weight) in names.iter().zip(&weights) {
                registry.upsert_vote(hash, Address::new(name.clone()), Stance::Approve, *weight);
                let support = aggregator.compute_support(registry.get_call(&hash).unwrap(), &ms);
                assert!(support >= previous);
                previous = support;
            }
            for name in &names {
                registry.withdraw_vote(&hash, &Address::new(name.clone())).unwrap();
                let support = aggregator.compute_support(registry.get_call(&hash).unwrap(), &ms);
                assert!(support <= previous);
                previous = support;
            }
            assert_eq!(previous, Percent::ZERO);
        }
    }
}
