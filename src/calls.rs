use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

use crate::call_type::CallPayload;
use crate::chain::{ChainClient, PendingCallRecord, StorageKey};
use crate::error::{GovernanceError, Result};
use crate::types::{Address, CallHash, MultisigId, Stance};
use crate::utils;

/// Open proposed calls of one multisig, oldest first.
#[derive(Debug, Clone, Default)]
pub struct CallRegistry {
    calls: HashMap<CallHash, ProposedCall>,
    order: BTreeMap<u64, CallHash>,
    next_seq: u64,
    next_ordinal: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedCall {
    pub call_hash: CallHash,
    // unknown when the call was first observed through a vote
    pub payload: Option<CallPayload>,
    pub proposer: Option<Address>,
    pub votes: BTreeMap<Address, Vote>,
    pub status: CallStatus,
    #[serde(skip)]
    seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: Address,
    pub call_hash: CallHash,
    pub stance: Stance,
    pub weight: u128,
    pub ordinal: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallStatus {
    Open,
    Executed,
    Withdrawn,
    Expired,
}

impl CallStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CallStatus::Open)
    }
}

/// Effect of an `upsert_vote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteChange {
    Inserted,
    Unchanged,
    Changed,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the registry from the pending-call storage of `multisig_id`.
    pub async fn fetch<C: ChainClient>(chain: &C, multisig_id: MultisigId) -> Result<Self> {
        let mut registry = Self::new();
        let hashes: Vec<CallHash> =
            utils::query_decoded(chain, StorageKey::PendingCalls(multisig_id), "pending call index")
                .await?
                .unwrap_or_default();

        for call_hash in hashes {
            let record: Option<PendingCallRecord> = utils::query_decoded(
                chain,
                StorageKey::PendingCall(multisig_id, call_hash),
                "pending call",
            )
            .await?;
            // index and entry are read separately, the call may have closed in between
            if let Some(record) = record {
                registry.insert_record(record);
            }
        }

        debug!(multisig = multisig_id, open = registry.len(), "fetched open calls");
        Ok(registry)
    }

    pub(crate) fn insert_record(&mut self, record: PendingCallRecord) {
        let PendingCallRecord {
            call_hash,
            payload,
            proposer,
            votes,
        } = record;
        self.open_call(call_hash, Some(payload), Some(proposer));
        for vote in votes {
            self.upsert_vote(call_hash, vote.voter, vote.stance, vote.weight);
        }
    }

    pub fn get_open_calls(&self) -> Vec<ProposedCall> {
        self.order
            .values()
            .filter_map(|hash| self.calls.get(hash))
            .cloned()
            .collect()
    }

    pub fn get_call(&self, call_hash: &CallHash) -> Result<&ProposedCall> {
        self.calls
            .get(call_hash)
            .ok_or_else(|| GovernanceError::call_not_found(*call_hash))
    }

    pub fn contains(&self, call_hash: &CallHash) -> bool {
        self.calls.contains_key(call_hash)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Creates the call if unseen. Fills in payload/proposer on an entry first seen through a vote.
    /// Returns whether a new entry was created.
    pub fn open_call(
        &mut self,
        call_hash: CallHash,
        payload: Option<CallPayload>,
        proposer: Option<Address>,
    ) -> bool {
        if let Some(call) = self.calls.get_mut(&call_hash) {
            if call.payload.is_none() {
                call.payload = payload;
            }
            if call.proposer.is_none() {
                call.proposer = proposer;
            }
            return false;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, call_hash);
        self.calls.insert(
            call_hash,
            ProposedCall {
                call_hash,
                payload,
                proposer,
                votes: BTreeMap::new(),
                status: CallStatus::Open,
                seq,
            },
        );
        true
    }

    pub fn upsert_vote(
        &mut self,
        call_hash: CallHash,
        voter: Address,
        stance: Stance,
        weight: u128,
    ) -> VoteChange {
        self.open_call(call_hash, None, None);
        let ordinal = self.next_ordinal;
        let Some(call) = self.calls.get_mut(&call_hash) else {
            return VoteChange::Unchanged;
        };

        let change = match call.votes.get(&voter) {
            Some(existing) if existing.stance == stance => return VoteChange::Unchanged,
            Some(_) => VoteChange::Changed,
            None => VoteChange::Inserted,
        };

        self.next_ordinal += 1;
        call.votes.insert(
            voter.clone(),
            Vote {
                voter,
                call_hash,
                stance,
                weight,
                ordinal,
            },
        );
        change
    }

    pub fn withdraw_vote(&mut self, call_hash: &CallHash, voter: &Address) -> Result<Vote> {
        let call = self
            .calls
            .get_mut(call_hash)
            .ok_or_else(|| GovernanceError::call_not_found(*call_hash))?;
        call.votes
            .remove(voter)
            .ok_or_else(|| GovernanceError::NotAVoter {
                call_hash: *call_hash,
                voter: voter.clone(),
            })
    }

    /// Removes the call from the open set. Absent calls are a no-op so repeated
    /// confirmations of the same outcome are harmless.
    pub fn remove_call(&mut self, call_hash: &CallHash) -> Option<ProposedCall> {
        let call = self.calls.remove(call_hash)?;
        self.order.remove(&call.seq);
        Some(call)
    }
}

impl ProposedCall {
    pub fn stance_of(&self, voter: &Address) -> Option<Stance> {
        self.votes.get(voter).map(|vote| vote.stance)
    }
}

impl fmt::Display for CallRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for call in self.get_open_calls() {
            writeln!(f, "{}: {}", call.call_hash, call)?;
        }
        fmt::Result::Ok(())
    }
}

impl fmt::Display for ProposedCall {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match serde_json::to_string_pretty(self) {
            std::result::Result::Ok(json) => write!(f, "{}", json),
            std::result::Result::Err(e) => write!(f, "<failed to serialize call: {}>", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u8) -> CallHash {
        CallHash([byte; 32])
    }

    #[test]
    fn test_open_calls_keep_insertion_order() {
        let mut registry = CallRegistry::new();
        registry.open_call(hash(3), None, None);
        registry.open_call(hash(1), None, None);
        registry.open_call(hash(2), None, None);
        registry.open_call(hash(1), None, None);

        let order: Vec<CallHash> = registry.get_open_calls().iter().map(|c| c.call_hash).collect();
        assert_eq!(order, vec![hash(3), hash(1), hash(2)]);
    }

    #[test]
    fn test_upsert_vote_is_idempotent() {
        let mut registry = CallRegistry::new();
        let alice = Address::from("alice");

        assert_eq!(
            registry.upsert_vote(hash(1), alice.clone(), Stance::Approve, 60),
            VoteChange::Inserted
        );
        let snapshot = registry.get_call(&hash(1)).unwrap().clone();
        assert_eq!(
            registry.upsert_vote(hash(1), alice.clone(), Stance::Approve, 60),
            VoteChange::Unchanged
        );
        assert_eq!(registry.get_call(&hash(1)).unwrap(), &snapshot);

        assert_eq!(
            registry.upsert_vote(hash(1), alice.clone(), Stance::Reject, 60),
            VoteChange::Changed
        );
        let call = registry.get_call(&hash(1)).unwrap();
        assert_eq!(call.votes.len(), 1);
        assert_eq!(call.stance_of(&alice), Some(Stance::Reject));
    }

    #[test]
    fn test_vote_on_unseen_call_creates_it() {
        let mut registry = CallRegistry::new();
        registry.upsert_vote(hash(9), Address::from("bob"), Stance::Approve, 1);
        let call = registry.get_call(&hash(9)).unwrap();
        assert!(call.payload.is_none());
        assert_eq!(call.status, CallStatus::Open);
    }

    #[test]
    fn test_withdraw_vote_errors() {
        let mut registry = CallRegistry::new();
        let alice = Address::from("alice");

        assert!(matches!(
            registry.withdraw_vote(&hash(1), &alice),
            Err(GovernanceError::NotFound(_))
        ));

        registry.open_call(hash(1), None, None);
        assert!(matches!(
            registry.withdraw_vote(&hash(1), &alice),
            Err(GovernanceError::NotAVoter { .. })
        ));

        registry.upsert_vote(hash(1), alice.clone(), Stance::Approve, 5);
        let vote = registry.withdraw_vote(&hash(1), &alice).unwrap();
        assert_eq!(vote.weight, 5);
        assert!(registry.get_call(&hash(1)).unwrap().votes.is_empty());
    }

    #[test]
    fn test_remove_call_tolerates_duplicates() {
        let mut registry = CallRegistry::new();
        registry.open_call(hash(1), None, None);
        assert!(registry.remove_call(&hash(1)).is_some());
        assert!(registry.remove_call(&hash(1)).is_none());
        assert!(registry.is_empty());
        assert!(matches!(registry.get_call(&hash(1)), Err(GovernanceError::NotFound(_))));
    }
}
