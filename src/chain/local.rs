//! In-process dev chain.
//!
//! Applies the multisig runtime rules synchronously: every accepted transaction
//! goes straight into a new block that is immediately final. Signatures are not
//! verified, only required to be present.

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{
    tx_hash_of, ChainClient, ChainEvent, Extrinsic, InclusionReport, MultisigRecord,
    PendingCallRecord, SignedExtrinsic, Signer, StatusStream, StorageKey, TxStatus, VoteRecord,
};
use crate::call_type::CallPayload;
use crate::calls::CallRegistry;
use crate::multisig::{derive_account, Member, Multisig};
use crate::types::{Address, CallHash, MultisigId, Stance};
use crate::votes::VoteAggregator;

/// Signs with a keyed digest. Only meaningful to [`LocalChain`].
#[derive(Debug, Clone)]
pub struct DevSigner {
    address: Address,
}

impl DevSigner {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: Address::new(address),
        }
    }
}

impl Signer for DevSigner {
    fn address(&self) -> Address {
        self.address.clone()
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(self.address.as_str().as_bytes());
        hasher.update(payload);
        hasher.finalize().to_vec()
    }
}

/// Failure injected into the next submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    Invalid(String),
    Dropped,
    /// Included, but with no success/failure outcome event.
    Unrecognised,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("MultisigNotFound")]
    MultisigNotFound,
    #[error("NotAMember")]
    NotAMember,
    #[error("CallNotFound")]
    CallNotFound,
    #[error("NotAVoter")]
    NotAVoter,
    #[error("NotTheProposer")]
    NotTheProposer,
    #[error("TokensFrozen")]
    TokensFrozen,
    #[error("InsufficientBalance")]
    InsufficientBalance,
    #[error("InvalidParameter: {0}")]
    InvalidParameter(String),
}

#[derive(Debug, Clone, Default)]
struct State {
    next_id: MultisigId,
    multisigs: BTreeMap<MultisigId, Entry>,
    outbox: Vec<(MultisigId, CallPayload)>,
}

#[derive(Debug, Clone)]
struct Entry {
    record: MultisigRecord,
    balances: BTreeMap<Address, u128>,
    // insertion order
    pending: Vec<PendingCallRecord>,
}

#[derive(Debug, Default)]
struct Ledger {
    block: u64,
    nonce: u64,
    state: State,
    fault: Option<Fault>,
}

#[derive(Debug, Default)]
pub struct LocalChain {
    ledger: Mutex<Ledger>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<InclusionReport>>>,
}

impl LocalChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_fault(&self, fault: Fault) {
        self.ledger.lock().fault = Some(fault);
    }

    pub fn block_number(&self) -> u64 {
        self.ledger.lock().block
    }

    /// External calls and asset transfers dispatched by executed proposals.
    pub fn outbox(&self) -> Vec<(MultisigId, CallPayload)> {
        self.ledger.lock().state.outbox.clone()
    }

    /// Drops a pending call as a call-data time-to-live would, publishing `CallExpired`.
    pub fn expire_call(&self, multisig: MultisigId, call_hash: CallHash) -> bool {
        let report = {
            let mut ledger = self.ledger.lock();
            let Some(entry) = ledger.state.multisigs.get_mut(&multisig) else {
                return false;
            };
            let before = entry.pending.len();
            entry.pending.retain(|call| call.call_hash != call_hash);
            if entry.pending.len() == before {
                return false;
            }
            ledger.block += 1;
            ledger.nonce += 1;
            let mut hasher = Sha256::new();
            hasher.update(b"multisig-governance/expiry");
            hasher.update(ledger.nonce.to_le_bytes());
            InclusionReport::new(
                crate::types::TxHash(hasher.finalize().into()),
                ledger.block,
                vec![ChainEvent::CallExpired { multisig, call_hash }],
            )
        };
        self.publish(&report);
        true
    }

    fn publish(&self, report: &InclusionReport) {
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(report.clone()).is_ok());
    }

    fn process(
        &self,
        signed: SignedExtrinsic,
        tx: &mpsc::UnboundedSender<TxStatus>,
    ) -> StatusStreamParts {
        let mut ledger = self.ledger.lock();
        ledger.nonce += 1;
        let tx_hash = tx_hash_of(&signed, ledger.nonce);

        if signed.signature.is_empty() {
            let _ = tx.send(TxStatus::Invalid("missing signature".to_string()));
            return StatusStreamParts { tx_hash, report: None };
        }

        match ledger.fault.take() {
            Some(Fault::Invalid(reason)) => {
                let _ = tx.send(TxStatus::Invalid(reason));
                return StatusStreamParts { tx_hash, report: None };
            }
            Some(Fault::Dropped) => {
                let _ = tx.send(TxStatus::Ready);
                let _ = tx.send(TxStatus::Dropped);
                return StatusStreamParts { tx_hash, report: None };
            }
            Some(Fault::Unrecognised) => {
                let _ = tx.send(TxStatus::Ready);
                ledger.block += 1;
                let report = InclusionReport::new(
                    tx_hash,
                    ledger.block,
                    vec![ChainEvent::Other {
                        pallet: "system".to_string(),
                        name: "Remarked".to_string(),
                    }],
                );
                return StatusStreamParts { tx_hash, report: Some(report) };
            }
            None => {}
        }

        let _ = tx.send(TxStatus::Ready);
        ledger.block += 1;

        let snapshot = ledger.state.clone();
        let mut events = Vec::new();
        let result = ledger.state.dispatch(&signed.origin, signed.extrinsic, &mut events);
        let events = match result {
            Ok(()) => {
                events.push(ChainEvent::ExtrinsicSuccess);
                events
            }
            Err(error) => {
                ledger.state = snapshot;
                debug!(%error, origin = %signed.origin, "extrinsic failed");
                vec![ChainEvent::ExtrinsicFailed {
                    error: error.to_string(),
                }]
            }
        };

        StatusStreamParts {
            tx_hash,
            report: Some(InclusionReport::new(tx_hash, ledger.block, events)),
        }
    }
}

struct StatusStreamParts {
    tx_hash: crate::types::TxHash,
    report: Option<InclusionReport>,
}

impl ChainClient for LocalChain {
    async fn submit(&self, extrinsic: SignedExtrinsic) -> anyhow::Result<StatusStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        let parts = self.process(extrinsic, &tx);

        if let Some(report) = parts.report {
            self.publish(&report);
            let _ = tx.send(TxStatus::InBlock(report.clone()));
            let _ = tx.send(TxStatus::Finalized(report));
        }

        Ok(StatusStream::new(parts.tx_hash, rx))
    }

    async fn query(&self, key: StorageKey) -> anyhow::Result<Option<Vec<u8>>> {
        let ledger = self.ledger.lock();
        let state = &ledger.state;
        let bytes = match key {
            StorageKey::NextMultisigId => Some(bcs::to_bytes(&state.next_id)?),
            StorageKey::Multisig(id) => match state.multisigs.get(&id) {
                Some(entry) => Some(bcs::to_bytes(&entry.record)?),
                None => None,
            },
            StorageKey::Members(id) => match state.multisigs.get(&id) {
                Some(entry) => Some(bcs::to_bytes(&entry.members())?),
                None => None,
            },
            StorageKey::Balance(id, address) => {
                match state.multisigs.get(&id).and_then(|e| e.balances.get(&address)) {
                    Some(balance) => Some(bcs::to_bytes(balance)?),
                    None => None,
                }
            }
            StorageKey::PendingCalls(id) => match state.multisigs.get(&id) {
                Some(entry) => {
                    let hashes: Vec<CallHash> = entry.pending.iter().map(|c| c.call_hash).collect();
                    Some(bcs::to_bytes(&hashes)?)
                }
                None => None,
            },
            StorageKey::PendingCall(id, call_hash) => {
                match state.multisigs.get(&id).and_then(|e| e.pending_call(&call_hash)) {
                    Some(call) => Some(bcs::to_bytes(call)?),
                    None => None,
                }
            }
        };
        Ok(bytes)
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<InclusionReport> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }
}

impl Entry {
    fn members(&self) -> Vec<Address> {
        self.balances
            .iter()
            .filter(|(_, balance)| **balance > 0)
            .map(|(address, _)| address.clone())
            .collect()
    }

    fn balance_of(&self, address: &Address) -> u128 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    fn pending_call(&self, call_hash: &CallHash) -> Option<&PendingCallRecord> {
        self.pending.iter().find(|call| &call.call_hash == call_hash)
    }

    fn snapshot(&self, id: MultisigId) -> Multisig {
        let mut multisig = Multisig::new(
            id,
            self.balances
                .iter()
                .filter(|(_, balance)| **balance > 0)
                .map(|(address, balance)| Member::new(address.clone(), *balance))
                .collect(),
            self.record.minimum_support,
            self.record.required_approval,
        );
        multisig.account = self.record.account.clone();
        multisig
    }
}

impl State {
    fn entry(&self, id: MultisigId) -> Result<&Entry, DispatchError> {
        self.multisigs.get(&id).ok_or(DispatchError::MultisigNotFound)
    }

    fn entry_mut(&mut self, id: MultisigId) -> Result<&mut Entry, DispatchError> {
        self.multisigs.get_mut(&id).ok_or(DispatchError::MultisigNotFound)
    }

    fn ensure_member(&self, id: MultisigId, origin: &Address) -> Result<u128, DispatchError> {
        match self.entry(id)?.balance_of(origin) {
            0 => Err(DispatchError::NotAMember),
            weight => Ok(weight),
        }
    }

    fn dispatch(
        &mut self,
        origin: &Address,
        extrinsic: Extrinsic,
        events: &mut Vec<ChainEvent>,
    ) -> Result<(), DispatchError> {
        match extrinsic {
            Extrinsic::CreateMultisig {
                metadata,
                minimum_support,
                required_approval,
                frozen_tokens,
                creator_weight,
            } => {
                if creator_weight == 0 {
                    let reason = "creator weight is zero".to_string();
                    return Err(DispatchError::InvalidParameter(reason));
                }
                let id = self.next_id;
                self.next_id += 1;
                let account = derive_account(id);
                self.multisigs.insert(
                    id,
                    Entry {
                        record: MultisigRecord {
                            account: account.clone(),
                            metadata,
                            minimum_support,
                            required_approval,
                            frozen_tokens,
                        },
                        balances: BTreeMap::from([(origin.clone(), creator_weight)]),
                        pending: Vec::new(),
                    },
                );
                info!(multisig = id, creator = %origin, "multisig created");
                events.push(ChainEvent::MultisigCreated {
                    multisig: id,
                    account,
                    creator: origin.clone(),
                });
                events.push(ChainEvent::MemberAdded {
                    multisig: id,
                    address: origin.clone(),
                    amount: creator_weight,
                    balance: creator_weight,
                });
                Ok(())
            }
            Extrinsic::Propose { multisig, payload } => {
                let weight = self.ensure_member(multisig, origin)?;
                payload
                    .validate()
                    .map_err(|e| DispatchError::InvalidParameter(e.to_string()))?;
                let call_hash = payload
                    .call_hash()
                    .map_err(|e| DispatchError::InvalidParameter(e.to_string()))?;

                let entry = self.entry_mut(multisig)?;
                if entry.pending_call(&call_hash).is_none() {
                    entry.pending.push(PendingCallRecord {
                        call_hash,
                        payload: payload.clone(),
                        proposer: origin.clone(),
                        votes: Vec::new(),
                    });
                    events.push(ChainEvent::VoteStarted {
                        multisig,
                        call_hash,
                        proposer: origin.clone(),
                        payload,
                    });
                }
                self.record_vote(multisig, call_hash, origin, Stance::Approve, weight, events)?;
                self.try_execute(multisig, call_hash, events);
                Ok(())
            }
            Extrinsic::Vote {
                multisig,
                call_hash,
                stance,
            } => {
                let weight = self.ensure_member(multisig, origin)?;
                self.record_vote(multisig, call_hash, origin, stance, weight, events)?;
                self.try_execute(multisig, call_hash, events);
                Ok(())
            }
            Extrinsic::WithdrawVote { multisig, call_hash } => {
                let call = self
                    .entry_mut(multisig)?
                    .pending
                    .iter_mut()
                    .find(|call| call.call_hash == call_hash)
                    .ok_or(DispatchError::CallNotFound)?;
                let before = call.votes.len();
                call.votes.retain(|vote| &vote.voter != origin);
                if call.votes.len() == before {
                    return Err(DispatchError::NotAVoter);
                }
                events.push(ChainEvent::VoteWithdrawn {
                    multisig,
                    call_hash,
                    voter: origin.clone(),
                });
                // dropping a rejection can tip the approval ratio
                self.try_execute(multisig, call_hash, events);
                Ok(())
            }
            Extrinsic::WithdrawProposal { multisig, call_hash } => {
                let entry = self.entry_mut(multisig)?;
                let call = entry.pending_call(&call_hash).ok_or(DispatchError::CallNotFound)?;
                if &call.proposer != origin {
                    return Err(DispatchError::NotTheProposer);
                }
                entry.pending.retain(|call| call.call_hash != call_hash);
                events.push(ChainEvent::ProposalWithdrawn { multisig, call_hash });
                Ok(())
            }
            Extrinsic::TransferTokens {
                multisig,
                to,
                amount,
            } => {
                let entry = self.entry_mut(multisig)?;
                if entry.record.frozen_tokens {
                    return Err(DispatchError::TokensFrozen);
                }
                if amount == 0 {
                    return Err(DispatchError::InvalidParameter("amount is zero".to_string()));
                }
                let available = entry.balance_of(origin);
                if available < amount {
                    return Err(DispatchError::InsufficientBalance);
                }
                entry.balances.insert(origin.clone(), available - amount);
                *entry.balances.entry(to.clone()).or_insert(0) += amount;
                let from_balance = entry.balance_of(origin);
                let to_balance = entry.balance_of(&to);
                entry.balances.retain(|_, balance| *balance > 0);
                events.push(ChainEvent::TokensTransferred {
                    multisig,
                    from: origin.clone(),
                    to,
                    amount,
                    from_balance,
                    to_balance,
                });
                Ok(())
            }
        }
    }

    fn record_vote(
        &mut self,
        multisig: MultisigId,
        call_hash: CallHash,
        voter: &Address,
        stance: Stance,
        weight: u128,
        events: &mut Vec<ChainEvent>,
    ) -> Result<(), DispatchError> {
        let call = self
            .entry_mut(multisig)?
            .pending
            .iter_mut()
            .find(|call| call.call_hash == call_hash)
            .ok_or(DispatchError::CallNotFound)?;
        call.votes.retain(|vote| &vote.voter != voter);
        call.votes.push(VoteRecord {
            voter: voter.clone(),
            stance,
            weight,
        });
        events.push(ChainEvent::VoteRecorded {
            multisig,
            call_hash,
            voter: voter.clone(),
            stance,
            weight,
        });
        Ok(())
    }

    fn try_execute(
        &mut self,
        multisig: MultisigId,
        call_hash: CallHash,
        events: &mut Vec<ChainEvent>,
    ) {
        let Some(entry) = self.multisigs.get_mut(&multisig) else {
            return;
        };
        let Some(record) = entry.pending_call(&call_hash).cloned() else {
            return;
        };

        let mut registry = CallRegistry::new();
        registry.insert_record(record.clone());
        let snapshot = entry.snapshot(multisig);
        let met = registry
            .get_call(&call_hash)
            .map(|call| VoteAggregator::default().is_threshold_met(call, &snapshot))
            .unwrap_or(false);
        if !met {
            return;
        }

        entry.pending.retain(|call| call.call_hash != call_hash);
        let origin = entry.record.account.clone();
        let result = self
            .execute_payload(multisig, &origin, record.payload, events)
            .map_err(|e| e.to_string());
        info!(multisig, %call_hash, ok = result.is_ok(), "call executed");
        events.push(ChainEvent::Executed {
            multisig,
            call_hash,
            result,
        });
    }

    fn execute_payload(
        &mut self,
        multisig: MultisigId,
        origin: &Address,
        payload: CallPayload,
        events: &mut Vec<ChainEvent>,
    ) -> Result<(), DispatchError> {
        match payload {
            CallPayload::AddMember(args) => {
                let entry = self.entry_mut(multisig)?;
                let balance = entry.balances.entry(args.address.clone()).or_insert(0);
                *balance += args.amount;
                let balance = *balance;
                events.push(ChainEvent::MemberAdded {
                    multisig,
                    address: args.address,
                    amount: args.amount,
                    balance,
                });
            }
            CallPayload::RemoveMember(args) => {
                let entry = self.entry_mut(multisig)?;
                let amount = entry
                    .balances
                    .remove(&args.address)
                    .ok_or(DispatchError::NotAMember)?;
                events.push(ChainEvent::MemberRemoved {
                    multisig,
                    address: args.address,
                    amount,
                });
            }
            CallPayload::SetParameters(args) => {
                let record = &mut self.entry_mut(multisig)?.record;
                if let Some(metadata) = &args.metadata {
                    record.metadata = metadata.clone();
                }
                if let Some(support) = args.minimum_support {
                    record.minimum_support = support;
                }
                if let Some(approval) = args.required_approval {
                    record.required_approval = approval;
                }
                if let Some(frozen) = args.frozen_tokens {
                    record.frozen_tokens = frozen;
                }
                events.push(ChainEvent::ParametersUpdated {
                    multisig,
                    metadata: args.metadata,
                    minimum_support: args.minimum_support,
                    required_approval: args.required_approval,
                    frozen_tokens: args.frozen_tokens,
                });
            }
            CallPayload::VoteOnMultisig(args) => {
                self.dispatch(
                    origin,
                    Extrinsic::Vote {
                        multisig: args.multisig,
                        call_hash: args.call_hash,
                        stance: args.stance,
                    },
                    events,
                )?;
            }
            payload @ (CallPayload::SendExternalCall(_)
            | CallPayload::TransferExternalAsset(_)) => {
                self.outbox.push((multisig, payload));
            }
        }
        Ok(())
    }
}
