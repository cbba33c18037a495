//! Boundary with the chain client.
//!
//! The engine consumes a [`ChainClient`] that can submit signed extrinsics, read
//! storage and publish inclusion reports. Storage values are bcs-encoded.

pub mod local;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::future::Future;
use tokio::sync::mpsc;

use crate::call_type::CallPayload;
use crate::error::{GovernanceError, Result};
use crate::types::{Address, CallHash, MultisigId, Percent, Stance, TxHash};

pub trait Signer: Send + Sync {
    fn address(&self) -> Address;
    fn sign(&self, payload: &[u8]) -> Vec<u8>;
}

pub trait ChainClient: Send + Sync + 'static {
    fn submit(
        &self,
        extrinsic: SignedExtrinsic,
    ) -> impl Future<Output = anyhow::Result<StatusStream>> + Send;

    fn query(
        &self,
        key: StorageKey,
    ) -> impl Future<Output = anyhow::Result<Option<Vec<u8>>>> + Send;

    /// Inclusion reports for every block, whoever submitted the transactions.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<InclusionReport>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Extrinsic {
    CreateMultisig {
        metadata: Vec<u8>,
        minimum_support: Percent,
        required_approval: Percent,
        frozen_tokens: bool,
        creator_weight: u128,
    },
    Propose {
        multisig: MultisigId,
        payload: CallPayload,
    },
    Vote {
        multisig: MultisigId,
        call_hash: CallHash,
        stance: Stance,
    },
    WithdrawVote {
        multisig: MultisigId,
        call_hash: CallHash,
    },
    WithdrawProposal {
        multisig: MultisigId,
        call_hash: CallHash,
    },
    TransferTokens {
        multisig: MultisigId,
        to: Address,
        amount: u128,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedExtrinsic {
    pub origin: Address,
    pub extrinsic: Extrinsic,
    pub signature: Vec<u8>,
}

impl SignedExtrinsic {
    pub fn new(signer: &dyn Signer, extrinsic: Extrinsic) -> Result<Self> {
        let payload = bcs::to_bytes(&extrinsic).map_err(|source| GovernanceError::Decode {
            what: "extrinsic",
            source,
        })?;
        Ok(Self {
            origin: signer.address(),
            signature: signer.sign(&payload),
            extrinsic,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKey {
    NextMultisigId,
    Multisig(MultisigId),
    Members(MultisigId),
    Balance(MultisigId, Address),
    PendingCalls(MultisigId),
    PendingCall(MultisigId, CallHash),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigRecord {
    pub account: Address,
    pub metadata: Vec<u8>,
    pub minimum_support: Percent,
    pub required_approval: Percent,
    pub frozen_tokens: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCallRecord {
    pub call_hash: CallHash,
    pub payload: CallPayload,
    pub proposer: Address,
    pub votes: Vec<VoteRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub voter: Address,
    pub stance: Stance,
    pub weight: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainEvent {
    ExtrinsicSuccess,
    ExtrinsicFailed {
        error: String,
    },
    MultisigCreated {
        multisig: MultisigId,
        account: Address,
        creator: Address,
    },
    VoteStarted {
        multisig: MultisigId,
        call_hash: CallHash,
        proposer: Address,
        payload: CallPayload,
    },
    VoteRecorded {
        multisig: MultisigId,
        call_hash: CallHash,
        voter: Address,
        stance: Stance,
        weight: u128,
    },
    VoteWithdrawn {
        multisig: MultisigId,
        call_hash: CallHash,
        voter: Address,
    },
    Executed {
        multisig: MultisigId,
        call_hash: CallHash,
        result: std::result::Result<(), String>,
    },
    ProposalWithdrawn {
        multisig: MultisigId,
        call_hash: CallHash,
    },
    CallExpired {
        multisig: MultisigId,
        call_hash: CallHash,
    },
    MemberAdded {
        multisig: MultisigId,
        address: Address,
        amount: u128,
        balance: u128,
    },
    MemberRemoved {
        multisig: MultisigId,
        address: Address,
        amount: u128,
    },
    TokensTransferred {
        multisig: MultisigId,
        from: Address,
        to: Address,
        amount: u128,
        from_balance: u128,
        to_balance: u128,
    },
    ParametersUpdated {
        multisig: MultisigId,
        metadata: Option<Vec<u8>>,
        minimum_support: Option<Percent>,
        required_approval: Option<Percent>,
        frozen_tokens: Option<bool>,
    },
    Other {
        pallet: String,
        name: String,
    },
}

impl ChainEvent {
    pub fn multisig(&self) -> Option<MultisigId> {
        match self {
            ChainEvent::MultisigCreated { multisig, .. }
            | ChainEvent::VoteStarted { multisig, .. }
            | ChainEvent::VoteRecorded { multisig, .. }
            | ChainEvent::VoteWithdrawn { multisig, .. }
            | ChainEvent::Executed { multisig, .. }
            | ChainEvent::ProposalWithdrawn { multisig, .. }
            | ChainEvent::CallExpired { multisig, .. }
            | ChainEvent::MemberAdded { multisig, .. }
            | ChainEvent::MemberRemoved { multisig, .. }
            | ChainEvent::TokensTransferred { multisig, .. }
            | ChainEvent::ParametersUpdated { multisig, .. } => Some(*multisig),
            ChainEvent::ExtrinsicSuccess
            | ChainEvent::ExtrinsicFailed { .. }
            | ChainEvent::Other { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub index: u32,
    pub event: ChainEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionReport {
    pub tx_hash: TxHash,
    pub block: u64,
    pub events: Vec<EventRecord>,
}

impl InclusionReport {
    pub fn new(tx_hash: TxHash, block: u64, events: Vec<ChainEvent>) -> Self {
        Self {
            tx_hash,
            block,
            events: events
                .into_iter()
                .enumerate()
                .map(|(index, event)| EventRecord {
                    index: index as u32,
                    event,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Invalid(String),
    Ready,
    Dropped,
    InBlock(InclusionReport),
    Finalized(InclusionReport),
}

/// Status notifications for one submitted transaction.
#[derive(Debug)]
pub struct StatusStream {
    tx_hash: TxHash,
    rx: mpsc::UnboundedReceiver<TxStatus>,
}

impl StatusStream {
    pub fn new(tx_hash: TxHash, rx: mpsc::UnboundedReceiver<TxStatus>) -> Self {
        Self { tx_hash, rx }
    }

    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    pub async fn next(&mut self) -> Option<TxStatus> {
        self.rx.recv().await
    }
}

pub(crate) fn tx_hash_of(extrinsic: &SignedExtrinsic, nonce: u64) -> TxHash {
    let mut hasher = Sha256::new();
    hasher.update(b"multisig-governance/tx");
    hasher.update(nonce.to_le_bytes());
    // encoding only fails on unsupported serde shapes, none of which are used here
    hasher.update(bcs::to_bytes(extrinsic).unwrap_or_default());
    TxHash(hasher.finalize().into())
}
