//! Governance error types

use thiserror::Error;

use crate::types::{Address, CallHash, MultisigId, TxHash};

/// What a lookup failed to find
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    Call(CallHash),
    Member(Address),
    Multisig(MultisigId),
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Missing::Call(hash) => write!(f, "call {}", hash),
            Missing::Member(address) => write!(f, "member {}", address),
            Missing::Multisig(id) => write!(f, "multisig {}", id),
        }
    }
}

#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("Not found: {0}")]
    NotFound(Missing),

    #[error("{voter} has no stance on call {call_hash}")]
    NotAVoter { call_hash: CallHash, voter: Address },

    #[error("Unauthorized: {address} is not allowed to {action} on multisig {multisig}")]
    Unauthorized {
        address: Address,
        multisig: MultisigId,
        action: &'static str,
    },

    #[error("Transaction rejected by the chain: {0}")]
    ChainRejected(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Unrecognised inclusion result for transaction {0}")]
    UnknownResult(TxHash),

    #[error("Multisig not loaded")]
    NotLoaded,

    #[error("Multisig {0} kept changing while it was being refreshed")]
    RefreshContended(MultisigId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Chain client error: {0}")]
    Chain(#[from] anyhow::Error),

    #[error("Failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: bcs::Error,
    },
}

impl GovernanceError {
    pub fn call_not_found(call_hash: CallHash) -> Self {
        GovernanceError::NotFound(Missing::Call(call_hash))
    }
}

pub type Result<T> = std::result::Result<T, GovernanceError>;
