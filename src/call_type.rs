use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{GovernanceError, Result};
use crate::params::{
    AddMemberArgs, RemoveMemberArgs, SendExternalCallArgs, SetParametersArgs,
    TransferExternalAssetArgs, VoteOnMultisigArgs,
};
use crate::types::CallHash;

/// The action a proposed call performs once approved.
///
/// The engine never interprets these beyond hashing and membership bookkeeping;
/// dispatch is the chain's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallPayload {
    AddMember(AddMemberArgs),
    RemoveMember(RemoveMemberArgs),
    SendExternalCall(SendExternalCallArgs),
    TransferExternalAsset(TransferExternalAssetArgs),
    SetParameters(SetParametersArgs),
    VoteOnMultisig(VoteOnMultisigArgs),
}

impl CallPayload {
    const HASH_DOMAIN: &'static [u8] = b"multisig-governance/call/v1";

    /// Content-derived identifier: identical payloads share a hash and therefore a proposal.
    pub fn call_hash(&self) -> Result<CallHash> {
        let encoded = bcs::to_bytes(self).map_err(|source| GovernanceError::Decode {
            what: "call payload",
            source,
        })?;
        let mut hasher = Sha256::new();
        hasher.update(Self::HASH_DOMAIN);
        hasher.update(&encoded);
        Ok(CallHash(hasher.finalize().into()))
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            CallPayload::AddMember(args) if args.amount == 0 => Err(
                GovernanceError::InvalidArgument("new member amount must be positive".to_string()),
            ),
            CallPayload::TransferExternalAsset(args) if args.amount == 0 => Err(
                GovernanceError::InvalidArgument("transfer amount must be positive".to_string()),
            ),
            CallPayload::SendExternalCall(args) if args.call_data.is_empty() => Err(
                GovernanceError::InvalidArgument("external call data is empty".to_string()),
            ),
            CallPayload::SetParameters(args)
                if args.metadata.is_none()
                    && args.minimum_support.is_none()
                    && args.required_approval.is_none()
                    && args.frozen_tokens.is_none() =>
            {
                Err(GovernanceError::InvalidArgument("no parameter to update".to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CallPayload::AddMember(_) => "add_member",
            CallPayload::RemoveMember(_) => "remove_member",
            CallPayload::SendExternalCall(_) => "send_external_call",
            CallPayload::TransferExternalAsset(_) => "transfer_external_asset",
            CallPayload::SetParameters(_) => "set_parameters",
            CallPayload::VoteOnMultisig(_) => "vote_on_multisig",
        }
    }
}

impl fmt::Display for CallPayload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CallPayload::AddMember(args) => {
                write!(f, "add_member({}, {})", args.address, args.amount)
            }
            CallPayload::RemoveMember(args) => write!(f, "remove_member({})", args.address),
            CallPayload::SendExternalCall(args) => write!(
                f,
                "send_external_call({}, weight {}, 0x{})",
                args.destination,
                args.weight,
                hex::encode(&args.call_data)
            ),
            CallPayload::TransferExternalAsset(args) => write!(
                f,
                "transfer_external_asset({}, {} {} to {})",
                args.destination, args.amount, args.asset, args.to
            ),
            CallPayload::SetParameters(args) => write!(
                f,
                "set_parameters(support {:?}, approval {:?}, frozen {:?})",
                args.minimum_support.map(|p| p.value()),
                args.required_approval.map(|p| p.value()),
                args.frozen_tokens
            ),
            CallPayload::VoteOnMultisig(args) => write!(
                f,
                "vote_on_multisig({}, {}, {})",
                args.multisig, args.call_hash, args.stance
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;

    #[test]
    fn test_identical_payloads_share_hash() {
        let a = CallPayload::AddMember(AddMemberArgs::new(Address::from("bob"), 10));
        let b = CallPayload::AddMember(AddMemberArgs::new(Address::from("bob"), 10));
        assert_eq!(a.call_hash().unwrap(), b.call_hash().unwrap());
    }

    #[test]
    fn test_distinct_payloads_differ() {
        let a = CallPayload::AddMember(AddMemberArgs::new(Address::from("bob"), 10));
        let b = CallPayload::AddMember(AddMemberArgs::new(Address::from("bob"), 11));
        let c = CallPayload::RemoveMember(RemoveMemberArgs::new(Address::from("bob")));
        assert_ne!(a.call_hash().unwrap(), b.call_hash().unwrap());
        assert_ne!(a.call_hash().unwrap(), c.call_hash().unwrap());
    }

    #[test]
    fn test_validate_rejects_zero_amounts() {
        let call = CallPayload::AddMember(AddMemberArgs::new(Address::from("bob"), 0));
        assert!(matches!(call.validate(), Err(GovernanceError::InvalidArgument(_))));
        let call = CallPayload::SetParameters(SetParametersArgs::new(None, None, None, None));
        assert!(call.validate().is_err());
    }
}
