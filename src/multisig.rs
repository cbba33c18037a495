use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::chain::{ChainClient, MultisigRecord, StorageKey};
use crate::error::{GovernanceError, Missing, Result};
use crate::types::{Address, MultisigId, Percent};
use crate::utils;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multisig {
    pub id: MultisigId,
    pub account: Address,
    pub metadata: Vec<u8>,
    pub minimum_support: Percent,
    pub required_approval: Percent,
    pub frozen_tokens: bool,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub address: Address,
    pub weight: u128,
}

impl Member {
    pub fn new(address: Address, weight: u128) -> Self {
        Self { address, weight }
    }
}

/// Account controlled by the multisig itself, used as origin for the calls it executes.
pub fn derive_account(id: MultisigId) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(b"multisig-governance/account");
    hasher.update(id.to_le_bytes());
    Address::new(format!("0x{}", hex::encode(hasher.finalize())))
}

impl Multisig {
    pub fn new(
        id: MultisigId,
        members: Vec<Member>,
        minimum_support: Percent,
        required_approval: Percent,
    ) -> Self {
        Self {
            id,
            account: derive_account(id),
            metadata: Vec::new(),
            minimum_support,
            required_approval,
            frozen_tokens: false,
            members,
        }
    }

    pub async fn from_id<C: ChainClient>(chain: &C, id: MultisigId) -> Result<Self> {
        let mut multisig = Self::new(id, Vec::new(), Percent::ZERO, Percent::ZERO);
        multisig.refresh(chain).await?;
        Ok(multisig)
    }

    pub async fn refresh<C: ChainClient>(&mut self, chain: &C) -> Result<()> {

        // --- Multisig record ---

        let record: MultisigRecord =
            utils::query_decoded(chain, StorageKey::Multisig(self.id), "multisig")
                .await?
                .ok_or(GovernanceError::NotFound(Missing::Multisig(self.id)))?;

        self.account = record.account;
        self.metadata = record.metadata;
        self.minimum_support = record.minimum_support;
        self.required_approval = record.required_approval;
        self.frozen_tokens = record.frozen_tokens;

        // --- Members and their balances ---

        let addresses: Vec<Address> =
            utils::query_decoded(chain, StorageKey::Members(self.id), "member list")
                .await?
                .unwrap_or_default();

        let mut members = Vec::with_capacity(addresses.len());
        for address in addresses {
            let key = StorageKey::Balance(self.id, address.clone());
            let weight = utils::query_decoded(chain, key, "balance")
                .await?
                .unwrap_or(0u128);
            members.push(Member { address, weight });
        }
        self.members = members;

        Ok(())
    }

    pub fn total_weight(&self) -> u128 {
        self.members
            .iter()
            .fold(0u128, |acc, member| acc.saturating_add(member.weight))
    }

    pub fn weight_of(&self, address: &Address) -> Option<u128> {
        self.members
            .iter()
            .find(|member| &member.address == address)
            .map(|member| member.weight)
    }

    pub fn is_member(&self, address: &Address) -> bool {
        self.weight_of(address).is_some()
    }

    pub fn metadata_str(&self) -> String {
        String::from_utf8_lossy(&self.metadata).into_owned()
    }

    /// Sets an absolute balance; zero removes the member.
    pub(crate) fn set_weight(&mut self, address: &Address, weight: u128) {
        match self.members.iter_mut().find(|m| &m.address == address) {
            Some(member) => member.weight = weight,
            None => self.members.push(Member::new(address.clone(), weight)),
        }
        self.members.retain(|m| &m.address != address || m.weight > 0);
    }

    pub(crate) fn remove_member(&mut self, address: &Address) {
        self.members.retain(|m| &m.address != address);
    }
}

impl fmt::Display for Multisig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Multisig {} ({})", self.id, self.account)?;
        writeln!(f, "  metadata:          {}", self.metadata_str())?;
        writeln!(f, "  minimum support:   {}", self.minimum_support)?;
        writeln!(f, "  required approval: {}", self.required_approval)?;
        writeln!(f, "  frozen tokens:     {}", self.frozen_tokens)?;
        write!(
            f,
            "  members:           {} (total weight {})",
            self.members.len(),
            self.total_weight()
        )
    }
}
