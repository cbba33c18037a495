use crate::chain::Extrinsic;
use crate::error::{GovernanceError, Result};
use crate::types::Percent;

/// Seed balance minted to the creator of a new multisig.
pub const DEFAULT_CREATOR_WEIGHT: u128 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigBuilder {
    pub name: Option<String>,
    pub minimum_support: u8,
    pub required_approval: u8,
    pub frozen_tokens: bool,
    pub creator_weight: u128,
}

impl Default for MultisigBuilder {
    fn default() -> Self {
        Self {
            name: None,
            minimum_support: 51,
            required_approval: 51,
            frozen_tokens: true,
            creator_weight: DEFAULT_CREATOR_WEIGHT,
        }
    }
}

impl MultisigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn set_minimum_support(mut self, percent: u8) -> Self {
        self.minimum_support = percent;
        self
    }

    pub fn set_required_approval(mut self, percent: u8) -> Self {
        self.required_approval = percent;
        self
    }

    pub fn set_frozen_tokens(mut self, frozen: bool) -> Self {
        self.frozen_tokens = frozen;
        self
    }

    pub fn set_creator_weight(mut self, weight: u128) -> Self {
        self.creator_weight = weight;
        self
    }

    /// Validates the settings into a creation extrinsic.
    pub fn build(self) -> Result<Extrinsic> {
        let Self {
            name,
            minimum_support,
            required_approval,
            frozen_tokens,
            creator_weight,
        } = self;

        if creator_weight == 0 {
            return Err(GovernanceError::InvalidArgument(
                "creator weight must be positive".to_string(),
            ));
        }

        Ok(Extrinsic::CreateMultisig {
            metadata: name.map(String::into_bytes).unwrap_or_default(),
            minimum_support: Percent::new(minimum_support)?,
            required_approval: Percent::new(required_approval)?,
            frozen_tokens,
            creator_weight,
        })
    }
}
