use serde::Serialize;

use crate::multisig::Multisig;
use crate::types::{Address, Power};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankEntry {
    pub address: Address,
    pub amount: u128,
}

/// Derives power and rankings from a multisig snapshot. Nothing is cached:
/// every call reads the snapshot it is given.
#[derive(Debug, Clone, Copy)]
pub struct PowerCalculator<'a> {
    multisig: &'a Multisig,
}

impl<'a> PowerCalculator<'a> {
    pub fn new(multisig: &'a Multisig) -> Self {
        Self { multisig }
    }

    pub fn total_weight(&self) -> u128 {
        self.multisig.total_weight()
    }

    /// Zero for non-members and for a group without weight.
    pub fn get_power(&self, address: &Address) -> Power {
        let weight = self.multisig.weight_of(address).unwrap_or(0);
        Power::of(weight, self.total_weight())
    }

    /// Heaviest first, equal weights by address.
    pub fn create_ranking(&self) -> Vec<RankEntry> {
        let mut ranking: Vec<RankEntry> = self
            .multisig
            .members
            .iter()
            .map(|member| RankEntry {
                address: member.address.clone(),
                amount: member.weight,
            })
            .collect();
        ranking.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.address.cmp(&b.address)));
        ranking
    }

    pub fn get_all_balances(&self) -> Vec<RankEntry> {
        let mut balances: Vec<RankEntry> = self
            .multisig
            .members
            .iter()
            .map(|member| RankEntry {
                address: member.address.clone(),
                amount: member.weight,
            })
            .collect();
        balances.sort_by(|a, b| a.address.cmp(&b.address));
        balances
    }
}
