use anyhow::Result;
use clap::Subcommand;
use multisig_governance_sdk::chain::{ChainClient, Signer};
use multisig_governance_sdk::types::{CallHash, Stance};
use multisig_governance_sdk::MultisigClient;

use crate::tx_utils;

#[derive(Debug, Subcommand)]
pub enum CallCommands {
    #[command(name = "vote", about = "Vote on a call (approve | reject)")]
    Vote { stance: Stance },
    #[command(name = "withdraw-vote", about = "Remove your vote from a call")]
    WithdrawVote,
    #[command(name = "withdraw", about = "Withdraw a call you proposed")]
    Withdraw,
    #[command(name = "tally", about = "Show current support and approval")]
    Tally,
}

impl CallCommands {
    pub async fn run<C: ChainClient>(
        &self,
        client: &MultisigClient<C>,
        signer: &dyn Signer,
        call_hash: CallHash,
    ) -> Result<()> {
        let confirmation = client.config().confirmation;
        match self {
            CallCommands::Vote { stance } => {
                let action = client.vote(signer, call_hash, *stance).await?;
                tx_utils::track(action, confirmation).await
            }
            CallCommands::WithdrawVote => {
                let action = client.withdraw_vote(signer, call_hash).await?;
                tx_utils::track(action, confirmation).await
            }
            CallCommands::Withdraw => {
                let action = client.withdraw_proposal(signer, call_hash).await?;
                tx_utils::track(action, confirmation).await
            }
            CallCommands::Tally => {
                let tally = client.compute_votes(&call_hash)?;
                let multisig = client.get_details()?;
                println!(
                    "support {} (needs {}), approval {} (needs {}), {}",
                    tally.support,
                    multisig.minimum_support,
                    tally.approval,
                    multisig.required_approval,
                    if tally.met { "passing" } else { "not passing" }
                );
                Ok(())
            }
        }
    }
}
