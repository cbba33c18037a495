use anyhow::Result;
use clap::Subcommand;
use multisig_governance_sdk::chain::{ChainClient, Signer};
use multisig_governance_sdk::engine::PendingAction;
use multisig_governance_sdk::params::{
    AddMemberArgs, RemoveMemberArgs, SendExternalCallArgs, SetParametersArgs,
    TransferExternalAssetArgs, VoteOnMultisigArgs,
};
use multisig_governance_sdk::types::{Address, CallHash, MultisigId, Percent, Stance};
use multisig_governance_sdk::MultisigClient;

use crate::parsers::{parse_percent, HexBytes};
use crate::tx_utils;

#[derive(Debug, Subcommand)]
pub enum ProposeCommands {
    #[command(name = "add-member", about = "Mint voting tokens to a new or existing member")]
    AddMember { address: Address, amount: u128 },
    #[command(name = "remove-member", about = "Burn all voting tokens of a member")]
    RemoveMember { address: Address },
    #[command(name = "send-external-call", about = "Dispatch an opaque call on another chain")]
    SendExternalCall {
        destination: String,
        #[arg(help = "Execution weight bought on the destination")]
        weight: u64,
        #[arg(help = "Encoded call, hex")]
        call_data: HexBytes,
    },
    #[command(name = "transfer-external-asset", about = "Move an asset held on another chain")]
    TransferExternalAsset {
        destination: String,
        asset: String,
        amount: u128,
        to: Address,
    },
    #[command(name = "set-parameters", about = "Update name, thresholds or token freezing")]
    SetParameters {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_parser = parse_percent)]
        minimum_support: Option<Percent>,
        #[arg(long, value_parser = parse_percent)]
        required_approval: Option<Percent>,
        #[arg(long)]
        frozen: Option<bool>,
    },
    #[command(name = "vote-on-multisig", about = "Cast this multisig's vote in another multisig")]
    VoteOnMultisig {
        multisig: MultisigId,
        call_hash: CallHash,
        stance: Stance,
    },
}

impl ProposeCommands {
    pub async fn run<C: ChainClient>(
        &self,
        client: &MultisigClient<C>,
        signer: &dyn Signer,
    ) -> Result<()> {
        let (call_hash, action) = self.submit(client, signer).await?;
        println!("Call hash: {}", call_hash);
        tx_utils::track(action, client.config().confirmation).await
    }

    async fn submit<C: ChainClient>(
        &self,
        client: &MultisigClient<C>,
        signer: &dyn Signer,
    ) -> Result<(CallHash, PendingAction)> {
        let submitted = match self {
            ProposeCommands::AddMember { address, amount } => {
                client
                    .add_member(signer, AddMemberArgs::new(address.clone(), *amount))
                    .await?
            }
            ProposeCommands::RemoveMember { address } => {
                client
                    .remove_member(signer, RemoveMemberArgs::new(address.clone()))
                    .await?
            }
            ProposeCommands::SendExternalCall {
                destination,
                weight,
                call_data,
            } => {
                let args =
                    SendExternalCallArgs::new(destination.clone(), *weight, call_data.0.clone());
                client.send_external_call(signer, args).await?
            }
            ProposeCommands::TransferExternalAsset {
                destination,
                asset,
                amount,
                to,
            } => {
                let args = TransferExternalAssetArgs::new(
                    destination.clone(),
                    asset.clone(),
                    *amount,
                    to.clone(),
                );
                client.transfer_external_asset(signer, args).await?
            }
            ProposeCommands::SetParameters {
                name,
                minimum_support,
                required_approval,
                frozen,
            } => {
                let args = SetParametersArgs::new(
                    name.as_ref().map(|n| n.as_bytes().to_vec()),
                    *minimum_support,
                    *required_approval,
                    *frozen,
                );
                client.set_parameters(signer, args).await?
            }
            ProposeCommands::VoteOnMultisig {
                multisig,
                call_hash,
                stance,
            } => {
                let args = VoteOnMultisigArgs::new(*multisig, *call_hash, *stance);
                client.vote_on_multisig(signer, args).await?
            }
        };
        Ok(submitted)
    }
}
