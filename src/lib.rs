pub mod call_type;
pub mod calls;
pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod multisig;
pub mod multisig_builder;
pub mod params;
pub mod power;
pub mod types;
pub mod utils;
pub mod votes;

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use crate::call_type::CallPayload;
use crate::calls::ProposedCall;
use crate::chain::{ChainClient, Signer, StorageKey};
use crate::config::EngineConfig;
use crate::engine::{ClosedCall, GovernanceEngine, PendingAction};
use crate::error::{GovernanceError, Result};
use crate::multisig::Multisig;
use crate::multisig_builder::MultisigBuilder;
use crate::params::{
    AddMemberArgs, RemoveMemberArgs, SendExternalCallArgs, SetParametersArgs,
    TransferExternalAssetArgs, VoteOnMultisigArgs,
};
use crate::power::{PowerCalculator, RankEntry};
use crate::types::{Address, CallHash, MultisigId, Power, Stance, TxHash};
use crate::votes::VoteTally;

pub use crate::multisig::derive_account;

/// Generates the proposal entry point of a call type and its pure payload constructor.
macro_rules! define_call_interface {
    (
        $call_name:ident,
        $args_type:ty,
        $variant:ident,
    ) => {
        paste::paste! {
            pub async fn $call_name(
                &self,
                signer: &dyn Signer,
                args: $args_type,
            ) -> Result<(CallHash, PendingAction)> {
                self.engine()?.submit(signer, Self::[<$call_name _call>](args)).await
            }

            pub fn [<$call_name _call>](args: $args_type) -> CallPayload {
                CallPayload::$variant(args)
            }
        }
    };
}

pub struct MultisigClient<C: ChainClient> {
    chain: Arc<C>,
    config: EngineConfig,
    engine: Option<GovernanceEngine<C>>,
}

impl<C: ChainClient> MultisigClient<C> {
    // === Constructors ===

    pub fn new(chain: Arc<C>) -> Self {
        Self::new_with_config(chain, EngineConfig::default())
    }

    pub fn new_with_config(chain: Arc<C>, config: EngineConfig) -> Self {
        Self {
            chain,
            config,
            engine: None,
        }
    }

    // === Multisig ===

    /// Creates a multisig with the signer as sole member and loads it.
    pub async fn create_multisig(
        &mut self,
        signer: &dyn Signer,
        builder: MultisigBuilder,
    ) -> Result<MultisigId> {
        let extrinsic = builder.build()?;
        let inclusion = engine::dispatch(self.chain.as_ref(), signer, extrinsic, None)
            .await?
            .wait(self.config.confirmation)
            .await?;
        let id = inclusion
            .created_multisig()
            .ok_or(GovernanceError::UnknownResult(inclusion.tx_hash))?;
        info!(multisig = id, creator = %signer.address(), "multisig created");

        self.load_multisig(id).await?;
        Ok(id)
    }

    pub async fn load_multisig(&mut self, id: MultisigId) -> Result<()> {
        self.engine = Some(GovernanceEngine::load(self.chain.clone(), id, self.config).await?);
        Ok(())
    }

    pub async fn refresh(&self) -> Result<()> {
        if let Some(engine) = self.engine.as_ref() {
            engine.refresh().await?;
        }
        Ok(())
    }

    pub fn is_created(&self) -> bool {
        self.engine.is_some()
    }

    pub fn get_details(&self) -> Result<Multisig> {
        Ok(self.engine()?.multisig())
    }

    /// Reads the balance straight from chain storage.
    pub async fn get_balance(&self, address: &Address) -> Result<u128> {
        let id = self.engine()?.multisig_id();
        let key = StorageKey::Balance(id, address.clone());
        let balance = utils::query_decoded(self.chain.as_ref(), key, "balance")
            .await?
            .unwrap_or(0);
        Ok(balance)
    }

    pub fn get_power(&self, address: &Address) -> Result<Power> {
        let multisig = self.get_details()?;
        Ok(PowerCalculator::new(&multisig).get_power(address))
    }

    pub fn get_all_balances(&self) -> Result<Vec<RankEntry>> {
        let multisig = self.get_details()?;
        Ok(PowerCalculator::new(&multisig).get_all_balances())
    }

    pub fn create_ranking(&self) -> Result<Vec<RankEntry>> {
        let multisig = self.get_details()?;
        Ok(PowerCalculator::new(&multisig).create_ranking())
    }

    pub async fn transfer_tokens(
        &self,
        signer: &dyn Signer,
        to: Address,
        amount: u128,
    ) -> Result<PendingAction> {
        self.engine()?.transfer_tokens(signer, to, amount).await
    }

    /// Follows every block on a background task so changes made by others are observed.
    pub fn spawn_follower(&self) -> Result<JoinHandle<()>> {
        Ok(self.engine()?.spawn_follower())
    }

    /// Transactions a follower saw included with an unrecognised outcome.
    pub fn unknown_results(&self) -> Result<broadcast::Receiver<TxHash>> {
        Ok(self.engine()?.unknown_results())
    }

    // === Calls ===

    define_call_interface!(add_member, AddMemberArgs, AddMember,);

    define_call_interface!(remove_member, RemoveMemberArgs, RemoveMember,);

    define_call_interface!(send_external_call, SendExternalCallArgs, SendExternalCall,);

    define_call_interface!(
        transfer_external_asset,
        TransferExternalAssetArgs,
        TransferExternalAsset,
    );

    define_call_interface!(set_parameters, SetParametersArgs, SetParameters,);

    define_call_interface!(vote_on_multisig, VoteOnMultisigArgs, VoteOnMultisig,);

    /// Proposes an arbitrary payload.
    pub async fn propose(
        &self,
        signer: &dyn Signer,
        payload: CallPayload,
    ) -> Result<(CallHash, PendingAction)> {
        self.engine()?.submit(signer, payload).await
    }

    pub async fn vote(
        &self,
        signer: &dyn Signer,
        call_hash: CallHash,
        stance: Stance,
    ) -> Result<PendingAction> {
        self.engine()?.vote(signer, call_hash, stance).await
    }

    pub async fn withdraw_vote(
        &self,
        signer: &dyn Signer,
        call_hash: CallHash,
    ) -> Result<PendingAction> {
        self.engine()?.withdraw_vote(signer, call_hash).await
    }

    pub async fn withdraw_proposal(
        &self,
        signer: &dyn Signer,
        call_hash: CallHash,
    ) -> Result<PendingAction> {
        self.engine()?.withdraw_proposal(signer, call_hash).await
    }

    pub fn compute_votes(&self, call_hash: &CallHash) -> Result<VoteTally> {
        self.engine()?.compute_votes(call_hash)
    }

    pub fn get_open_calls(&self) -> Result<Vec<ProposedCall>> {
        Ok(self.engine()?.get_open_calls())
    }

    pub fn get_pending_call(&self, call_hash: &CallHash) -> Result<ProposedCall> {
        self.engine()?.get_pending_call(call_hash)
    }

    pub fn closed_calls(&self) -> Result<Vec<ClosedCall>> {
        Ok(self.engine()?.closed_calls())
    }

    // === Getters ===

    pub fn chain(&self) -> &Arc<C> {
        &self.chain
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn multisig_id(&self) -> Option<MultisigId> {
        self.engine.as_ref().map(|engine| engine.multisig_id())
    }

    pub fn engine(&self) -> Result<&GovernanceEngine<C>> {
        self.engine.as_ref().ok_or(GovernanceError::NotLoaded)
    }

    pub fn derive_account(id: MultisigId) -> Address {
        derive_account(id)
    }
}
