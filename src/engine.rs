//! Event-driven governance state machine.
//!
//! Calls move `Open -> Executed | Withdrawn | Expired` and never leave a terminal
//! state. Local state only advances through [`EngineState::on_chain_event`],
//! fed either by the [`PendingAction`] of a transaction we submitted or by
//! [`GovernanceEngine::follow`]. Events are deduplicated by transaction hash and
//! event index, so the in-block and finalized reports of one transaction apply once.
//! Dedup keys are kept for [`DEDUP_WINDOW_BLOCKS`] blocks and reports older than
//! that window are skipped.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::call_type::CallPayload;
use crate::calls::{CallRegistry, CallStatus, ProposedCall, VoteChange};
use crate::chain::{
    ChainClient, ChainEvent, Extrinsic, InclusionReport, PendingCallRecord, SignedExtrinsic,
    Signer, StatusStream, StorageKey, TxStatus,
};
use crate::config::{Confirmation, EngineConfig, DEFAULT_CLOSED_HISTORY};
use crate::error::{GovernanceError, Missing, Result};
use crate::multisig::Multisig;
use crate::types::{Address, CallHash, MultisigId, Stance, TxHash};
use crate::utils;
use crate::votes::{VoteAggregator, VoteTally};

/// Blocks behind the newest applied report for which event keys are remembered.
pub const DEDUP_WINDOW_BLOCKS: u64 = 256;

const REFRESH_ATTEMPTS: usize = 3;
const UNKNOWN_RESULT_BUFFER: usize = 64;

/// A call that left the open set, with how it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosedCall {
    pub call_hash: CallHash,
    pub status: CallStatus,
    pub payload: Option<CallPayload>,
    pub result: Option<std::result::Result<(), String>>,
}

/// What applying one chain event did to local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    CallOpened(CallHash),
    VoteCounted {
        call_hash: CallHash,
        change: VoteChange,
        threshold_met: bool,
    },
    /// Recorded on the call but excluded from tallies.
    StaleVote {
        call_hash: CallHash,
        voter: Address,
    },
    VoteRemoved {
        call_hash: CallHash,
        voter: Address,
    },
    Closed {
        call_hash: CallHash,
        status: CallStatus,
    },
    MembershipChanged(Address),
    ParametersChanged,
    ExtrinsicFailed(String),
    Ignored,
}

/// Local view of one multisig: member snapshot, open calls and closed history.
#[derive(Debug, Clone)]
pub struct EngineState {
    multisig: Multisig,
    registry: CallRegistry,
    aggregator: VoteAggregator,
    closed: VecDeque<ClosedCall>,
    closed_history: usize,
    applied: BTreeMap<u64, HashSet<(TxHash, u32)>>,
    pruned_through: Option<u64>,
    /// Bumped by every event that touches this multisig.
    generation: u64,
}

impl EngineState {
    pub fn new(multisig: Multisig, registry: CallRegistry, aggregator: VoteAggregator) -> Self {
        Self {
            multisig,
            registry,
            aggregator,
            closed: VecDeque::new(),
            closed_history: DEFAULT_CLOSED_HISTORY,
            applied: BTreeMap::new(),
            pruned_through: None,
            generation: 0,
        }
    }

    pub fn with_closed_history(mut self, closed_history: usize) -> Self {
        self.closed_history = closed_history;
        self
    }

    pub fn multisig(&self) -> &Multisig {
        &self.multisig
    }

    pub fn registry(&self) -> &CallRegistry {
        &self.registry
    }

    pub fn closed_calls(&self) -> &VecDeque<ClosedCall> {
        &self.closed
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn compute_votes(&self, call_hash: &CallHash) -> Result<VoteTally> {
        let call = self.registry.get_call(call_hash)?;
        Ok(self.aggregator.compute_votes(call, &self.multisig))
    }

    /// Applies every event of `report` not applied before.
    ///
    /// Reports carrying no event of this multisig are skipped without being recorded.
    pub fn apply_events(&mut self, report: &InclusionReport) -> Vec<EventOutcome> {
        let id = self.multisig.id;
        if !report.events.iter().any(|record| record.event.multisig() == Some(id)) {
            return Vec::new();
        }
        if self.pruned_through.is_some_and(|block| report.block <= block) {
            debug!(block = report.block, tx = %report.tx_hash, "report behind the dedup window");
            return Vec::new();
        }

        let keys = self.applied.entry(report.block).or_default();
        let fresh: Vec<&ChainEvent> = report
            .events
            .iter()
            .filter(|record| keys.insert((report.tx_hash, record.index)))
            .map(|record| &record.event)
            .collect();
        let outcomes = fresh.into_iter().map(|event| self.on_chain_event(event)).collect();
        self.prune_applied();
        outcomes
    }

    fn prune_applied(&mut self) {
        let Some(latest) = self.applied.keys().next_back().copied() else {
            return;
        };
        while let Some(entry) = self.applied.first_entry() {
            if *entry.key() + DEDUP_WINDOW_BLOCKS >= latest {
                break;
            }
            let (block, _) = entry.remove_entry();
            self.pruned_through = Some(block);
        }
    }

    pub fn on_chain_event(&mut self, event: &ChainEvent) -> EventOutcome {
        if let ChainEvent::ExtrinsicFailed { error } = event {
            debug!(multisig = self.multisig.id, %error, "extrinsic failed");
            return EventOutcome::ExtrinsicFailed(error.clone());
        }
        if event.multisig() != Some(self.multisig.id) {
            return EventOutcome::Ignored;
        }
        self.generation += 1;

        match event {
            ChainEvent::VoteStarted {
                call_hash,
                proposer,
                payload,
                ..
            } => {
                self.registry
                    .open_call(*call_hash, Some(payload.clone()), Some(proposer.clone()));
                debug!(%call_hash, %proposer, call = payload.name(), "vote started");
                EventOutcome::CallOpened(*call_hash)
            }
            ChainEvent::VoteRecorded {
                call_hash,
                voter,
                stance,
                weight,
                ..
            } => {
                let change = self
                    .registry
                    .upsert_vote(*call_hash, voter.clone(), *stance, *weight);
                if !self.multisig.is_member(voter) {
                    warn!(%call_hash, %voter, "vote from non-member recorded but not counted");
                    return EventOutcome::StaleVote {
                        call_hash: *call_hash,
                        voter: voter.clone(),
                    };
                }
                let threshold_met = self
                    .registry
                    .get_call(call_hash)
                    .map(|call| self.aggregator.is_threshold_met(call, &self.multisig))
                    .unwrap_or(false);
                debug!(%call_hash, %voter, ?stance, ?change, threshold_met, "vote recorded");
                EventOutcome::VoteCounted {
                    call_hash: *call_hash,
                    change,
                    threshold_met,
                }
            }
            ChainEvent::VoteWithdrawn { call_hash, voter, .. } => {
                match self.registry.withdraw_vote(call_hash, voter) {
                    Ok(_) => {
                        debug!(%call_hash, %voter, "vote withdrawn");
                        EventOutcome::VoteRemoved {
                            call_hash: *call_hash,
                            voter: voter.clone(),
                        }
                    }
                    Err(e) => {
                        debug!(%call_hash, error = %e, "nothing to withdraw");
                        EventOutcome::Ignored
                    }
                }
            }
            ChainEvent::Executed {
                call_hash, result, ..
            } => self.close(*call_hash, CallStatus::Executed, Some(result.clone())),
            ChainEvent::ProposalWithdrawn { call_hash, .. } => {
                self.close(*call_hash, CallStatus::Withdrawn, None)
            }
            ChainEvent::CallExpired { call_hash, .. } => {
                self.close(*call_hash, CallStatus::Expired, None)
            }
            ChainEvent::MemberAdded {
                address, balance, ..
            } => {
                self.multisig.set_weight(address, *balance);
                debug!(%address, balance, "member balance updated");
                EventOutcome::MembershipChanged(address.clone())
            }
            ChainEvent::MemberRemoved { address, .. } => {
                self.multisig.remove_member(address);
                debug!(%address, "member removed");
                EventOutcome::MembershipChanged(address.clone())
            }
            ChainEvent::TokensTransferred {
                from,
                to,
                from_balance,
                to_balance,
                ..
            } => {
                self.multisig.set_weight(from, *from_balance);
                self.multisig.set_weight(to, *to_balance);
                debug!(%from, %to, "tokens transferred");
                EventOutcome::MembershipChanged(to.clone())
            }
            ChainEvent::ParametersUpdated {
                metadata,
                minimum_support,
                required_approval,
                frozen_tokens,
                ..
            } => {
                if let Some(metadata) = metadata {
                    self.multisig.metadata = metadata.clone();
                }
                if let Some(support) = minimum_support {
                    self.multisig.minimum_support = *support;
                }
                if let Some(approval) = required_approval {
                    self.multisig.required_approval = *approval;
                }
                if let Some(frozen) = frozen_tokens {
                    self.multisig.frozen_tokens = *frozen;
                }
                info!(multisig = self.multisig.id, "parameters updated");
                EventOutcome::ParametersChanged
            }
            ChainEvent::MultisigCreated { .. }
            | ChainEvent::ExtrinsicSuccess
            | ChainEvent::ExtrinsicFailed { .. }
            | ChainEvent::Other { .. } => EventOutcome::Ignored,
        }
    }

    fn close(
        &mut self,
        call_hash: CallHash,
        status: CallStatus,
        result: Option<std::result::Result<(), String>>,
    ) -> EventOutcome {
        let Some(call) = self.registry.remove_call(&call_hash) else {
            debug!(%call_hash, ?status, "call already closed");
            return EventOutcome::Ignored;
        };
        match &result {
            Some(Err(error)) => warn!(%call_hash, %error, "call executed with an error"),
            _ => info!(%call_hash, ?status, "call closed"),
        }
        self.closed.push_back(ClosedCall {
            call_hash,
            status,
            payload: call.payload,
            result,
        });
        while self.closed.len() > self.closed_history {
            self.closed.pop_front();
        }
        EventOutcome::Closed { call_hash, status }
    }
}

/// Classifies the outcome of an included transaction.
///
/// Reports without an extrinsic outcome are accepted when they carry multisig
/// events (e.g. an expiry at block initialisation).
pub fn inclusion_result(report: &InclusionReport) -> Result<()> {
    let mut succeeded = false;
    let mut governance = false;
    for record in &report.events {
        match &record.event {
            ChainEvent::ExtrinsicFailed { error } => {
                return Err(GovernanceError::ExecutionFailed(error.clone()))
            }
            ChainEvent::ExtrinsicSuccess => succeeded = true,
            event => governance |= event.multisig().is_some(),
        }
    }
    if succeeded || governance {
        Ok(())
    } else {
        Err(GovernanceError::UnknownResult(report.tx_hash))
    }
}

/// An included transaction with the local effects of its events.
#[derive(Debug, Clone)]
pub struct Inclusion {
    pub tx_hash: TxHash,
    pub block: u64,
    pub events: Vec<ChainEvent>,
    pub outcomes: Vec<EventOutcome>,
}

impl Inclusion {
    pub fn created_multisig(&self) -> Option<MultisigId> {
        self.events.iter().find_map(|event| match event {
            ChainEvent::MultisigCreated { multisig, .. } => Some(*multisig),
            _ => None,
        })
    }
}

#[derive(Debug)]
pub enum ActionUpdate {
    Ready,
    InBlock(Inclusion),
    Finalized(Inclusion),
    /// `Invalid` or `Dropped`: the transaction never made it into a block.
    Rejected(GovernanceError),
    /// Included but failed, or included with an unrecognised outcome.
    Failed(GovernanceError),
}

/// Observes one submitted transaction. Dropping it stops observation, not the transaction.
#[derive(Debug)]
pub struct PendingAction {
    stream: StatusStream,
    state: Option<Arc<Mutex<EngineState>>>,
    call_hash: Option<CallHash>,
    done: bool,
}

impl PendingAction {
    fn new(stream: StatusStream, state: Option<Arc<Mutex<EngineState>>>) -> Self {
        Self {
            stream,
            state,
            call_hash: None,
            done: false,
        }
    }

    fn for_call(mut self, call_hash: CallHash) -> Self {
        self.call_hash = Some(call_hash);
        self
    }

    pub fn tx_hash(&self) -> TxHash {
        self.stream.tx_hash()
    }

    pub fn call_hash(&self) -> Option<CallHash> {
        self.call_hash
    }

    pub async fn next(&mut self) -> Option<ActionUpdate> {
        if self.done {
            return None;
        }
        let Some(status) = self.stream.next().await else {
            self.done = true;
            return None;
        };

        let update = match status {
            TxStatus::Ready => ActionUpdate::Ready,
            TxStatus::Invalid(reason) => {
                self.done = true;
                let reason = format!("invalid: {}", reason);
                ActionUpdate::Rejected(GovernanceError::ChainRejected(reason))
            }
            TxStatus::Dropped => {
                self.done = true;
                let reason = "dropped from the pool".to_string();
                ActionUpdate::Rejected(GovernanceError::ChainRejected(reason))
            }
            TxStatus::InBlock(report) => self.include(report, false),
            TxStatus::Finalized(report) => {
                self.done = true;
                self.include(report, true)
            }
        };
        Some(update)
    }

    /// Drives the action until the requested confirmation level.
    pub async fn wait(mut self, confirmation: Confirmation) -> Result<Inclusion> {
        while let Some(update) = self.next().await {
            match update {
                ActionUpdate::Ready => {}
                ActionUpdate::InBlock(inclusion) if confirmation == Confirmation::InBlock => {
                    return Ok(inclusion)
                }
                ActionUpdate::InBlock(_) => {}
                ActionUpdate::Finalized(inclusion) => return Ok(inclusion),
                ActionUpdate::Rejected(e) | ActionUpdate::Failed(e) => return Err(e),
            }
        }
        Err(GovernanceError::ChainRejected(format!(
            "status stream of {} closed before inclusion",
            self.tx_hash()
        )))
    }

    fn include(&mut self, report: InclusionReport, finalized: bool) -> ActionUpdate {
        let outcomes = match &self.state {
            Some(state) => state.lock().apply_events(&report),
            None => Vec::new(),
        };
        if let Err(e) = inclusion_result(&report) {
            self.done = true;
            return ActionUpdate::Failed(e);
        }

        let inclusion = Inclusion {
            tx_hash: report.tx_hash,
            block: report.block,
            events: report.events.into_iter().map(|record| record.event).collect(),
            outcomes,
        };
        if finalized {
            ActionUpdate::Finalized(inclusion)
        } else {
            ActionUpdate::InBlock(inclusion)
        }
    }
}

/// Signs and submits an extrinsic, optionally applying its events to `state`.
pub(crate) async fn dispatch<C: ChainClient>(
    chain: &C,
    signer: &dyn Signer,
    extrinsic: Extrinsic,
    state: Option<Arc<Mutex<EngineState>>>,
) -> Result<PendingAction> {
    let signed = SignedExtrinsic::new(signer, extrinsic)?;
    let stream = chain.submit(signed).await?;
    debug!(tx = %stream.tx_hash(), origin = %signer.address(), "extrinsic submitted");
    Ok(PendingAction::new(stream, state))
}

pub struct GovernanceEngine<C: ChainClient> {
    chain: Arc<C>,
    config: EngineConfig,
    state: Arc<Mutex<EngineState>>,
    unknown_results: broadcast::Sender<TxHash>,
}

impl<C: ChainClient> Clone for GovernanceEngine<C> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            config: self.config,
            state: self.state.clone(),
            unknown_results: self.unknown_results.clone(),
        }
    }
}

impl<C: ChainClient> GovernanceEngine<C> {
    pub async fn load(chain: Arc<C>, id: MultisigId, config: EngineConfig) -> Result<Self> {
        let multisig = Multisig::from_id(chain.as_ref(), id).await?;
        let registry = CallRegistry::fetch(chain.as_ref(), id).await?;
        let aggregator = VoteAggregator::new(config.weight_policy);
        info!(
            multisig = id,
            members = multisig.members.len(),
            open = registry.len(),
            "engine loaded"
        );
        let state = EngineState::new(multisig, registry, aggregator)
            .with_closed_history(config.closed_history);
        let (unknown_results, _) = broadcast::channel(UNKNOWN_RESULT_BUFFER);
        Ok(Self {
            chain,
            config,
            state: Arc::new(Mutex::new(state)),
            unknown_results,
        })
    }

    /// Rebuilds the snapshot and open calls from chain storage.
    ///
    /// Storage is read again when events were applied while it was being read,
    /// so an event confirmed during the rebuild is never overwritten.
    pub async fn refresh(&self) -> Result<()> {
        let id = self.multisig_id();
        for attempt in 1..=REFRESH_ATTEMPTS {
            let generation = self.state.lock().generation;
            let multisig = Multisig::from_id(self.chain.as_ref(), id).await?;
            let registry = CallRegistry::fetch(self.chain.as_ref(), id).await?;
            {
                let mut state = self.state.lock();
                if state.generation == generation {
                    state.multisig = multisig;
                    state.registry = registry;
                    debug!(multisig = id, attempt, "refreshed from storage");
                    return Ok(());
                }
            }
            debug!(multisig = id, attempt, "events applied during refresh, reading again");
        }
        warn!(multisig = id, "refresh gave up, keeping the event-driven state");
        Err(GovernanceError::RefreshContended(id))
    }

    pub fn chain(&self) -> &Arc<C> {
        &self.chain
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn multisig_id(&self) -> MultisigId {
        self.state.lock().multisig.id
    }

    pub fn multisig(&self) -> Multisig {
        self.state.lock().multisig.clone()
    }

    pub fn get_open_calls(&self) -> Vec<ProposedCall> {
        self.state.lock().registry.get_open_calls()
    }

    pub fn get_pending_call(&self, call_hash: &CallHash) -> Result<ProposedCall> {
        self.state.lock().registry.get_call(call_hash).cloned()
    }

    pub fn closed_calls(&self) -> Vec<ClosedCall> {
        self.state.lock().closed.iter().cloned().collect()
    }

    pub fn compute_votes(&self, call_hash: &CallHash) -> Result<VoteTally> {
        self.state.lock().compute_votes(call_hash)
    }

    /// Transactions whose followed report had an unrecognised outcome.
    pub fn unknown_results(&self) -> broadcast::Receiver<TxHash> {
        self.unknown_results.subscribe()
    }

    // === Actions ===

    pub async fn submit(
        &self,
        signer: &dyn Signer,
        payload: CallPayload,
    ) -> Result<(CallHash, PendingAction)> {
        payload.validate()?;
        let call_hash = payload.call_hash()?;
        let caller = signer.address();
        let id = {
            let state = self.state.lock();
            ensure_member(&state.multisig, &caller, "propose")?;
            if let CallPayload::RemoveMember(args) = &payload {
                if !state.multisig.is_member(&args.address) {
                    return Err(GovernanceError::NotFound(Missing::Member(args.address.clone())));
                }
            }
            state.multisig.id
        };

        info!(
            multisig = id,
            %call_hash,
            call = payload.name(),
            proposer = %caller,
            "submitting call"
        );
        let action = self.dispatch(signer, Extrinsic::Propose { multisig: id, payload }).await?;
        Ok((call_hash, action.for_call(call_hash)))
    }

    pub async fn vote(
        &self,
        signer: &dyn Signer,
        call_hash: CallHash,
        stance: Stance,
    ) -> Result<PendingAction> {
        let caller = signer.address();
        let id = {
            let state = self.state.lock();
            ensure_member(&state.multisig, &caller, "vote")?;
            state.multisig.id
        };
        self.ensure_call(id, call_hash).await?;

        debug!(multisig = id, %call_hash, voter = %caller, ?stance, "submitting vote");
        let action = self
            .dispatch(signer, Extrinsic::Vote { multisig: id, call_hash, stance })
            .await?;
        Ok(action.for_call(call_hash))
    }

    pub async fn withdraw_vote(
        &self,
        signer: &dyn Signer,
        call_hash: CallHash,
    ) -> Result<PendingAction> {
        let caller = signer.address();
        let id = self.multisig_id();
        self.ensure_call(id, call_hash).await?;
        {
            let state = self.state.lock();
            let call = state.registry.get_call(&call_hash)?;
            if call.stance_of(&caller).is_none() {
                return Err(GovernanceError::NotAVoter {
                    call_hash,
                    voter: caller,
                });
            }
        }

        let action = self
            .dispatch(signer, Extrinsic::WithdrawVote { multisig: id, call_hash })
            .await?;
        Ok(action.for_call(call_hash))
    }

    pub async fn withdraw_proposal(
        &self,
        signer: &dyn Signer,
        call_hash: CallHash,
    ) -> Result<PendingAction> {
        let caller = signer.address();
        let id = self.multisig_id();
        self.ensure_call(id, call_hash).await?;
        {
            let state = self.state.lock();
            let call = state.registry.get_call(&call_hash)?;
            if call.proposer.as_ref() != Some(&caller) {
                return Err(GovernanceError::Unauthorized {
                    address: caller,
                    multisig: id,
                    action: "withdraw the proposal",
                });
            }
        }

        let action = self
            .dispatch(signer, Extrinsic::WithdrawProposal { multisig: id, call_hash })
            .await?;
        Ok(action.for_call(call_hash))
    }

    pub async fn transfer_tokens(
        &self,
        signer: &dyn Signer,
        to: Address,
        amount: u128,
    ) -> Result<PendingAction> {
        if amount == 0 {
            return Err(GovernanceError::InvalidArgument("amount must be positive".to_string()));
        }
        let caller = signer.address();
        let id = {
            let state = self.state.lock();
            let multisig = &state.multisig;
            if multisig.frozen_tokens {
                return Err(GovernanceError::InvalidArgument(format!(
                    "tokens of multisig {} are frozen",
                    multisig.id
                )));
            }
            let balance = ensure_member(multisig, &caller, "transfer tokens")?;
            if balance < amount {
                return Err(GovernanceError::InvalidArgument(format!(
                    "balance {} is lower than {}",
                    balance, amount
                )));
            }
            multisig.id
        };

        self.dispatch(signer, Extrinsic::TransferTokens { multisig: id, to, amount })
            .await
    }

    // === Events ===

    pub fn on_chain_event(&self, event: &ChainEvent) -> EventOutcome {
        self.state.lock().on_chain_event(event)
    }

    /// Applies a report once, then classifies its outcome.
    pub fn apply_report(&self, report: &InclusionReport) -> Result<Vec<EventOutcome>> {
        let outcomes = self.state.lock().apply_events(report);
        inclusion_result(report)?;
        Ok(outcomes)
    }

    /// Consumes inclusion reports until the sender side closes.
    ///
    /// Unrecognised outcomes are published to [`Self::unknown_results`] subscribers.
    pub async fn follow(&self, mut reports: mpsc::UnboundedReceiver<InclusionReport>) {
        while let Some(report) = reports.recv().await {
            match self.apply_report(&report) {
                Ok(outcomes) => {
                    debug!(block = report.block, applied = outcomes.len(), "report applied")
                }
                Err(GovernanceError::UnknownResult(tx)) => {
                    warn!(block = report.block, %tx, "unrecognised inclusion result");
                    // no subscriber is not an error
                    let _ = self.unknown_results.send(tx);
                }
                Err(e) => debug!(block = report.block, error = %e, "transaction failed"),
            }
        }
        debug!(multisig = self.multisig_id(), "report stream closed");
    }

    /// Subscribes to the chain and follows it on a background task.
    pub fn spawn_follower(&self) -> JoinHandle<()> {
        let engine = self.clone();
        let reports = self.chain.subscribe();
        tokio::spawn(async move { engine.follow(reports).await })
    }

    // === Helpers ===

    async fn dispatch(&self, signer: &dyn Signer, extrinsic: Extrinsic) -> Result<PendingAction> {
        dispatch(self.chain.as_ref(), signer, extrinsic, Some(self.state.clone())).await
    }

    /// Reads `call_hash` from chain storage when it has not been observed yet.
    async fn ensure_call(&self, id: MultisigId, call_hash: CallHash) -> Result<()> {
        let known = self.state.lock().registry.contains(&call_hash);
        if known {
            return Ok(());
        }
        let key = StorageKey::PendingCall(id, call_hash);
        let record: PendingCallRecord =
            utils::query_decoded(self.chain.as_ref(), key, "pending call")
                .await?
                .ok_or_else(|| GovernanceError::call_not_found(call_hash))?;
        self.state.lock().registry.insert_record(record);
        Ok(())
    }
}

fn ensure_member(multisig: &Multisig, address: &Address, action: &'static str) -> Result<u128> {
    multisig
        .weight_of(address)
        .ok_or_else(|| GovernanceError::Unauthorized {
            address: address.clone(),
            multisig: multisig.id,
            action,
        })
}
