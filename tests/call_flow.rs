mod utils;
use utils::{eventually, finalize, setup, signer};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};

use multisig_governance_sdk::calls::CallStatus;
use multisig_governance_sdk::chain::local::{Fault, LocalChain};
use multisig_governance_sdk::chain::{
    ChainClient, InclusionReport, SignedExtrinsic, StatusStream, StorageKey,
};
use multisig_governance_sdk::config::Confirmation;
use multisig_governance_sdk::engine::{ActionUpdate, EventOutcome};
use multisig_governance_sdk::error::GovernanceError;
use multisig_governance_sdk::params::{AddMemberArgs, RemoveMemberArgs, SetParametersArgs};
use multisig_governance_sdk::types::{Address, CallHash, Stance};
use multisig_governance_sdk::MultisigClient;

const COUNCIL: &[(&str, u128)] = &[("alice", 60), ("bob", 30), ("carol", 10)];

fn dave(amount: u128) -> AddMemberArgs {
    AddMemberArgs::new("dave".into(), amount)
}

/// Dev chain that can hold one read of the pending-call index until released.
struct GatedChain {
    inner: Arc<LocalChain>,
    armed: AtomicBool,
    paused: Notify,
    resume: Notify,
}

impl GatedChain {
    fn new(inner: Arc<LocalChain>) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(false),
            paused: Notify::new(),
            resume: Notify::new(),
        }
    }
}

impl ChainClient for GatedChain {
    async fn submit(&self, extrinsic: SignedExtrinsic) -> anyhow::Result<StatusStream> {
        self.inner.submit(extrinsic).await
    }

    async fn query(&self, key: StorageKey) -> anyhow::Result<Option<Vec<u8>>> {
        let hold = matches!(key, StorageKey::PendingCalls(_))
            && self.armed.swap(false, Ordering::SeqCst);
        let value = self.inner.query(key).await?;
        if hold {
            self.paused.notify_one();
            self.resume.notified().await;
        }
        Ok(value)
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<InclusionReport> {
        self.inner.subscribe()
    }
}

#[tokio::test]
async fn test_majority_holder_executes_alone() {
    let (_chain, client) = setup(COUNCIL, 51, 51).await;
    assert_eq!(client.get_details().unwrap().total_weight(), 100);

    let (call_hash, action) = client.add_member(&signer("alice"), dave(5)).await.unwrap();
    let inclusion = action.wait(Confirmation::InBlock).await.unwrap();
    assert!(inclusion.outcomes.contains(&EventOutcome::Closed {
        call_hash,
        status: CallStatus::Executed
    }));

    assert!(client.get_open_calls().unwrap().is_empty());
    assert_eq!(client.get_details().unwrap().weight_of(&"dave".into()), Some(5));
    assert_eq!(client.get_balance(&"dave".into()).await.unwrap(), 5);
    let closed = client.closed_calls().unwrap();
    assert_eq!(closed.last().unwrap().result, Some(Ok(())));
}

#[tokio::test]
async fn test_both_thresholds_gate_execution() {
    let (_chain, client) = setup(COUNCIL, 51, 51).await;

    let (call_hash, action) = client.add_member(&signer("bob"), dave(5)).await.unwrap();
    finalize(action).await;
    finalize(client.vote(&signer("carol"), call_hash, Stance::Approve).await.unwrap()).await;

    let tally = client.compute_votes(&call_hash).unwrap();
    assert_eq!(tally.support.value(), 40);
    assert_eq!(tally.approval.value(), 100);
    assert!(!tally.met);

    finalize(client.vote(&signer("alice"), call_hash, Stance::Reject).await.unwrap()).await;
    let tally = client.compute_votes(&call_hash).unwrap();
    assert_eq!(tally.support.value(), 40);
    assert_eq!(tally.approval.value(), 40);
    assert_eq!(client.get_open_calls().unwrap().len(), 1);

    // changing a stance replaces the earlier vote
    finalize(client.vote(&signer("alice"), call_hash, Stance::Approve).await.unwrap()).await;
    assert!(matches!(
        client.get_pending_call(&call_hash),
        Err(GovernanceError::NotFound(_))
    ));
    assert!(client.get_details().unwrap().is_member(&"dave".into()));
}

#[tokio::test]
async fn test_finalized_report_does_not_reapply() {
    let (_chain, client) = setup(COUNCIL, 51, 51).await;

    let (_, mut action) = client.add_member(&signer("alice"), dave(5)).await.unwrap();
    assert!(matches!(action.next().await, Some(ActionUpdate::Ready)));
    let in_block = match action.next().await {
        Some(ActionUpdate::InBlock(inclusion)) => inclusion,
        other => panic!("unexpected update {:?}", other),
    };
    assert!(!in_block.outcomes.is_empty());

    let finalized = match action.next().await {
        Some(ActionUpdate::Finalized(inclusion)) => inclusion,
        other => panic!("unexpected update {:?}", other),
    };
    assert!(finalized.outcomes.is_empty());
    assert!(action.next().await.is_none());

    assert_eq!(client.closed_calls().unwrap().len(), 4);
    assert_eq!(client.get_details().unwrap().total_weight(), 105);
}

#[tokio::test]
async fn test_withdraw_vote_recomputes_approval() {
    let (_chain, client) = setup(COUNCIL, 51, 51).await;

    let (call_hash, action) = client.add_member(&signer("bob"), dave(5)).await.unwrap();
    finalize(action).await;
    finalize(client.vote(&signer("carol"), call_hash, Stance::Reject).await.unwrap()).await;
    assert_eq!(client.compute_votes(&call_hash).unwrap().approval.value(), 75);

    assert!(matches!(
        client.withdraw_vote(&signer("alice"), call_hash).await,
        Err(GovernanceError::NotAVoter { .. })
    ));

    finalize(client.withdraw_vote(&signer("carol"), call_hash).await.unwrap()).await;
    let call = client.get_pending_call(&call_hash).unwrap();
    assert_eq!(call.stance_of(&"carol".into()), None);
    assert_eq!(client.compute_votes(&call_hash).unwrap().approval.value(), 100);
}

#[tokio::test]
async fn test_removed_member_votes_stop_counting() {
    let (_chain, client) = setup(COUNCIL, 51, 51).await;

    let (pending, action) = client.add_member(&signer("bob"), dave(5)).await.unwrap();
    finalize(action).await;
    assert_eq!(client.compute_votes(&pending).unwrap().support.value(), 30);

    let (_, action) = client
        .remove_member(&signer("alice"), RemoveMemberArgs::new("bob".into()))
        .await
        .unwrap();
    finalize(action).await;

    let details = client.get_details().unwrap();
    assert!(!details.is_member(&"bob".into()));
    assert_eq!(details.total_weight(), 70);
    assert_eq!(client.compute_votes(&pending).unwrap().support.value(), 0);
    // the vote is kept for audit
    assert!(client.get_pending_call(&pending).unwrap().stance_of(&"bob".into()).is_some());
}

#[tokio::test]
async fn test_membership_and_withdrawal_checks() {
    let (_chain, client) = setup(COUNCIL, 51, 51).await;

    assert!(matches!(
        client.add_member(&signer("mallory"), dave(5)).await,
        Err(GovernanceError::Unauthorized { .. })
    ));
    assert!(matches!(
        client.vote(&signer("carol"), CallHash([9; 32]), Stance::Approve).await,
        Err(GovernanceError::NotFound(_))
    ));
    assert!(matches!(
        client.remove_member(&signer("alice"), RemoveMemberArgs::new("nobody".into())).await,
        Err(GovernanceError::NotFound(_))
    ));

    let (call_hash, action) = client.add_member(&signer("bob"), dave(5)).await.unwrap();
    finalize(action).await;
    assert!(matches!(
        client.withdraw_proposal(&signer("carol"), call_hash).await,
        Err(GovernanceError::Unauthorized { .. })
    ));

    finalize(client.withdraw_proposal(&signer("bob"), call_hash).await.unwrap()).await;
    let closed = client.closed_calls().unwrap();
    assert_eq!(closed.last().unwrap().status, CallStatus::Withdrawn);

    // a withdrawn payload can be proposed again
    let (again, action) = client.add_member(&signer("bob"), dave(5)).await.unwrap();
    finalize(action).await;
    assert_eq!(again, call_hash);
    assert_eq!(client.get_open_calls().unwrap().len(), 1);
}

#[tokio::test]
async fn test_follower_observes_other_clients() {
    let (chain, client) = setup(COUNCIL, 51, 51).await;
    let follower = client.spawn_follower().unwrap();

    let mut other = MultisigClient::new(chain.clone());
    other.load_multisig(client.multisig_id().unwrap()).await.unwrap();

    let (call_hash, action) = other.add_member(&signer("bob"), dave(5)).await.unwrap();
    finalize(action).await;
    eventually(|| client.get_pending_call(&call_hash).is_ok()).await;

    assert!(chain.expire_call(client.multisig_id().unwrap(), call_hash));
    eventually(|| {
        client
            .closed_calls()
            .unwrap()
            .iter()
            .any(|c| c.call_hash == call_hash && c.status == CallStatus::Expired)
    })
    .await;
    assert!(client.get_open_calls().unwrap().is_empty());

    follower.abort();
}

#[tokio::test]
async fn test_vote_reads_unseen_call_from_storage() {
    let (chain, client) = setup(COUNCIL, 51, 51).await;

    let mut other = MultisigClient::new(chain.clone());
    other.load_multisig(client.multisig_id().unwrap()).await.unwrap();
    let (call_hash, action) = other.add_member(&signer("bob"), dave(5)).await.unwrap();
    finalize(action).await;

    // `client` did not follow the chain but can still vote
    finalize(client.vote(&signer("alice"), call_hash, Stance::Approve).await.unwrap()).await;
    assert!(client.get_details().unwrap().is_member(&"dave".into()));

    // `other` is now stale: its withdrawal fails on chain
    let result = other
        .withdraw_vote(&signer("bob"), call_hash)
        .await
        .unwrap()
        .wait(Confirmation::Finalized)
        .await;
    assert!(matches!(result, Err(GovernanceError::ExecutionFailed(e)) if e == "CallNotFound"));

    other.refresh().await.unwrap();
    assert!(other.get_open_calls().unwrap().is_empty());
    assert!(other.get_details().unwrap().is_member(&"dave".into()));
}

#[tokio::test]
async fn test_withdrawals_read_unseen_call_from_storage() {
    let (chain, client) = setup(COUNCIL, 51, 51).await;

    let mut other = MultisigClient::new(chain.clone());
    other.load_multisig(client.multisig_id().unwrap()).await.unwrap();
    let (call_hash, action) = other.add_member(&signer("bob"), dave(5)).await.unwrap();
    finalize(action).await;
    assert!(client.get_pending_call(&call_hash).is_err());

    finalize(client.withdraw_vote(&signer("bob"), call_hash).await.unwrap()).await;
    let call = client.get_pending_call(&call_hash).unwrap();
    assert_eq!(call.stance_of(&"bob".into()), None);

    let (withdrawn, action) = other.add_member(&signer("bob"), dave(7)).await.unwrap();
    finalize(action).await;
    assert!(matches!(
        client.withdraw_proposal(&signer("carol"), withdrawn).await,
        Err(GovernanceError::Unauthorized { .. })
    ));
    finalize(client.withdraw_proposal(&signer("bob"), withdrawn).await.unwrap()).await;
    let closed = client.closed_calls().unwrap();
    assert_eq!(closed.last().unwrap().call_hash, withdrawn);
    assert_eq!(closed.last().unwrap().status, CallStatus::Withdrawn);
}

#[tokio::test]
async fn test_refresh_keeps_events_confirmed_meanwhile() {
    let (chain, client) = setup(COUNCIL, 51, 51).await;
    let gated = Arc::new(GatedChain::new(chain.clone()));
    let mut gated_client = MultisigClient::new(gated.clone());
    gated_client.load_multisig(client.multisig_id().unwrap()).await.unwrap();

    gated.armed.store(true, Ordering::SeqCst);
    let engine = gated_client.engine().unwrap().clone();
    let refresh = tokio::spawn(async move { engine.refresh().await });
    gated.paused.notified().await;

    // the refresh holds an index read taken before this proposal
    let (call_hash, action) = gated_client.add_member(&signer("bob"), dave(5)).await.unwrap();
    finalize(action).await;
    assert!(gated_client.get_pending_call(&call_hash).is_ok());

    gated.resume.notify_one();
    refresh.await.unwrap().unwrap();

    let call = gated_client.get_pending_call(&call_hash).unwrap();
    assert!(call.stance_of(&"bob".into()).is_some());
    assert_eq!(gated_client.compute_votes(&call_hash).unwrap().support.value(), 30);
}

#[tokio::test]
async fn test_follower_surfaces_unknown_results() {
    let (chain, client) = setup(COUNCIL, 51, 51).await;
    let mut unknown = client.unknown_results().unwrap();
    let follower = client.spawn_follower().unwrap();

    chain.inject_fault(Fault::Unrecognised);
    let (_, action) = client.add_member(&signer("bob"), dave(5)).await.unwrap();
    let tx_hash = action.tx_hash();
    drop(action);

    let surfaced = tokio::time::timeout(Duration::from_secs(1), unknown.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(surfaced, tx_hash);

    follower.abort();
}

#[tokio::test]
async fn test_chain_rejections_surface() {
    let (chain, client) = setup(COUNCIL, 51, 51).await;

    chain.inject_fault(Fault::Invalid("stale nonce".to_string()));
    let (_, action) = client.add_member(&signer("bob"), dave(5)).await.unwrap();
    assert!(matches!(
        action.wait(Confirmation::InBlock).await,
        Err(GovernanceError::ChainRejected(_))
    ));

    chain.inject_fault(Fault::Dropped);
    let (_, action) = client.add_member(&signer("bob"), dave(5)).await.unwrap();
    assert!(matches!(
        action.wait(Confirmation::InBlock).await,
        Err(GovernanceError::ChainRejected(_))
    ));

    chain.inject_fault(Fault::Unrecognised);
    let (_, action) = client.add_member(&signer("bob"), dave(5)).await.unwrap();
    let tx_hash = action.tx_hash();
    assert!(matches!(
        action.wait(Confirmation::InBlock).await,
        Err(GovernanceError::UnknownResult(tx)) if tx == tx_hash
    ));

    // nothing was applied locally
    assert!(client.get_open_calls().unwrap().is_empty());
}

#[tokio::test]
async fn test_frozen_tokens_block_transfers() {
    let (_chain, client) = setup(COUNCIL, 51, 51).await;
    let to = Address::from("dave");

    assert!(matches!(
        client.transfer_tokens(&signer("carol"), to.clone(), 5).await,
        Err(GovernanceError::InvalidArgument(_))
    ));

    let unfreeze = SetParametersArgs::new(None, None, None, Some(false));
    let (_, action) = client.set_parameters(&signer("alice"), unfreeze).await.unwrap();
    finalize(action).await;
    assert!(!client.get_details().unwrap().frozen_tokens);

    assert!(matches!(
        client.transfer_tokens(&signer("carol"), to.clone(), 50).await,
        Err(GovernanceError::InvalidArgument(_))
    ));
    finalize(client.transfer_tokens(&signer("carol"), to.clone(), 10).await.unwrap()).await;

    let details = client.get_details().unwrap();
    assert!(!details.is_member(&"carol".into()));
    assert_eq!(details.weight_of(&to), Some(10));
    assert_eq!(client.get_power(&to).unwrap().basis_points(), 1_000);

    let ranking = client.create_ranking().unwrap();
    let order: Vec<&str> = ranking.iter().map(|e| e.address.as_str()).collect();
    assert_eq!(order, vec!["alice", "bob", "dave"]);
}
