#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use multisig_governance_sdk::chain::local::{DevSigner, LocalChain};
use multisig_governance_sdk::engine::ActionUpdate;
use multisig_governance_sdk::engine::PendingAction;
use multisig_governance_sdk::multisig_builder::MultisigBuilder;
use multisig_governance_sdk::params::{AddMemberArgs, SetParametersArgs};
use multisig_governance_sdk::types::Percent;
use multisig_governance_sdk::MultisigClient;

pub fn signer(name: &str) -> DevSigner {
    DevSigner::new(name)
}

/// Creates a multisig on a fresh dev chain where `members[0]` is the creator and
/// the others are added one by one, each addition approved by the current members.
pub async fn setup(
    members: &[(&str, u128)],
    minimum_support: u8,
    required_approval: u8,
) -> (Arc<LocalChain>, MultisigClient<LocalChain>) {
    let chain = Arc::new(LocalChain::new());
    let mut client = MultisigClient::new(chain.clone());

    let (creator, weight) = members[0];
    client
        .create_multisig(
            &signer(creator),
            MultisigBuilder::new()
                .set_name("council")
                .set_minimum_support(0)
                .set_required_approval(0)
                .set_creator_weight(weight),
        )
        .await
        .unwrap();

    for (address, weight) in &members[1..] {
        let (_, action) = client
            .add_member(&signer(creator), AddMemberArgs::new((*address).into(), *weight))
            .await
            .unwrap();
        finalize(action).await;
    }

    // thresholds are raised once the group is formed
    let (_, action) = client
        .set_parameters(
            &signer(creator),
            SetParametersArgs::new(
                None,
                Some(Percent::new(minimum_support).unwrap()),
                Some(Percent::new(required_approval).unwrap()),
                None,
            ),
        )
        .await
        .unwrap();
    finalize(action).await;

    (chain, client)
}

/// Drives an action to finality, panicking on rejection or failure.
pub async fn finalize(mut action: PendingAction) {
    while let Some(update) = action.next().await {
        match update {
            ActionUpdate::Finalized(_) => return,
            ActionUpdate::Rejected(e) | ActionUpdate::Failed(e) => panic!("action failed: {}", e),
            _ => {}
        }
    }
    panic!("status stream closed before finality");
}

/// Polls `condition` until it holds, giving background tasks time to run.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}
