use anyhow::{anyhow, Result};
use multisig_governance_sdk::config::Confirmation;
use multisig_governance_sdk::engine::{ActionUpdate, EventOutcome, PendingAction};

/// Prints status updates until the action reaches `confirmation`.
pub async fn track(mut action: PendingAction, confirmation: Confirmation) -> Result<()> {
    println!("Submitted {}", action.tx_hash());
    while let Some(update) = action.next().await {
        match update {
            ActionUpdate::Ready => println!("Ready"),
            ActionUpdate::InBlock(inclusion) => {
                println!("In block #{}", inclusion.block);
                print_outcomes(&inclusion.outcomes);
                if confirmation == Confirmation::InBlock {
                    return Ok(());
                }
            }
            ActionUpdate::Finalized(inclusion) => {
                println!("Finalized in block #{}", inclusion.block);
                print_outcomes(&inclusion.outcomes);
                return Ok(());
            }
            ActionUpdate::Rejected(e) | ActionUpdate::Failed(e) => return Err(e.into()),
        }
    }
    Err(anyhow!("Status stream closed before inclusion"))
}

fn print_outcomes(outcomes: &[EventOutcome]) {
    for outcome in outcomes {
        match outcome {
            EventOutcome::Ignored => {}
            EventOutcome::CallOpened(hash) => println!("  call opened: {}", hash),
            EventOutcome::VoteCounted { call_hash, change, threshold_met } => println!(
                "  vote on {}: {:?}{}",
                call_hash,
                change,
                if *threshold_met { " (threshold met)" } else { "" }
            ),
            EventOutcome::Closed { call_hash, status } => {
                println!("  call {}: {:?}", call_hash, status)
            }
            other => println!("  {:?}", other),
        }
    }
}
