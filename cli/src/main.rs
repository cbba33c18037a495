use std::io::{self, Write};
use std::sync::Arc;
use anyhow::Result;
use clap::{Parser, Subcommand};
use multisig_governance_sdk::chain::local::{DevSigner, LocalChain};
use multisig_governance_sdk::chain::Signer;
use multisig_governance_sdk::multisig_builder::MultisigBuilder;
use multisig_governance_sdk::types::{Address, CallHash, MultisigId};
use multisig_governance_sdk::MultisigClient;
use multisig_governance_cli::commands::{call::CallCommands, config, propose::ProposeCommands};
use multisig_governance_cli::tx_utils;

#[derive(Debug, Parser)]
#[command(name = "multisig", version, about, long_about = None)]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(name = "exit", about = "Exit the CLI")]
    Exit,
    #[command(name = "as", about = "Sign the next commands as another address")]
    As {
        address: String
    },
    #[command(name = "create", about = "Create a new multisig with you as sole member")]
    Create {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = 51)]
        minimum_support: u8,
        #[arg(long, default_value_t = 51)]
        required_approval: u8,
        #[arg(long, help = "Let members transfer voting tokens")]
        unfrozen: bool,
        #[arg(long)]
        weight: Option<u128>,
    },
    #[command(name = "load", about = "Load a multisig and cache its state")]
    Load {
        id: MultisigId
    },
    #[command(name = "refresh", about = "Reload the multisig from chain storage")]
    Refresh,
    #[command(name = "details", about = "Show multisig parameters")]
    Details,
    #[command(name = "balance", about = "Balance of an address, read from chain storage")]
    Balance {
        address: Address
    },
    #[command(name = "balances", about = "List members and their balances")]
    Balances,
    #[command(name = "ranking", about = "List members by voting weight")]
    Ranking,
    #[command(name = "power", about = "Voting power of an address")]
    Power {
        address: Address
    },
    #[command(name = "account", about = "Account derived for a multisig id")]
    Account {
        id: MultisigId
    },
    #[command(name = "transfer", about = "Transfer your voting tokens")]
    Transfer {
        to: Address,
        amount: u128,
    },
    #[command(name = "propose", about = "Propose a call")]
    Propose {
        #[command(subcommand)]
        propose_command: ProposeCommands,
    },
    #[command(name = "calls", about = "List, inspect and vote on open calls")]
    Calls {
        call_hash: Option<CallHash>,
        #[command(subcommand)]
        call_command: Option<CallCommands>,
    },
    #[command(name = "history", about = "Show closed calls")]
    History,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("Multisig CLI - Interactive Mode");
    println!("Type 'help' for commands, 'exit' to quit");

    let config = config::load(std::env::args().nth(1).as_deref())?;
    let chain = Arc::new(LocalChain::new());
    let mut client = MultisigClient::new_with_config(chain, config);
    let mut signer = DevSigner::new("alice");

    loop {
        print!("multisig ({})> ", signer.address());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input == "exit" || input == "quit" {
            break;
        }

        let args = std::iter::once("multisig").chain(input.split_whitespace());
        match App::try_parse_from(args) {
            Ok(app) => {
                if let Commands::Exit = app.command {
                    break;
                }
                if let Commands::As { address } = &app.command {
                    signer = DevSigner::new(address.as_str());
                    continue;
                }
                if let Err(e) = run(app.command, &mut client, &signer).await {
                    eprintln!("Error: {}", e);
                }
            }
            Err(e) => {
                eprintln!("{}", e);
            }
        }
    }

    Ok(())
}

async fn run(
    command: Commands,
    client: &mut MultisigClient<LocalChain>,
    signer: &DevSigner,
) -> Result<()> {
    match command {
        Commands::Exit | Commands::As { .. } => {}
        Commands::Create { name, minimum_support, required_approval, unfrozen, weight } => {
            let mut builder = MultisigBuilder::new()
                .set_minimum_support(minimum_support)
                .set_required_approval(required_approval)
                .set_frozen_tokens(!unfrozen);
            if let Some(name) = name {
                builder = builder.set_name(&name);
            }
            if let Some(weight) = weight {
                builder = builder.set_creator_weight(weight);
            }
            let id = client.create_multisig(signer, builder).await?;
            let account = MultisigClient::<LocalChain>::derive_account(id);
            println!("Created multisig {} ({})", id, account);
        },
        Commands::Load { id } => {
            client.load_multisig(id).await?;
            println!("{}", client.get_details()?);
        },
        Commands::Refresh => {
            client.refresh().await?;
        },
        Commands::Details => {
            if !client.is_created() {
                println!("No multisig loaded, use `create` or `load <id>`");
                return Ok(());
            }
            println!("{}", client.get_details()?);
        },
        Commands::Balance { address } => {
            println!("{}", client.get_balance(&address).await?);
        },
        Commands::Balances => {
            for entry in client.get_all_balances()? {
                println!("{}  {}", entry.address, entry.amount);
            }
        },
        Commands::Ranking => {
            for (rank, entry) in client.create_ranking()?.iter().enumerate() {
                println!("{:>3}. {}  {}", rank + 1, entry.address, entry.amount);
            }
        },
        Commands::Power { address } => {
            let power = client.get_power(&address)?;
            println!("{} bp ({:.2}%)", power.basis_points(), power.as_fraction() * 100.0);
        },
        Commands::Account { id } => {
            println!("{}", MultisigClient::<LocalChain>::derive_account(id));
        },
        Commands::Transfer { to, amount } => {
            let action = client.transfer_tokens(signer, to, amount).await?;
            tx_utils::track(action, client.config().confirmation).await?;
        },
        Commands::Propose { propose_command } => {
            propose_command.run(client, signer).await?;
        },
        Commands::Calls { call_hash, call_command } => {
            match (call_hash, call_command) {
                (Some(call_hash), Some(call_command)) => {
                    call_command.run(client, signer, call_hash).await?;
                },
                (Some(call_hash), None) => {
                    println!("{}", client.get_pending_call(&call_hash)?);
                },
                (None, None) => {
                    for call in client.get_open_calls()? {
                        let payload =
                            call.payload.as_ref().map(|p| p.to_string()).unwrap_or_default();
                        println!("{}  {} ({} votes)", call.call_hash, payload, call.votes.len());
                    }
                },
                _ => {
                    eprintln!("Invalid command");
                }
            }
        },
        Commands::History => {
            for call in client.closed_calls()? {
                println!("{}  {:?}  {:?}", call.call_hash, call.status, call.result);
            }
        },
    }
    Ok(())
}
