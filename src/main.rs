// Wallet core demo
// Drives the full transaction pipeline against the in-memory ledger double

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::RngCore;
use tracing::info;

use account_chain_wallet::{
    BatchEvent, BlockHash, InMemoryLedger, ReceivableBatchProcessor, Signer, SoftwareSigner,
    TransactionService, WalletConfig,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "wallet-demo")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: open, receive a batch, send, change rep
    Run {
        /// Local work difficulty threshold (hex)
        #[arg(short, long, default_value = "ff00000000000000")]
        difficulty: String,
    },
    /// Print the addresses a random seed derives
    Addresses {
        /// How many account indexes to derive
        #[arg(short, long, default_value = "5")]
        count: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { difficulty } => {
            let difficulty =
                u64::from_str_radix(&difficulty, 16).context("difficulty must be hex")?;
            run_demo(difficulty).await
        }
        Commands::Addresses { count } => {
            let signer = SoftwareSigner::new(random_seed());
            for index in 0..count {
                let address = signer.account_public_key(index).await?.address();
                println!("{:>3}  {}", index, address);
            }
            Ok(())
        }
    }
}

fn random_seed() -> [u8; 32] {
    let mut seed = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);
    seed
}

async fn run_demo(difficulty: u64) -> anyhow::Result<()> {
    let config = WalletConfig {
        work_difficulty: difficulty,
        ..WalletConfig::default()
    };
    let ledger = Arc::new(InMemoryLedger::with_difficulty(difficulty));
    let signer = Arc::new(SoftwareSigner::new(random_seed()));
    let service = Arc::new(TransactionService::new(
        ledger.clone(),
        signer.clone(),
        config,
    ));

    let alice = signer.account_public_key(0).await?.address();
    let bob = signer.account_public_key(1).await?.address();
    info!(%alice, %bob, "derived demo accounts");

    // Three incoming transfers for Alice, as if sent from elsewhere
    for (i, amount) in [400u128, 250, 100].iter().enumerate() {
        ledger
            .credit(&alice, BlockHash::from_data(&[i as u8]), *amount)
            .await;
    }

    let pending = service.receivables(0).await?;
    info!(count = pending.len(), "pending receivables found");

    let processor = ReceivableBatchProcessor::new(service.clone());
    let mut events = processor.process_all(0, pending);
    while let Some(event) = events.recv().await {
        match event {
            BatchEvent::Received { fraction, hash, .. } => {
                info!(progress = %format!("{:.0}%", fraction * 100.0), %hash, "received");
            }
            BatchEvent::Completed { processed } => info!(processed, "batch done"),
            BatchEvent::Failed { index, error } => {
                anyhow::bail!("batch failed at item {}: {}", index, error)
            }
        }
    }

    let send_hash = service.withdraw(0, &bob, 300).await?;
    info!(%send_hash, "withdrawal processed");

    // Bob pockets the transfer, opening his account
    let bob_pending = service.receivables(1).await?;
    let open_hash = service.receive(1, &bob_pending[0]).await?;
    info!(%open_hash, "bob's account opened");

    let change_hash = service.change_representative(0, &bob).await?;
    info!(%change_hash, "representative changed");

    Ok(())
}
