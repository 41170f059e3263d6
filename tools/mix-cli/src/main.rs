//! mix-cli: route one payment through a chain of program derived hops.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chain_sol::{address_to_bytes, Keypair};
use clap::Parser;
use mix_core::{lamports_from_sol, ExecutionOrchestrator, MAX_ROUTING_LAYERS};
use mix_rpc::HttpLedgerClient;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::MixConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "mix.toml")]
    config: PathBuf,

    /// Fee payer keypair (Solana CLI JSON)
    #[arg(long, env = "MIX_FEE_PAYER")]
    fee_payer: PathBuf,

    /// Proxy payer keypair (Solana CLI JSON); funds the transfer
    #[arg(long, env = "MIX_PROXY_PAYER")]
    proxy_payer: PathBuf,

    /// Recipient address (base58)
    #[arg(long)]
    recipient: String,

    /// Amount to route, in SOL
    #[arg(long)]
    amount_sol: f64,

    /// Number of intermediate hops
    #[arg(long, default_value_t = MAX_ROUTING_LAYERS)]
    layers: u8,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    info!(version = env!("CARGO_PKG_VERSION"), "starting mix-cli");

    let config = MixConfig::from_file(&args.config)?;
    let program_id = config.program_id()?;
    info!(rpc = %config.rpc_url, program = %config.program_id, "configuration loaded");

    let fee_payer = Keypair::from_json_file(&args.fee_payer)
        .with_context(|| format!("failed to load fee payer from {}", args.fee_payer.display()))?;
    let proxy_payer = Keypair::from_json_file(&args.proxy_payer).with_context(|| {
        format!("failed to load proxy payer from {}", args.proxy_payer.display())
    })?;
    let recipient = address_to_bytes(&args.recipient).context("invalid recipient address")?;
    let amount = lamports_from_sol(args.amount_sol).context("invalid amount")?;

    info!(
        fee_payer = %fee_payer.address(),
        proxy_payer = %proxy_payer.address(),
        recipient = %args.recipient,
        amount,
        layers = args.layers,
        "routing request"
    );

    let ledger = HttpLedgerClient::new(config.rpc_url.clone(), config.request_timeout())
        .context("failed to create rpc client")?;
    let orchestrator =
        ExecutionOrchestrator::new(Arc::new(ledger), program_id, config.to_execution_options());

    let receipt = orchestrator
        .execute(&fee_payer, &proxy_payer, recipient, amount, args.layers)
        .await
        .map_err(|failure| {
            error!(
                failed_at = ?failure.failed_at,
                signature = ?failure.observed.signature,
                retryable = failure.error.is_retryable(),
                "routing failed"
            );
            anyhow::Error::new(failure)
        })?;

    if let Some(url) = config.explorer_url(&receipt.signature) {
        info!(%url, "explorer");
    }

    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "mix_cli=debug,mix_core=debug,mix_rpc=debug,info"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}
