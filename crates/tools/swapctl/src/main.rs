use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use swap_contracts::{
    ChainBackend, ChainError, JsonRpcBackend, SettlementClient, TransactionReceipt, TxHash,
};
use swap_economics::{SledStateStore, Swap};
use swap_identity::load_or_generate_keypair;
use swap_types::{Address, PeerId};
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod config;

use config::SwapctlConfig;

/// Command-line interface for SWAP accounting
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// Path to the configuration file.
    #[clap(short, long, value_parser, default_value = "config/swapctl.toml")]
    config: PathBuf,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the node address, generating a key if none exists
    Keygen,

    /// List every known peer balance
    Balances,

    /// Show the balance with one peer
    Balance {
        /// Peer id, hex
        #[clap(long)]
        peer: PeerId,
    },

    /// Show the last cheque sent to (or received from) a peer
    Cheque {
        #[clap(long)]
        peer: PeerId,

        /// Show the last received cheque instead
        #[clap(long)]
        received: bool,
    },

    /// Deploy a new settlement contract owned by this node
    Deploy {
        /// Give up after this many seconds
        #[clap(long, default_value = "300")]
        timeout_secs: u64,
    },

    /// Check that an address holds the settlement contract
    VerifyContract {
        #[clap(long)]
        address: Address,
    },

    /// Print the issuer of a settlement contract
    ContractOwner {
        #[clap(long)]
        address: Address,
    },
}

/// Stand-in backend when no rpc_url is configured.
struct OfflineBackend;

impl OfflineBackend {
    fn unavailable<T>() -> Result<T, ChainError> {
        Err(ChainError::Transport("no rpc_url configured".to_string()))
    }
}

#[async_trait]
impl ChainBackend for OfflineBackend {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Self::unavailable()
    }

    async fn nonce_at(&self, _account: Address) -> Result<u64, ChainError> {
        Self::unavailable()
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        Self::unavailable()
    }

    async fn send_raw_transaction(&self, _raw: &[u8]) -> Result<TxHash, ChainError> {
        Self::unavailable()
    }

    async fn wait_mined(&self, _tx: TxHash) -> Result<TransactionReceipt, ChainError> {
        Self::unavailable()
    }

    async fn code_at(&self, _address: Address) -> Result<Vec<u8>, ChainError> {
        Self::unavailable()
    }

    async fn call(&self, _to: Address, _data: &[u8]) -> Result<Vec<u8>, ChainError> {
        Self::unavailable()
    }
}

/// Chain id used when neither the config nor a node can provide one.
const OFFLINE_CHAIN_ID: u64 = 1;

/// Configured chain id, else the one the node reports. Without a node there is
/// nothing to sign for, so any id will do.
async fn resolve_chain_id(configured: Option<u64>, node: Option<&dyn ChainBackend>) -> Result<u64> {
    match (configured, node) {
        (Some(chain_id), _) => Ok(chain_id),
        (None, Some(backend)) => {
            let chain_id = backend
                .chain_id()
                .await
                .context("Failed to query chain id from the settlement chain")?;
            info!("Using chain id {} reported by the node", chain_id);
            Ok(chain_id)
        }
        (None, None) => Ok(OFFLINE_CHAIN_ID),
    }
}

async fn build_swap(config: &SwapctlConfig) -> Result<Swap> {
    let store = Arc::new(
        SledStateStore::open(&config.store_path).context("Failed to initialize SledStateStore")?,
    );
    let keypair = load_or_generate_keypair(config.key_path.as_deref())
        .context("Failed to load or generate keypair")?;

    let node: Option<Arc<dyn ChainBackend>> = match &config.rpc_url {
        Some(url) if !url.is_empty() => {
            info!("Using settlement chain at {}", url);
            Some(Arc::new(
                JsonRpcBackend::new(url.clone()).context("Failed to create JSON-RPC client")?,
            ))
        }
        _ => None,
    };
    let chain_id = resolve_chain_id(config.chain_id, node.as_deref()).await?;
    let backend = node.unwrap_or_else(|| Arc::new(OfflineBackend));
    let settlement = SettlementClient::new(backend, config.contract_code()?, chain_id)
        .with_harddeposit_timeout(config.harddeposit_timeout);

    Ok(Swap::new(store, keypair, config.contract_address()?, settlement)
        .with_config(config.swap_config()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = SwapctlConfig::load(&cli.config)?;

    let log_level_str = config.log_level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level_str))
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));
    fmt::Subscriber::builder().with_env_filter(filter).init();

    let swap = build_swap(&config).await?;
    let result = run(&swap, cli.command).await;
    swap.close().await.context("Failed to close state store")?;
    result
}

async fn run(swap: &Swap, command: Commands) -> Result<()> {
    match command {
        Commands::Keygen => {
            println!("{}", swap.owner().await.address);
        }
        Commands::Balances => {
            let mut balances: Vec<_> = swap.balances().await?.into_iter().collect();
            balances.sort();
            for (peer, balance) in balances {
                println!("{} {}", peer, balance);
            }
        }
        Commands::Balance { peer } => {
            let balance = swap.balance(&peer).await?;
            println!("{}", balance);
        }
        Commands::Cheque { peer, received } => {
            let cheque = if received {
                swap.load_last_received_cheque(&peer).await?
            } else {
                swap.last_sent_cheque(&peer).await?
            };
            match cheque {
                Some(cheque) => println!("{}", serde_json::to_string_pretty(&cheque)?),
                None => println!("no cheque"),
            }
        }
        Commands::Deploy { timeout_secs } => {
            let deadline = tokio::time::Instant::now() + Duration::from_secs(timeout_secs);
            let address = swap.deploy(Some(deadline)).await?;
            println!("{}", address);
        }
        Commands::VerifyContract { address } => {
            swap.verify_contract(address)
                .await
                .map_err(|e| anyhow!("contract at {} failed verification: {}", address, e))?;
            println!("ok");
        }
        Commands::ContractOwner { address } => {
            let owner = swap.get_contract_owner(address).await?;
            println!("{}", owner);
        }
    }
    Ok(())
}
