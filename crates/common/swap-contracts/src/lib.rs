//! Chain access for SWAP settlement: the `ChainBackend` seam, a JSON-RPC
//! implementation, legacy transaction signing, and the settlement contract
//! deployer with bounded retries.
#![forbid(unsafe_code)]

pub mod backend;
pub mod deploy_metrics;
pub mod error;
pub mod retry;
pub mod rpc_backend;
pub mod settlement;
pub mod transaction;

pub use backend::{ChainBackend, TransactionReceipt, TxHash};
pub use error::{ChainError, ContractError};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use rpc_backend::JsonRpcBackend;
pub use settlement::{
    ContractCode, Deployment, SettlementClient, DEFAULT_DEPLOY_GAS_LIMIT,
    DEFAULT_HARDDEPOSIT_TIMEOUT, DEPLOY_DELAY, DEPLOY_RETRIES,
};
pub use transaction::{LegacyTransaction, SignedTransaction};
