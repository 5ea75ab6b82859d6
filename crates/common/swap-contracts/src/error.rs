use swap_identity::KeyError;
use swap_types::Address;
use thiserror::Error;

/// Failures talking to the settlement chain.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),

    #[error("transaction 0x{0} reverted")]
    Reverted(String),

    #[error("receipt carries no contract address")]
    NoContractAddress,

    #[error("no code at {0} after deployment")]
    NoCodeAfterDeploy(Address),

    #[error("timed out waiting for receipt of 0x{0}")]
    ReceiptTimeout(String),

    #[error("failed to sign transaction: {0}")]
    Signing(#[from] KeyError),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("chain id mismatch: signing for {configured}, node reports {actual}")]
    ChainIdMismatch { configured: u64, actual: u64 },
}

/// Failures of the read-only contract checks.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("code at {0} does not match the settlement contract")]
    InvalidCode(Address),

    #[error("malformed return data from {address}: {reason}")]
    InvalidReturnData { address: Address, reason: String },
}
