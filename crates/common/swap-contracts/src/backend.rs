use crate::error::ChainError;
use async_trait::async_trait;
use swap_types::Address;

pub type TxHash = [u8; 32];

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub tx_hash: TxHash,
    /// `true` when execution succeeded.
    pub status: bool,
    pub contract_address: Option<Address>,
    pub block_number: u64,
}

/// Chain operations the settlement layer relies on.
#[async_trait]
pub trait ChainBackend: Send + Sync {
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// Next nonce for `account`, pending transactions included.
    async fn nonce_at(&self, account: Address) -> Result<u64, ChainError>;

    async fn gas_price(&self) -> Result<u128, ChainError>;

    /// Broadcast a signed transaction.
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, ChainError>;

    /// Block until `tx` is mined and return its receipt.
    async fn wait_mined(&self, tx: TxHash) -> Result<TransactionReceipt, ChainError>;

    async fn code_at(&self, address: Address) -> Result<Vec<u8>, ChainError>;

    /// Read-only contract call against the latest block.
    async fn call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, ChainError>;
}
