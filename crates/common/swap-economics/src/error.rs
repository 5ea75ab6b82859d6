use crate::oracle::OracleError;
use crate::peer::TransportError;
use swap_contracts::{ChainError, ContractError};
use swap_types::{ChequeError, PeerId, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwapError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("balance for peer {peer} is {balance}, over the disconnect threshold {threshold}, disconnecting")]
    DisconnectThresholdExceeded {
        peer: PeerId,
        threshold: u64,
        balance: i64,
    },

    #[error("price oracle failed: {0}")]
    PriceOracle(#[from] OracleError),

    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),

    #[error("no debt owed to peer {peer} (balance {balance})")]
    NoDebt { peer: PeerId, balance: i64 },

    #[error(transparent)]
    Cheque(#[from] ChequeError),

    #[error("failed to send cheque: {0}")]
    Transport(#[from] TransportError),

    #[error("balance overflow for peer {0}")]
    BalanceOverflow(PeerId),

    #[error("cheque amount or serial overflow for peer {0}")]
    ChequeOverflow(PeerId),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl SwapError {
    /// Whether the caller should drop the peer.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, SwapError::DisconnectThresholdExceeded { .. })
    }
}
