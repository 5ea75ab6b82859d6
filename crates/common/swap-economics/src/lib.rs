//! SWAP accounting: per-peer honey balances with disconnect and payment
//! thresholds, cheque issuance against a settlement contract, and the state
//! stores that back them.
#![forbid(unsafe_code)]

pub mod cheque;
pub mod error;
pub mod oracle;
pub mod params;
pub mod peer;
pub mod sled_state_store;
pub mod state_store;
pub mod swap;
pub mod swap_metrics;

pub use cheque::{recover_cheque_signer, sign_cheque, verify_cheque_signer};
pub use error::SwapError;
pub use oracle::{FixedPriceOracle, OracleError, PriceOracle};
pub use params::{
    Params, SwapConfig, DEFAULT_CASH_IN_DELAY, DEFAULT_DISCONNECT_THRESHOLD,
    DEFAULT_INITIAL_DEPOSIT_AMOUNT, DEFAULT_PAYMENT_THRESHOLD,
};
pub use peer::{SwapPeer, TransportError};
pub use sled_state_store::SledStateStore;
pub use state_store::{get_decoded, put_encoded, InMemoryStateStore, StateStore};
pub use swap::Swap;
