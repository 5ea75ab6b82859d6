//! Shared types for the SWAP accounting protocol: addresses, peer ids, cheques,
//! store key layout and the error enums the other crates build on.
#![forbid(unsafe_code)]

pub mod address;
pub mod cheque;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod protocol;

pub use address::{Address, PeerId, ADDRESS_LENGTH, PEER_ID_LENGTH};
pub use cheque::{Cheque, ChequeParams};
pub use error::{AddressError, ChequeError, StoreError};
pub use protocol::EmitChequeMsg;
