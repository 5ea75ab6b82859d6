//! SWAP Identity – node keys and ownership for the settlement chain.
//!
//! - secp256k1 `KeyPair` generation, loading and persistence.
//! - Chain addresses derived as the last 20 bytes of keccak256(pubkey).
//! - Recoverable signatures (`r || s || v`) and signer recovery.
//! - `Owner`: keypair plus the settlement contract it issues cheques from.

#![forbid(unsafe_code)]

mod keypair;
mod keystore;
mod owner;

pub use keypair::{address_from_public_key, recover_address, KeyError, KeyPair, Signature, SIGNATURE_LENGTH};
pub use keystore::load_or_generate_keypair;
pub use owner::Owner;
