//! Store key layout. Every per-peer record lives under `<prefix><peer-hex>`.

use crate::address::PeerId;
use crate::error::AddressError;

pub const BALANCE_PREFIX: &str = "balance_";
pub const SENT_CHEQUE_PREFIX: &str = "sent_cheque_";
pub const RECEIVED_CHEQUE_PREFIX: &str = "received_cheque_";

/// Key of a peer's honey balance.
pub fn balance_key(peer: &PeerId) -> String {
    format!("{}{}", BALANCE_PREFIX, peer)
}

/// Key of the last cheque issued to a peer.
pub fn sent_cheque_key(peer: &PeerId) -> String {
    format!("{}{}", SENT_CHEQUE_PREFIX, peer)
}

/// Key of the last cheque received from a peer.
pub fn received_cheque_key(peer: &PeerId) -> String {
    format!("{}{}", RECEIVED_CHEQUE_PREFIX, peer)
}

/// Recovers the peer id from a namespaced key.
pub fn key_to_peer(key: &str, prefix: &str) -> Result<PeerId, AddressError> {
    let suffix = key
        .strip_prefix(prefix)
        .ok_or_else(|| AddressError::InvalidHex(format!("key {} lacks prefix {}", key, prefix)))?;
    suffix.parse()
}
