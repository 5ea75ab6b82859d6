use crate::keypair::{KeyError, KeyPair, Signature};
use swap_types::Address;

/// The local node as a cheque issuer: its keypair, its own address and the
/// settlement contract cheques are drawn on.
#[derive(Clone, Debug)]
pub struct Owner {
    pub contract: Address,
    pub address: Address,
    keypair: KeyPair,
}

impl Owner {
    pub fn new(keypair: KeyPair, contract: Address) -> Self {
        Self {
            contract,
            address: keypair.address,
            keypair,
        }
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    /// Same owner, drawing on a different contract.
    pub fn with_contract(&self, contract: Address) -> Self {
        Self {
            contract,
            address: self.address,
            keypair: self.keypair.clone(),
        }
    }

    pub fn sign_hash(&self, hash: &[u8; 32]) -> Result<Signature, KeyError> {
        self.keypair.sign_hash(hash)
    }
}
