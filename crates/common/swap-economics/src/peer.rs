use async_trait::async_trait;
use swap_types::{Address, EmitChequeMsg, PeerId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("peer {0} is not connected")]
    Disconnected(PeerId),

    #[error("failed to deliver message: {0}")]
    Delivery(String),
}

/// A connected peer as seen by the accounting protocol.
#[async_trait]
pub trait SwapPeer: Send + Sync {
    fn id(&self) -> PeerId;

    /// Address the peer wants its cheques made out to.
    fn beneficiary(&self) -> Address;

    /// Address expected to sign cheques this peer sends us.
    fn issuer(&self) -> Address;

    async fn send(&self, msg: EmitChequeMsg) -> Result<(), TransportError>;
}
