#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use swap_contracts::{
    ChainBackend, ChainError, ContractCode, SettlementClient, TransactionReceipt, TxHash,
};
use swap_economics::{
    InMemoryStateStore, OracleError, PriceOracle, StateStore, Swap, SwapConfig, SwapPeer,
    TransportError,
};
use swap_identity::KeyPair;
use swap_types::crypto::keccak256;
use swap_types::{Address, EmitChequeMsg, PeerId, StoreError};
use tokio::sync::Notify;

pub const CONTRACT: Address = Address([0xc0; 20]);
pub const DEPLOYED: Address = Address([0xd0; 20]);

pub fn runtime_code() -> Vec<u8> {
    vec![0x60, 0x80, 0x60, 0x40]
}

/// Chain that accepts every transaction and reports it deployed at `DEPLOYED`.
#[derive(Default)]
pub struct HappyChain {
    pub issuer: Mutex<Option<Address>>,
}

#[async_trait]
impl ChainBackend for HappyChain {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(1337)
    }

    async fn nonce_at(&self, _account: Address) -> Result<u64, ChainError> {
        Ok(0)
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        Ok(1)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, ChainError> {
        Ok(keccak256(raw))
    }

    async fn wait_mined(&self, tx: TxHash) -> Result<TransactionReceipt, ChainError> {
        Ok(TransactionReceipt {
            tx_hash: tx,
            status: true,
            contract_address: Some(DEPLOYED),
            block_number: 1,
        })
    }

    async fn code_at(&self, address: Address) -> Result<Vec<u8>, ChainError> {
        if address == DEPLOYED {
            Ok(runtime_code())
        } else {
            Ok(Vec::new())
        }
    }

    async fn call(&self, _to: Address, _data: &[u8]) -> Result<Vec<u8>, ChainError> {
        let issuer = self.issuer.lock().unwrap().unwrap_or(Address::ZERO);
        Ok(issuer.to_word().to_vec())
    }
}

pub fn settlement(chain: Arc<HappyChain>) -> SettlementClient {
    let code = ContractCode {
        creation: vec![0xfe],
        runtime: runtime_code(),
    };
    SettlementClient::new(chain, code, 1337)
}

pub fn peer_id(n: u8) -> PeerId {
    PeerId([n; 32])
}

pub fn new_swap(store: Arc<dyn StateStore>, keypair: KeyPair, config: SwapConfig) -> Swap {
    Swap::new(store, keypair, CONTRACT, settlement(Arc::new(HappyChain::default())))
        .with_config(config)
}

pub fn memory_swap(config: SwapConfig) -> (Swap, Arc<InMemoryStateStore>) {
    let store = Arc::new(InMemoryStateStore::new());
    let swap = new_swap(store.clone(), KeyPair::generate(), config);
    (swap, store)
}

/// Peer that records every cheque it is asked to deliver.
pub struct RecordingPeer {
    pub id: PeerId,
    pub beneficiary: Address,
    pub issuer: Address,
    pub sent: Mutex<Vec<EmitChequeMsg>>,
    pub fail: AtomicBool,
    pub gate: Option<Arc<Notify>>,
}

impl RecordingPeer {
    pub fn new(id: PeerId) -> Arc<Self> {
        Arc::new(Self::with_addresses(id, Address([id.0[0]; 20]), Address::ZERO))
    }

    pub fn with_addresses(id: PeerId, beneficiary: Address, issuer: Address) -> Self {
        Self {
            id,
            beneficiary,
            issuer,
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            gate: None,
        }
    }

    pub fn sent(&self) -> Vec<EmitChequeMsg> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SwapPeer for RecordingPeer {
    fn id(&self) -> PeerId {
        self.id
    }

    fn beneficiary(&self) -> Address {
        self.beneficiary
    }

    fn issuer(&self) -> Address {
        self.issuer
    }

    async fn send(&self, msg: EmitChequeMsg) -> Result<(), TransportError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected(self.id));
        }
        self.sent.lock().unwrap().push(msg);
        Ok(())
    }
}

pub struct FailingOracle;

#[async_trait]
impl PriceOracle for FailingOracle {
    async fn get_price(&self, _honey: u64) -> Result<u64, OracleError> {
        Err(OracleError::Unavailable("offline".to_string()))
    }
}

/// In-memory store whose reads, single writes and batch writes can be
/// switched off independently.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryStateStore,
    pub fail_puts: AtomicBool,
    pub fail_batches: AtomicBool,
    pub fail_gets: AtomicBool,
}

#[async_trait]
impl StateStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk on fire".to_string()));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.put(key, value).await
    }

    async fn put_batch(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        if self.fail_puts.load(Ordering::SeqCst) || self.fail_batches.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.put_batch(entries).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.keys(prefix).await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.inner.close().await
    }
}
