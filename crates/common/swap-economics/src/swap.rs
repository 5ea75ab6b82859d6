use crate::cheque::{sign_cheque, verify_cheque_signer};
use crate::error::SwapError;
use crate::oracle::{FixedPriceOracle, PriceOracle};
use crate::params::{SwapConfig, DEFAULT_CASH_IN_DELAY};
use crate::peer::SwapPeer;
use crate::state_store::{encode_entry, get_decoded, put_encoded, StateStore};
use crate::swap_metrics::*;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use swap_contracts::SettlementClient;
use swap_identity::{KeyPair, Owner};
use swap_types::keys::{
    balance_key, key_to_peer, received_cheque_key, sent_cheque_key, BALANCE_PREFIX,
};
use swap_types::{Address, Cheque, ChequeError, ChequeParams, EmitChequeMsg, PeerId, StoreError};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Cache slot for a value backed by the store. `Unloaded` means the store has
/// not been consulted yet this session, which is distinct from a loaded zero.
#[derive(Debug, Clone, Default)]
enum Slot<T> {
    #[default]
    Unloaded,
    Loaded(T),
}

/// Per-peer accounting state, guarded by its own lock so that one peer's
/// updates never wait on another's.
#[derive(Debug, Default)]
struct PeerAccount {
    balance: Slot<i64>,
    last_sent: Slot<Option<Cheque>>,
    last_received: Slot<Option<Cheque>>,
}

/// The SWAP accounting engine: per-peer honey balances, threshold policy and
/// cheque issuance, persisted through a [`StateStore`].
///
/// A positive balance means the peer owes us; a negative one means we owe the
/// peer. Updates for a single peer are strictly serialized.
pub struct Swap {
    store: Arc<dyn StateStore>,
    owner: RwLock<Arc<Owner>>,
    settlement: SettlementClient,
    oracle: Arc<dyn PriceOracle>,
    config: SwapConfig,
    accounts: Mutex<HashMap<PeerId, Arc<Mutex<PeerAccount>>>>,
    peers: RwLock<HashMap<PeerId, Arc<dyn SwapPeer>>>,
}

impl Swap {
    pub fn new(
        store: Arc<dyn StateStore>,
        keypair: KeyPair,
        contract: Address,
        settlement: SettlementClient,
    ) -> Self {
        Self {
            store,
            owner: RwLock::new(Arc::new(Owner::new(keypair, contract))),
            settlement,
            oracle: Arc::new(FixedPriceOracle::default()),
            config: SwapConfig::default(),
            accounts: Mutex::new(HashMap::new()),
            peers: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn PriceOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn with_config(mut self, config: SwapConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    pub async fn owner(&self) -> Arc<Owner> {
        self.owner.read().await.clone()
    }

    /// Settlement contract cheques are currently drawn on.
    pub async fn contract(&self) -> Address {
        self.owner.read().await.contract
    }

    pub async fn add_peer(&self, peer: Arc<dyn SwapPeer>) {
        let id = peer.id();
        debug!(peer = %id, beneficiary = %peer.beneficiary(), "registering swap peer");
        self.peers.write().await.insert(id, peer);
    }

    pub async fn remove_peer(&self, peer: &PeerId) -> Option<Arc<dyn SwapPeer>> {
        self.peers.write().await.remove(peer)
    }

    async fn peer_handle(&self, peer: &PeerId) -> Result<Arc<dyn SwapPeer>, SwapError> {
        self.peers
            .read()
            .await
            .get(peer)
            .cloned()
            .ok_or(SwapError::UnknownPeer(*peer))
    }

    async fn account(&self, peer: &PeerId) -> Arc<Mutex<PeerAccount>> {
        let mut accounts = self.accounts.lock().await;
        accounts.entry(*peer).or_default().clone()
    }

    async fn existing_account(&self, peer: &PeerId) -> Option<Arc<Mutex<PeerAccount>>> {
        self.accounts.lock().await.get(peer).cloned()
    }

    /// Apply `amount` to the peer's balance. This is the only path that
    /// changes a balance on behalf of metered traffic.
    ///
    /// The disconnect check runs against the balance before `amount` is
    /// applied and the payment check against the balance after. Returns the
    /// balance right after `amount` was applied; a cheque issued as a result
    /// is settled on top of that and reported only through logs.
    pub async fn add(&self, amount: i64, peer: &PeerId) -> Result<i64, SwapError> {
        let account = self.account(peer).await;
        let mut acct = account.lock().await;

        let balance = match self.load_balance(peer, &mut acct).await {
            Ok(balance) => balance,
            Err(e) => {
                error!(peer = %peer, error = %e, "error while loading balance for peer");
                SWAP_BALANCE_UPDATES_TOTAL.with_label_values(&["error"]).inc();
                return Err(e);
            }
        };

        if balance >= self.config.disconnect_bound() {
            let err = SwapError::DisconnectThresholdExceeded {
                peer: *peer,
                threshold: self.config.disconnect_threshold,
                balance,
            };
            warn!("{}", err);
            SWAP_DISCONNECT_REJECTIONS_TOTAL.inc();
            SWAP_BALANCE_UPDATES_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(err);
        }

        let new_balance = match self.update_balance(peer, &mut acct, amount).await {
            Ok(b) => b,
            Err(e) => {
                SWAP_BALANCE_UPDATES_TOTAL.with_label_values(&["error"]).inc();
                return Err(e);
            }
        };
        SWAP_BALANCE_UPDATES_TOTAL.with_label_values(&["applied"]).inc();

        if new_balance <= self.config.payment_bound() {
            warn!(
                peer = %peer,
                payment_threshold = self.config.payment_threshold,
                "balance for peer went over the payment threshold, sending cheque"
            );
            match self.send_cheque_locked(peer, &mut acct).await {
                Ok(()) => info!(peer = %peer, "successfully sent cheque to peer"),
                Err(e) => error!(peer = %peer, error = %e, "error while sending cheque to peer"),
            }
        }

        Ok(new_balance)
    }

    async fn load_balance(&self, peer: &PeerId, acct: &mut PeerAccount) -> Result<i64, SwapError> {
        if let Slot::Loaded(balance) = acct.balance {
            return Ok(balance);
        }
        let balance = match get_decoded::<i64>(self.store.as_ref(), &balance_key(peer)).await {
            Ok(balance) => balance,
            Err(e) if e.is_not_found() => 0,
            Err(e) => {
                SWAP_STORE_ERRORS_TOTAL.with_label_values(&["load_balance"]).inc();
                return Err(e.into());
            }
        };
        acct.balance = Slot::Loaded(balance);
        SWAP_TRACKED_PEERS.inc();
        Ok(balance)
    }

    // Persists first; the cache only moves once the store accepted the value.
    async fn update_balance(
        &self,
        peer: &PeerId,
        acct: &mut PeerAccount,
        amount: i64,
    ) -> Result<i64, SwapError> {
        let balance = self.load_balance(peer, acct).await?;
        let new_balance = balance
            .checked_add(amount)
            .ok_or(SwapError::BalanceOverflow(*peer))?;
        if let Err(e) = put_encoded(self.store.as_ref(), &balance_key(peer), &new_balance).await {
            SWAP_STORE_ERRORS_TOTAL.with_label_values(&["save_balance"]).inc();
            error!(peer = %peer, error = %e, "error while storing balance for peer");
            return Err(e.into());
        }
        acct.balance = Slot::Loaded(new_balance);
        debug!(peer = %peer, balance = new_balance, "balance for peer after accounting");
        Ok(new_balance)
    }

    /// Persist `cheque` under `cheque_key` together with the balance moved by
    /// `amount`, as one batch. Neither the store nor the cached balance changes
    /// unless both writes land; the caller updates its cheque slot on success.
    async fn reset_balance_with_cheque(
        &self,
        peer: &PeerId,
        acct: &mut PeerAccount,
        cheque_key: String,
        cheque: &Cheque,
        amount: i64,
    ) -> Result<i64, SwapError> {
        info!(peer = %peer, amount, "resetting balance for peer");
        let balance = self.load_balance(peer, acct).await?;
        let new_balance = balance
            .checked_add(amount)
            .ok_or(SwapError::BalanceOverflow(*peer))?;
        let entries = vec![
            encode_entry(cheque_key, cheque)?,
            encode_entry(balance_key(peer), &new_balance)?,
        ];
        if let Err(e) = self.store.put_batch(entries).await {
            SWAP_STORE_ERRORS_TOTAL.with_label_values(&["save_cheque_and_balance"]).inc();
            error!(peer = %peer, error = %e, "error while storing cheque and balance for peer");
            return Err(e.into());
        }
        acct.balance = Slot::Loaded(new_balance);
        debug!(peer = %peer, balance = new_balance, "balance for peer after accounting");
        Ok(new_balance)
    }

    /// Current balance with `peer`. Falls through to the store without caching
    /// when the peer has not been loaded this session; a peer never seen at
    /// all yields [`StoreError::NotFound`].
    pub async fn balance(&self, peer: &PeerId) -> Result<i64, SwapError> {
        if let Some(account) = self.existing_account(peer).await {
            if let Slot::Loaded(balance) = account.lock().await.balance {
                return Ok(balance);
            }
        }
        Ok(get_decoded::<i64>(self.store.as_ref(), &balance_key(peer)).await?)
    }

    /// Every peer with a known balance: those loaded this session plus those
    /// found in the store.
    pub async fn balance_peers(&self) -> Result<Vec<PeerId>, SwapError> {
        let mut peers = BTreeSet::new();
        let accounts: Vec<_> = self
            .accounts
            .lock()
            .await
            .iter()
            .map(|(id, account)| (*id, account.clone()))
            .collect();
        for (id, account) in accounts {
            if let Slot::Loaded(_) = account.lock().await.balance {
                peers.insert(id);
            }
        }

        let keys = self.store.keys(BALANCE_PREFIX).await.map_err(|e| {
            SWAP_STORE_ERRORS_TOTAL.with_label_values(&["keys"]).inc();
            e
        })?;
        for key in keys {
            match key_to_peer(&key, BALANCE_PREFIX) {
                Ok(peer) => {
                    peers.insert(peer);
                }
                Err(e) => warn!(key = %key, error = %e, "skipping malformed balance key"),
            }
        }
        Ok(peers.into_iter().collect())
    }

    pub async fn balances(&self) -> Result<HashMap<PeerId, i64>, SwapError> {
        let mut balances = HashMap::new();
        for peer in self.balance_peers().await? {
            balances.insert(peer, self.balance(&peer).await?);
        }
        Ok(balances)
    }

    pub async fn log_balance(&self, peer: &PeerId) {
        let account = self.account(peer).await;
        let mut acct = account.lock().await;
        match self.load_balance(peer, &mut acct).await {
            Ok(balance) => info!(peer = %peer, balance, "balance for peer"),
            Err(e) => error!(peer = %peer, error = %e, "error while loading balance for peer"),
        }
    }

    /// Issue a cheque for the whole current debt to `peer` and deliver it.
    pub async fn send_cheque(&self, peer: &PeerId) -> Result<(), SwapError> {
        let account = self.account(peer).await;
        let mut acct = account.lock().await;
        self.send_cheque_locked(peer, &mut acct).await
    }

    async fn send_cheque_locked(&self, peer: &PeerId, acct: &mut PeerAccount) -> Result<(), SwapError> {
        let result = self.issue_and_deliver(peer, acct).await;
        let outcome = if result.is_ok() { "success" } else { "error" };
        SWAP_CHEQUES_SENT_TOTAL.with_label_values(&[outcome]).inc();
        result
    }

    async fn issue_and_deliver(&self, peer: &PeerId, acct: &mut PeerAccount) -> Result<(), SwapError> {
        let handle = self.peer_handle(peer).await?;
        let (cheque, settled) = match self.create_cheque(peer, acct, handle.beneficiary()).await {
            Ok(created) => created,
            Err(e) => {
                error!(peer = %peer, error = %e, "error while creating cheque");
                return Err(e);
            }
        };

        info!(
            serial = cheque.params.serial,
            amount = cheque.params.amount,
            beneficiary = %cheque.params.beneficiary,
            contract = %cheque.params.contract,
            "sending cheque"
        );

        // Recorded as sent and settled before delivery; not rolled back if
        // delivery below fails.
        let settled = i64::try_from(settled).map_err(|_| SwapError::BalanceOverflow(*peer))?;
        self.reset_balance_with_cheque(peer, acct, sent_cheque_key(peer), &cheque, settled)
            .await?;
        acct.last_sent = Slot::Loaded(Some(cheque.clone()));

        handle.send(EmitChequeMsg { cheque }).await?;
        Ok(())
    }

    /// Build and sign the next cheque for `peer`. Returns the cheque and the
    /// settlement amount it adds on top of the previous one.
    async fn create_cheque(
        &self,
        peer: &PeerId,
        acct: &mut PeerAccount,
        beneficiary: Address,
    ) -> Result<(Cheque, u64), SwapError> {
        let balance = self.load_balance(peer, acct).await?;
        if balance >= 0 {
            return Err(SwapError::NoDebt { peer: *peer, balance });
        }
        let honey = balance.unsigned_abs();

        let amount = match self.oracle.get_price(honey).await {
            Ok(amount) => amount,
            Err(e) => {
                error!(error = %e, "error getting price from oracle");
                return Err(e.into());
            }
        };

        let (serial, cumulative) = match self.load_last_sent(peer, acct).await? {
            Some(last) => (
                last.params
                    .serial
                    .checked_add(1)
                    .ok_or(SwapError::ChequeOverflow(*peer))?,
                last.params
                    .amount
                    .checked_add(amount)
                    .ok_or(SwapError::ChequeOverflow(*peer))?,
            ),
            None => (1, amount),
        };

        let owner = self.owner().await;
        let params = ChequeParams {
            contract: owner.contract,
            beneficiary,
            serial,
            amount: cumulative,
            honey,
            timeout: DEFAULT_CASH_IN_DELAY,
        };
        let cheque = sign_cheque(params, &owner)?;
        Ok((cheque, amount))
    }

    async fn load_last_sent(
        &self,
        peer: &PeerId,
        acct: &mut PeerAccount,
    ) -> Result<Option<Cheque>, SwapError> {
        if let Slot::Loaded(cheque) = &acct.last_sent {
            return Ok(cheque.clone());
        }
        let cheque = self.load_cheque(&sent_cheque_key(peer), "load_sent_cheque").await?;
        acct.last_sent = Slot::Loaded(cheque.clone());
        Ok(cheque)
    }

    async fn load_last_received(
        &self,
        peer: &PeerId,
        acct: &mut PeerAccount,
    ) -> Result<Option<Cheque>, SwapError> {
        if let Slot::Loaded(cheque) = &acct.last_received {
            return Ok(cheque.clone());
        }
        let cheque = self
            .load_cheque(&received_cheque_key(peer), "load_received_cheque")
            .await?;
        acct.last_received = Slot::Loaded(cheque.clone());
        Ok(cheque)
    }

    async fn load_cheque(&self, key: &str, operation: &str) -> Result<Option<Cheque>, SwapError> {
        match get_decoded::<Cheque>(self.store.as_ref(), key).await {
            Ok(cheque) => Ok(Some(cheque)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => {
                SWAP_STORE_ERRORS_TOTAL.with_label_values(&[operation]).inc();
                error!(key, error = %e, "error while loading cheque");
                Err(e.into())
            }
        }
    }

    /// Last cheque we issued to `peer`, if any.
    pub async fn last_sent_cheque(&self, peer: &PeerId) -> Result<Option<Cheque>, SwapError> {
        let account = self.account(peer).await;
        let mut acct = account.lock().await;
        self.load_last_sent(peer, &mut acct).await
    }

    /// Last cheque received from `peer`, if any.
    pub async fn load_last_received_cheque(&self, peer: &PeerId) -> Result<Option<Cheque>, SwapError> {
        let account = self.account(peer).await;
        let mut acct = account.lock().await;
        self.load_last_received(peer, &mut acct).await
    }

    pub async fn save_last_received_cheque(&self, peer: &PeerId, cheque: Cheque) -> Result<(), SwapError> {
        let account = self.account(peer).await;
        let mut acct = account.lock().await;
        self.store_received(peer, &mut acct, cheque).await
    }

    async fn store_received(
        &self,
        peer: &PeerId,
        acct: &mut PeerAccount,
        cheque: Cheque,
    ) -> Result<(), SwapError> {
        if let Err(e) = put_encoded(self.store.as_ref(), &received_cheque_key(peer), &cheque).await {
            SWAP_STORE_ERRORS_TOTAL.with_label_values(&["save_received_cheque"]).inc();
            return Err(e.into());
        }
        acct.last_received = Slot::Loaded(Some(cheque));
        Ok(())
    }

    /// Accept a cheque `peer` sent us: check it, keep it as the last received
    /// cheque and credit the peer with the honey it settles.
    pub async fn handle_emit_cheque(&self, peer: &PeerId, msg: EmitChequeMsg) -> Result<(), SwapError> {
        let result = self.accept_cheque(peer, msg.cheque).await;
        let outcome = match &result {
            Ok(()) => "accepted",
            Err(SwapError::Cheque(ChequeError::InvalidSignature)) => "invalid_signature",
            Err(_) => "rejected",
        };
        SWAP_CHEQUES_RECEIVED_TOTAL.with_label_values(&[outcome]).inc();
        if let Err(e) = &result {
            warn!(peer = %peer, error = %e, "rejected cheque from peer");
        }
        result
    }

    async fn accept_cheque(&self, peer: &PeerId, cheque: Cheque) -> Result<(), SwapError> {
        let handle = self.peer_handle(peer).await?;
        verify_cheque_signer(&cheque, handle.issuer())?;

        let own_address = self.owner().await.address;
        if cheque.params.beneficiary != own_address {
            return Err(ChequeError::WrongBeneficiary {
                expected: own_address,
                actual: cheque.params.beneficiary,
            }
            .into());
        }

        let account = self.account(peer).await;
        let mut acct = account.lock().await;

        if let Some(last) = self.load_last_received(peer, &mut acct).await? {
            if cheque.params.serial <= last.params.serial {
                return Err(ChequeError::StaleSerial {
                    serial: cheque.params.serial,
                    last: last.params.serial,
                }
                .into());
            }
            if cheque.params.amount < last.params.amount {
                return Err(ChequeError::DecreasingAmount {
                    amount: cheque.params.amount,
                    last: last.params.amount,
                }
                .into());
            }
        }

        let honey = i64::try_from(cheque.params.honey).map_err(|_| SwapError::BalanceOverflow(*peer))?;
        info!(
            peer = %peer,
            serial = cheque.params.serial,
            amount = cheque.params.amount,
            honey,
            "received cheque"
        );
        self.reset_balance_with_cheque(peer, &mut acct, received_cheque_key(peer), &cheque, -honey)
            .await?;
        acct.last_received = Slot::Loaded(Some(cheque));
        Ok(())
    }

    /// Summary of the deployed settlement setup, for logs.
    pub async fn deploy_success(&self) -> String {
        let owner = self.owner().await;
        format!(
            "contract: {}, owner: {}, deposit: {}, signer: {}",
            owner.contract,
            owner.address,
            self.config.params.initial_deposit_amount,
            hex::encode(owner.keypair().public_key_bytes())
        )
    }

    /// Deploy a fresh settlement contract for this node and draw future
    /// cheques on it. Callers must not run deployments concurrently.
    pub async fn deploy(&self, deadline: Option<Instant>) -> Result<Address, SwapError> {
        let owner = self.owner().await;
        info!(owner = %owner.address, "deploying new swap");
        let deployment = match self
            .settlement
            .deploy(
                owner.keypair(),
                owner.address,
                u128::from(self.config.params.initial_deposit_amount),
                deadline,
            )
            .await
        {
            Ok(deployment) => deployment,
            Err(e) => {
                error!(error = %e, "unable to deploy swap");
                return Err(e.into());
            }
        };
        *self.owner.write().await = Arc::new(owner.with_contract(deployment.address));
        info!(address = %deployment.address, owner = %owner.address, "swap deployed");
        info!("{}", self.deploy_success().await);
        Ok(deployment.address)
    }

    /// Check that `address` holds the settlement contract code.
    pub async fn verify_contract(&self, address: Address) -> Result<(), SwapError> {
        Ok(self.settlement.verify_contract(address).await?)
    }

    /// Issuer recorded by a foreign settlement contract.
    pub async fn get_contract_owner(&self, address: Address) -> Result<Address, SwapError> {
        Ok(self.settlement.contract_owner(address).await?)
    }

    pub async fn close(&self) -> Result<(), StoreError> {
        self.store.close().await
    }
}
