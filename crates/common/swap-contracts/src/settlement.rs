use crate::backend::{ChainBackend, TxHash};
use crate::deploy_metrics::SWAP_DEPLOY_ATTEMPTS_TOTAL;
use crate::error::{ChainError, ContractError};
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::transaction::LegacyTransaction;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use swap_identity::KeyPair;
use swap_types::crypto::{selector, u64_to_word};
use swap_types::Address;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Number of deployment attempts before giving up.
pub const DEPLOY_RETRIES: u32 = 5;
/// Delay before every deployment attempt after the first.
pub const DEPLOY_DELAY: Duration = Duration::from_secs(1);
/// Hard deposit decrease timeout passed to the contract constructor, in seconds.
pub const DEFAULT_HARDDEPOSIT_TIMEOUT: u64 = 86_400;
pub const DEFAULT_DEPLOY_GAS_LIMIT: u64 = 3_000_000;

/// Settlement contract bytecode: the creation code sent on deploy and the
/// runtime code expected at a deployed address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractCode {
    pub creation: Vec<u8>,
    pub runtime: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    pub address: Address,
    pub tx_hash: TxHash,
}

/// Deploys and inspects settlement contracts through a [`ChainBackend`].
pub struct SettlementClient {
    backend: Arc<dyn ChainBackend>,
    code: ContractCode,
    chain_id: u64,
    gas_limit: u64,
    harddeposit_timeout: u64,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl SettlementClient {
    pub fn new(backend: Arc<dyn ChainBackend>, code: ContractCode, chain_id: u64) -> Self {
        Self {
            backend,
            code,
            chain_id,
            gas_limit: DEFAULT_DEPLOY_GAS_LIMIT,
            harddeposit_timeout: DEFAULT_HARDDEPOSIT_TIMEOUT,
            retry: RetryPolicy::fixed(DEPLOY_RETRIES, DEPLOY_DELAY),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        self.retry = retry;
        self.sleeper = sleeper;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn with_harddeposit_timeout(mut self, seconds: u64) -> Self {
        self.harddeposit_timeout = seconds;
        self
    }

    pub fn backend(&self) -> &Arc<dyn ChainBackend> {
        &self.backend
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Fail unless the node reports the chain id transactions are signed for.
    pub async fn check_chain_id(&self) -> Result<(), ChainError> {
        let actual = self.backend.chain_id().await?;
        if actual != self.chain_id {
            return Err(ChainError::ChainIdMismatch {
                configured: self.chain_id,
                actual,
            });
        }
        Ok(())
    }

    /// Creation code followed by the ABI-encoded constructor arguments
    /// `(address owner, uint256 harddepositTimeout)`.
    pub fn init_code(&self, owner: Address) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.code.creation.len() + 64);
        data.extend_from_slice(&self.code.creation);
        data.extend_from_slice(&owner.to_word());
        data.extend_from_slice(&u64_to_word(self.harddeposit_timeout));
        data
    }

    /// Deploy a settlement contract owned by `owner`, funded with
    /// `initial_deposit`, retrying failed attempts per the retry policy.
    ///
    /// Every attempt sends a fresh transaction; callers must not run two
    /// deployments for the same owner at once. Once `deadline` passes no
    /// further attempt starts and the in-flight one is abandoned.
    pub async fn deploy(
        &self,
        signer: &KeyPair,
        owner: Address,
        initial_deposit: u128,
        deadline: Option<Instant>,
    ) -> Result<Deployment, ChainError> {
        let init_code = self.init_code(owner);
        let result = self
            .retry
            .run_if(
                self.sleeper.as_ref(),
                |attempt| {
                    let init_code = &init_code;
                    async move {
                        let outcome = with_deadline(
                            deadline,
                            self.attempt(signer, init_code, initial_deposit, attempt),
                        )
                        .await;
                        let label = if outcome.is_ok() { "success" } else { "failure" };
                        SWAP_DEPLOY_ATTEMPTS_TOTAL.with_label_values(&[label]).inc();
                        outcome
                    }
                },
                |e| {
                    !matches!(
                        e,
                        ChainError::DeadlineExceeded | ChainError::ChainIdMismatch { .. }
                    )
                },
            )
            .await;

        if let Ok(deployment) = &result {
            info!(
                contract = %deployment.address,
                owner = %owner,
                deposit = initial_deposit,
                "deployed chequebook"
            );
        }
        result
    }

    async fn attempt(
        &self,
        signer: &KeyPair,
        init_code: &[u8],
        initial_deposit: u128,
        attempt: u32,
    ) -> Result<Deployment, ChainError> {
        let tx_hash = match self.submit(signer, init_code, initial_deposit).await {
            Ok(hash) => hash,
            Err(e) => {
                warn!(attempt, error = %e, "can't send chequebook deploy tx");
                return Err(e);
            }
        };
        match self.confirm(tx_hash).await {
            Ok(address) => Ok(Deployment { address, tx_hash }),
            Err(e) => {
                warn!(attempt, error = %e, "chequebook deploy error");
                Err(e)
            }
        }
    }

    async fn submit(
        &self,
        signer: &KeyPair,
        init_code: &[u8],
        initial_deposit: u128,
    ) -> Result<TxHash, ChainError> {
        self.check_chain_id().await?;
        let nonce = self.backend.nonce_at(signer.address).await?;
        let gas_price = self.backend.gas_price().await?;
        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit: self.gas_limit,
            to: None,
            value: initial_deposit,
            data: init_code.to_vec(),
        };
        let signed = tx.sign(signer, self.chain_id)?;
        debug!(nonce, tx = %hex::encode(signed.hash), "sending chequebook deploy tx");
        self.backend.send_raw_transaction(&signed.raw).await
    }

    async fn confirm(&self, tx_hash: TxHash) -> Result<Address, ChainError> {
        let receipt = self.backend.wait_mined(tx_hash).await?;
        if !receipt.status {
            return Err(ChainError::Reverted(hex::encode(tx_hash)));
        }
        let address = receipt.contract_address.ok_or(ChainError::NoContractAddress)?;
        let code = self.backend.code_at(address).await?;
        if code.is_empty() {
            return Err(ChainError::NoCodeAfterDeploy(address));
        }
        Ok(address)
    }

    /// Check that the code at `address` is the settlement contract.
    pub async fn verify_contract(&self, address: Address) -> Result<(), ContractError> {
        let code = self.backend.code_at(address).await?;
        if code != self.code.runtime {
            return Err(ContractError::InvalidCode(address));
        }
        Ok(())
    }

    /// Issuer recorded by the settlement contract at `address`.
    pub async fn contract_owner(&self, address: Address) -> Result<Address, ContractError> {
        let data = selector("issuer()");
        let output = self.backend.call(address, &data).await?;
        if output.len() < 32 {
            return Err(ContractError::InvalidReturnData {
                address,
                reason: format!("expected a 32-byte word, got {} bytes", output.len()),
            });
        }
        if output[..12].iter().any(|b| *b != 0) {
            return Err(ContractError::InvalidReturnData {
                address,
                reason: "issuer word is not a padded address".to_string(),
            });
        }
        Address::from_slice(&output[12..32]).map_err(|e| ContractError::InvalidReturnData {
            address,
            reason: e.to_string(),
        })
    }
}

async fn with_deadline<T, F>(deadline: Option<Instant>, fut: F) -> Result<T, ChainError>
where
    F: Future<Output = Result<T, ChainError>>,
{
    match deadline {
        Some(deadline) => {
            if Instant::now() >= deadline {
                return Err(ChainError::DeadlineExceeded);
            }
            tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| ChainError::DeadlineExceeded)?
        }
        None => fut.await,
    }
}
