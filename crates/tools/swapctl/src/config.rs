use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use swap_contracts::{ContractCode, DEFAULT_HARDDEPOSIT_TIMEOUT};
use swap_economics::{
    Params, SwapConfig, DEFAULT_DISCONNECT_THRESHOLD, DEFAULT_INITIAL_DEPOSIT_AMOUNT,
    DEFAULT_PAYMENT_THRESHOLD,
};
use swap_types::Address;

/// Configuration for swapctl
#[derive(Debug, Deserialize, Clone)]
pub struct SwapctlConfig {
    /// Directory of the sled database holding balances and cheques.
    pub store_path: PathBuf,

    /// Hex-encoded secp256k1 secret. Generated and written if missing.
    pub key_path: Option<PathBuf>,

    /// JSON-RPC endpoint of the settlement chain.
    pub rpc_url: Option<String>,

    /// Chain id deploy transactions are signed for. Asked from the node
    /// when left out.
    pub chain_id: Option<u64>,

    /// Settlement contract cheques are drawn on, if one is deployed already.
    pub contract: Option<String>,

    #[serde(default = "default_payment_threshold")]
    pub payment_threshold: u64,

    #[serde(default = "default_disconnect_threshold")]
    pub disconnect_threshold: u64,

    #[serde(default = "default_initial_deposit_amount")]
    pub initial_deposit_amount: u64,

    #[serde(default = "default_harddeposit_timeout")]
    pub harddeposit_timeout: u64,

    /// Hex creation bytecode of the settlement contract, needed for deploy.
    pub creation_code: Option<String>,

    /// Hex runtime bytecode, needed for verify-contract.
    pub runtime_code: Option<String>,

    /// Log filter, e.g. "info" or "swap_economics=debug".
    pub log_level: Option<String>,
}

fn default_payment_threshold() -> u64 {
    DEFAULT_PAYMENT_THRESHOLD
}

fn default_disconnect_threshold() -> u64 {
    DEFAULT_DISCONNECT_THRESHOLD
}

fn default_initial_deposit_amount() -> u64 {
    DEFAULT_INITIAL_DEPOSIT_AMOUNT
}

fn default_harddeposit_timeout() -> u64 {
    DEFAULT_HARDDEPOSIT_TIMEOUT
}

impl SwapctlConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {:?}", path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse configuration file: {:?}", path))
    }

    pub fn swap_config(&self) -> SwapConfig {
        SwapConfig {
            payment_threshold: self.payment_threshold,
            disconnect_threshold: self.disconnect_threshold,
            params: Params {
                initial_deposit_amount: self.initial_deposit_amount,
            },
        }
    }

    pub fn contract_address(&self) -> Result<Address> {
        match &self.contract {
            Some(s) => s
                .parse()
                .with_context(|| format!("Invalid contract address {:?}", s)),
            None => Ok(Address::ZERO),
        }
    }

    pub fn contract_code(&self) -> Result<ContractCode> {
        Ok(ContractCode {
            creation: decode_code(self.creation_code.as_deref(), "creation_code")?,
            runtime: decode_code(self.runtime_code.as_deref(), "runtime_code")?,
        })
    }
}

fn decode_code(code: Option<&str>, field: &str) -> Result<Vec<u8>> {
    let Some(code) = code else {
        return Ok(Vec::new());
    };
    let trimmed = code.trim();
    hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
        .with_context(|| format!("{} is not valid hex", field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: SwapctlConfig = toml::from_str(r#"store_path = "/tmp/swap""#).unwrap();
        assert_eq!(config.chain_id, None);
        assert_eq!(config.payment_threshold, DEFAULT_PAYMENT_THRESHOLD);
        assert_eq!(config.disconnect_threshold, DEFAULT_DISCONNECT_THRESHOLD);
        assert_eq!(config.harddeposit_timeout, DEFAULT_HARDDEPOSIT_TIMEOUT);
        assert_eq!(config.contract_address().unwrap(), Address::ZERO);
        assert!(config.contract_code().unwrap().creation.is_empty());
    }

    #[test]
    fn full_config_parses() {
        let config: SwapctlConfig = toml::from_str(
            r#"
            store_path = "data/swap"
            key_path = "data/node.key"
            rpc_url = "http://127.0.0.1:8545"
            chain_id = 1337
            contract = "0x1111111111111111111111111111111111111111"
            payment_threshold = 100
            disconnect_threshold = 150
            initial_deposit_amount = 5
            creation_code = "0x6080"
            runtime_code = "6080"
            log_level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.chain_id, Some(1337));
        let swap = config.swap_config();
        assert_eq!(swap.payment_threshold, 100);
        assert_eq!(swap.disconnect_threshold, 150);
        assert_eq!(swap.params.initial_deposit_amount, 5);
        assert_eq!(config.contract_address().unwrap(), Address([0x11; 20]));
        let code = config.contract_code().unwrap();
        assert_eq!(code.creation, vec![0x60, 0x80]);
        assert_eq!(code.runtime, vec![0x60, 0x80]);
    }

    #[test]
    fn bad_contract_is_reported() {
        let config: SwapctlConfig =
            toml::from_str("store_path = \"x\"\ncontract = \"0x12\"").unwrap();
        assert!(config.contract_address().is_err());
    }
}
