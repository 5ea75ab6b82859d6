use crate::backend::{ChainBackend, TransactionReceipt, TxHash};
use crate::error::ChainError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use swap_types::Address;
use tokio::time::Instant;
use tracing::debug;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorObject>,
}

/// [`ChainBackend`] over Ethereum-style JSON-RPC.
#[derive(Debug)]
pub struct JsonRpcBackend {
    client: Client,
    url: String,
    next_id: AtomicU64,
    poll_interval: Duration,
    receipt_timeout: Duration,
}

impl JsonRpcBackend {
    pub fn new(url: impl Into<String>) -> Result<Self, ChainError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
            poll_interval: DEFAULT_POLL_INTERVAL,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        })
    }

    pub fn with_receipt_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.receipt_timeout = timeout;
        self
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "json-rpc request");

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ChainError::Transport(format!(
                "{} returned HTTP {}",
                method,
                resp.status()
            )));
        }
        let parsed: RpcResponse = resp
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
        if let Some(err) = parsed.error {
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(parsed.result)
    }
}

#[async_trait]
impl ChainBackend for JsonRpcBackend {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        let value = self.request("eth_chainId", json!([])).await?;
        parse_u64(&value)
    }

    async fn nonce_at(&self, account: Address) -> Result<u64, ChainError> {
        let value = self
            .request("eth_getTransactionCount", json!([account.to_string(), "pending"]))
            .await?;
        parse_u64(&value)
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        let value = self.request("eth_gasPrice", json!([])).await?;
        parse_quantity(&value)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, ChainError> {
        let value = self
            .request(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;
        parse_hash(&value)
    }

    async fn wait_mined(&self, tx: TxHash) -> Result<TransactionReceipt, ChainError> {
        let tx_hex = format!("0x{}", hex::encode(tx));
        let started = Instant::now();
        loop {
            let value = self
                .request("eth_getTransactionReceipt", json!([tx_hex.clone()]))
                .await?;
            if !value.is_null() {
                return parse_receipt(&value);
            }
            if started.elapsed() >= self.receipt_timeout {
                return Err(ChainError::ReceiptTimeout(hex::encode(tx)));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn code_at(&self, address: Address) -> Result<Vec<u8>, ChainError> {
        let value = self
            .request("eth_getCode", json!([address.to_string(), "latest"]))
            .await?;
        parse_data(&value)
    }

    async fn call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, ChainError> {
        let value = self
            .request(
                "eth_call",
                json!([
                    { "to": to.to_string(), "data": format!("0x{}", hex::encode(data)) },
                    "latest"
                ]),
            )
            .await?;
        parse_data(&value)
    }
}

fn as_hex_str(value: &Value) -> Result<&str, ChainError> {
    let s = value
        .as_str()
        .ok_or_else(|| ChainError::InvalidResponse(format!("expected hex string, got {}", value)))?;
    s.strip_prefix("0x")
        .ok_or_else(|| ChainError::InvalidResponse(format!("missing 0x prefix in {}", s)))
}

fn parse_quantity(value: &Value) -> Result<u128, ChainError> {
    let digits = as_hex_str(value)?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| ChainError::InvalidResponse(format!("bad quantity {}: {}", digits, e)))
}

fn parse_u64(value: &Value) -> Result<u64, ChainError> {
    let quantity = parse_quantity(value)?;
    u64::try_from(quantity)
        .map_err(|_| ChainError::InvalidResponse(format!("quantity {} overflows u64", quantity)))
}

fn parse_data(value: &Value) -> Result<Vec<u8>, ChainError> {
    let digits = as_hex_str(value)?;
    hex::decode(digits).map_err(|e| ChainError::InvalidResponse(e.to_string()))
}

fn parse_hash(value: &Value) -> Result<TxHash, ChainError> {
    let bytes = parse_data(value)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| ChainError::InvalidResponse(format!("expected 32-byte hash, got {}", bytes.len())))
}

fn receipt_field<'a>(receipt: &'a Value, name: &str) -> Result<&'a Value, ChainError> {
    receipt
        .get(name)
        .ok_or_else(|| ChainError::InvalidResponse(format!("receipt lacks {}", name)))
}

fn parse_receipt(value: &Value) -> Result<TransactionReceipt, ChainError> {
    let tx_hash = parse_hash(receipt_field(value, "transactionHash")?)?;
    let status = parse_quantity(receipt_field(value, "status")?)? == 1;
    let block_number = parse_u64(receipt_field(value, "blockNumber")?)?;
    let contract_address = match value.get("contractAddress") {
        Some(v) if !v.is_null() => {
            let bytes = parse_data(v)?;
            Some(
                Address::from_slice(&bytes)
                    .map_err(|e| ChainError::InvalidResponse(e.to_string()))?,
            )
        }
        _ => None,
    };
    Ok(TransactionReceipt {
        tx_hash,
        status,
        contract_address,
        block_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities_parse_as_hex() {
        assert_eq!(parse_quantity(&json!("0x0")).unwrap(), 0);
        assert_eq!(parse_quantity(&json!("0x4a817c800")).unwrap(), 20_000_000_000);
        assert_eq!(parse_u64(&json!("0x2a")).unwrap(), 42);
        assert!(parse_quantity(&json!("2a")).is_err());
        assert!(parse_quantity(&json!(42)).is_err());
        assert!(parse_u64(&json!("0xffffffffffffffffff")).is_err());
    }

    #[test]
    fn data_and_hashes_decode() {
        assert!(parse_data(&json!("0x")).unwrap().is_empty());
        assert_eq!(parse_data(&json!("0x6080")).unwrap(), vec![0x60, 0x80]);
        assert!(parse_hash(&json!("0x1234")).is_err());
        let hash = format!("0x{}", "ab".repeat(32));
        assert_eq!(parse_hash(&json!(hash)).unwrap(), [0xab; 32]);
    }

    #[test]
    fn receipt_with_contract_address() {
        let receipt = parse_receipt(&json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "status": "0x1",
            "blockNumber": "0x10",
            "contractAddress": format!("0x{}", "22".repeat(20)),
        }))
        .unwrap();
        assert!(receipt.status);
        assert_eq!(receipt.block_number, 16);
        assert_eq!(receipt.contract_address, Some(Address([0x22; 20])));

        let failed = parse_receipt(&json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "status": "0x0",
            "blockNumber": "0x10",
            "contractAddress": null,
        }))
        .unwrap();
        assert!(!failed.status);
        assert_eq!(failed.contract_address, None);
    }
}
