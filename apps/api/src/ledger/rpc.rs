use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::ledger::{Address, Ledger, TransactionReceipt, TransactionRequest};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("node returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("could not decode {method} result: {reason}")]
    Decode { method: String, reason: String },
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Ethereum JSON-RPC 2.0 client over HTTP.
pub struct RpcLedger {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcLedger {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!("RPC {} (id {})", method, id);

        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RpcError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RpcResponse = response.json().await?;
        if let Some(error) = parsed.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        serde_json::from_value(parsed.result.unwrap_or(Value::Null)).map_err(|e| {
            RpcError::Decode {
                method: method.to_string(),
                reason: e.to_string(),
            }
        })
    }

    async fn quantity(&self, method: &str, params: Value) -> Result<u128, RpcError> {
        let raw: String = self.request(method, params).await?;
        parse_quantity(&raw).map_err(|reason| RpcError::Decode {
            method: method.to_string(),
            reason,
        })
    }

    async fn data(&self, method: &str, params: Value) -> Result<Vec<u8>, RpcError> {
        let raw: String = self.request(method, params).await?;
        decode_data(&raw).map_err(|reason| RpcError::Decode {
            method: method.to_string(),
            reason,
        })
    }
}

fn narrow(method: &str, value: u128) -> Result<u64, RpcError> {
    u64::try_from(value).map_err(|_| RpcError::Decode {
        method: method.to_string(),
        reason: format!("{value} does not fit in 64 bits"),
    })
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        let value = self.quantity("eth_chainId", json!([])).await?;
        narrow("eth_chainId", value)
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        let value = self.quantity("eth_blockNumber", json!([])).await?;
        narrow("eth_blockNumber", value)
    }

    async fn balance(&self, account: &Address) -> Result<u128, RpcError> {
        self.quantity("eth_getBalance", json!([account.to_hex(), "latest"]))
            .await
    }

    async fn code_at(&self, address: &Address) -> Result<Vec<u8>, RpcError> {
        self.data("eth_getCode", json!([address.to_hex(), "latest"]))
            .await
    }

    async fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>, RpcError> {
        let call = json!({
            "to": to.to_hex(),
            "data": encode_data(data),
        });
        self.data("eth_call", json!([call, "latest"])).await
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, RpcError> {
        let value = self
            .quantity("eth_estimateGas", json!([transaction_json(tx)]))
            .await?;
        narrow("eth_estimateGas", value)
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, RpcError> {
        self.request("eth_sendTransaction", json!([transaction_json(tx)]))
            .await
    }

    async fn transaction_receipt(
        &self,
        hash: &str,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        self.request("eth_getTransactionReceipt", json!([hash]))
            .await
    }
}

fn transaction_json(tx: &TransactionRequest) -> Value {
    let mut value = json!({
        "from": tx.from.to_hex(),
        "data": encode_data(&tx.data),
    });
    if let Some(to) = &tx.to {
        value["to"] = json!(to.to_hex());
    }
    if let Some(gas) = tx.gas {
        value["gas"] = json!(format!("{gas:#x}"));
    }
    value
}

/// Parses a hex QUANTITY (`0x`-prefixed, no leading zeros required).
pub fn parse_quantity(raw: &str) -> Result<u128, String> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| format!("quantity '{raw}' is missing the 0x prefix"))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|e| format!("invalid quantity '{raw}': {e}"))
}

/// Decodes hex DATA (`0x`-prefixed, even length).
pub fn decode_data(raw: &str) -> Result<Vec<u8>, String> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| format!("data is missing the 0x prefix: '{raw}'"))?;
    hex::decode(digits).map_err(|e| format!("invalid hex data: {e}"))
}

pub fn encode_data(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}
