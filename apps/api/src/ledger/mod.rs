//! Ledger access: the `Ledger` trait (the seam every ledger operation goes through),
//! its JSON-RPC backend, and the store / fetch / verify flows built on top.

use async_trait::async_trait;
use serde::Deserialize;

pub mod address;
pub mod handlers;
pub mod rpc;
pub mod storage;
pub mod store;
pub mod verify;

pub use address::{parse_address, Address};
pub use rpc::{RpcError, RpcLedger};

/// A transaction to be signed and submitted by the node.
/// `to: None` creates a contract from `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Option<Address>,
    pub data: Vec<u8>,
    pub gas: Option<u64>,
}

/// The subset of `eth_getTransactionReceipt` this service reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub contract_address: Option<String>,
    pub status: Option<String>,
    pub gas_used: Option<String>,
    pub block_number: Option<String>,
}

impl TransactionReceipt {
    /// Pre-Byzantium receipts carry no status and are treated as successful.
    pub fn succeeded(&self) -> bool {
        !matches!(self.status.as_deref(), Some("0x0") | Some("0x00"))
    }
}

/// Carried in `AppState` as `Option<Arc<dyn Ledger>>`.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn chain_id(&self) -> Result<u64, RpcError>;

    async fn block_number(&self) -> Result<u64, RpcError>;

    /// Balance in wei.
    async fn balance(&self, account: &Address) -> Result<u128, RpcError>;

    /// Runtime code at `address`; empty when nothing is deployed there.
    async fn code_at(&self, address: &Address) -> Result<Vec<u8>, RpcError>;

    /// Read-only call against the latest block.
    async fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>, RpcError>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, RpcError>;

    /// Submits via `eth_sendTransaction`; returns the transaction hash.
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, RpcError>;

    async fn transaction_receipt(&self, hash: &str)
        -> Result<Option<TransactionReceipt>, RpcError>;
}
