//! Store, fetch and status operations over any `Ledger`.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::ledger::rpc::parse_quantity;
use crate::ledger::storage::{
    content_getter_call, creation_code, decode_abi_string, decode_runtime, StoredCode,
};
use crate::ledger::{parse_address, Address, Ledger, RpcError, TransactionRequest};

/// Margin added on top of the node's gas estimate, in percent.
const GAS_MARGIN_PERCENT: u64 = 20;
const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// The on-chain record: one text field keyed by contract address.
#[derive(Debug, Clone, Serialize)]
pub struct ContractRecord {
    pub address: Address,
    pub contract_content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Deployment {
    pub address: Address,
    pub transaction_hash: String,
    pub gas_used: Option<u64>,
    pub block_number: Option<u64>,
    pub content_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerStatus {
    pub chain_id: u64,
    pub block_number: u64,
    pub account: Address,
    pub balance_wei: String,
    pub balance_ether: String,
}

/// How long to wait for a deploy receipt, and how often to ask.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptPolling {
    pub interval: Duration,
    pub timeout: Duration,
}

pub(crate) fn ledger_error(context: &str, e: RpcError) -> AppError {
    AppError::Ledger(format!("{context}: {e}"))
}

/// Deploys a data contract holding `text` from `from` and waits for its receipt.
pub async fn deploy_contract_text(
    ledger: &dyn Ledger,
    from: &Address,
    text: &str,
    polling: ReceiptPolling,
) -> Result<Deployment, AppError> {
    let code = creation_code(text).map_err(|e| AppError::Validation(e.to_string()))?;

    let mut tx = TransactionRequest {
        from: *from,
        to: None,
        data: code,
        gas: None,
    };
    let estimate = ledger
        .estimate_gas(&tx)
        .await
        .map_err(|e| ledger_error("gas estimation failed", e))?;
    tx.gas = Some(with_gas_margin(estimate));

    let hash = ledger
        .send_transaction(&tx)
        .await
        .map_err(|e| ledger_error("transaction rejected", e))?;
    info!("Deploy transaction sent: {} (gas limit {:?})", hash, tx.gas);

    let deadline = Instant::now() + polling.timeout;
    let receipt = loop {
        match ledger
            .transaction_receipt(&hash)
            .await
            .map_err(|e| ledger_error("receipt lookup failed", e))?
        {
            Some(receipt) => break receipt,
            None if Instant::now() + polling.interval > deadline => {
                return Err(AppError::Ledger(format!(
                    "transaction {hash} was not mined within {}s",
                    polling.timeout.as_secs()
                )));
            }
            None => tokio::time::sleep(polling.interval).await,
        }
    };

    if !receipt.succeeded() {
        warn!("Deploy transaction {} reverted", hash);
        return Err(AppError::Ledger(format!("transaction {hash} reverted")));
    }
    let address = receipt
        .contract_address
        .as_deref()
        .ok_or_else(|| AppError::Ledger(format!("receipt for {hash} has no contract address")))
        .and_then(|raw| {
            parse_address(raw)
                .map_err(|e| AppError::Ledger(format!("node returned a bad contract address: {e}")))
        })?;

    info!("Contract text stored at {}", address);
    Ok(Deployment {
        address,
        transaction_hash: receipt.transaction_hash,
        gas_used: receipt
            .gas_used
            .as_deref()
            .and_then(|g| parse_quantity(g).ok())
            .and_then(|g| u64::try_from(g).ok()),
        block_number: receipt
            .block_number
            .as_deref()
            .and_then(|b| parse_quantity(b).ok())
            .and_then(|b| u64::try_from(b).ok()),
        content_bytes: text.len(),
    })
}

/// Reads the text stored at `address`.
pub async fn fetch_contract_text(
    ledger: &dyn Ledger,
    address: &Address,
) -> Result<ContractRecord, AppError> {
    let code = ledger
        .code_at(address)
        .await
        .map_err(|e| ledger_error("could not read contract code", e))?;

    let stored = decode_runtime(&code).map_err(|e| AppError::Ledger(e.to_string()))?;
    let contract_content = match stored {
        StoredCode::Missing => {
            return Err(AppError::NotFound(format!("no contract deployed at {address}")));
        }
        StoredCode::Data(text) => text,
        StoredCode::Program => {
            let output = ledger
                .call(address, &content_getter_call())
                .await
                .map_err(|e| ledger_error("contractContent() call failed", e))?;
            decode_abi_string(&output).map_err(|e| {
                AppError::UnprocessableEntity(format!(
                    "contract at {address} does not expose contractContent(): {e}"
                ))
            })?
        }
    };

    Ok(ContractRecord {
        address: *address,
        contract_content,
    })
}

pub async fn ledger_status(ledger: &dyn Ledger, account: &Address) -> Result<LedgerStatus, AppError> {
    let chain_id = ledger
        .chain_id()
        .await
        .map_err(|e| ledger_error("could not reach ledger node", e))?;
    let block_number = ledger
        .block_number()
        .await
        .map_err(|e| ledger_error("could not read block number", e))?;
    let balance = ledger
        .balance(account)
        .await
        .map_err(|e| ledger_error("could not read account balance", e))?;

    Ok(LedgerStatus {
        chain_id,
        block_number,
        account: *account,
        balance_wei: balance.to_string(),
        balance_ether: format_ether(balance),
    })
}

/// Pads a gas estimate by `GAS_MARGIN_PERCENT`, clamped to `u64::MAX`.
fn with_gas_margin(estimate: u64) -> u64 {
    let padded = u128::from(estimate) * u128::from(100 + GAS_MARGIN_PERCENT) / 100;
    u64::try_from(padded).unwrap_or(u64::MAX)
}

/// Formats wei as ether with trailing fractional zeros removed.
pub fn format_ether(wei: u128) -> String {
    let whole = wei / WEI_PER_ETHER;
    let fraction = wei % WEI_PER_ETHER;
    if fraction == 0 {
        return whole.to_string();
    }
    let fraction = format!("{fraction:018}");
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}
