use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::{Config, LedgerConfig};
use crate::errors::AppError;
use crate::ledger::store::ReceiptPolling;
use crate::ledger::{parse_address, Address, Ledger, RpcLedger};
use crate::llm_client::TextGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Model backend. `WatsonxClient` in production; swapped for a fake in tests.
    pub llm: Arc<dyn TextGenerator>,
    /// `None` when `LEDGER_RPC_URL` is unset.
    pub ledger: Option<LedgerHandle>,
    pub config: Config,
}

/// A ledger client together with the account deploys are sent from.
#[derive(Clone)]
pub struct LedgerHandle {
    pub client: Arc<dyn Ledger>,
    pub account: Address,
    pub polling: ReceiptPolling,
}

impl LedgerHandle {
    pub fn connect(config: &LedgerConfig) -> Result<Self> {
        let account = parse_address(&config.default_account)
            .with_context(|| format!("LEDGER_DEFAULT_ACCOUNT '{}' is not a valid address", config.default_account))?;
        let client = RpcLedger::new(config.rpc_url.clone())
            .with_context(|| format!("Could not create ledger client for {}", config.rpc_url))?;
        Ok(LedgerHandle {
            client: Arc::new(client),
            account,
            polling: ReceiptPolling {
                interval: Duration::from_millis(config.poll_interval_ms),
                timeout: Duration::from_secs(config.receipt_timeout_secs),
            },
        })
    }
}

impl AppState {
    pub fn ledger(&self) -> Result<&LedgerHandle, AppError> {
        self.ledger.as_ref().ok_or(AppError::LedgerUnavailable)
    }
}
