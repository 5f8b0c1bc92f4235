//! Axum route handlers for the Ledger API.
//!
//! Every handler validates its input before asking for the ledger, so a malformed
//! request gets a 400 even when no ledger is configured.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Deserialize;

use crate::documents::extract::extract_pdf_text;
use crate::documents::upload::UploadForm;
use crate::errors::AppError;
use crate::ledger::storage::creation_code;
use crate::ledger::store::{
    deploy_contract_text, fetch_contract_text, ledger_status, ContractRecord, Deployment,
    LedgerStatus,
};
use crate::ledger::verify::{verify_at, Verification};
use crate::ledger::{parse_address, Address};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DeployRequest {
    pub contract_text: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub address: String,
    pub contract_text: String,
}

fn address_param(raw: &str) -> Result<Address, AppError> {
    parse_address(raw.trim()).map_err(|e| AppError::Validation(format!("invalid address '{raw}': {e}")))
}

/// GET /api/v1/ledger/status
pub async fn handle_status(State(state): State<AppState>) -> Result<Json<LedgerStatus>, AppError> {
    let ledger = state.ledger()?;
    let status = ledger_status(ledger.client.as_ref(), &ledger.account).await?;
    Ok(Json(status))
}

/// POST /api/v1/ledger/contracts
///
/// Stores the contract text on-chain and returns the new contract address.
pub async fn handle_deploy(
    State(state): State<AppState>,
    Json(request): Json<DeployRequest>,
) -> Result<Json<Deployment>, AppError> {
    creation_code(&request.contract_text).map_err(|e| AppError::Validation(e.to_string()))?;

    let ledger = state.ledger()?;
    let deployment = deploy_contract_text(
        ledger.client.as_ref(),
        &ledger.account,
        &request.contract_text,
        ledger.polling,
    )
    .await?;
    Ok(Json(deployment))
}

/// GET /api/v1/ledger/contracts/:address
pub async fn handle_get_contract(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ContractRecord>, AppError> {
    let address = address_param(&address)?;
    let ledger = state.ledger()?;
    let record = fetch_contract_text(ledger.client.as_ref(), &address).await?;
    Ok(Json(record))
}

/// POST /api/v1/ledger/verify
pub async fn handle_verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<Verification>, AppError> {
    let address = address_param(&request.address)?;
    let ledger = state.ledger()?;
    let verification = verify_at(ledger.client.as_ref(), &address, &request.contract_text).await?;
    Ok(Json(verification))
}

/// POST /api/v1/ledger/verify/upload
///
/// Multipart form: `address` plus a PDF `file`. The file's text layer is verified.
pub async fn handle_verify_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Verification>, AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let address = address_param(form.field("address")?)?;
    let candidate = extract_pdf_text(form.take_file("file")?.data).await?;

    let ledger = state.ledger()?;
    let verification = verify_at(ledger.client.as_ref(), &address, &candidate).await?;
    Ok(Json(verification))
}
