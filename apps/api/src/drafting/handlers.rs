//! Axum route handlers for the Assistant API.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::documents::extract::extract_pdf_text;
use crate::documents::upload::UploadForm;
use crate::drafting::tasks::{
    run_task, AssistantTask, TaskKind, TaskOutput, CONTRACT_TYPES, DEFAULT_COUNTRY,
};
use crate::errors::AppError;
use crate::llm_client::ParamOverrides;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    #[serde(flatten)]
    pub task: AssistantTask,
    #[serde(default)]
    pub parameters: ParamOverrides,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub task: TaskKind,
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct ContractTypesResponse {
    pub contract_types: Vec<&'static str>,
    pub default_country: &'static str,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/assistant/tasks
///
/// Renders the task's prompt, sends it to the model and returns the generated text as-is.
pub async fn handle_run_task(
    State(state): State<AppState>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<TaskOutput>, AppError> {
    let output = run_task(
        state.llm.as_ref(),
        &state.config.generation,
        &request.task,
        &request.parameters,
    )
    .await?;
    Ok(Json(output))
}

/// POST /api/v1/assistant/tasks/preview
///
/// Returns the rendered prompt without calling the model.
pub async fn handle_preview_task(
    Json(request): Json<TaskRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    let prompt = request.task.render()?;
    Ok(Json(PreviewResponse {
        task: request.task.kind(),
        prompt,
    }))
}

/// POST /api/v1/assistant/tasks/upload
///
/// Multipart form: `task`, a PDF `file`, and for `compare` an `updated_file`.
/// An optional `max_new_tokens` field overrides the configured limit.
pub async fn handle_upload_task(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<TaskOutput>, AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let kind: TaskKind = form.field("task")?.parse()?;
    if kind == TaskKind::Draft {
        return Err(AppError::Validation(
            "draft does not take an uploaded document".to_string(),
        ));
    }

    let overrides = ParamOverrides {
        max_new_tokens: match form.fields.get("max_new_tokens").map(|v| v.trim()) {
            Some(raw) if !raw.is_empty() => Some(raw.parse().map_err(|_| {
                AppError::Validation(format!("max_new_tokens must be an integer, got '{raw}'"))
            })?),
            _ => None,
        },
        ..Default::default()
    };

    let document = extract_pdf_text(form.take_file("file")?.data).await?;
    let updated = match form.files.remove("updated_file") {
        Some(file) => Some(extract_pdf_text(file.data).await?),
        None => None,
    };
    let task = kind.with_documents(document, updated)?;

    let output = run_task(
        state.llm.as_ref(),
        &state.config.generation,
        &task,
        &overrides,
    )
    .await?;
    Ok(Json(output))
}

/// GET /api/v1/assistant/contract-types
pub async fn handle_contract_types() -> Json<ContractTypesResponse> {
    Json(ContractTypesResponse {
        contract_types: CONTRACT_TYPES.to_vec(),
        default_country: DEFAULT_COUNTRY,
    })
}
