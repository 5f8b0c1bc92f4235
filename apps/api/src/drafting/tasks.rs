//! Assistant tasks: one parameterized template per task, rendered and sent to the model verbatim.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::drafting::prompts::{
    CATEGORIZATION_PROMPT_TEMPLATE, CLAUSE_SUGGESTION_PROMPT_TEMPLATE, COMPARISON_PROMPT_TEMPLATE,
    COMPLIANCE_PROMPT_TEMPLATE, DRAFT_PROMPT_TEMPLATE, REVIEW_PROMPT_TEMPLATE,
};
use crate::drafting::template::fill_template;
use crate::errors::AppError;
use crate::llm_client::{GenerationParams, ParamOverrides, TextGenerator};

/// Contract types offered by the drafting form. Drafting also accepts free text.
pub const CONTRACT_TYPES: &[&str] = &[
    "NDA",
    "Employment Agreement",
    "Service Agreement",
    "Sales Agreement",
];

pub const DEFAULT_COUNTRY: &str = "the United States";

/// Upper bound on any single caller-supplied field, in characters.
pub const MAX_FIELD_CHARS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Draft,
    Review,
    SuggestClauses,
    CheckCompliance,
    Compare,
    Categorize,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Draft => "draft",
            TaskKind::Review => "review",
            TaskKind::SuggestClauses => "suggest_clauses",
            TaskKind::CheckCompliance => "check_compliance",
            TaskKind::Compare => "compare",
            TaskKind::Categorize => "categorize",
        }
    }

    /// Builds a document task from uploaded text. Comparison needs the updated version too.
    pub fn with_documents(
        self,
        document: String,
        updated: Option<String>,
    ) -> Result<AssistantTask, AppError> {
        match (self, updated) {
            (TaskKind::Review, _) => Ok(AssistantTask::Review {
                contract_text: document,
            }),
            (TaskKind::SuggestClauses, _) => Ok(AssistantTask::SuggestClauses {
                contract_text: document,
            }),
            (TaskKind::CheckCompliance, _) => Ok(AssistantTask::CheckCompliance {
                contract_text: document,
            }),
            (TaskKind::Categorize, _) => Ok(AssistantTask::Categorize {
                document_text: document,
            }),
            (TaskKind::Compare, Some(new_contract)) => Ok(AssistantTask::Compare {
                original_contract: document,
                new_contract,
            }),
            (TaskKind::Compare, None) => Err(AppError::Validation(
                "compare needs both the original and the updated document".to_string(),
            )),
            (TaskKind::Draft, _) => Err(AppError::Validation(
                "draft does not take an uploaded document".to_string(),
            )),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "draft" => Ok(TaskKind::Draft),
            "review" => Ok(TaskKind::Review),
            "suggest_clauses" => Ok(TaskKind::SuggestClauses),
            "check_compliance" => Ok(TaskKind::CheckCompliance),
            "compare" => Ok(TaskKind::Compare),
            "categorize" => Ok(TaskKind::Categorize),
            other => Err(AppError::Validation(format!("unknown task '{other}'"))),
        }
    }
}

/// A fully specified assistant request, tagged by `task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum AssistantTask {
    Draft {
        contract_type: String,
        party_one: String,
        party_two: String,
        contract_terms: String,
        #[serde(default)]
        country: Option<String>,
    },
    Review {
        contract_text: String,
    },
    SuggestClauses {
        contract_text: String,
    },
    CheckCompliance {
        contract_text: String,
    },
    Compare {
        original_contract: String,
        new_contract: String,
    },
    Categorize {
        document_text: String,
    },
}

impl AssistantTask {
    pub fn kind(&self) -> TaskKind {
        match self {
            AssistantTask::Draft { .. } => TaskKind::Draft,
            AssistantTask::Review { .. } => TaskKind::Review,
            AssistantTask::SuggestClauses { .. } => TaskKind::SuggestClauses,
            AssistantTask::CheckCompliance { .. } => TaskKind::CheckCompliance,
            AssistantTask::Compare { .. } => TaskKind::Compare,
            AssistantTask::Categorize { .. } => TaskKind::Categorize,
        }
    }

    /// Template and the (placeholder, value) pairs that fill it.
    fn template_and_fields(&self) -> (&'static str, Vec<(&'static str, &str)>) {
        match self {
            AssistantTask::Draft {
                contract_type,
                party_one,
                party_two,
                contract_terms,
                country,
            } => (
                DRAFT_PROMPT_TEMPLATE,
                vec![
                    ("contract_type", contract_type.trim()),
                    ("party_one", party_one.trim()),
                    ("party_two", party_two.trim()),
                    ("contract_terms", contract_terms.trim()),
                    (
                        "country",
                        country
                            .as_deref()
                            .map(str::trim)
                            .filter(|c| !c.is_empty())
                            .unwrap_or(DEFAULT_COUNTRY),
                    ),
                ],
            ),
            AssistantTask::Review { contract_text } => (
                REVIEW_PROMPT_TEMPLATE,
                vec![("contract_text", contract_text.trim())],
            ),
            AssistantTask::SuggestClauses { contract_text } => (
                CLAUSE_SUGGESTION_PROMPT_TEMPLATE,
                vec![("contract_text", contract_text.trim())],
            ),
            AssistantTask::CheckCompliance { contract_text } => (
                COMPLIANCE_PROMPT_TEMPLATE,
                vec![("contract_text", contract_text.trim())],
            ),
            AssistantTask::Compare {
                original_contract,
                new_contract,
            } => (
                COMPARISON_PROMPT_TEMPLATE,
                vec![
                    ("original_contract", original_contract.trim()),
                    ("new_contract", new_contract.trim()),
                ],
            ),
            AssistantTask::Categorize { document_text } => (
                CATEGORIZATION_PROMPT_TEMPLATE,
                vec![("document_text", document_text.trim())],
            ),
        }
    }

    /// Every caller-supplied field must be non-blank and within `MAX_FIELD_CHARS`.
    /// `country` is optional and defaults to `DEFAULT_COUNTRY`.
    pub fn validate(&self) -> Result<(), AppError> {
        let (_, fields) = self.template_and_fields();
        for (name, value) in fields {
            if value.is_empty() {
                return Err(AppError::Validation(format!("{name} cannot be empty")));
            }
            let chars = value.chars().count();
            if chars > MAX_FIELD_CHARS {
                return Err(AppError::Validation(format!(
                    "{name} is too long ({chars} chars, limit {MAX_FIELD_CHARS})"
                )));
            }
        }
        Ok(())
    }

    /// Renders the task's prompt. This is the single rendering path for every task.
    pub fn render(&self) -> Result<String, AppError> {
        self.validate()?;
        let (template, fields) = self.template_and_fields();
        fill_template(template, &fields)
    }
}

/// Result of one assistant task. `text` is the model output, unmodified.
#[derive(Debug, Serialize)]
pub struct TaskOutput {
    pub task: TaskKind,
    pub model_id: String,
    pub parameters: GenerationParams,
    pub text: String,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub stop_reason: Option<String>,
}

/// Validates, renders and runs a task against the model.
pub async fn run_task(
    generator: &dyn TextGenerator,
    defaults: &GenerationParams,
    task: &AssistantTask,
    overrides: &ParamOverrides,
) -> Result<TaskOutput, AppError> {
    let parameters = defaults.merged(overrides);
    parameters.validate().map_err(AppError::Validation)?;

    let prompt = task.render()?;
    let kind = task.kind();
    info!(
        "Running {} task ({} prompt chars, max_new_tokens={})",
        kind,
        prompt.chars().count(),
        parameters.max_new_tokens
    );

    let generation = generator
        .generate(&prompt, &parameters)
        .await
        .map_err(|e| AppError::Llm(format!("{kind} task failed: {e}")))?;

    Ok(TaskOutput {
        task: kind,
        model_id: generator.model_id().to_string(),
        parameters,
        text: generation.text,
        input_tokens: generation.input_tokens,
        output_tokens: generation.output_tokens,
        stop_reason: generation.stop_reason,
    })
}
