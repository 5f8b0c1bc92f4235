/// LLM Client — the single point of entry for all hosted-model calls in Counsel.
///
/// ARCHITECTURAL RULE: No other module may call the watsonx.ai API directly.
/// Handlers depend on the `TextGenerator` trait; `WatsonxClient` is the production backend.
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;

pub mod params;

pub use params::{DecodingMethod, GenerationParams, ParamOverrides};

const API_VERSION: &str = "2023-05-29";
const IAM_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";
const MAX_RETRIES: u32 = 3;
/// Tokens are refreshed this long before IAM says they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("IAM token exchange failed (status {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned no results")]
    EmptyContent,
}

/// Text returned by the model, plus the accounting the endpoint reports.
#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    pub text: String,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub stop_reason: Option<String>,
}

/// The seam between prompt-building code and the hosted model.
///
/// Carried in `AppState` as `Arc<dyn TextGenerator>`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Generation, LlmError>;

    fn model_id(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct TextGenerationRequest<'a> {
    model_id: &'a str,
    input: &'a str,
    project_id: &'a str,
    parameters: WatsonxParameters,
}

/// Wire form of `GenerationParams`. Sampling knobs are omitted for greedy decoding.
#[derive(Debug, Serialize, PartialEq)]
struct WatsonxParameters {
    decoding_method: DecodingMethod,
    max_new_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

impl From<&GenerationParams> for WatsonxParameters {
    fn from(params: &GenerationParams) -> Self {
        let sampling = params.decoding_method == DecodingMethod::Sample;
        Self {
            decoding_method: params.decoding_method,
            max_new_tokens: params.max_new_tokens,
            temperature: sampling.then_some(params.temperature),
            top_k: sampling.then_some(params.top_k),
            top_p: sampling.then_some(params.top_p),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TextGenerationResponse {
    results: Vec<TextGenerationResult>,
}

#[derive(Debug, Deserialize)]
struct TextGenerationResult {
    generated_text: String,
    generated_token_count: Option<u32>,
    input_token_count: Option<u32>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WatsonxErrorBody {
    errors: Vec<WatsonxErrorItem>,
}

#[derive(Debug, Deserialize)]
struct WatsonxErrorItem {
    message: String,
}

#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Connection settings for `WatsonxClient`.
#[derive(Debug, Clone)]
pub struct WatsonxSettings {
    pub api_key: String,
    pub base_url: String,
    pub iam_url: String,
    pub project_id: String,
    pub model_id: String,
}

impl WatsonxSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.watsonx_api_key.clone(),
            base_url: config.watsonx_url.clone(),
            iam_url: config.watsonx_iam_url.clone(),
            project_id: config.watsonx_project_id.clone(),
            model_id: config.watsonx_model_id.clone(),
        }
    }
}

/// watsonx.ai text-generation client with IAM token caching and retry.
#[derive(Clone)]
pub struct WatsonxClient {
    client: Client,
    settings: WatsonxSettings,
    token: Arc<Mutex<Option<CachedToken>>>,
    retry_base_delay: Duration,
}

impl WatsonxClient {
    pub fn new(settings: WatsonxSettings) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            settings,
            token: Arc::new(Mutex::new(None)),
            retry_base_delay: Duration::from_millis(1000),
        })
    }

    /// Overrides the first backoff step (1s by default); later steps double it.
    #[cfg(test)]
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    fn generation_url(&self) -> String {
        format!(
            "{}/ml/v1/text/generation?version={API_VERSION}",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn token_url(&self) -> String {
        format!("{}/identity/token", self.settings.iam_url.trim_end_matches('/'))
    }

    /// Returns a cached bearer token, exchanging the API key for a new one when stale.
    async fn bearer_token(&self) -> Result<String, LlmError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.is_fresh(Instant::now()) {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .client
            .post(self.token_url())
            .header("accept", "application/json")
            .form(&[
                ("grant_type", IAM_GRANT_TYPE),
                ("apikey", self.settings.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Auth {
                status: status.as_u16(),
                message,
            });
        }

        let token: IamTokenResponse = response.json().await?;
        info!("Obtained IAM token (expires in {}s)", token.expires_in);

        let value = token.access_token.clone();
        *guard = Some(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }
}

#[async_trait]
impl TextGenerator for WatsonxClient {
    /// Sends one prompt to the text-generation endpoint.
    /// Retries on 401 (after dropping the cached token), 429 and 5xx with exponential backoff.
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Generation, LlmError> {
        let request_body = TextGenerationRequest {
            model_id: &self.settings.model_id,
            input: prompt,
            project_id: &self.settings.project_id,
            parameters: WatsonxParameters::from(params),
        };
        let url = self.generation_url();

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = self.retry_base_delay * (1 << (attempt - 1));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let token = self.bearer_token().await?;

            let response = self
                .client
                .post(&url)
                .bearer_auth(&token)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::UNAUTHORIZED {
                self.invalidate_token().await;
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: "bearer token rejected".to_string(),
                });
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: error_message(body),
                });
            }

            let parsed: TextGenerationResponse = response.json().await?;
            let result = parsed
                .results
                .into_iter()
                .next()
                .ok_or(LlmError::EmptyContent)?;

            debug!(
                "LLM call succeeded: input_tokens={:?}, output_tokens={:?}, stop_reason={:?}",
                result.input_token_count, result.generated_token_count, result.stop_reason
            );

            return Ok(Generation {
                text: result.generated_text,
                input_tokens: result.input_token_count,
                output_tokens: result.generated_token_count,
                stop_reason: result.stop_reason,
            });
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    fn model_id(&self) -> &str {
        &self.settings.model_id
    }
}

/// Pulls the human-readable messages out of a watsonx error body, falling back to the raw body.
fn error_message(body: String) -> String {
    match serde_json::from_str::<WatsonxErrorBody>(&body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; "),
        _ => body,
    }
}
