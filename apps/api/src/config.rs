use std::str::FromStr;

use anyhow::{Context, Result};

use crate::llm_client::{DecodingMethod, GenerationParams};

pub const DEFAULT_MODEL_ID: &str = "ibm/granite-13b-chat-v2";
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub watsonx_api_key: String,
    pub watsonx_url: String,
    pub watsonx_project_id: String,
    pub watsonx_model_id: String,
    pub watsonx_iam_url: String,
    pub generation: GenerationParams,
    /// `None` disables the ledger routes.
    pub ledger: Option<LedgerConfig>,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub default_account: String,
    pub receipt_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = GenerationParams::default();
        let generation = GenerationParams {
            decoding_method: parse_env("GEN_DECODING_METHOD", DecodingMethod::Sample)?,
            max_new_tokens: parse_env("GEN_MAX_NEW_TOKENS", defaults.max_new_tokens)?,
            temperature: parse_env("GEN_TEMPERATURE", defaults.temperature)?,
            top_k: parse_env("GEN_TOP_K", defaults.top_k)?,
            top_p: parse_env("GEN_TOP_P", defaults.top_p)?,
        };
        generation
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid GEN_* generation defaults")?;

        let ledger = match optional_env("LEDGER_RPC_URL") {
            Some(rpc_url) => Some(LedgerConfig {
                rpc_url,
                default_account: require_env("LEDGER_DEFAULT_ACCOUNT")
                    .context("LEDGER_DEFAULT_ACCOUNT is required when LEDGER_RPC_URL is set")?,
                receipt_timeout_secs: parse_env("LEDGER_RECEIPT_TIMEOUT_SECS", 120)?,
                poll_interval_ms: parse_env("LEDGER_POLL_INTERVAL_MS", 2000)?,
            }),
            None => None,
        };

        Ok(Config {
            watsonx_api_key: require_env("WATSONX_APIKEY")?,
            watsonx_url: require_env("WATSONX_URL")?,
            watsonx_project_id: require_env("PROJECT_ID")?,
            watsonx_model_id: optional_env("WATSONX_MODEL_ID")
                .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            watsonx_iam_url: optional_env("WATSONX_IAM_URL")
                .unwrap_or_else(|| DEFAULT_IAM_URL.to_string()),
            generation,
            ledger,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

#[cfg(test)]
impl Config {
    /// Fixed configuration for handler tests: no ledger, default generation params.
    pub fn for_tests() -> Self {
        Config {
            watsonx_api_key: "test-key".to_string(),
            watsonx_url: "http://127.0.0.1:9".to_string(),
            watsonx_project_id: "test-project".to_string(),
            watsonx_model_id: DEFAULT_MODEL_ID.to_string(),
            watsonx_iam_url: DEFAULT_IAM_URL.to_string(),
            generation: GenerationParams::default(),
            ledger: None,
            port: 0,
            rust_log: "info".to_string(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
