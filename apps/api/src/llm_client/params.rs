use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const MAX_NEW_TOKENS_LIMIT: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodingMethod {
    Greedy,
    Sample,
}

impl fmt::Display for DecodingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodingMethod::Greedy => f.write_str("greedy"),
            DecodingMethod::Sample => f.write_str("sample"),
        }
    }
}

impl FromStr for DecodingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "greedy" => Ok(DecodingMethod::Greedy),
            "sample" => Ok(DecodingMethod::Sample),
            other => Err(format!("unknown decoding method '{other}' (expected greedy or sample)")),
        }
    }
}

/// Generation parameters forwarded to the hosted model with every prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub decoding_method: DecodingMethod,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            decoding_method: DecodingMethod::Sample,
            max_new_tokens: 800,
            temperature: 0.7,
            top_k: 50,
            top_p: 0.9,
        }
    }
}

impl GenerationParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_new_tokens == 0 || self.max_new_tokens > MAX_NEW_TOKENS_LIMIT {
            return Err(format!(
                "max_new_tokens must be between 1 and {MAX_NEW_TOKENS_LIMIT}, got {}",
                self.max_new_tokens
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            ));
        }
        if self.top_k == 0 {
            return Err("top_k must be at least 1".to_string());
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(format!("top_p must be in (0, 1], got {}", self.top_p));
        }
        Ok(())
    }

    /// Applies per-request overrides on top of these parameters.
    pub fn merged(&self, overrides: &ParamOverrides) -> Self {
        Self {
            decoding_method: overrides.decoding_method.unwrap_or(self.decoding_method),
            max_new_tokens: overrides.max_new_tokens.unwrap_or(self.max_new_tokens),
            temperature: overrides.temperature.unwrap_or(self.temperature),
            top_k: overrides.top_k.unwrap_or(self.top_k),
            top_p: overrides.top_p.unwrap_or(self.top_p),
        }
    }
}

/// Optional per-request overrides. Absent fields fall back to the configured defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParamOverrides {
    pub decoding_method: Option<DecodingMethod>,
    pub max_new_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
}
