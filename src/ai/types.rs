// SPDX-License-Identifier: BUSL-1.1

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Sensitive;

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_MODEL: &str = "deepseek-coder";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Shown when the validation reply is not the JSON object we asked for.
pub const UNPARSEABLE_VALIDATION_NOTE: &str =
    "Could not parse the validation response as JSON. Please review the SQL syntax manually.";

/// Sampling parameters for one completion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Sampling {
    pub const GENERATION: Sampling = Sampling {
        temperature: 0.3,
        max_tokens: 1000,
    };
    pub const VALIDATION: Sampling = Sampling {
        temperature: 0.1,
        max_tokens: 1000,
    };
}

/// Settings for the completion API
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<Sensitive<String>>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl AiConfig {
    pub fn effective_model(&self) -> String {
        self.model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn effective_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn effective_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn has_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_blank())
    }
}

/// Errors returned by the completion gateway.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("No AI API key is configured. Set DEEPSEEK_API_KEY to enable SQL generation.")]
    MissingApiKey,

    #[error("The AI API key is invalid. Check that the key is correct.")]
    InvalidApiKey,

    #[error("The AI account balance is insufficient. Top up the account and try again.")]
    InsufficientBalance,

    #[error("AI API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("AI request failed: {0}")]
    Request(String),

    #[error("AI response was malformed: {0}")]
    MalformedResponse(String),
}

impl AiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "AI_NOT_CONFIGURED",
            Self::InvalidApiKey => "AI_INVALID_KEY",
            Self::InsufficientBalance => "AI_INSUFFICIENT_BALANCE",
            Self::Api { .. } => "AI_API_ERROR",
            Self::Request(_) => "AI_REQUEST_FAILED",
            Self::MalformedResponse(_) => "AI_MALFORMED_RESPONSE",
        }
    }
}

/// Structured verdict produced by the validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlValidation {
    pub is_valid: bool,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
    #[serde(default)]
    pub improved_query: Option<String>,
}

impl SqlValidation {
    /// The verdict used when the model's reply cannot be parsed.
    pub fn unparseable(sql: &str) -> Self {
        Self {
            is_valid: true,
            errors: None,
            suggestions: Some(vec![UNPARSEABLE_VALIDATION_NOTE.to_string()]),
            improved_query: Some(sql.to_string()),
        }
    }
}

/// Local, parser-based risk assessment of a statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyInfo {
    pub is_mutation: bool,
    pub is_dangerous: bool,
    pub warnings: Vec<String>,
}

/// Response of the generate-sql endpoint
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedSql {
    pub sql: String,
    pub validation: SqlValidation,
    pub safety: SafetyInfo,
}

/// Reported by the status endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiStatus {
    pub has_key: bool,
    pub model: String,
    pub base_url: String,
}
