// SPDX-License-Identifier: BUSL-1.1

//! AI Gateway: natural language to SQL, followed by a model-side review of
//! the generated statement.

use std::sync::Arc;

use tracing::{instrument, warn};

use super::context::{
    build_generation_prompt, build_validation_prompt, format_schema_for_prompt,
    VALIDATION_USER_PROMPT,
};
use super::provider::{extract_query_from_response, AIProvider, ChatCompletionsProvider};
use super::safety::analyze_sql;
use super::types::{AiConfig, AiError, AiStatus, GeneratedSql, Sampling, SqlValidation};
use crate::engine::types::DatabaseSchema;

pub struct AiGateway {
    config: AiConfig,
    provider: Option<Arc<dyn AIProvider>>,
}

impl AiGateway {
    /// Builds the HTTP provider. Without an API key the gateway still answers
    /// status calls but every completion fails with [`AiError::MissingApiKey`].
    pub fn new(config: AiConfig) -> Self {
        let provider = match ChatCompletionsProvider::from_config(&config) {
            Ok(p) => Some(Arc::new(p) as Arc<dyn AIProvider>),
            Err(AiError::MissingApiKey) => None,
            Err(e) => {
                warn!(error = %e, "AI provider unavailable");
                None
            }
        };
        Self { config, provider }
    }

    pub fn with_provider(config: AiConfig, provider: Arc<dyn AIProvider>) -> Self {
        Self {
            config,
            provider: Some(provider),
        }
    }

    pub fn status(&self) -> AiStatus {
        AiStatus {
            has_key: self.provider.is_some(),
            model: self.config.effective_model(),
            base_url: self.config.effective_base_url(),
        }
    }

    fn provider(&self) -> Result<&Arc<dyn AIProvider>, AiError> {
        self.provider.as_ref().ok_or(AiError::MissingApiKey)
    }

    /// Asks the model for a single statement answering `prompt`.
    #[instrument(skip_all, fields(prompt_len = prompt.len()))]
    pub async fn generate_sql(&self, prompt: &str, schema_description: &str) -> Result<String, AiError> {
        let system = build_generation_prompt(schema_description);
        let reply = self
            .provider()?
            .complete(&system, prompt, Sampling::GENERATION)
            .await?;

        let sql = extract_query_from_response(&reply).unwrap_or_else(|| reply.trim().to_string());
        if sql.is_empty() {
            return Err(AiError::MalformedResponse("empty completion".into()));
        }
        Ok(sql)
    }

    /// Asks the model to review `sql`. Transport and API errors propagate; an
    /// unreadable verdict does not.
    #[instrument(skip_all, fields(sql_len = sql.len()))]
    pub async fn validate_sql(&self, sql: &str, schema_description: &str) -> Result<SqlValidation, AiError> {
        let system = build_validation_prompt(sql, schema_description);
        let reply = self
            .provider()?
            .complete(&system, VALIDATION_USER_PROMPT, Sampling::VALIDATION)
            .await?;
        Ok(parse_validation(&reply, sql))
    }

    /// Generation, validation and local safety analysis in one call.
    pub async fn generate(&self, prompt: &str, schema: &DatabaseSchema) -> Result<GeneratedSql, AiError> {
        let description = format_schema_for_prompt(schema, prompt);
        let sql = self.generate_sql(prompt, &description).await?;
        let validation = self.validate_sql(&sql, &description).await?;
        let safety = analyze_sql(&sql);
        Ok(GeneratedSql {
            sql,
            validation,
            safety,
        })
    }
}

/// Reads the validation verdict, tolerating code fences and surrounding prose.
pub fn parse_validation(reply: &str, sql: &str) -> SqlValidation {
    let body = extract_query_from_response(reply).unwrap_or_else(|| reply.trim().to_string());
    let candidate = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body.as_str(),
    };

    match serde_json::from_str::<SqlValidation>(candidate) {
        Ok(validation) => validation,
        Err(e) => {
            warn!(error = %e, "Validation reply was not valid JSON");
            SqlValidation::unparseable(sql)
        }
    }
}
