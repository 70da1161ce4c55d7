// SPDX-License-Identifier: BUSL-1.1

//! AI endpoints: natural-language SQL generation and execution.

use hyper::body::Bytes;
use hyper::Response;
use serde::Deserialize;

use super::{require_text, session};
use crate::engine::schema_loader;
use crate::server::request::ApiRequest;
use crate::server::response::json_ok;
use crate::server::router::RouterError;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    database: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    #[serde(default)]
    sql: Option<String>,
    #[serde(default)]
    database: Option<String>,
}

/// `POST /api/ai/generate-sql` with `{prompt, connectionId, database}`
pub async fn generate_sql(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let body: GenerateRequest = req.json()?;
    let prompt = require_text(&body.prompt, "prompt")?;
    let database = require_text(&body.database, "database")?;
    let ctx = session(req, state).await?;

    let schema = schema_loader::load_database_schema(&ctx, database).await?;
    json_ok(state.ai.generate(prompt, &schema).await?)
}

/// `POST /api/ai/execute-sql` with `{sql, connectionId, database}`
pub async fn execute_sql(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let body: ExecuteRequest = req.json()?;
    let sql = require_text(&body.sql, "sql")?;
    let database = require_text(&body.database, "database")?;
    let ctx = session(req, state).await?;
    json_ok(ctx.execute(Some(database), sql).await?)
}

/// `GET /api/ai/status`
pub async fn status(_req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    json_ok(state.ai.status())
}
