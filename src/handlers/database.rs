//! Schema browsing and the free-form query endpoint.

use hyper::body::Bytes;
use hyper::Response;
use serde::Deserialize;

use super::{require_text, session};
use crate::engine::schema_loader;
use crate::engine::types::{TableEntry, TableKind};
use crate::server::request::ApiRequest;
use crate::server::response::json_ok;
use crate::server::router::RouterError;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct QueryRequest {
    #[serde(default)]
    query: Option<String>,
}

/// `GET /api/databases`
pub async fn list_databases(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let ctx = session(req, state).await?;
    json_ok(ctx.engine().list_databases(ctx.config()).await?)
}

/// `GET /api/databases/{database}/tables`
pub async fn list_tables(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let ctx = session(req, state).await?;
    let database = req.param("database")?;
    json_ok(ctx.engine().list_tables(ctx.config(), database).await?)
}

/// `GET /api/databases/{database}/views`
pub async fn list_views(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let ctx = session(req, state).await?;
    let database = req.param("database")?;
    let views: Vec<TableEntry> = ctx
        .engine()
        .list_tables(ctx.config(), database)
        .await?
        .into_iter()
        .filter(|entry| entry.kind == TableKind::View)
        .collect();
    json_ok(views)
}

/// `GET /api/databases/{database}/functions`
pub async fn list_functions(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let ctx = session(req, state).await?;
    let database = req.param("database")?;
    json_ok(ctx.engine().list_routines(ctx.config(), database).await?)
}

/// `GET /api/databases/{database}/events`
pub async fn list_events(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let ctx = session(req, state).await?;
    let database = req.param("database")?;
    json_ok(ctx.engine().list_events(ctx.config(), database).await?)
}

/// `GET /api/databases/{database}/schema`
pub async fn database_schema(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let ctx = session(req, state).await?;
    let database = req.param("database")?;
    json_ok(schema_loader::load_database_schema(&ctx, database).await?)
}

/// `POST /api/databases/{database}/query`
pub async fn execute_query(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let body: QueryRequest = req.json()?;
    let query = require_text(&body.query, "query")?;
    let ctx = session(req, state).await?;
    let database = req.param("database")?;
    json_ok(ctx.execute(Some(database), query).await?)
}
