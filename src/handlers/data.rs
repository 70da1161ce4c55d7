//! Data grid endpoints: paging, row writes and spreadsheet export.

use hyper::body::Bytes;
use hyper::Response;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::session;
use crate::engine::sql_generator::{self, MAX_PAGE_SIZE};
use crate::engine::types::{QueryResult, RowValues};
use crate::export::xlsx::{export_filename, header_labels, XlsxWriter, XLSX_CONTENT_TYPE};
use crate::server::request::ApiRequest;
use crate::server::response::{attachment, json_ok};
use crate::server::router::RouterError;
use crate::AppState;

const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct RowWrite {
    #[serde(default)]
    data: RowValues,
    #[serde(default, rename = "where")]
    filter: RowValues,
}

#[derive(Debug, Serialize)]
struct DataPage {
    #[serde(flatten)]
    result: QueryResult,
    limit: u32,
    offset: u64,
}

fn table_params(req: &ApiRequest) -> Result<(&str, &str), RouterError> {
    Ok((req.param("database")?, req.param("table")?))
}

/// `GET .../tables/{table}/data?limit=100&offset=0`
pub async fn page(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let limit = req
        .query_number("limit", DEFAULT_PAGE_SIZE)?
        .clamp(1, MAX_PAGE_SIZE);
    let offset = req.query_number("offset", 0u64)?;
    let ctx = session(req, state).await?;
    let (database, table) = table_params(req)?;

    let statement = sql_generator::generate_select_page(database, table, limit, offset);
    let result = ctx.execute_bound(Some(database), &statement).await?;
    json_ok(DataPage {
        result,
        limit,
        offset,
    })
}

/// `POST .../tables/{table}/data` with `{data}`
pub async fn insert(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let body: RowWrite = req.json()?;
    let (database, table) = table_params(req)?;
    let statement = sql_generator::generate_insert(database, table, &body.data)?;

    let ctx = session(req, state).await?;
    json_ok(ctx.execute_bound(Some(database), &statement).await?)
}

/// `PUT .../tables/{table}/data` with `{data, where}`
pub async fn update(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let body: RowWrite = req.json()?;
    let (database, table) = table_params(req)?;
    let statement = sql_generator::generate_update(database, table, &body.data, &body.filter)?;

    let ctx = session(req, state).await?;
    json_ok(ctx.execute_bound(Some(database), &statement).await?)
}

/// `DELETE .../tables/{table}/data` with `{where}`; an empty filter is rejected.
pub async fn delete(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let body: RowWrite = req.json()?;
    let (database, table) = table_params(req)?;
    let statement = sql_generator::generate_delete(database, table, &body.filter)?;

    let ctx = session(req, state).await?;
    json_ok(ctx.execute_bound(Some(database), &statement).await?)
}

/// `GET .../tables/{table}/export`: the whole table as an `.xlsx` attachment.
pub async fn export(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let ctx = session(req, state).await?;
    let (database, table) = table_params(req)?;

    let result = ctx
        .execute(Some(database), &sql_generator::generate_select_all(database, table))
        .await?;
    let columns = ctx.engine().describe_columns(ctx.config(), database, table).await?;
    let labels = header_labels(result.fields(), &columns);

    let sheet = table.to_string();
    let (bytes, rows) = tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, u32), String> {
        let mut writer = XlsxWriter::new(&sheet)?;
        writer.write_header(&labels)?;
        for row in result.rows() {
            writer.write_row(row)?;
        }
        let rows = writer.rows_written();
        Ok((writer.finish()?, rows))
    })
    .await
    .map_err(|e| RouterError::Internal(format!("Export task failed: {}", e)))?
    .map_err(RouterError::Internal)?;

    let filename = export_filename(table, chrono::Local::now().date_naive());
    info!(database, table, rows, bytes = bytes.len(), "Table exported");
    attachment(bytes, XLSX_CONTENT_TYPE, &filename)
}
