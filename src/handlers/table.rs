//! Table metadata endpoints and the table designer.

use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use studio_ddl::{
    synthesize_alter, AlterOutcome, EditContext, FieldOperation, FieldSpec, TableDefinition,
};
use tracing::info;

use super::session;
use crate::engine::schema_loader;
use crate::engine::sql_generator;
use crate::engine::types::StructureColumn;
use crate::server::request::ApiRequest;
use crate::server::response::{json_ok, json_with_status, success_response};
use crate::server::router::RouterError;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct CreateTableRequest {
    name: String,
    fields: Vec<FieldSpec>,
}

#[derive(Debug, Deserialize)]
struct AlterTableRequest {
    fields: Vec<FieldSpec>,
    original: Vec<FieldSpec>,
}

#[derive(Debug, Deserialize)]
struct CommentRequest {
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DesignerRequest {
    definition: TableDefinition,
    operation: FieldOperation,
}

#[derive(Debug, Serialize)]
struct SqlText {
    sql: String,
}

#[derive(Debug, Serialize)]
struct TableComment {
    comment: String,
}

#[derive(Debug, Serialize)]
struct CreatedTable {
    sql: String,
    fields: Vec<FieldSpec>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum AlterResponse {
    NoChanges,
    Preview {
        sql: String,
        dropped: Vec<String>,
        added: Vec<String>,
        modified: Vec<String>,
    },
    Applied {
        sql: String,
        fields: Vec<FieldSpec>,
    },
}

fn table_params(req: &ApiRequest) -> Result<(&str, &str), RouterError> {
    Ok((req.param("database")?, req.param("table")?))
}

/// `GET .../tables/{table}/columns`
pub async fn columns(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let ctx = session(req, state).await?;
    let (database, table) = table_params(req)?;
    json_ok(ctx.engine().describe_columns(ctx.config(), database, table).await?)
}

/// `GET .../tables/{table}/fields`: the designer's view of the table.
pub async fn fields(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let ctx = session(req, state).await?;
    let (database, table) = table_params(req)?;
    json_ok(schema_loader::load_columns(&ctx, database, table).await?)
}

/// `GET .../tables/{table}/structure`
pub async fn structure(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let ctx = session(req, state).await?;
    let (database, table) = table_params(req)?;
    let columns = ctx.engine().describe_columns(ctx.config(), database, table).await?;
    let structure: Vec<StructureColumn> = columns.iter().map(StructureColumn::from).collect();
    json_ok(structure)
}

pub async fn indexes(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let ctx = session(req, state).await?;
    let (database, table) = table_params(req)?;
    json_ok(ctx.engine().list_indexes(ctx.config(), database, table).await?)
}

pub async fn foreign_keys(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let ctx = session(req, state).await?;
    let (database, table) = table_params(req)?;
    json_ok(ctx.engine().list_foreign_keys(ctx.config(), database, table).await?)
}

pub async fn triggers(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let ctx = session(req, state).await?;
    let (database, table) = table_params(req)?;
    json_ok(ctx.engine().list_triggers(ctx.config(), database, table).await?)
}

pub async fn checks(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let ctx = session(req, state).await?;
    let (database, table) = table_params(req)?;
    json_ok(ctx.engine().list_checks(ctx.config(), database, table).await?)
}

/// `GET .../tables/{table}/sql`
pub async fn create_sql(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let ctx = session(req, state).await?;
    let (database, table) = table_params(req)?;
    let sql = ctx.engine().show_create_table(ctx.config(), database, table).await?;
    json_ok(SqlText { sql })
}

pub async fn get_comment(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let ctx = session(req, state).await?;
    let (database, table) = table_params(req)?;
    let comment = ctx.engine().table_comment(ctx.config(), database, table).await?;
    json_ok(TableComment { comment })
}

pub async fn update_comment(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let body: CommentRequest = req.json()?;
    let comment = body.comment.unwrap_or_default();
    let ctx = session(req, state).await?;
    let (database, table) = table_params(req)?;

    let sql = sql_generator::generate_table_comment(database, table, &comment);
    ctx.execute(Some(database), &sql).await?;
    json_ok(TableComment { comment })
}

/// `POST /api/designer/apply`: one field operation, returning the
/// normalized definition.
pub async fn designer_apply(req: &ApiRequest, _state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let DesignerRequest {
        mut definition,
        operation,
    } = req.json()?;
    definition.apply(operation)?;
    json_ok(definition)
}

fn create_definition(body: CreateTableRequest) -> TableDefinition {
    let mut definition = TableDefinition {
        name: body.name.trim().to_string(),
        fields: body.fields,
        context: EditContext::Create,
    };
    definition.normalize();
    definition
}

/// `POST /api/databases/{database}/tables/preview-create`
pub async fn preview_create(req: &ApiRequest, _state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let definition = create_definition(req.json()?);
    let sql = definition.synthesize_create()?;
    json_ok(SqlText { sql })
}

/// `POST /api/databases/{database}/tables`
pub async fn create_table(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let definition = create_definition(req.json()?);
    let sql = definition.synthesize_create()?;

    let ctx = session(req, state).await?;
    let database = req.param("database")?;
    ctx.execute(Some(database), &sql).await?;
    info!(database, table = %definition.name, "Table created");

    let fields = schema_loader::load_columns(&ctx, database, &definition.name).await?;
    json_with_status(StatusCode::CREATED, &success_response(CreatedTable { sql, fields }))
}

/// `POST .../tables/{table}/alter`, with `?dryRun=true` to only preview.
pub async fn alter_table(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let AlterTableRequest {
        mut fields,
        mut original,
    } = req.json()?;
    let (database, table) = table_params(req)?;
    // Both sides go through the same pass so untouched fields compare equal.
    for field in fields.iter_mut().chain(original.iter_mut()) {
        field.normalize(EditContext::Alter);
    }

    let statement = match synthesize_alter(table, &fields, &original)? {
        AlterOutcome::NoChanges => return json_ok(AlterResponse::NoChanges),
        AlterOutcome::Statement(statement) => statement,
    };

    if req.query_flag("dryRun") {
        return json_ok(AlterResponse::Preview {
            sql: statement.sql,
            dropped: statement.dropped,
            added: statement.added,
            modified: statement.modified,
        });
    }

    let ctx = session(req, state).await?;
    ctx.execute(Some(database), &statement.sql).await?;
    info!(
        database,
        table,
        dropped = statement.dropped.len(),
        added = statement.added.len(),
        modified = statement.modified.len(),
        "Table altered"
    );

    let fields = schema_loader::load_columns(&ctx, database, table).await?;
    json_ok(AlterResponse::Applied {
        sql: statement.sql,
        fields,
    })
}
