//! MySQL Driver
//!
//! Implements the DataEngine trait for MySQL/MariaDB using SQLx. Each call
//! opens a dedicated connection, runs one statement and closes it.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, ConnectOptions, Connection, Executor, Row, Statement, TypeInfo};
use studio_ddl::quote_ident;
use tokio::time::timeout;
use tracing::{debug, instrument};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::DataEngine;
use crate::engine::types::{
    CheckInfo, ColumnInfo, ColumnMetadata, ConnectionConfig, EventInfo, ForeignKeyInfo,
    IndexInfo, QueryResult, RoutineInfo, Row as QRow, TableEntry, TableKind, TriggerInfo, Value,
};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// MySQL driver implementation
pub struct MySqlDriver {
    connect_timeout: Duration,
}

#[derive(sqlx::FromRow)]
struct ColumnRow {
    column_name: String,
    data_type: String,
    column_type: String,
    character_length: Option<u64>,
    numeric_precision: Option<u64>,
    numeric_scale: Option<u64>,
    is_nullable: String,
    column_key: String,
    column_default: Option<String>,
    extra: String,
    column_comment: String,
}

impl From<ColumnRow> for ColumnMetadata {
    fn from(row: ColumnRow) -> Self {
        Self {
            name: row.column_name,
            data_type: row.data_type,
            full_type: row.column_type,
            character_length: row.character_length,
            numeric_precision: row.numeric_precision,
            numeric_scale: row.numeric_scale,
            nullable: row.is_nullable.eq_ignore_ascii_case("YES"),
            key: row.column_key,
            default_value: row.column_default,
            extra: row.extra,
            comment: row.column_comment,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    name: String,
    status: String,
    event_type: String,
    execute_at: Option<String>,
    interval_value: Option<String>,
    interval_field: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ForeignKeyRow {
    constraint_name: String,
    column_name: String,
    referenced_table: String,
    referenced_column: String,
    update_rule: String,
    delete_rule: String,
}

impl MySqlDriver {
    pub fn new() -> Self {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    fn connect_options(config: &ConnectionConfig, database: Option<&str>) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(config.password.expose())
            .charset("utf8mb4");

        match database {
            Some(db) if !db.is_empty() => options.database(db),
            _ => options,
        }
    }

    async fn open(
        &self,
        config: &ConnectionConfig,
        database: Option<&str>,
    ) -> EngineResult<MySqlConnection> {
        let options = Self::connect_options(config, database);
        match timeout(self.connect_timeout, options.connect()).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(map_connect_error(e)),
            Err(_) => Err(EngineError::timeout(self.connect_timeout.as_millis() as u64)),
        }
    }

    async fn close(conn: MySqlConnection) {
        if let Err(e) = conn.close().await {
            debug!(error = %e, "Failed to close MySQL connection cleanly");
        }
    }

    /// Converts a SQLx row to our universal Row type
    fn convert_row(mysql_row: &MySqlRow) -> QRow {
        let values = (0..mysql_row.columns().len())
            .map(|idx| Self::extract_value(mysql_row, idx))
            .collect();
        QRow { values }
    }

    /// Decodes a cell by trying progressively looser Rust types.
    fn extract_value(row: &MySqlRow, idx: usize) -> Value {
        macro_rules! decode_as {
            ($ty:ty, $map:expr) => {
                if let Ok(v) = row.try_get::<Option<$ty>, _>(idx) {
                    return v.map($map).unwrap_or(Value::Null);
                }
            };
        }

        decode_as!(i64, Value::Int);
        decode_as!(u64, |u: u64| i64::try_from(u)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(u.to_string())));
        decode_as!(i32, |i: i32| Value::Int(i64::from(i)));
        decode_as!(u32, |u: u32| Value::Int(i64::from(u)));
        decode_as!(i16, |i: i16| Value::Int(i64::from(i)));
        decode_as!(u16, |u: u16| Value::Int(i64::from(u)));
        decode_as!(i8, |i: i8| Value::Int(i64::from(i)));
        decode_as!(u8, |u: u8| Value::Int(i64::from(u)));
        decode_as!(bool, Value::Bool);
        decode_as!(rust_decimal::Decimal, |d: rust_decimal::Decimal| Value::Text(
            d.to_string()
        ));
        decode_as!(f64, Value::Float);
        decode_as!(f32, |f: f32| Value::Float(f64::from(f)));
        decode_as!(String, Value::Text);
        decode_as!(chrono::NaiveDateTime, |dt: chrono::NaiveDateTime| Value::Text(
            dt.format("%Y-%m-%d %H:%M:%S").to_string()
        ));
        decode_as!(chrono::DateTime<chrono::Utc>, |dt: chrono::DateTime<chrono::Utc>| {
            Value::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string())
        });
        decode_as!(chrono::NaiveDate, |d: chrono::NaiveDate| Value::Text(
            d.format("%Y-%m-%d").to_string()
        ));
        decode_as!(chrono::NaiveTime, |t: chrono::NaiveTime| Value::Text(
            t.format("%H:%M:%S").to_string()
        ));
        decode_as!(serde_json::Value, Value::Json);
        decode_as!(Vec<u8>, |bytes: Vec<u8>| match String::from_utf8(bytes) {
            Ok(text) => Value::Text(text),
            Err(e) => Value::Bytes(e.into_bytes()),
        });

        Value::Null
    }

    fn column_info<'a>(columns: impl IntoIterator<Item = &'a sqlx::mysql::MySqlColumn>) -> Vec<ColumnInfo> {
        columns
            .into_iter()
            .map(|col| ColumnInfo {
                name: col.name().to_string(),
                data_type: col.type_info().name().to_string(),
            })
            .collect()
    }

    /// Column names of a result set, asking the server when there are no rows
    /// to read them from.
    async fn result_fields(conn: &mut MySqlConnection, sql: &str, rows: &[MySqlRow]) -> Vec<ColumnInfo> {
        if let Some(first) = rows.first() {
            return Self::column_info(first.columns());
        }
        match (&mut *conn).prepare(sql).await {
            Ok(stmt) => Self::column_info(stmt.columns()),
            Err(e) => {
                debug!(error = %e, "Could not prepare statement for column metadata");
                Vec::new()
            }
        }
    }

    async fn run(
        conn: &mut MySqlConnection,
        sql: &str,
        query: Query<'_, MySql, MySqlArguments>,
    ) -> EngineResult<QueryResult> {
        let start = Instant::now();

        if returns_rows(sql) {
            let mysql_rows = query.fetch_all(&mut *conn).await.map_err(map_query_error)?;
            let execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;

            let fields = Self::result_fields(conn, sql, &mysql_rows).await;

            Ok(QueryResult::ResultSet {
                fields,
                rows: mysql_rows.iter().map(Self::convert_row).collect(),
                execution_time_ms,
            })
        } else {
            let done = query.execute(&mut *conn).await.map_err(map_query_error)?;
            Ok(QueryResult::Affected {
                affected_rows: done.rows_affected(),
                insert_id: done.last_insert_id(),
                execution_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            })
        }
    }
}

impl Default for MySqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Statements whose results come back as rows rather than a write summary.
pub(crate) fn returns_rows(sql: &str) -> bool {
    let head = sql.trim_start().trim_start_matches('(').trim_start();
    let keyword: String = head
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();
    matches!(
        keyword.as_str(),
        "SELECT" | "SHOW" | "DESCRIBE" | "DESC" | "EXPLAIN" | "WITH" | "VALUES" | "TABLE"
    )
}

fn map_connect_error(err: sqlx::Error) -> EngineError {
    let msg = err.to_string();
    if msg.contains("Access denied") {
        EngineError::auth_failed(msg)
    } else {
        EngineError::connection_failed(msg)
    }
}

fn map_query_error(err: sqlx::Error) -> EngineError {
    match err {
        sqlx::Error::Database(db) => {
            let msg = db.message().to_string();
            if msg.contains("syntax") {
                EngineError::syntax_error(msg)
            } else {
                EngineError::execution_error(msg)
            }
        }
        other => EngineError::execution_error(other.to_string()),
    }
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.as_str()),
        Value::Bytes(b) => query.bind(b.as_slice()),
        Value::Json(j) => query.bind(j.to_string()),
    }
}

#[async_trait]
impl DataEngine for MySqlDriver {
    fn driver_id(&self) -> &'static str {
        "mysql"
    }

    #[instrument(skip(self, config), fields(host = %config.host, port = config.port, user = %config.user))]
    async fn test_connection(&self, config: &ConnectionConfig) -> EngineResult<()> {
        let mut conn = self.open(config, None).await?;
        let ping = conn.ping().await.map_err(map_query_error);
        Self::close(conn).await;
        ping
    }

    #[instrument(skip(self, config, sql), fields(host = %config.host, database = ?database))]
    async fn execute(
        &self,
        config: &ConnectionConfig,
        database: Option<&str>,
        sql: &str,
    ) -> EngineResult<QueryResult> {
        let mut conn = self.open(config, database).await?;
        // Raw statements go over the text protocol so that DDL and SHOW work.
        let result = Self::run_raw(&mut conn, sql).await;
        Self::close(conn).await;
        result
    }

    #[instrument(skip(self, config, sql, params), fields(host = %config.host, database = ?database, params = params.len()))]
    async fn execute_bound(
        &self,
        config: &ConnectionConfig,
        database: Option<&str>,
        sql: &str,
        params: &[Value],
    ) -> EngineResult<QueryResult> {
        let mut conn = self.open(config, database).await?;
        let query = params
            .iter()
            .fold(sqlx::query(sql), |query, value| bind_value(query, value));
        let result = Self::run(&mut conn, sql, query).await;
        Self::close(conn).await;
        result
    }

    #[instrument(skip(self, config), fields(host = %config.host))]
    async fn list_databases(&self, config: &ConnectionConfig) -> EngineResult<Vec<String>> {
        let mut conn = self.open(config, None).await?;
        let rows: Result<Vec<(String,)>, _> = sqlx::query_as(
            "SELECT CAST(SCHEMA_NAME AS CHAR) FROM information_schema.SCHEMATA ORDER BY SCHEMA_NAME",
        )
        .fetch_all(&mut conn)
        .await;
        Self::close(conn).await;

        Ok(rows
            .map_err(map_query_error)?
            .into_iter()
            .map(|(name,)| name)
            .collect())
    }

    #[instrument(skip(self, config), fields(host = %config.host))]
    async fn list_tables(
        &self,
        config: &ConnectionConfig,
        database: &str,
    ) -> EngineResult<Vec<TableEntry>> {
        let mut conn = self.open(config, None).await?;
        // Cast to CHAR to avoid BINARY type mismatch with Rust String
        let rows: Result<Vec<(String, String)>, _> = sqlx::query_as(
            r#"
            SELECT CAST(TABLE_NAME AS CHAR), CAST(TABLE_TYPE AS CHAR)
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = ?
            ORDER BY TABLE_NAME
            "#,
        )
        .bind(database)
        .fetch_all(&mut conn)
        .await;
        Self::close(conn).await;

        Ok(rows
            .map_err(map_query_error)?
            .into_iter()
            .map(|(name, table_type)| TableEntry {
                name,
                kind: TableKind::from_table_type(&table_type),
            })
            .collect())
    }

    #[instrument(skip(self, config), fields(host = %config.host))]
    async fn describe_columns(
        &self,
        config: &ConnectionConfig,
        database: &str,
        table: &str,
    ) -> EngineResult<Vec<ColumnMetadata>> {
        let mut conn = self.open(config, None).await?;
        let rows: Result<Vec<ColumnRow>, _> = sqlx::query_as(
            r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR) AS column_name,
                CAST(DATA_TYPE AS CHAR) AS data_type,
                CAST(COLUMN_TYPE AS CHAR) AS column_type,
                CAST(CHARACTER_MAXIMUM_LENGTH AS UNSIGNED) AS character_length,
                CAST(NUMERIC_PRECISION AS UNSIGNED) AS numeric_precision,
                CAST(NUMERIC_SCALE AS UNSIGNED) AS numeric_scale,
                CAST(IS_NULLABLE AS CHAR) AS is_nullable,
                CAST(COLUMN_KEY AS CHAR) AS column_key,
                CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
                CAST(EXTRA AS CHAR) AS extra,
                CAST(COLUMN_COMMENT AS CHAR) AS column_comment
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
            "#,
        )
        .bind(database)
        .bind(table)
        .fetch_all(&mut conn)
        .await;
        Self::close(conn).await;

        Ok(rows
            .map_err(map_query_error)?
            .into_iter()
            .map(ColumnMetadata::from)
            .collect())
    }

    async fn list_routines(
        &self,
        config: &ConnectionConfig,
        database: &str,
    ) -> EngineResult<Vec<RoutineInfo>> {
        let mut conn = self.open(config, None).await?;
        let rows: Result<Vec<(String, String)>, _> = sqlx::query_as(
            r#"
            SELECT CAST(ROUTINE_NAME AS CHAR), CAST(ROUTINE_TYPE AS CHAR)
            FROM information_schema.ROUTINES
            WHERE ROUTINE_SCHEMA = ?
            ORDER BY ROUTINE_NAME
            "#,
        )
        .bind(database)
        .fetch_all(&mut conn)
        .await;
        Self::close(conn).await;

        Ok(rows
            .map_err(map_query_error)?
            .into_iter()
            .map(|(name, routine_type)| RoutineInfo { name, routine_type })
            .collect())
    }

    async fn list_events(
        &self,
        config: &ConnectionConfig,
        database: &str,
    ) -> EngineResult<Vec<EventInfo>> {
        let mut conn = self.open(config, None).await?;
        let rows: Result<Vec<EventRow>, _> = sqlx::query_as(
            r#"
            SELECT
                CAST(EVENT_NAME AS CHAR) AS name,
                CAST(STATUS AS CHAR) AS status,
                CAST(EVENT_TYPE AS CHAR) AS event_type,
                CAST(EXECUTE_AT AS CHAR) AS execute_at,
                CAST(INTERVAL_VALUE AS CHAR) AS interval_value,
                CAST(INTERVAL_FIELD AS CHAR) AS interval_field
            FROM information_schema.EVENTS
            WHERE EVENT_SCHEMA = ?
            ORDER BY EVENT_NAME
            "#,
        )
        .bind(database)
        .fetch_all(&mut conn)
        .await;
        Self::close(conn).await;

        Ok(rows
            .map_err(map_query_error)?
            .into_iter()
            .map(|row| EventInfo {
                name: row.name,
                status: row.status,
                event_type: row.event_type,
                execute_at: row.execute_at,
                interval_value: row.interval_value,
                interval_field: row.interval_field,
            })
            .collect())
    }

    async fn list_indexes(
        &self,
        config: &ConnectionConfig,
        database: &str,
        table: &str,
    ) -> EngineResult<Vec<IndexInfo>> {
        let mut conn = self.open(config, None).await?;
        let rows: Result<Vec<(String, Option<String>, u64, String, u64)>, _> = sqlx::query_as(
            r#"
            SELECT
                CAST(INDEX_NAME AS CHAR),
                CAST(COLUMN_NAME AS CHAR),
                CAST(SEQ_IN_INDEX AS UNSIGNED),
                CAST(INDEX_TYPE AS CHAR),
                CAST(NON_UNIQUE AS UNSIGNED)
            FROM information_schema.STATISTICS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
            "#,
        )
        .bind(database)
        .bind(table)
        .fetch_all(&mut conn)
        .await;
        Self::close(conn).await;

        Ok(rows
            .map_err(map_query_error)?
            .into_iter()
            .map(|(name, column, seq, index_type, non_unique)| IndexInfo {
                name,
                column_name: column.unwrap_or_default(),
                seq_in_index: u32::try_from(seq).unwrap_or(u32::MAX),
                index_type,
                non_unique: non_unique != 0,
            })
            .collect())
    }

    async fn list_foreign_keys(
        &self,
        config: &ConnectionConfig,
        database: &str,
        table: &str,
    ) -> EngineResult<Vec<ForeignKeyInfo>> {
        let mut conn = self.open(config, None).await?;
        let rows: Result<Vec<ForeignKeyRow>, _> = sqlx::query_as(
            r#"
            SELECT
                CAST(k.CONSTRAINT_NAME AS CHAR) AS constraint_name,
                CAST(k.COLUMN_NAME AS CHAR) AS column_name,
                CAST(k.REFERENCED_TABLE_NAME AS CHAR) AS referenced_table,
                CAST(k.REFERENCED_COLUMN_NAME AS CHAR) AS referenced_column,
                CAST(r.UPDATE_RULE AS CHAR) AS update_rule,
                CAST(r.DELETE_RULE AS CHAR) AS delete_rule
            FROM information_schema.KEY_COLUMN_USAGE k
            JOIN information_schema.REFERENTIAL_CONSTRAINTS r
              ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
             AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME
             AND r.TABLE_NAME = k.TABLE_NAME
            WHERE k.TABLE_SCHEMA = ? AND k.TABLE_NAME = ?
              AND k.REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION
            "#,
        )
        .bind(database)
        .bind(table)
        .fetch_all(&mut conn)
        .await;
        Self::close(conn).await;

        Ok(rows
            .map_err(map_query_error)?
            .into_iter()
            .map(|row| ForeignKeyInfo {
                constraint_name: row.constraint_name,
                column_name: row.column_name,
                referenced_table: row.referenced_table,
                referenced_column: row.referenced_column,
                update_rule: row.update_rule,
                delete_rule: row.delete_rule,
            })
            .collect())
    }

    async fn list_triggers(
        &self,
        config: &ConnectionConfig,
        database: &str,
        table: &str,
    ) -> EngineResult<Vec<TriggerInfo>> {
        let mut conn = self.open(config, None).await?;
        let rows: Result<Vec<(String, String, String, String)>, _> = sqlx::query_as(
            r#"
            SELECT
                CAST(TRIGGER_NAME AS CHAR),
                CAST(EVENT_MANIPULATION AS CHAR),
                CAST(ACTION_TIMING AS CHAR),
                CAST(ACTION_STATEMENT AS CHAR)
            FROM information_schema.TRIGGERS
            WHERE EVENT_OBJECT_SCHEMA = ? AND EVENT_OBJECT_TABLE = ?
            ORDER BY TRIGGER_NAME
            "#,
        )
        .bind(database)
        .bind(table)
        .fetch_all(&mut conn)
        .await;
        Self::close(conn).await;

        Ok(rows
            .map_err(map_query_error)?
            .into_iter()
            .map(|(name, event, timing, statement)| TriggerInfo {
                name,
                event,
                timing,
                statement,
            })
            .collect())
    }

    async fn list_checks(
        &self,
        config: &ConnectionConfig,
        database: &str,
        table: &str,
    ) -> EngineResult<Vec<CheckInfo>> {
        let mut conn = self.open(config, None).await?;
        // CHECK_CONSTRAINTS exists from MySQL 8.0.16.
        let rows: Result<Vec<(String, String)>, _> = sqlx::query_as(
            r#"
            SELECT CAST(tc.CONSTRAINT_NAME AS CHAR), CAST(cc.CHECK_CLAUSE AS CHAR)
            FROM information_schema.TABLE_CONSTRAINTS tc
            JOIN information_schema.CHECK_CONSTRAINTS cc
              ON cc.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
             AND cc.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
            WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ?
              AND tc.CONSTRAINT_TYPE = 'CHECK'
            ORDER BY tc.CONSTRAINT_NAME
            "#,
        )
        .bind(database)
        .bind(table)
        .fetch_all(&mut conn)
        .await;
        Self::close(conn).await;

        Ok(rows
            .map_err(map_query_error)?
            .into_iter()
            .map(|(constraint_name, check_clause)| CheckInfo {
                constraint_name,
                check_clause,
            })
            .collect())
    }

    async fn table_comment(
        &self,
        config: &ConnectionConfig,
        database: &str,
        table: &str,
    ) -> EngineResult<String> {
        let mut conn = self.open(config, None).await?;
        let row: Result<Option<(Option<String>,)>, _> = sqlx::query_as(
            r#"
            SELECT CAST(TABLE_COMMENT AS CHAR)
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            "#,
        )
        .bind(database)
        .bind(table)
        .fetch_optional(&mut conn)
        .await;
        Self::close(conn).await;

        match row.map_err(map_query_error)? {
            Some((comment,)) => Ok(comment.unwrap_or_default()),
            None => Err(EngineError::execution_error(format!(
                "Table '{database}.{table}' doesn't exist"
            ))),
        }
    }

    async fn show_create_table(
        &self,
        config: &ConnectionConfig,
        database: &str,
        table: &str,
    ) -> EngineResult<String> {
        let sql = format!(
            "SHOW CREATE TABLE {}.{}",
            quote_ident(database),
            quote_ident(table)
        );
        let mut conn = self.open(config, None).await?;
        let row = (&mut conn).fetch_one(sql.as_str()).await;
        Self::close(conn).await;

        let row = row.map_err(map_query_error)?;
        row.try_get::<String, _>(1)
            .or_else(|_| {
                row.try_get::<Vec<u8>, _>(1)
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            })
            .map_err(|e| EngineError::internal(e.to_string()))
    }
}

impl MySqlDriver {
    /// Text-protocol execution for statements the server cannot prepare.
    async fn run_raw(conn: &mut MySqlConnection, sql: &str) -> EngineResult<QueryResult> {
        let start = Instant::now();

        if returns_rows(sql) {
            let mysql_rows = (&mut *conn).fetch_all(sql).await.map_err(map_query_error)?;
            let execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;
            let fields = Self::result_fields(conn, sql, &mysql_rows).await;

            Ok(QueryResult::ResultSet {
                fields,
                rows: mysql_rows.iter().map(Self::convert_row).collect(),
                execution_time_ms,
            })
        } else {
            let done = (&mut *conn).execute(sql).await.map_err(map_query_error)?;
            Ok(QueryResult::Affected {
                affected_rows: done.rows_affected(),
                insert_id: done.last_insert_id(),
                execution_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returns_rows_detection() {
        assert!(returns_rows("select * from t"));
        assert!(returns_rows("  SHOW TABLES"));
        assert!(returns_rows("(SELECT 1) UNION (SELECT 2)"));
        assert!(returns_rows("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(returns_rows("desc users"));
        assert!(!returns_rows("DESCRIBEX"));
        assert!(!returns_rows("INSERT INTO t VALUES (1)"));
        assert!(!returns_rows("ALTER TABLE t ADD COLUMN c INT"));
        assert!(!returns_rows(""));
    }

    #[test]
    fn test_non_database_errors_are_execution_errors() {
        let err = map_query_error(sqlx::Error::Protocol("bad packet".into()));
        assert!(matches!(err, EngineError::ExecutionError { .. }));
    }

    #[test]
    fn test_connect_error_mapping() {
        let err = map_connect_error(sqlx::Error::Protocol(
            "Access denied for user 'root'@'localhost'".into(),
        ));
        assert!(matches!(err, EngineError::AuthenticationFailed { .. }));

        let err = map_connect_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, EngineError::ConnectionFailed { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_fast() {
        let driver = MySqlDriver::with_connect_timeout(Duration::from_secs(2));
        let config = ConnectionConfig::new("127.0.0.1", 1, "root", "");
        let err = driver.test_connection(&config).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::ConnectionFailed { .. } | EngineError::Timeout { .. }
        ));
    }
}
