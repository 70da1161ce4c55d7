//! DataEngine trait definition
//!
//! The seam between the HTTP layer and the database. Every call receives the
//! stored [`ConnectionConfig`] and is expected to open its own connection,
//! run one statement and close it again. There is no pooling.

use async_trait::async_trait;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{
    CheckInfo, ColumnMetadata, ConnectionConfig, EventInfo, ForeignKeyInfo, IndexInfo,
    QueryResult, RoutineInfo, TableEntry, TriggerInfo, Value,
};

#[async_trait]
pub trait DataEngine: Send + Sync {
    /// Returns the unique identifier for this driver (e.g. "mysql")
    fn driver_id(&self) -> &'static str;

    /// Opens and closes a connection, reporting auth and reachability errors.
    async fn test_connection(&self, config: &ConnectionConfig) -> EngineResult<()>;

    /// Runs one statement verbatim, optionally scoped to `database`.
    async fn execute(
        &self,
        config: &ConnectionConfig,
        database: Option<&str>,
        sql: &str,
    ) -> EngineResult<QueryResult>;

    /// Runs one statement with `?` placeholders bound in order.
    async fn execute_bound(
        &self,
        config: &ConnectionConfig,
        database: Option<&str>,
        sql: &str,
        params: &[Value],
    ) -> EngineResult<QueryResult>;

    async fn list_databases(&self, config: &ConnectionConfig) -> EngineResult<Vec<String>>;

    async fn list_tables(
        &self,
        config: &ConnectionConfig,
        database: &str,
    ) -> EngineResult<Vec<TableEntry>>;

    /// Column metadata in ordinal order.
    async fn describe_columns(
        &self,
        config: &ConnectionConfig,
        database: &str,
        table: &str,
    ) -> EngineResult<Vec<ColumnMetadata>>;

    async fn list_routines(
        &self,
        _config: &ConnectionConfig,
        _database: &str,
    ) -> EngineResult<Vec<RoutineInfo>> {
        Err(EngineError::not_supported("routine listing"))
    }

    async fn list_events(
        &self,
        _config: &ConnectionConfig,
        _database: &str,
    ) -> EngineResult<Vec<EventInfo>> {
        Err(EngineError::not_supported("event listing"))
    }

    async fn list_indexes(
        &self,
        _config: &ConnectionConfig,
        _database: &str,
        _table: &str,
    ) -> EngineResult<Vec<IndexInfo>> {
        Err(EngineError::not_supported("index listing"))
    }

    async fn list_foreign_keys(
        &self,
        _config: &ConnectionConfig,
        _database: &str,
        _table: &str,
    ) -> EngineResult<Vec<ForeignKeyInfo>> {
        Err(EngineError::not_supported("foreign key listing"))
    }

    async fn list_triggers(
        &self,
        _config: &ConnectionConfig,
        _database: &str,
        _table: &str,
    ) -> EngineResult<Vec<TriggerInfo>> {
        Err(EngineError::not_supported("trigger listing"))
    }

    async fn list_checks(
        &self,
        _config: &ConnectionConfig,
        _database: &str,
        _table: &str,
    ) -> EngineResult<Vec<CheckInfo>> {
        Err(EngineError::not_supported("check constraint listing"))
    }

    /// Table comment, empty when none is set.
    async fn table_comment(
        &self,
        _config: &ConnectionConfig,
        _database: &str,
        _table: &str,
    ) -> EngineResult<String> {
        Err(EngineError::not_supported("table comments"))
    }

    /// `SHOW CREATE TABLE` text.
    async fn show_create_table(
        &self,
        _config: &ConnectionConfig,
        _database: &str,
        _table: &str,
    ) -> EngineResult<String> {
        Err(EngineError::not_supported("SHOW CREATE TABLE"))
    }
}
