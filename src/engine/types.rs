//! Data types shared by the engine, the HTTP handlers and the AI context.
//!
//! Metadata structs mirror the `information_schema` views they are read from
//! and serialize in camelCase for the browser UI.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::observability::Sensitive;

/// Unique identifier for a stored connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses the textual id handed out to clients.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// MySQL connection parameters held for the lifetime of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing, default)]
    pub password: Sensitive<String>,
}

impl ConnectionConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: Sensitive::new(password.into()),
        }
    }

    /// `host:port`, used as the default display name.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Universal value representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Result-set column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// A single row of data (indexed by column order)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Value>,
}

/// Column name to value, as sent by the data grid for inserts and updates.
pub type RowValues = BTreeMap<String, Value>;

/// Outcome of a single statement: either a result set or a write summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum QueryResult {
    ResultSet {
        fields: Vec<ColumnInfo>,
        rows: Vec<Row>,
        execution_time_ms: f64,
    },
    Affected {
        affected_rows: u64,
        insert_id: u64,
        execution_time_ms: f64,
    },
}

impl QueryResult {
    pub fn execution_time_ms(&self) -> f64 {
        match self {
            Self::ResultSet {
                execution_time_ms, ..
            }
            | Self::Affected {
                execution_time_ms, ..
            } => *execution_time_ms,
        }
    }

    pub fn rows(&self) -> &[Row] {
        match self {
            Self::ResultSet { rows, .. } => rows,
            Self::Affected { .. } => &[],
        }
    }

    pub fn fields(&self) -> &[ColumnInfo] {
        match self {
            Self::ResultSet { fields, .. } => fields,
            Self::Affected { .. } => &[],
        }
    }
}

/// Kind of entry in `information_schema.TABLES`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Table,
    View,
}

impl TableKind {
    pub fn from_table_type(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("VIEW") {
            Self::View
        } else {
            Self::Table
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableEntry {
    pub name: String,
    pub kind: TableKind,
}

/// Stored function or procedure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineInfo {
    pub name: String,
    pub routine_type: String,
}

/// Scheduled event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInfo {
    pub name: String,
    pub status: String,
    pub event_type: String,
    pub execute_at: Option<String>,
    pub interval_value: Option<String>,
    pub interval_field: Option<String>,
}

/// One row of `information_schema.COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    pub name: String,
    /// Bare type name, e.g. `varchar`
    pub data_type: String,
    /// Full column type, e.g. `varchar(64)` or `enum('a','b')`
    pub full_type: String,
    pub character_length: Option<u64>,
    pub numeric_precision: Option<u64>,
    pub numeric_scale: Option<u64>,
    pub nullable: bool,
    pub key: String,
    pub default_value: Option<String>,
    pub extra: String,
    pub comment: String,
}

/// The `DESCRIBE` shape of a column, also used as AI prompt context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
    pub key: String,
    pub default: Option<String>,
    pub extra: String,
}

impl From<&ColumnMetadata> for StructureColumn {
    fn from(column: &ColumnMetadata) -> Self {
        Self {
            name: column.name.clone(),
            column_type: column.full_type.clone(),
            nullable: column.nullable,
            key: column.key.clone(),
            default: column.default_value.clone(),
            extra: column.extra.clone(),
        }
    }
}

/// One column of one index (`information_schema.STATISTICS`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    pub name: String,
    pub column_name: String,
    pub seq_in_index: u32,
    pub index_type: String,
    pub non_unique: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyInfo {
    pub constraint_name: String,
    pub column_name: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub update_rule: String,
    pub delete_rule: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerInfo {
    pub name: String,
    pub event: String,
    pub timing: String,
    pub statement: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInfo {
    pub constraint_name: String,
    pub check_clause: String,
}

/// Whole-database column summary handed to the AI gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub database: String,
    pub tables: Vec<String>,
    pub schema: BTreeMap<String, Vec<StructureColumn>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_is_never_serialized() {
        let config = ConnectionConfig::new("db", 3306, "root", "hunter2");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("password"));
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn test_password_is_read_from_requests() {
        let config: ConnectionConfig = serde_json::from_str(
            r#"{"host":"h","port":3306,"user":"u","password":"p"}"#,
        )
        .unwrap();
        assert_eq!(config.password.expose(), "p");
        assert_eq!(config.address(), "h:3306");
    }

    #[test]
    fn test_query_result_shapes() {
        let rows = QueryResult::ResultSet {
            fields: vec![ColumnInfo {
                name: "id".into(),
                data_type: "INT".into(),
            }],
            rows: vec![Row {
                values: vec![Value::Int(1)],
            }],
            execution_time_ms: 1.5,
        };
        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(json["fields"][0]["name"], "id");
        assert_eq!(json["rows"][0]["values"][0], 1);

        let write = QueryResult::Affected {
            affected_rows: 2,
            insert_id: 7,
            execution_time_ms: 0.0,
        };
        let json = serde_json::to_value(&write).unwrap();
        assert_eq!(json["affectedRows"], 2);
        assert_eq!(json["insertId"], 7);
    }

    #[test]
    fn test_value_from_grid_json() {
        let values: RowValues =
            serde_json::from_str(r#"{"a":null,"b":3,"c":"x","d":1.5,"e":true}"#).unwrap();
        assert_eq!(values["a"], Value::Null);
        assert_eq!(values["b"], Value::Int(3));
        assert_eq!(values["c"], Value::Text("x".into()));
        assert_eq!(values["d"], Value::Float(1.5));
        assert_eq!(values["e"], Value::Bool(true));
    }

    #[test]
    fn test_session_id_parse() {
        let id = SessionId::new();
        assert_eq!(SessionId::parse(&id.to_string()), Some(id));
        assert_eq!(SessionId::parse("nope"), None);
    }
}
