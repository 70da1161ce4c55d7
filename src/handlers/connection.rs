//! Connection endpoints: test, store, list and dispose sessions.

use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::info;

use super::require_text;
use crate::engine::types::{ConnectionConfig, SessionId};
use crate::engine::EngineError;
use crate::server::request::ApiRequest;
use crate::server::response::{json_ok, json_with_status, success_response};
use crate::server::router::RouterError;
use crate::AppState;

const DEFAULT_PORT: u16 = 3306;

#[derive(Debug, Deserialize)]
pub struct ConnectionRequest {
    #[serde(default)]
    pub host: Option<String>,
    /// Number or numeric string
    #[serde(default)]
    pub port: Option<JsonValue>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub db_type: Option<String>,
}

impl ConnectionRequest {
    fn port(&self) -> Result<Option<u16>, RouterError> {
        let invalid = || RouterError::BadRequest("port must be between 1 and 65535".to_string());
        let port = match &self.port {
            None | Some(JsonValue::Null) => return Ok(None),
            Some(JsonValue::Number(n)) => n.as_u64().ok_or_else(invalid)?,
            Some(JsonValue::String(s)) if s.trim().is_empty() => return Ok(None),
            Some(JsonValue::String(s)) => s.trim().parse::<u64>().map_err(|_| invalid())?,
            Some(_) => return Err(invalid()),
        };
        match u16::try_from(port) {
            Ok(p) if p > 0 => Ok(Some(p)),
            _ => Err(invalid()),
        }
    }

    /// Validates the payload. When `type` is given it must be `mysql` and the
    /// port becomes mandatory; otherwise it defaults to 3306.
    pub fn into_config(self) -> Result<(ConnectionConfig, Option<String>), RouterError> {
        let port = self.port()?;
        let port = match &self.db_type {
            Some(kind) if !kind.eq_ignore_ascii_case("mysql") => {
                return Err(RouterError::Engine(EngineError::not_supported(format!(
                    "Only MySQL connections are supported, got '{kind}'"
                ))));
            }
            Some(_) => port.ok_or_else(|| RouterError::BadRequest("port is required".to_string()))?,
            None => port.unwrap_or(DEFAULT_PORT),
        };
        let host = require_text(&self.host, "host")?.to_string();
        let user = require_text(&self.user, "user")?.to_string();

        let config = ConnectionConfig::new(host, port, user, self.password.unwrap_or_default());
        Ok((config, self.name))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TestOutcome {
    connected: bool,
    address: String,
}

#[derive(Debug, Serialize)]
struct Disposed {
    id: SessionId,
}

/// `POST /api/connections/test`
pub async fn test_connection(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let (config, _) = req.json::<ConnectionRequest>()?.into_config()?;
    state.session_manager.test_connection(&config).await?;
    json_ok(TestOutcome {
        connected: true,
        address: config.address(),
    })
}

/// `POST /api/connections`
pub async fn create_connection(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let (config, name) = req.json::<ConnectionRequest>()?.into_config()?;
    let info = state.session_manager.connect(config, name).await?;
    info!(session_id = %info.id, "Connection created");
    json_with_status(StatusCode::CREATED, &success_response(info))
}

/// `GET /api/connections`
pub async fn list_connections(_req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    json_ok(state.session_manager.list_sessions().await)
}

/// `DELETE /api/connections/{id}`
pub async fn delete_connection(req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    let raw = req.param("id")?;
    let id = SessionId::parse(raw).ok_or_else(|| EngineError::session_not_found(raw))?;
    state.session_manager.disconnect(id).await?;
    json_ok(Disposed { id })
}
