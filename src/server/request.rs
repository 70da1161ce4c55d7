//! Request parsing helpers shared by every handler.

use std::collections::HashMap;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::Method;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time;

use super::router::RouterError;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Reads the whole body, bounded in both time and size.
pub async fn read_request_body_with_timeout<B>(body: B, timeout_ms: u64) -> Result<Bytes, RouterError>
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let timeout_duration = time::Duration::from_millis(timeout_ms);
    let collected = time::timeout(timeout_duration, Limited::new(body, MAX_BODY_BYTES).collect())
        .await
        .map_err(|_| RouterError::Timeout)?
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                RouterError::PayloadTooLarge(MAX_BODY_BYTES)
            } else {
                RouterError::BadRequest(format!("Failed to read request body: {}", e))
            }
        })?;
    Ok(collected.to_bytes())
}

/// Decodes a query string into a map. Later duplicates win.
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// A request after routing: path parameters resolved and body buffered.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Bytes,
}

impl ApiRequest {
    pub fn param(&self, name: &str) -> Result<&str, RouterError> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| RouterError::BadRequest(format!("Missing path parameter '{name}'")))
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Parses a numeric query parameter, falling back to `default` when absent.
    pub fn query_number<T: std::str::FromStr>(&self, name: &str, default: T) -> Result<T, RouterError> {
        match self.query_param(name) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| {
                RouterError::BadRequest(format!("Invalid {name} value '{raw}'"))
            }),
        }
    }

    pub fn query_flag(&self, name: &str) -> bool {
        self.query_param(name)
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
    }

    /// Deserializes the JSON body. An empty body is read as `{}`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RouterError> {
        let bytes: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &self.body
        };
        serde_json::from_slice(bytes)
            .map_err(|e| RouterError::BadRequest(format!("Failed to parse request: {}", e)))
    }

    /// The target connection: `?connectionId=` first, then the body field.
    pub fn connection_id(&self) -> Result<String, RouterError> {
        if let Some(id) = self.query_param("connectionId") {
            return Ok(id.to_string());
        }
        serde_json::from_slice::<JsonValue>(&self.body)
            .ok()
            .and_then(|body| body.get("connectionId").cloned())
            .and_then(|id| match id {
                JsonValue::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .ok_or_else(|| RouterError::BadRequest("connectionId is required".to_string()))
    }
}
