//! HTTP endpoint implementations, grouped by resource.
//!
//! Every handler takes the routed [`ApiRequest`] and the shared [`AppState`]
//! and returns a ready response or a [`RouterError`].

pub mod ai;
pub mod connection;
pub mod data;
pub mod database;
pub mod ops;
pub mod table;

use crate::engine::SessionContext;
use crate::server::request::ApiRequest;
use crate::server::router::RouterError;
use crate::AppState;

/// Resolves the request's `connectionId` to a live session.
pub(crate) async fn session(req: &ApiRequest, state: &AppState) -> Result<SessionContext, RouterError> {
    let id = req.connection_id()?;
    Ok(state.session_manager.resolve(&id).await?)
}

pub(crate) fn require_text<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, RouterError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RouterError::BadRequest(format!("{name} is required")))
}
