use hyper::body::Bytes;
use hyper::Response;
use serde::Serialize;

use crate::metrics;
use crate::server::request::ApiRequest;
use crate::server::response::json_ok;
use crate::server::router::RouterError;
use crate::AppState;

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
    sessions: usize,
}

/// `GET /api/health`
pub async fn health(_req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
    json_ok(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.session_manager.list_sessions().await.len(),
    })
}

/// `GET /api/metrics`
pub async fn metrics(_req: &ApiRequest, _state: &AppState) -> Result<Response<Bytes>, RouterError> {
    json_ok(metrics::snapshot())
}
