//! Matchit routing and the error-to-status mapping.

use std::collections::HashMap;
use std::time::Instant;

use hyper::body::{Body, Bytes};
use hyper::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use hyper::{Method, Request, Response, StatusCode};
use matchit::Router as MatchitRouter;
use percent_encoding::percent_decode_str;
use studio_ddl::DdlError;
use thiserror::Error;
use tracing::{error, info, warn};

use super::request::{parse_query, read_request_body_with_timeout, ApiRequest};
use super::response::{self, error_response};
use crate::ai::AiError;
use crate::engine::EngineError;
use crate::handlers::{ai, connection, data, database, ops, table};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Health,
    Metrics,
    Connections,
    ConnectionTest,
    Connection,
    Databases,
    Tables,
    PreviewCreate,
    Views,
    Functions,
    Events,
    Schema,
    Query,
    Columns,
    Fields,
    Structure,
    Indexes,
    ForeignKeys,
    Triggers,
    Checks,
    CreateSql,
    Comment,
    Data,
    Export,
    Alter,
    DesignerApply,
    AiGenerate,
    AiExecute,
    AiStatus,
}

const TABLE: &str = "/api/databases/{database}/tables/{table}";

fn routes() -> Vec<(String, Route)> {
    let mut routes: Vec<(String, Route)> = [
        ("/api/health", Route::Health),
        ("/api/metrics", Route::Metrics),
        ("/api/connections", Route::Connections),
        ("/api/connections/test", Route::ConnectionTest),
        ("/api/connections/{id}", Route::Connection),
        ("/api/databases", Route::Databases),
        ("/api/databases/{database}/tables", Route::Tables),
        ("/api/databases/{database}/tables/preview-create", Route::PreviewCreate),
        ("/api/databases/{database}/views", Route::Views),
        ("/api/databases/{database}/functions", Route::Functions),
        ("/api/databases/{database}/events", Route::Events),
        ("/api/databases/{database}/schema", Route::Schema),
        ("/api/databases/{database}/query", Route::Query),
        ("/api/designer/apply", Route::DesignerApply),
        ("/api/ai/generate-sql", Route::AiGenerate),
        ("/api/ai/execute-sql", Route::AiExecute),
        ("/api/ai/status", Route::AiStatus),
    ]
    .into_iter()
    .map(|(path, route)| (path.to_string(), route))
    .collect();

    let table_routes = [
        ("columns", Route::Columns),
        ("fields", Route::Fields),
        ("structure", Route::Structure),
        ("indexes", Route::Indexes),
        ("foreign-keys", Route::ForeignKeys),
        ("triggers", Route::Triggers),
        ("checks", Route::Checks),
        ("sql", Route::CreateSql),
        ("comment", Route::Comment),
        ("data", Route::Data),
        ("export", Route::Export),
        ("alter", Route::Alter),
    ];
    routes.extend(
        table_routes
            .into_iter()
            .map(|(suffix, route)| (format!("{TABLE}/{suffix}"), route)),
    );
    routes
}

impl Route {
    async fn handle(self, req: &ApiRequest, state: &AppState) -> Result<Response<Bytes>, RouterError> {
        let get = req.method == Method::GET;
        let post = req.method == Method::POST;

        match self {
            Route::Health if get => ops::health(req, state).await,
            Route::Metrics if get => ops::metrics(req, state).await,

            Route::Connections if get => connection::list_connections(req, state).await,
            Route::Connections if post => connection::create_connection(req, state).await,
            Route::ConnectionTest if post => connection::test_connection(req, state).await,
            Route::Connection if req.method == Method::DELETE => {
                connection::delete_connection(req, state).await
            }

            Route::Databases if get => database::list_databases(req, state).await,
            Route::Tables if get => database::list_tables(req, state).await,
            Route::Tables if post => table::create_table(req, state).await,
            Route::PreviewCreate if post => table::preview_create(req, state).await,
            Route::Views if get => database::list_views(req, state).await,
            Route::Functions if get => database::list_functions(req, state).await,
            Route::Events if get => database::list_events(req, state).await,
            Route::Schema if get => database::database_schema(req, state).await,
            Route::Query if post => database::execute_query(req, state).await,

            Route::Columns if get => table::columns(req, state).await,
            Route::Fields if get => table::fields(req, state).await,
            Route::Structure if get => table::structure(req, state).await,
            Route::Indexes if get => table::indexes(req, state).await,
            Route::ForeignKeys if get => table::foreign_keys(req, state).await,
            Route::Triggers if get => table::triggers(req, state).await,
            Route::Checks if get => table::checks(req, state).await,
            Route::CreateSql if get => table::create_sql(req, state).await,
            Route::Comment if get => table::get_comment(req, state).await,
            Route::Comment if post => table::update_comment(req, state).await,
            Route::Alter if post => table::alter_table(req, state).await,
            Route::DesignerApply if post => table::designer_apply(req, state).await,

            Route::Data if get => data::page(req, state).await,
            Route::Data if post => data::insert(req, state).await,
            Route::Data if req.method == Method::PUT => data::update(req, state).await,
            Route::Data if req.method == Method::DELETE => data::delete(req, state).await,
            Route::Export if get => data::export(req, state).await,

            Route::AiGenerate if post => ai::generate_sql(req, state).await,
            Route::AiExecute if post => ai::execute_sql(req, state).await,
            Route::AiStatus if get => ai::status(req, state).await,

            _ => Err(RouterError::MethodNotAllowed),
        }
    }
}

/// HTTP request router.
pub struct Router {
    inner: MatchitRouter<Route>,
    state: AppState,
}

impl Router {
    pub fn new(state: AppState) -> Result<Self, matchit::InsertError> {
        let mut inner = MatchitRouter::new();
        for (path, route) in routes() {
            inner.insert(path, route)?;
        }
        Ok(Self { inner, state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Routes one request. Errors are rendered into the error envelope here,
    /// so this always yields a response.
    pub async fn route<B>(&self, req: Request<B>) -> Response<Bytes>
    where
        B: Body<Data = Bytes>,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let mut response = match self.dispatch(req).await {
            Ok(response) => response,
            Err(err) => {
                let status = err.status();
                if status.is_server_error() {
                    error!(method = %method, path = %path, error = %err, "Request failed");
                } else {
                    warn!(method = %method, path = %path, error = %err, "Request rejected");
                }
                err.into_response()
            }
        };
        apply_cors(response.headers_mut());

        info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Request handled"
        );
        response
    }

    async fn dispatch<B>(&self, req: Request<B>) -> Result<Response<Bytes>, RouterError>
    where
        B: Body<Data = Bytes>,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        if req.method() == Method::OPTIONS {
            return response::empty(StatusCode::NO_CONTENT);
        }

        let (parts, body) = req.into_parts();
        let path = parts.uri.path().to_string();
        let (route, params) = match self.inner.at(&path) {
            Ok(matched) => {
                let params: HashMap<String, String> = matched
                    .params
                    .iter()
                    .map(|(k, v)| (k.to_string(), percent_decode_str(v).decode_utf8_lossy().into_owned()))
                    .collect();
                (*matched.value, params)
            }
            Err(_) => return Err(RouterError::NotFound(path)),
        };

        let body = if parts.method == Method::GET || parts.method == Method::HEAD {
            Bytes::new()
        } else {
            read_request_body_with_timeout(body, self.state.config.request_timeout_ms).await?
        };

        let request = ApiRequest {
            method: parts.method,
            path,
            params,
            query: parse_query(parts.uri.query()),
            body,
        };
        route.handle(&request, &self.state).await
    }
}

fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("No route found for {0}")]
    NotFound(String),

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    BadRequest(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Timed out reading the request body")]
    Timeout,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Ddl(#[from] DdlError),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error("Internal Error: {0}")]
    Internal(String),
}

impl RouterError {
    pub fn status(&self) -> StatusCode {
        match self {
            RouterError::NotFound(_) => StatusCode::NOT_FOUND,
            RouterError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RouterError::BadRequest(_) | RouterError::Ddl(_) => StatusCode::BAD_REQUEST,
            RouterError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RouterError::Timeout => StatusCode::REQUEST_TIMEOUT,
            RouterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RouterError::Engine(err) => match err {
                EngineError::ValidationError { .. }
                | EngineError::SyntaxError { .. }
                | EngineError::ExecutionError { .. } => StatusCode::BAD_REQUEST,
                EngineError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
                EngineError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
                EngineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                EngineError::ConnectionFailed { .. } => StatusCode::BAD_GATEWAY,
                EngineError::NotSupported { .. } => StatusCode::NOT_IMPLEMENTED,
                EngineError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            RouterError::Ai(err) => match err {
                AiError::MissingApiKey => StatusCode::SERVICE_UNAVAILABLE,
                AiError::InvalidApiKey => StatusCode::UNAUTHORIZED,
                AiError::InsufficientBalance => StatusCode::PAYMENT_REQUIRED,
                AiError::Api { .. } | AiError::Request(_) | AiError::MalformedResponse(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RouterError::NotFound(_) => "NOT_FOUND",
            RouterError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            RouterError::BadRequest(_) | RouterError::Ddl(_) => "VALIDATION_ERROR",
            RouterError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            RouterError::Timeout => "REQUEST_TIMEOUT",
            RouterError::Internal(_) => "INTERNAL_ERROR",
            RouterError::Engine(err) => err.code(),
            RouterError::Ai(err) => err.code(),
        }
    }

    /// Server messages for rejected SQL are passed through untouched.
    fn message(&self) -> String {
        match self {
            RouterError::Engine(
                EngineError::SyntaxError { message } | EngineError::ExecutionError { message },
            ) => message.clone(),
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            RouterError::Engine(
                err @ (EngineError::SyntaxError { .. } | EngineError::ExecutionError { .. }),
            ) => Some(err.to_string()),
            RouterError::Ai(AiError::Api { status, .. }) => Some(format!("upstream status {status}")),
            _ => None,
        }
    }

    pub fn into_response(self) -> Response<Bytes> {
        let status = self.status();
        let envelope = error_response(self.code(), self.message(), self.details());
        let body = serde_json::to_vec(&envelope).unwrap_or_else(|_| {
            br#"{"success":false,"error":{"code":"INTERNAL_ERROR","message":"Failed to serialize error","details":null}}"#.to_vec()
        });

        let mut response = Response::new(Bytes::from(body));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_table_builds() {
        let mut inner = MatchitRouter::new();
        for (path, route) in routes() {
            inner.insert(path, route).unwrap();
        }
        assert_eq!(*inner.at("/api/databases/shop/tables/preview-create").unwrap().value, Route::PreviewCreate);
        assert_eq!(*inner.at("/api/databases/shop/tables/orders/foreign-keys").unwrap().value, Route::ForeignKeys);
        let matched = inner.at("/api/databases/shop/tables/orders/data").unwrap();
        assert_eq!(matched.params.get("table"), Some("orders"));
        assert!(inner.at("/api/unknown").is_err());
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (RouterError::from(EngineError::validation("x")), 400),
            (RouterError::from(EngineError::session_not_found("x")), 404),
            (RouterError::from(EngineError::auth_failed("x")), 401),
            (RouterError::from(EngineError::timeout(5)), 504),
            (RouterError::from(EngineError::syntax_error("x")), 400),
            (RouterError::from(EngineError::execution_error("x")), 400),
            (RouterError::from(EngineError::internal("x")), 500),
            (RouterError::from(AiError::InsufficientBalance), 402),
            (RouterError::from(DdlError::MissingPrimaryKey), 400),
        ];
        for (err, status) in cases {
            assert_eq!(err.status().as_u16(), status, "{err:?}");
        }
    }

    #[test]
    fn test_sql_errors_keep_server_message() {
        let err = RouterError::from(EngineError::execution_error("Duplicate entry '1' for key 'PRIMARY'"));
        let response = err.into_response();
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "SQL_EXECUTION_ERROR");
        assert_eq!(body["error"]["message"], "Duplicate entry '1' for key 'PRIMARY'");
    }
}
