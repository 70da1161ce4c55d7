//! Session Manager
//!
//! The in-memory table of stored connections. A session is created only after
//! a successful connection test, and every request that touches MySQL resolves
//! its `connectionId` into a [`SessionContext`] here first.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{info, instrument, warn};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::sql_generator::BoundStatement;
use crate::engine::traits::DataEngine;
use crate::engine::types::{ConnectionConfig, QueryResult, SessionId};
use crate::metrics;

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub test_timeout: Duration,
    /// `None` keeps sessions until they are deleted or the process exits.
    pub idle_timeout: Option<Duration>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            test_timeout: Duration::from_millis(SessionManager::TEST_TIMEOUT_MS),
            idle_timeout: None,
        }
    }
}

struct ActiveSession {
    config: ConnectionConfig,
    name: String,
    created_at: DateTime<Utc>,
    last_used: Instant,
}

/// Public view of a session. Never carries the password.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: SessionId,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(rename = "type")]
    pub driver: &'static str,
    pub created_at: DateTime<Utc>,
}

pub struct SessionManager {
    engine: Arc<dyn DataEngine>,
    sessions: RwLock<HashMap<SessionId, ActiveSession>>,
    settings: SessionSettings,
}

impl SessionManager {
    const TEST_TIMEOUT_MS: u64 = 10000;

    pub fn new(engine: Arc<dyn DataEngine>, settings: SessionSettings) -> Self {
        Self {
            engine,
            sessions: RwLock::new(HashMap::new()),
            settings,
        }
    }

    pub fn engine(&self) -> Arc<dyn DataEngine> {
        Arc::clone(&self.engine)
    }

    /// Tests a connection without persisting it
    #[instrument(skip(self, config), fields(host = %config.host, port = config.port, user = %config.user))]
    pub async fn test_connection(&self, config: &ConnectionConfig) -> EngineResult<()> {
        let limit = self.settings.test_timeout;
        match timeout(limit, self.engine.test_connection(config)).await {
            Ok(result) => result,
            Err(_) => {
                metrics::record_timeout();
                Err(EngineError::timeout(limit.as_millis() as u64))
            }
        }
    }

    /// Tests the connection and stores it on success.
    #[instrument(skip(self, config, name), fields(host = %config.host, port = config.port, user = %config.user))]
    pub async fn connect(
        &self,
        config: ConnectionConfig,
        name: Option<String>,
    ) -> EngineResult<SessionInfo> {
        self.test_connection(&config).await?;

        let id = SessionId::new();
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| config.address());
        let session = ActiveSession {
            config,
            name,
            created_at: Utc::now(),
            last_used: Instant::now(),
        };
        let info = self.describe(id, &session);

        self.sessions.write().await.insert(id, session);
        info!(session_id = %id, "Connection stored");
        Ok(info)
    }

    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn disconnect(&self, session_id: SessionId) -> EngineResult<()> {
        self.sessions
            .write()
            .await
            .remove(&session_id)
            .map(|_| ())
            .ok_or_else(|| EngineError::session_not_found(session_id.to_string()))
    }

    /// Lists stored sessions, oldest first
    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().await;
        let mut infos: Vec<SessionInfo> = sessions
            .iter()
            .map(|(id, session)| self.describe(*id, session))
            .collect();
        infos.sort_by_key(|info| info.created_at);
        infos
    }

    /// Resolves a session and marks it as used.
    pub async fn session(&self, session_id: SessionId) -> EngineResult<SessionContext> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| EngineError::session_not_found(session_id.to_string()))?;
        session.last_used = Instant::now();

        Ok(SessionContext {
            id: session_id,
            config: session.config.clone(),
            engine: Arc::clone(&self.engine),
        })
    }

    /// Same as [`SessionManager::session`], for ids arriving as text.
    pub async fn resolve(&self, raw_id: &str) -> EngineResult<SessionContext> {
        let id = SessionId::parse(raw_id).ok_or_else(|| EngineError::session_not_found(raw_id))?;
        self.session(id).await
    }

    pub async fn session_exists(&self, session_id: SessionId) -> bool {
        self.sessions.read().await.contains_key(&session_id)
    }

    /// Drops sessions idle for longer than the configured timeout as of `now`.
    pub async fn purge_idle_at(&self, now: Instant) -> usize {
        let Some(idle) = self.settings.idle_timeout else {
            return 0;
        };
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| now.saturating_duration_since(s.last_used) <= idle);
        before - sessions.len()
    }

    /// Spawns the background idle sweep, if an idle timeout is configured.
    pub fn spawn_idle_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let idle = self.settings.idle_timeout?;
        let period = (idle / 2).max(Duration::from_secs(1));
        let manager = Arc::clone(self);

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let purged = manager.purge_idle_at(Instant::now()).await;
                if purged > 0 {
                    info!(purged, "Expired idle connections");
                }
            }
        }))
    }

    fn describe(&self, id: SessionId, session: &ActiveSession) -> SessionInfo {
        SessionInfo {
            id,
            name: session.name.clone(),
            host: session.config.host.clone(),
            port: session.config.port,
            user: session.config.user.clone(),
            driver: self.engine.driver_id(),
            created_at: session.created_at,
        }
    }
}

/// Per-request handle to a stored connection. All SQL issued on behalf of a
/// user goes through here so that it is timed and counted.
#[derive(Clone)]
pub struct SessionContext {
    id: SessionId,
    config: ConnectionConfig,
    engine: Arc<dyn DataEngine>,
}

impl SessionContext {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn engine(&self) -> &dyn DataEngine {
        self.engine.as_ref()
    }

    /// Runs SQL verbatim against `database`.
    #[instrument(skip(self, sql), fields(session_id = %self.id, database = ?database))]
    pub async fn execute(&self, database: Option<&str>, sql: &str) -> EngineResult<QueryResult> {
        let start = Instant::now();
        let result = self.engine.execute(&self.config, database, sql).await;
        record_outcome(start, &result);
        result
    }

    /// Runs a generated statement with bound parameters.
    #[instrument(skip(self, statement), fields(session_id = %self.id, database = ?database))]
    pub async fn execute_bound(
        &self,
        database: Option<&str>,
        statement: &BoundStatement,
    ) -> EngineResult<QueryResult> {
        let start = Instant::now();
        let result = self
            .engine
            .execute_bound(&self.config, database, &statement.sql, &statement.params)
            .await;
        record_outcome(start, &result);
        result
    }
}

fn record_outcome(start: Instant, result: &EngineResult<QueryResult>) {
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    match result {
        Ok(_) => metrics::record_query(elapsed_ms, true),
        Err(err) => {
            if matches!(err, EngineError::Timeout { .. }) {
                metrics::record_timeout();
            }
            metrics::record_query(elapsed_ms, false);
            warn!(error = %err, elapsed_ms, "Statement failed");
        }
    }
}
