// MySQL Studio - web MySQL administration server
// Core library

pub mod ai;
pub mod config;
pub mod engine;
pub mod export;
pub mod handlers;
pub mod metrics;
pub mod observability;
pub mod server;

use std::sync::Arc;

use ai::AiGateway;
use config::ServerConfig;
use engine::{DataEngine, SessionManager};

/// Shared application state, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub session_manager: Arc<SessionManager>,
    pub ai: Arc<AiGateway>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, engine: Arc<dyn DataEngine>) -> Self {
        let ai = AiGateway::new(config.ai_config());
        Self::with_ai(config, engine, ai)
    }

    /// Same as [`AppState::new`] with a caller-supplied gateway.
    pub fn with_ai(config: ServerConfig, engine: Arc<dyn DataEngine>, ai: AiGateway) -> Self {
        let session_manager = Arc::new(SessionManager::new(engine, config.session_settings()));
        Self {
            session_manager,
            ai: Arc::new(ai),
            config: Arc::new(config),
        }
    }
}
