//! Server configuration: command-line flags with environment fallbacks.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::ai::types::{AiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::engine::SessionSettings;
use crate::observability::{LogSettings, Sensitive};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Host address to bind to
    #[arg(long, env = "MYSQL_STUDIO_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "MYSQL_STUDIO_PORT", default_value_t = 3001)]
    pub port: u16,

    /// Request body read timeout in milliseconds
    #[arg(long, env = "MYSQL_STUDIO_REQUEST_TIMEOUT_MS", default_value_t = 30_000)]
    pub request_timeout_ms: u64,

    /// MySQL connect and connection-test timeout in milliseconds
    #[arg(long, env = "MYSQL_STUDIO_CONNECT_TIMEOUT_MS", default_value_t = 10_000)]
    pub connect_timeout_ms: u64,

    /// Drop connections unused for this many seconds (0 keeps them forever)
    #[arg(long, env = "MYSQL_STUDIO_SESSION_IDLE_SECS", default_value_t = 0)]
    pub session_idle_secs: u64,

    /// Write daily JSON log files here instead of logging to stdout
    #[arg(long, env = "MYSQL_STUDIO_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// API key for the completion service
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    pub ai_api_key: Option<String>,

    #[arg(long, env = "MYSQL_STUDIO_AI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub ai_base_url: String,

    #[arg(long, env = "MYSQL_STUDIO_AI_MODEL", default_value = DEFAULT_MODEL)]
    pub ai_model: String,

    #[arg(long, env = "MYSQL_STUDIO_AI_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub ai_timeout_secs: u64,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            test_timeout: self.connect_timeout(),
            idle_timeout: (self.session_idle_secs > 0)
                .then(|| Duration::from_secs(self.session_idle_secs)),
        }
    }

    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            log_dir: self.log_dir.clone(),
        }
    }

    pub fn ai_config(&self) -> AiConfig {
        AiConfig {
            api_key: self
                .ai_api_key
                .as_ref()
                .map(|k| Sensitive::new(k.trim().to_string())),
            base_url: Some(self.ai_base_url.clone()),
            model: Some(self.ai_model.clone()),
            timeout_secs: Some(self.ai_timeout_secs),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            session_idle_secs: 0,
            log_dir: None,
            ai_api_key: None,
            ai_base_url: DEFAULT_BASE_URL.to_string(),
            ai_model: DEFAULT_MODEL.to_string(),
            ai_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let config = ServerConfig::try_parse_from([
            "mysql-studio",
            "--port",
            "8080",
            "--session-idle-secs",
            "600",
            "--ai-model",
            "deepseek-chat",
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.session_settings().idle_timeout,
            Some(Duration::from_secs(600))
        );
        assert_eq!(config.ai_config().effective_model(), "deepseek-chat");
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:3001");
        assert_eq!(config.session_settings().idle_timeout, None);
        assert_eq!(config.session_settings().test_timeout, Duration::from_secs(10));
        assert!(!config.ai_config().has_key());
        assert!(config.log_settings().log_dir.is_none());
    }
}
