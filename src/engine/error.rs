// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for the MySQL engine layer.
//!
//! Driver errors, session lookups and designer validation failures are all
//! folded into [`EngineError`] so the HTTP layer has a single mapping point.

use serde::{Deserialize, Serialize};
use studio_ddl::DdlError;
use thiserror::Error;

/// Unified error type for all engine operations
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum EngineError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Query syntax error: {message}")]
    SyntaxError { message: String },

    #[error("Query execution error: {message}")]
    ExecutionError { message: String },

    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Connection not found or expired: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Feature not supported: {message}")]
    NotSupported { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl EngineError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: msg.into() }
    }

    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::AuthenticationFailed { message: msg.into() }
    }

    pub fn syntax_error(msg: impl Into<String>) -> Self {
        Self::SyntaxError { message: msg.into() }
    }

    pub fn execution_error(msg: impl Into<String>) -> Self {
        Self::ExecutionError { message: msg.into() }
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::SessionNotFound { session_id: id.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal { message: msg.into() }
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported { message: msg.into() }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError { message: msg.into() }
    }

    /// Short machine-readable code used in API error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConnectionFailed { .. } => "CONNECTION_FAILED",
            Self::AuthenticationFailed { .. } => "AUTHENTICATION_FAILED",
            Self::SyntaxError { .. } => "SQL_SYNTAX_ERROR",
            Self::ExecutionError { .. } => "SQL_EXECUTION_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::SessionNotFound { .. } => "CONNECTION_NOT_FOUND",
            Self::Internal { .. } => "INTERNAL_ERROR",
            Self::NotSupported { .. } => "NOT_SUPPORTED",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
        }
    }
}

impl From<DdlError> for EngineError {
    fn from(err: DdlError) -> Self {
        Self::validation(err.to_string())
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ddl_errors_become_validation_errors() {
        let err: EngineError = DdlError::MissingPrimaryKey.into();
        assert!(matches!(err, EngineError::ValidationError { .. }));
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_display_keeps_server_message() {
        let err = EngineError::syntax_error("You have an error in your SQL syntax");
        assert_eq!(
            err.to_string(),
            "Query syntax error: You have an error in your SQL syntax"
        );
    }

    #[test]
    fn test_serializes_as_tagged_struct() {
        let json = serde_json::to_value(EngineError::timeout(500)).unwrap();
        assert_eq!(json["Timeout"]["timeout_ms"], 500);
    }
}
