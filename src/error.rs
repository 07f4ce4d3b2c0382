use thiserror::Error;

/// Dockhand-specific error types for better error handling
#[derive(Error, Debug)]
pub enum DockhandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Container runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Chat gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Other(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found at path: {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid config format: {reason}")]
    InvalidFormat { reason: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Container runtime unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Container query rejected: {reason}")]
    Query { reason: String },

    #[error("Failed to {action} container {id}: {reason}")]
    Operation {
        id: String,
        action: &'static str,
        reason: String,
    },

    #[error("Container not found: {id}")]
    NotFound { id: String },
}

impl RuntimeError {
    pub fn operation(id: impl Into<String>, action: &'static str, reason: impl ToString) -> Self {
        Self::Operation {
            id: id.into(),
            action,
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Platform rejected {operation}: {reason}")]
    ResponseDelivery {
        operation: &'static str,
        reason: String,
    },

    #[error("Gateway connection failed: {reason}")]
    Connection { reason: String },

    #[error("Gateway protocol error: {reason}")]
    Protocol { reason: String },
}

/// A filter token that was skipped while parsing. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterParseWarning {
    #[error("no '=' in filter token {token:?}, skipping it")]
    MissingSeparator { token: String },

    #[error("empty key in filter token {token:?}, skipping it")]
    EmptyKey { token: String },
}

/// Convenience type alias for Dockhand results
pub type Result<T, E = DockhandError> = std::result::Result<T, E>;
