//! Error types for the shamash-asm core pipeline.
//!
//! Bind/validation failures are structured data (dotted path + message) so
//! callers and tests can assert on them precisely, not just match a string.

use thiserror::Error;

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, ShamashError>;

#[derive(Debug, Error)]
pub enum ShamashError {
    #[error("config bind error at {path}: {message}")]
    Bind { path: String, message: String },

    #[error("config validation failed with {} error(s)", .errors.len())]
    ValidationFailed { errors: Vec<ValidationIssue> },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("scan cancelled")]
    Cancelled,
}

/// A single bind-time shape/type error, carried with a dotted config path
/// (e.g. `rules[3].params.forbidden[0].from`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigBindError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ConfigBindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Severity of a C4 validation finding. ERROR rejects the config; WARNING
/// passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
    pub level: IssueLevel,
}

impl ValidationIssue {
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            level: IssueLevel::Error,
        }
    }

    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            level: IssueLevel::Warning,
        }
    }
}

impl From<ConfigBindError> for ShamashError {
    fn from(e: ConfigBindError) -> Self {
        ShamashError::Bind {
            path: e.path,
            message: e.message,
        }
    }
}
