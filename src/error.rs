//! Error types
//!
//! Every failure surfaced by the core is one of a small set of kinds so that
//! callers (and scripts driving the CLI) can branch on it.

use crate::sql::model::OperationError;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum SqlError {
    /// A request failed before a semantic response was obtained
    #[error("API request failed ({}): {message}", display_code(.code))]
    Transport {
        /// HTTP status / GCP error code, when a response was received
        code: Option<u16>,
        /// GCP canonical status (e.g. `NOT_FOUND`)
        status: Option<String>,
        message: String,
    },

    /// A long-running operation finished with a server-reported error
    #[error("Operation {operation} failed: {}", display_errors(.errors))]
    OperationFailed {
        operation: String,
        errors: Vec<OperationError>,
    },

    /// The invocation is unresolvable before any network call
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The caller stopped waiting; the remote outcome is unknown
    #[error("Cancelled while waiting{}; the remote outcome is unknown until re-queried", display_operation(.operation))]
    Cancelled { operation: Option<String> },

    /// The credential provider failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Results could not be rendered or written (e.g. a closed pipe)
    #[error("Output error: {0}")]
    Output(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, SqlError>;

impl SqlError {
    /// Transport error without an HTTP response (connect, decode, ...)
    pub fn transport(message: impl Into<String>) -> Self {
        SqlError::Transport {
            code: None,
            status: None,
            message: message.into(),
        }
    }

    /// Returns true if the API reported the resource as missing
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, SqlError::Transport { code: Some(404), .. })
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SqlError::Cancelled { .. })
    }

    /// Process exit code for this error kind
    pub fn exit_code(&self) -> i32 {
        match self {
            SqlError::Configuration(_) => 2,
            SqlError::Transport { .. } | SqlError::Auth(_) => 3,
            SqlError::OperationFailed { .. } => 4,
            SqlError::Output(_) => 5,
            SqlError::Cancelled { .. } => 130,
        }
    }
}

impl From<reqwest::Error> for SqlError {
    fn from(err: reqwest::Error) -> Self {
        SqlError::Transport {
            code: err.status().map(|s| s.as_u16()),
            status: None,
            message: err.to_string(),
        }
    }
}

fn display_code(code: &Option<u16>) -> String {
    code.map_or_else(|| "no response".to_string(), |c| c.to_string())
}

fn display_errors(errors: &[OperationError]) -> String {
    if errors.is_empty() {
        return "no error details reported".to_string();
    }
    errors
        .iter()
        .map(|e| {
            let code = e.code.as_deref().unwrap_or("UNKNOWN");
            match &e.message {
                Some(message) => format!("[{}] {}", code, message),
                None => format!("[{}]", code),
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn display_operation(operation: &Option<String>) -> String {
    operation
        .as_ref()
        .map(|op| format!(" for operation {}", op))
        .unwrap_or_default()
}
