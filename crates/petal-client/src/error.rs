//! # Client Error Types
//!
//! Error types for calls to the order service.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Client Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Server              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Transport      │  │  Server{status,message} │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  InvalidResponse        │ │
//! │  │  ConfigLoad/Save│  │                 │  │  TransitionRejected     │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Validation    │  │   Save          │  │     Local               │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Core(..)       │  │  PartialSave    │  │  Attachment             │ │
//! │  │  (no call made) │  │  SaveInProgress │  │  Serialization          │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Server Messages
//! The order service reports failures as `{"detail": ...}`. A string detail
//! is shown as is; a list of field errors becomes `loc.path - msg` joined by
//! `; `. Anything else falls back to the transport text.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

use petal_core::CoreError;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Every way a client operation can fail.
#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Local Errors
    // =========================================================================
    /// Rejected before any network call.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A save is already running for this composer.
    #[error("A save is already in progress")]
    SaveInProgress,

    #[error("Attachment {name}: {reason}")]
    Attachment { name: String, reason: String },

    #[error("Serialization failed: {0}")]
    Serialization(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Transport(String),

    // =========================================================================
    // Server Errors
    // =========================================================================
    /// Non-success status; `message` is extracted from the body.
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The service refused a status change. `reason` is its own text.
    #[error("{reason}")]
    TransitionRejected { to: String, reason: String },

    /// Some save calls went through before one failed.
    #[error("Save stopped after {progress}: {source}")]
    PartialSave {
        progress: SaveProgress,
        #[source]
        source: Box<ClientError>,
    },
}

// =============================================================================
// Save Progress
// =============================================================================

/// How far a multi-call save got.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveProgress {
    pub deleted: usize,
    pub created: usize,
    pub updated: usize,
    pub order_updated: bool,
}

impl SaveProgress {
    pub fn is_empty(&self) -> bool {
        self.deleted == 0 && self.created == 0 && self.updated == 0 && !self.order_updated
    }
}

impl fmt::Display for SaveProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} deleted, {} created, {} updated",
            self.deleted, self.created, self.updated
        )?;
        if self.order_updated {
            write!(f, ", order fields saved")?;
        }
        Ok(())
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::InvalidResponse(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::ConfigSaveFailed(err.to_string())
    }
}

impl From<petal_core::ValidationError> for ClientError {
    fn from(err: petal_core::ValidationError) -> Self {
        ClientError::Core(err.into())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ClientError {
    /// True when repeating the same request may succeed.
    ///
    /// Only reads are ever retried automatically.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Timeout | ClientError::Transport(_) => true,
            ClientError::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// True for problems caught before anything was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Core(_))
    }

    /// True when the service refused the request on business grounds.
    pub fn is_rejection(&self) -> bool {
        match self {
            ClientError::TransitionRejected { .. } => true,
            ClientError::Server { status, .. } => (400..500).contains(status),
            _ => false,
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidConfig(_)
                | ClientError::InvalidUrl(_)
                | ClientError::ConfigLoadFailed(_)
                | ClientError::ConfigSaveFailed(_)
        )
    }

    /// The status code, for server errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            ClientError::PartialSave { source, .. } => source.status(),
            _ => None,
        }
    }
}

// =============================================================================
// Server Message Extraction
// =============================================================================

/// Reads a human-readable message from an error body.
///
/// Returns `None` when the body carries no usable `detail`.
pub fn extract_server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(entries) if !entries.is_empty() => {
            let parts: Vec<String> = entries.iter().map(describe_field_error).collect();
            Some(parts.join("; "))
        }
        _ => None,
    }
}

fn describe_field_error(entry: &Value) -> String {
    let loc = entry
        .get("loc")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .map(|p| match p {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(".")
        })
        .unwrap_or_default();
    let msg = entry
        .get("msg")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| entry.to_string());
    format!("{} - {}", loc, msg)
}

// =============================================================================
// Tests
// =============================================================================
