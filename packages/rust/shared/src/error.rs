//! Error types for Mriynyk.
//!
//! Library crates use [`MriynykError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Mriynyk operations.
#[derive(Debug, thiserror::Error)]
pub enum MriynykError {
    /// Embedding or completion provider failure (transport, status, malformed
    /// body, or a call that exceeded its timeout).
    #[error("provider error: {0}")]
    Provider(String),

    /// No topic, no candidate topics, or no pages for the resolved topic.
    #[error("not found: {0}")]
    NotFound(String),

    /// The model's topic or answer selection was unparseable or out of range.
    #[error("disambiguation error: {message}")]
    Disambiguation { message: String },

    /// The structured generation call produced no result.
    #[error("generation error: {0}")]
    Generation(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (empty query, bad grade, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MriynykError>;

/// Stable, machine-readable classification of a [`MriynykError`].
///
/// The request boundary maps these to its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Provider,
    NotFound,
    Disambiguation,
    Generation,
    Config,
    Storage,
    Io,
    Validation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provider => "provider_error",
            Self::NotFound => "not_found",
            Self::Disambiguation => "disambiguation_error",
            Self::Generation => "generation_error",
            Self::Config => "config_error",
            Self::Storage => "storage_error",
            Self::Io => "io_error",
            Self::Validation => "validation_error",
        }
    }
}

impl MriynykError {
    /// Create a provider error from any displayable message.
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a not-found error from any displayable message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a disambiguation error from any displayable message.
    pub fn disambiguation(msg: impl Into<String>) -> Self {
        Self::Disambiguation {
            message: msg.into(),
        }
    }

    /// Create a generation error from any displayable message.
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a storage error from any displayable message.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Provider(_) => ErrorKind::Provider,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Disambiguation { .. } => ErrorKind::Disambiguation,
            Self::Generation(_) => ErrorKind::Generation,
            Self::Config { .. } => ErrorKind::Config,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Io { .. } => ErrorKind::Io,
            Self::Validation { .. } => ErrorKind::Validation,
        }
    }
}
