//! Error types for IdeaScope.
//!
//! Library crates use [`IdeaScopeError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all IdeaScope operations.
#[derive(Debug, thiserror::Error)]
pub enum IdeaScopeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure talking to an external provider.
    #[error("network error: {0}")]
    Network(String),

    /// An external provider answered with an error (non-2xx or error payload).
    #[error("{provider} error: {message}")]
    Provider { provider: String, message: String },

    /// A provider response could not be decoded into the expected shape.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A structured-output schema failed registry validation.
    #[error("schema error: {0}")]
    Schema(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (fixture mismatch, fragment shape, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A pipeline stage failed; carries the stage name for server-side logs.
    #[error("{stage} failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: Box<IdeaScopeError>,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, IdeaScopeError>;

impl IdeaScopeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a provider error tagged with the provider's name.
    pub fn provider(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
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

    /// Attribute this error to a pipeline stage.
    pub fn in_stage(self, stage: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            source: Box::new(self),
        }
    }

    /// The innermost message without category prefixes or stage wrapping.
    ///
    /// This is what callers outside the process get to see; stage names and
    /// provider tags stay in the server logs.
    pub fn upstream_message(&self) -> String {
        match self {
            Self::Config { message }
            | Self::Parse { message }
            | Self::Validation { message }
            | Self::Provider { message, .. } => message.clone(),
            Self::Network(message) | Self::Schema(message) => message.clone(),
            Self::Io { source, .. } => source.to_string(),
            Self::Stage { source, .. } => source.upstream_message(),
        }
    }
}
