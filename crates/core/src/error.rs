//! Error types for the blessed CSS splitter.
//!
//! A single error enum covers configuration, I/O, serialization and the
//! two failure modes of the splitting plugin itself: unsupported
//! (streaming) input and chunking failures.

use thiserror::Error;

/// Tag attached to every plugin-level failure.
pub const PLUGIN_NAME: &str = "blessed";

/// Unified error type for the blessed workspace.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Input arrived as a streaming payload, which the splitter cannot buffer.
    #[error("[{plugin}] Streaming not supported")]
    UnsupportedInput { plugin: String },

    /// The chunking capability rejected the input.
    #[error("[{plugin}] {message}")]
    Chunking { plugin: String, message: String },

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Build an `UnsupportedInput` error tagged with the plugin name.
    pub fn unsupported_input() -> Self {
        AppError::UnsupportedInput {
            plugin: PLUGIN_NAME.to_string(),
        }
    }

    /// Build a `Chunking` error tagged with the plugin name.
    pub fn chunking(message: impl Into<String>) -> Self {
        AppError::Chunking {
            plugin: PLUGIN_NAME.to_string(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
