//! Blessed Core Library
//!
//! Foundational utilities shared by the splitter and the CLI:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, SplitOptions};
pub use error::{AppError, AppResult, PLUGIN_NAME};
