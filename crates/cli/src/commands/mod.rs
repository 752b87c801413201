//! Command handlers for the blessed CLI.
//!
//! Each command lives in its own submodule.

pub mod check;
pub mod split;

// Re-export command types for convenience
pub use check::CheckCommand;
pub use split::SplitCommand;
