//! CLI Module Organization
//!
//! - args: CLI argument structures
//! - commands: command implementations
//! - config_builder: configuration loading and flag overrides
//! - output: tables, progress bars and summaries

pub mod args;
pub mod commands;
pub mod config_builder;
pub mod output;

// Re-export commonly used items for convenience
pub use args::*;
pub use commands::*;
