//! CLI Command Implementations
//!
//! - mine: run the mining pipeline over a corpus file
//! - config: configuration management commands
//! - test_summary: summaries of generated test runs

pub mod config;
pub mod mine;
pub mod test_summary;

pub use config::{init_config, print_default_config, validate_config};
pub use mine::mine_command;
pub use test_summary::summarize_tests;
