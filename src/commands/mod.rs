//! CLI command implementations for herakles-plugin-agent.
//!
//! This module provides implementations for all CLI subcommands:
//! - `config`: Configuration file generation
//! - `test`: One-shot plugin collection
//! - `plugins`: Built-in plugin listing

pub mod config;
pub mod plugins;

// Re-export command functions
pub use config::command_config;
pub use plugins::command_plugins;
pub use test::command_test;
