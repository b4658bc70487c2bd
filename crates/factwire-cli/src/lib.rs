//! factwire CLI library.
//!
//! Configuration loading, command execution and output formatting for the
//! `factwire` binary. Commands expose a `run_*` function returning a report
//! and an `execute_*` wrapper that prints it.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::{Config, OutputFormat};
pub use error::{CliError, Result};
pub use output::Formatter;
