//! CLI Module
//!
//! Provides command-line interface functionality including:
//! - Exit codes for automation
//! - Command name resolution
//! - Result formatting (text, JSON, hex)

pub mod exit_codes;
pub mod lookup;
pub mod output;

pub use exit_codes::{exit_code_description, print_exit_codes, CliResult, ExitCodes};
pub use lookup::lookup_command;
pub use output::{format_commands, format_reading, hex_format, OutputFormat};
