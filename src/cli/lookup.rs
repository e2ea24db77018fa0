//! Command name resolution for the command line
//!
//! Runs against the registry alone, before any port is opened, so a typo
//! fails fast with [`ExitCodes::NO_SUCH_COMMAND`].

use super::exit_codes::{CliResult, ExitCodes};
use crate::core::command::{CommandDescriptor, CommandRegistry};

/// Resolve a command by name or hex id
pub fn lookup_command(registry: &CommandRegistry, key: &str) -> Result<CommandDescriptor, CliResult> {
    registry
        .find(key)
        .cloned()
        .ok_or_else(|| CliResult::error(ExitCodes::NO_SUCH_COMMAND, format!("Unknown command '{key}'")))
}
