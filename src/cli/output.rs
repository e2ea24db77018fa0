//! Output formatting for command results

use crate::core::command::{CommandDescriptor, Reading};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human readable text
    #[default]
    Text,
    /// One JSON object per result
    Json,
    /// Hex dump of the raw reply data
    Hex,
}

#[derive(Serialize)]
struct JsonResult<'a> {
    command: &'a str,
    id: u8,
    #[serde(flatten)]
    reading: &'a Reading,
}

/// Format one command result
pub fn format_reading(descriptor: &CommandDescriptor, reading: &Reading, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => reading.to_string(),
        OutputFormat::Json => {
            let result = JsonResult {
                command: &descriptor.name,
                id: descriptor.id,
                reading,
            };
            serde_json::to_string(&result).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
        }
        OutputFormat::Hex => match reading {
            Reading::EngineeringData(data) => hex_format(data),
            Reading::Float(v) => hex_format(&v.to_le_bytes()),
            Reading::Integer(v) => hex_format(&v.to_le_bytes()),
            Reading::Byte(v) => hex_format(&[*v]),
            Reading::Version(v) => {
                let mut raw = v.software.to_vec();
                raw.extend_from_slice(&v.hardware);
                raw.extend_from_slice(&v.protocol);
                hex_format(&raw)
            }
            other => other.to_string(),
        },
    }
}

/// Format the registry as a table, or JSON array
pub fn format_commands<'a>(
    commands: impl Iterator<Item = &'a CommandDescriptor>,
    format: OutputFormat,
) -> String {
    let commands: Vec<&CommandDescriptor> = commands.collect();
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(&commands).unwrap_or_default();
    }

    let mut out = format!("{:<6} {:<14} {:>4} {:>6}  {:<22} {}\n", "ID", "NAME", "REQ", "REPLY", "CODEC", "DESCRIPTION");
    for c in commands {
        out.push_str(&format!(
            "0x{:02x}   {:<14} {:>4} {:>6}  {:<22} {}\n",
            c.id,
            c.name,
            c.request_size,
            c.reply_size,
            c.codec.name(),
            c.description
        ));
    }
    out
}

/// Space separated hex bytes
pub fn hex_format(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}
