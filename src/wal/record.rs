//! The on-disk line format for a single WAL entry.

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::commands::Command;

/// One durable mutation: a request id plus the command and arguments that
/// produced it. Only `SET` and `DEL` are ever logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub id: Uuid,
    pub command: Command,
    pub args: Vec<String>,
}

impl LogRecord {
    pub fn new(id: Uuid, command: Command, args: Vec<String>) -> Self {
        LogRecord { id, command, args }
    }

    /// `<uuid> <CMD> <arg1> [arg2] \n` — trailing space before the newline,
    /// matching the reference writer.
    pub fn to_line(&self) -> String {
        let mut line = format!("{} {}", self.id, self.command.as_str());
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line.push_str(" \n");
        line
    }

    /// Parse one already-trimmed-of-newline log line back into a record.
    /// Field 0 is the request id (kept, not validated beyond being present),
    /// field 1 is the command, the rest are arguments. Tolerates a trailing
    /// space left by [`LogRecord::to_line`].
    pub fn parse_line(line: &str) -> Result<Self> {
        let mut fields = line.split(' ').filter(|f| !f.is_empty());

        let id_field = fields
            .next()
            .ok_or_else(|| Error::ReplicationApply("empty log line".to_string()))?;
        let id = Uuid::parse_str(id_field)
            .map_err(|e| Error::ReplicationApply(format!("bad record id {id_field}: {e}")))?;

        let command_field = fields
            .next()
            .ok_or_else(|| Error::ReplicationApply(format!("missing command in line: {line}")))?;
        let command = match command_field {
            "SET" => Command::Set,
            "DEL" => Command::Del,
            other => {
                return Err(Error::ReplicationApply(format!(
                    "unknown logged command: {other}"
                )))
            }
        };

        let args: Vec<String> = fields.map(|s| s.to_string()).collect();

        Ok(LogRecord { id, command, args })
    }
}
