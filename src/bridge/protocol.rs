//! Bridge wire messages.
//!
//! One JSON object per line, tagged by `type`. The executor (a behavior
//! pack client or a proxy for one) receives `execute_command` messages and
//! answers with `command_result`, correlated by `command_id`.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Command, CommandId, Metadata};

/// Messages sent from the queue to the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        message: String,
    },
    Ack {
        message: String,
    },
    ExecuteCommand {
        command_id: CommandId,
        command: String,
        metadata: Metadata,
    },
}

impl ServerMessage {
    pub fn welcome() -> Self {
        ServerMessage::Welcome {
            message: "Connected to mcq command queue".to_string(),
        }
    }

    pub fn ack() -> Self {
        ServerMessage::Ack {
            message: "mcq ready".to_string(),
        }
    }

    pub fn execute(command: &Command) -> Self {
        ServerMessage::ExecuteCommand {
            command_id: command.id,
            command: command.text.clone(),
            metadata: command.metadata.clone(),
        }
    }

    /// Serialize as a single newline-terminated line.
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Messages sent from the executor to the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutorMessage {
    Ready,
    CommandResult {
        command_id: CommandId,
        success: bool,
        #[serde(default)]
        result: serde_json::Value,
    },
    Error {
        error: String,
    },
}

impl ExecutorMessage {
    pub fn from_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }
}
