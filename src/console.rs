//! Operator console: one line in, one reply out.
//!
//! Lines starting with `:` are console directives; anything else is queued
//! as a raw command.
//!
//! ```text
//! :history [N]                          recent commands, newest first
//! :show <id>                            one command
//! :place <block> x y z [data]           setblock
//! :remove x y z                         setblock ... air
//! :fill x1 y1 z1 x2 y2 z2 <block> [mode]
//! :clone x1 y1 z1 x2 y2 z2 dx dy dz [mode]
//! :destroy x1 y1 z1 x2 y2 z2
//! :quit
//! ```

use std::str::{FromStr, SplitWhitespace};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::CommandId;
use crate::queue::CommandQueue;
use crate::world::{BlockPosition, CloneMode, FillMode, WorldManager};

/// History size shown when `:history` has no argument.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Empty,
    History(Option<i64>),
    Show(CommandId),
    Place {
        block_type: String,
        position: BlockPosition,
        data_value: u8,
    },
    Remove(BlockPosition),
    Fill {
        from: BlockPosition,
        to: BlockPosition,
        block_type: String,
        mode: FillMode,
    },
    Clone {
        from: BlockPosition,
        to: BlockPosition,
        destination: BlockPosition,
        mode: CloneMode,
    },
    Destroy {
        from: BlockPosition,
        to: BlockPosition,
    },
    Quit,
    Raw(String),
}

impl FromStr for ConsoleCommand {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(ConsoleCommand::Empty);
        }
        let Some(directive) = line.strip_prefix(':') else {
            return Ok(ConsoleCommand::Raw(line.to_string()));
        };

        let mut args = directive.split_whitespace();
        let name = args.next().unwrap_or_default();
        let command = match name {
            "history" => {
                ConsoleCommand::History(args.next().map(|n| number(n, "limit")).transpose()?)
            }
            "show" => ConsoleCommand::Show(word(&mut args, "command id")?.parse()?),
            "place" => ConsoleCommand::Place {
                block_type: word(&mut args, "block type")?.to_string(),
                position: position(&mut args)?,
                data_value: args
                    .next()
                    .map(|n| number(n, "data value"))
                    .transpose()?
                    .unwrap_or(0),
            },
            "remove" => ConsoleCommand::Remove(position(&mut args)?),
            "fill" => ConsoleCommand::Fill {
                from: position(&mut args)?,
                to: position(&mut args)?,
                block_type: word(&mut args, "block type")?.to_string(),
                mode: args
                    .next()
                    .map(str::parse::<FillMode>)
                    .transpose()?
                    .unwrap_or_default(),
            },
            "clone" => ConsoleCommand::Clone {
                from: position(&mut args)?,
                to: position(&mut args)?,
                destination: position(&mut args)?,
                mode: args
                    .next()
                    .map(str::parse::<CloneMode>)
                    .transpose()?
                    .unwrap_or_default(),
            },
            "destroy" => ConsoleCommand::Destroy {
                from: position(&mut args)?,
                to: position(&mut args)?,
            },
            "quit" | "exit" => ConsoleCommand::Quit,
            other => {
                return Err(Error::InvalidArgument(format!(
                    "unknown directive ':{other}'"
                )));
            }
        };

        if let Some(extra) = args.next() {
            return Err(Error::InvalidArgument(format!(
                "unexpected argument '{extra}' for ':{name}'"
            )));
        }
        Ok(command)
    }
}

fn word<'a>(args: &mut SplitWhitespace<'a>, what: &str) -> Result<&'a str> {
    args.next()
        .ok_or_else(|| Error::InvalidArgument(format!("missing {what}")))
}

fn number<T>(token: &str, what: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    token
        .parse()
        .map_err(|e| Error::InvalidArgument(format!("bad {what} '{token}': {e}")))
}

fn position(args: &mut SplitWhitespace<'_>) -> Result<BlockPosition> {
    let mut axis = |name: &str| -> Result<i32> { number(word(args, name)?, name) };
    Ok(BlockPosition::new(axis("x")?, axis("y")?, axis("z")?))
}

/// What the console wants printed, or a request to stop.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// Executes console commands against the queue.
pub struct Console {
    queue: Arc<CommandQueue>,
    world: WorldManager,
    history_max: i64,
}

impl Console {
    pub fn new(queue: Arc<CommandQueue>, history_max: i64) -> Self {
        Self {
            world: WorldManager::new(Arc::clone(&queue)),
            queue,
            history_max,
        }
    }

    /// Parse and execute one line.
    pub fn handle_line(&self, line: &str) -> Result<Reply> {
        self.execute(line.parse()?)
    }

    pub fn execute(&self, command: ConsoleCommand) -> Result<Reply> {
        let queued = |id: CommandId| -> Result<Reply> { Ok(Reply::Text(format!("queued {id}"))) };

        match command {
            ConsoleCommand::Empty => Ok(Reply::Text(String::new())),
            ConsoleCommand::Quit => Ok(Reply::Quit),
            ConsoleCommand::History(limit) => {
                let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
                let commands = self.queue.recent(limit.min(self.history_max))?;
                Ok(Reply::Text(serde_json::to_string_pretty(&commands)?))
            }
            ConsoleCommand::Show(id) => {
                let command = self.queue.get(id)?;
                Ok(Reply::Text(serde_json::to_string_pretty(&command)?))
            }
            ConsoleCommand::Place {
                block_type,
                position,
                data_value,
            } => queued(self.world.place_block(&block_type, position, data_value)?),
            ConsoleCommand::Remove(position) => queued(self.world.remove_block(position)?),
            ConsoleCommand::Fill {
                from,
                to,
                block_type,
                mode,
            } => queued(self.world.fill_area(from, to, &block_type, mode)?),
            ConsoleCommand::Clone {
                from,
                to,
                destination,
                mode,
            } => queued(self.world.clone_area(from, to, destination, mode)?),
            ConsoleCommand::Destroy { from, to } => queued(self.world.destroy_area(from, to)?),
            ConsoleCommand::Raw(text) => queued(self.world.execute(&text)?),
        }
    }
}
