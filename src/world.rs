//! World-manipulation command builders.
//!
//! Renders Bedrock Edition commands (`setblock`, `fill`, `clone`) from typed
//! arguments, validates them the way the request layer expects, and submits
//! the result through the [`CommandQueue`] with descriptive metadata.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};
use crate::model::{CommandId, Metadata};
use crate::queue::CommandQueue;

/// Lowest buildable block height.
pub const MIN_Y: i32 = -64;
/// Highest buildable block height.
pub const MAX_Y: i32 = 320;
/// Largest block data (variant) value.
pub const MAX_DATA_VALUE: u8 = 15;

const AIR: &str = "air";

/// A block coordinate in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPosition {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    fn validate(self) -> Result<Self> {
        if (MIN_Y..=MAX_Y).contains(&self.y) {
            Ok(self)
        } else {
            Err(Error::InvalidArgument(format!(
                "y coordinate {} outside {MIN_Y}..={MAX_Y}",
                self.y
            )))
        }
    }

    fn to_json(self) -> serde_json::Value {
        json!({"x": self.x, "y": self.y, "z": self.z})
    }
}

impl std::fmt::Display for BlockPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

/// How `fill` treats blocks already in the area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    #[default]
    Replace,
    Destroy,
    Keep,
    Hollow,
    Outline,
}

impl FillMode {
    fn as_str(self) -> &'static str {
        match self {
            FillMode::Replace => "replace",
            FillMode::Destroy => "destroy",
            FillMode::Keep => "keep",
            FillMode::Hollow => "hollow",
            FillMode::Outline => "outline",
        }
    }
}

impl std::fmt::Display for FillMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FillMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "replace" => Ok(FillMode::Replace),
            "destroy" => Ok(FillMode::Destroy),
            "keep" => Ok(FillMode::Keep),
            "hollow" => Ok(FillMode::Hollow),
            "outline" => Ok(FillMode::Outline),
            other => Err(Error::InvalidArgument(format!(
                "fill mode must be one of: replace, destroy, keep, hollow, outline (got '{other}')"
            ))),
        }
    }
}

/// How `clone` copies blocks into the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneMode {
    #[default]
    Replace,
    Masked,
    Filtered,
}

impl CloneMode {
    fn as_str(self) -> &'static str {
        match self {
            CloneMode::Replace => "replace",
            CloneMode::Masked => "masked",
            CloneMode::Filtered => "filtered",
        }
    }
}

impl std::fmt::Display for CloneMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CloneMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "replace" => Ok(CloneMode::Replace),
            "masked" => Ok(CloneMode::Masked),
            "filtered" => Ok(CloneMode::Filtered),
            other => Err(Error::InvalidArgument(format!(
                "clone mode must be one of: replace, masked, filtered (got '{other}')"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Rendered commands
// ---------------------------------------------------------------------------

/// A rendered command ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldCommand {
    pub text: String,
    pub metadata: Metadata,
}

impl WorldCommand {
    fn new(text: String, metadata: serde_json::Value) -> Self {
        let metadata = match metadata {
            serde_json::Value::Object(map) => map,
            _ => Metadata::new(),
        };
        Self { text, metadata }
    }

    /// `setblock x y z <block> <data>`
    pub fn place_block(block_type: &str, position: BlockPosition, data_value: u8) -> Result<Self> {
        let block_type = namespaced(block_type)?;
        let position = position.validate()?;
        if data_value > MAX_DATA_VALUE {
            return Err(Error::InvalidArgument(format!(
                "data value {data_value} outside 0..={MAX_DATA_VALUE}"
            )));
        }

        Ok(Self::new(
            format!("setblock {position} {block_type} {data_value}"),
            json!({
                "action": "place_block",
                "block_type": block_type,
                "position": position.to_json(),
            }),
        ))
    }

    /// `setblock x y z air`
    pub fn remove_block(position: BlockPosition) -> Result<Self> {
        let position = position.validate()?;
        Ok(Self::new(
            format!("setblock {position} {AIR}"),
            json!({
                "action": "remove_block",
                "position": position.to_json(),
            }),
        ))
    }

    /// `fill x1 y1 z1 x2 y2 z2 <block> <mode>`
    pub fn fill_area(
        from: BlockPosition,
        to: BlockPosition,
        block_type: &str,
        mode: FillMode,
    ) -> Result<Self> {
        Self::fill(from, to, namespaced(block_type)?, mode)
    }

    /// Fill the area with air.
    pub fn destroy_area(from: BlockPosition, to: BlockPosition) -> Result<Self> {
        Self::fill(from, to, AIR, FillMode::Replace)
    }

    fn fill(from: BlockPosition, to: BlockPosition, block_type: &str, mode: FillMode) -> Result<Self> {
        let from = from.validate()?;
        let to = to.validate()?;
        Ok(Self::new(
            format!("fill {from} {to} {block_type} {mode}"),
            json!({
                "action": "fill_area",
                "from": from.to_json(),
                "to": to.to_json(),
                "block_type": block_type,
                "mode": mode.as_str(),
            }),
        ))
    }

    /// `clone x1 y1 z1 x2 y2 z2 dx dy dz <mode>`
    pub fn clone_area(
        from: BlockPosition,
        to: BlockPosition,
        destination: BlockPosition,
        mode: CloneMode,
    ) -> Result<Self> {
        let from = from.validate()?;
        let to = to.validate()?;
        let destination = destination.validate()?;
        Ok(Self::new(
            format!("clone {from} {to} {destination} {mode}"),
            json!({
                "action": "clone_area",
                "from": from.to_json(),
                "to": to.to_json(),
                "destination": destination.to_json(),
                "mode": mode.as_str(),
            }),
        ))
    }

    /// A verbatim command. One leading slash is dropped.
    pub fn raw(command: &str) -> Self {
        let command = command.trim();
        let command = command.strip_prefix('/').unwrap_or(command);
        Self::new(
            command.to_string(),
            json!({
                "action": "raw_command",
                "command": command,
            }),
        )
    }
}

fn namespaced(block_type: &str) -> Result<&str> {
    let block_type = block_type.trim();
    match block_type.split_once(':') {
        Some((ns, name)) if !ns.is_empty() && !name.is_empty() => Ok(block_type),
        _ => Err(Error::InvalidArgument(format!(
            "block type '{block_type}' must include a namespace (e.g. minecraft:stone)"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// High-level world operations. Each call renders a command and queues it.
#[derive(Clone)]
pub struct WorldManager {
    queue: Arc<CommandQueue>,
}

impl WorldManager {
    pub fn new(queue: Arc<CommandQueue>) -> Self {
        Self { queue }
    }

    fn submit(&self, command: WorldCommand) -> Result<CommandId> {
        self.queue.submit(command.text, command.metadata)
    }

    pub fn place_block(
        &self,
        block_type: &str,
        position: BlockPosition,
        data_value: u8,
    ) -> Result<CommandId> {
        self.submit(WorldCommand::place_block(block_type, position, data_value)?)
    }

    pub fn remove_block(&self, position: BlockPosition) -> Result<CommandId> {
        self.submit(WorldCommand::remove_block(position)?)
    }

    pub fn fill_area(
        &self,
        from: BlockPosition,
        to: BlockPosition,
        block_type: &str,
        mode: FillMode,
    ) -> Result<CommandId> {
        self.submit(WorldCommand::fill_area(from, to, block_type, mode)?)
    }

    pub fn clone_area(
        &self,
        from: BlockPosition,
        to: BlockPosition,
        destination: BlockPosition,
        mode: CloneMode,
    ) -> Result<CommandId> {
        self.submit(WorldCommand::clone_area(from, to, destination, mode)?)
    }

    pub fn destroy_area(&self, from: BlockPosition, to: BlockPosition) -> Result<CommandId> {
        self.submit(WorldCommand::destroy_area(from, to)?)
    }

    pub fn execute(&self, command: &str) -> Result<CommandId> {
        self.submit(WorldCommand::raw(command))
    }
}
