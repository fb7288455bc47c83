//! # mcq
//!
//! In-memory command queue for driving a Minecraft world.
//!
//! Commands are submitted fire-and-forget, drained in submission order by a
//! single executor, and finalized when the executor reports back. Every
//! command stays inspectable in the history for the life of the process.
//! Nothing is persisted; a restart starts from an empty queue.

pub mod bridge;
pub mod config;
pub mod console;
pub mod error;
pub mod history;
pub mod model;
pub mod queue;
pub mod telemetry;
pub mod world;

pub use error::{Error, Result};
pub use model::{Command, CommandId, Metadata, Status};
pub use queue::CommandQueue;
