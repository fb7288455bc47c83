//! Error types for mcq.

use thiserror::Error;

use crate::model::{CommandId, Status};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("unknown command: {0}")]
    UnknownCommand(CommandId),

    #[error("command {id} already finalized as {status}")]
    AlreadyFinalized { id: CommandId, status: Status },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Short machine-readable name, used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidCommand(_) => "invalid_command",
            Error::UnknownCommand(_) => "unknown_command",
            Error::AlreadyFinalized { .. } => "already_finalized",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Other(_) => "other",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
