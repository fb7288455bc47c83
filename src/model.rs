//! Core data model.
//!
//! A command is an opaque instruction string plus metadata, submitted for
//! asynchronous execution by an external executor and correlated with its
//! result through its id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Free-form metadata attached at submission. Never interpreted by the queue.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A unit of work tracked by the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Unique identifier, used to correlate results with submissions.
    pub id: CommandId,

    /// Submission sequence number. Strictly increasing, starts at 1.
    pub seq: u64,

    /// The raw command text (e.g. `setblock 0 64 0 minecraft:stone 0`).
    pub text: String,

    pub metadata: Metadata,

    /// Never earlier than the previous submission's timestamp.
    pub submitted_at: DateTime<Utc>,

    pub status: Status,

    /// Executor output or error description. Set on the terminal transition.
    pub result: Option<serde_json::Value>,

    pub finalized_at: Option<DateTime<Utc>>,
}

impl Command {
    /// Apply a terminal outcome. Rejects anything but `pending -> terminal`.
    pub(crate) fn finalize(
        &mut self,
        success: bool,
        payload: serde_json::Value,
        at: DateTime<Utc>,
    ) -> crate::error::Result<()> {
        let to = if success {
            Status::Completed
        } else {
            Status::Failed
        };
        if !self.status.can_transition_to(to) {
            return Err(crate::error::Error::AlreadyFinalized {
                id: self.id,
                status: self.status,
            });
        }
        self.status = to;
        self.result = Some(payload);
        self.finalized_at = Some(at);
        Ok(())
    }
}

/// Newtype for command IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(pub Uuid);

impl CommandId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CommandId {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(CommandId)
            .map_err(|e| crate::error::Error::InvalidArgument(format!("bad command id '{s}': {e}")))
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Submitted, waiting for the executor to report back.
    Pending,
    /// Executor reported success. Terminal.
    Completed,
    /// Executor reported failure. Terminal.
    Failed,
}

impl Status {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: Status) -> bool {
        use Status::*;
        matches!((self, to), (Pending, Completed) | (Pending, Failed))
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::Completed => "completed",
            Status::Failed => "failed",
        };
        write!(f, "{s}")
    }
}
