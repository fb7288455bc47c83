//! Append-only command history.
//!
//! Holds a snapshot of every command ever submitted, in submission order.
//! Entries are overwritten in place when a result is reported but never
//! removed, so growth is unbounded for the life of the process.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::model::{Command, CommandId};

/// Insertion-ordered log of command snapshots with an id index.
///
/// Not synchronized on its own; [`crate::queue::CommandQueue`] guards it
/// with the same lock as the pending queue.
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<Command>,
    index: HashMap<CommandId, usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot. Called once per submission.
    pub fn record(&mut self, command: Command) {
        self.index.insert(command.id, self.entries.len());
        self.entries.push(command);
    }

    /// Overwrite the stored snapshot for `id`. Position in the log is kept.
    pub fn update(&mut self, id: CommandId, command: Command) -> Result<()> {
        let slot = self
            .index
            .get(&id)
            .and_then(|&i| self.entries.get_mut(i))
            .ok_or(Error::UnknownCommand(id))?;
        *slot = command;
        Ok(())
    }

    pub fn get(&self, id: CommandId) -> Option<&Command> {
        self.index.get(&id).and_then(|&i| self.entries.get(i))
    }

    pub fn contains(&self, id: CommandId) -> bool {
        self.index.contains_key(&id)
    }

    /// Up to `limit` most recently submitted commands, most recent first.
    pub fn recent(&self, limit: i64) -> Result<Vec<Command>> {
        if limit <= 0 {
            return Err(Error::InvalidArgument(format!(
                "limit must be positive, got {limit}"
            )));
        }
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self.entries.iter().rev().take(take).cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metadata, Status};
    use chrono::Utc;

    fn command(seq: u64, text: &str) -> Command {
        Command {
            id: CommandId::new(),
            seq,
            text: text.to_string(),
            metadata: Metadata::new(),
            submitted_at: Utc::now(),
            status: Status::Pending,
            result: None,
            finalized_at: None,
        }
    }

    #[test]
    fn recent_is_most_recent_first_and_clamped() {
        let mut history = History::new();
        for (i, text) in ["a", "b", "c"].iter().enumerate() {
            history.record(command(i as u64 + 1, text));
        }

        let texts: Vec<_> = history
            .recent(2)
            .unwrap()
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, ["c", "b"]);
        assert_eq!(history.recent(50).unwrap().len(), 3);
    }

    #[test]
    fn recent_rejects_non_positive_limit() {
        let history = History::new();
        assert!(matches!(history.recent(0), Err(Error::InvalidArgument(_))));
        assert!(matches!(history.recent(-1), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn update_keeps_position() {
        let mut history = History::new();
        let first = command(1, "first");
        let id = first.id;
        history.record(first.clone());
        history.record(command(2, "second"));

        let mut done = first;
        done.status = Status::Completed;
        history.update(id, done).unwrap();

        let recent = history.recent(2).unwrap();
        assert_eq!(recent[1].id, id);
        assert_eq!(recent[1].status, Status::Completed);
    }

    #[test]
    fn update_unknown_id_fails() {
        let mut history = History::new();
        let stray = command(1, "stray");
        assert!(matches!(
            history.update(stray.id, stray),
            Err(Error::UnknownCommand(_))
        ));
        assert!(history.is_empty());
    }
}
