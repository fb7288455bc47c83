//! Command queue. The public API for submitting and finalizing commands.
//!
//! The queue owns the pending collection and the history behind one lock,
//! so a submission is visible to both at once and a drain can never miss
//! or duplicate a command. The lock is never held across an await point.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::history::History;
use crate::model::*;
use crate::telemetry::metrics;

/// In-memory command queue with history and result correlation.
///
/// Construct once at startup and share it via `Arc`.
pub struct CommandQueue {
    state: Mutex<QueueState>,
    submitted: Notify,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<CommandId>,
    history: History,
    last_seq: u64,
    last_stamp: Option<DateTime<Utc>>,
}

impl QueueState {
    /// Fresh id that has never been issued by this queue.
    fn issue_id(&self) -> CommandId {
        loop {
            let id = CommandId::new();
            if !self.history.contains(id) {
                return id;
            }
        }
    }

    /// Finalize `id`. A command reported before it was drained leaves the
    /// pending deque too, so the executor is never handed it.
    fn finalize(
        &mut self,
        id: CommandId,
        success: bool,
        payload: serde_json::Value,
    ) -> Result<Command> {
        let mut command = self
            .history
            .get(id)
            .cloned()
            .ok_or(Error::UnknownCommand(id))?;
        let at = self.stamp();
        command.finalize(success, payload, at)?;
        self.history.update(id, command.clone())?;
        self.pending.retain(|pending| *pending != id);
        Ok(command)
    }

    /// Wall-clock time, clamped so it never runs backwards.
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            submitted: Notify::new(),
        }
    }

    // Every critical section leaves the state consistent, so a panic in
    // another holder does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Submit a command. Returns its id immediately; never waits for execution.
    ///
    /// The text is opaque and only has to be non-empty.
    pub fn submit(&self, text: impl Into<String>, metadata: Metadata) -> Result<CommandId> {
        let text = text.into();
        if text.is_empty() {
            return Err(rejected(Error::InvalidCommand(
                "command text must not be empty".to_string(),
            )));
        }

        let (id, seq) = {
            let mut state = self.lock();
            let id = state.issue_id();
            let submitted_at = state.stamp();
            state.last_seq += 1;
            let seq = state.last_seq;

            state.history.record(Command {
                id,
                seq,
                text: text.clone(),
                metadata,
                submitted_at,
                status: Status::Pending,
                result: None,
                finalized_at: None,
            });
            state.pending.push_back(id);
            (id, seq)
        };

        self.submitted.notify_one();
        metrics::commands_submitted().add(1, &[]);
        info!(%id, seq, command = %text, "command queued");
        Ok(id)
    }

    /// Remove and return every pending command, in submission order.
    pub fn drain_pending(&self) -> Vec<Command> {
        let drained: Vec<Command> = {
            let mut state = self.lock();
            let ids: Vec<CommandId> = state.pending.drain(..).collect();
            ids.into_iter()
                .filter_map(|id| state.history.get(id).cloned())
                .collect()
        };

        if !drained.is_empty() {
            metrics::commands_drained().add(drained.len() as u64, &[]);
            debug!(count = drained.len(), "drained pending commands");
        }
        drained
    }

    /// Record the executor's outcome for `id`. Returns the finalized snapshot.
    ///
    /// A second report for the same id is rejected and leaves the first
    /// outcome in place.
    pub fn report_result(
        &self,
        id: CommandId,
        success: bool,
        payload: serde_json::Value,
    ) -> Result<Command> {
        let outcome = self.lock().finalize(id, success, payload);

        match outcome {
            Ok(command) => {
                metrics::commands_finalized()
                    .add(1, &[KeyValue::new("status", command.status.to_string())]);
                info!(%id, status = %command.status, "command finalized");
                Ok(command)
            }
            Err(e) => {
                warn!(%id, error = %e, "result report rejected");
                Err(rejected(e))
            }
        }
    }

    /// Up to `limit` most recently submitted commands, most recent first.
    pub fn recent(&self, limit: i64) -> Result<Vec<Command>> {
        self.lock().history.recent(limit).map_err(rejected)
    }

    /// Current snapshot of one command.
    pub fn get(&self, id: CommandId) -> Result<Command> {
        self.lock()
            .history
            .get(id)
            .cloned()
            .ok_or(Error::UnknownCommand(id))
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    /// Wait until a submission happens.
    ///
    /// A submission made while nobody is waiting is remembered, so a single
    /// consumer never sleeps through work queued between two waits.
    pub async fn notified(&self) {
        self.submitted.notified().await;
    }
}

fn rejected(err: Error) -> Error {
    metrics::operations_rejected().add(1, &[KeyValue::new("kind", err.kind())]);
    err
}
