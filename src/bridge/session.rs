//! One executor connection: greet, dispatch pending commands, apply results.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Notify;
use tracing::{Instrument, debug, error, info, warn};

use super::protocol::{ExecutorMessage, ServerMessage};
use crate::error::Result;
use crate::model::{Command, Status};
use crate::queue::CommandQueue;
use crate::telemetry::command::{record_status_transition, start_command_span};

/// Why a session stopped without an I/O error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The executor closed its side of the connection.
    Disconnected,
    /// Shutdown was requested.
    Shutdown,
}

/// What woke the session loop.
enum Wake {
    Shutdown,
    /// Bytes read into the line buffer; zero at end of stream.
    Read(usize),
    Deliver,
    Refill,
}

/// A connected executor.
///
/// Commands drained from the queue wait in `outbox` and are written one per
/// loop turn, so executor messages keep being read while a backlog drains.
pub struct Session<R, W> {
    queue: Arc<CommandQueue>,
    reader: BufReader<R>,
    line: Vec<u8>,
    writer: W,
    outbox: VecDeque<Command>,
    poll_interval: Duration,
    shutdown: Arc<Notify>,
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        queue: Arc<CommandQueue>,
        reader: R,
        writer: W,
        poll_interval: Duration,
        shutdown: Arc<Notify>,
    ) -> Self {
        Self {
            queue,
            reader: BufReader::new(reader),
            line: Vec::new(),
            writer,
            outbox: VecDeque::new(),
            poll_interval,
            shutdown,
        }
    }

    /// Run until the executor disconnects, shutdown is requested, or I/O fails.
    ///
    /// Commands drained but not yet written when the session ends are
    /// reported failed.
    pub async fn run(mut self) -> Result<SessionEnd> {
        let end = self.serve().await;
        if !self.outbox.is_empty() {
            let reason = match &end {
                Ok(SessionEnd::Shutdown) => "bridge shut down".to_string(),
                Ok(SessionEnd::Disconnected) => "executor disconnected".to_string(),
                Err(e) => e.to_string(),
            };
            self.abandon(&reason);
        }
        end
    }

    async fn serve(&mut self) -> Result<SessionEnd> {
        self.send(&ServerMessage::welcome()).await?;

        // Work submitted before the executor connected.
        self.refill();

        loop {
            // Shutdown first, then executor input, then one delivery.
            // `read_until` keeps partial input in `self.line` when another
            // branch wins.
            let wake = tokio::select! {
                biased;
                _ = self.shutdown.notified() => Wake::Shutdown,
                read = self.reader.read_until(b'\n', &mut self.line) => Wake::Read(read?),
                _ = std::future::ready(()), if !self.outbox.is_empty() => Wake::Deliver,
                _ = self.queue.notified() => Wake::Refill,
                _ = tokio::time::sleep(self.poll_interval) => Wake::Refill,
            };

            match wake {
                Wake::Shutdown => {
                    info!("bridge session shutting down");
                    return Ok(SessionEnd::Shutdown);
                }
                Wake::Read(0) => {
                    // A final line without a newline still counts.
                    self.take_line();
                    return Ok(SessionEnd::Disconnected);
                }
                Wake::Read(_) => {
                    if let Some(reply) = self.take_line() {
                        self.send(&reply).await?;
                    }
                }
                Wake::Deliver => self.deliver_next().await?,
                Wake::Refill => self.refill(),
            }
        }
    }

    /// Move pending commands from the queue into the outbox.
    pub(crate) fn refill(&mut self) {
        self.outbox.extend(self.queue.drain_pending());
    }

    /// Write the oldest undelivered command.
    ///
    /// On a write error the command and everything behind it in the outbox
    /// are marked failed, since the executor will never see them.
    pub(crate) async fn deliver_next(&mut self) -> Result<()> {
        let Some(command) = self.outbox.pop_front() else {
            return Ok(());
        };

        let span = start_command_span(&command);
        let sent = self
            .send(&ServerMessage::execute(&command))
            .instrument(span)
            .await;

        match sent {
            Ok(()) => {
                debug!(id = %command.id, "command delivered");
                Ok(())
            }
            Err(e) => {
                self.outbox.push_front(command);
                self.abandon(&e.to_string());
                Err(e)
            }
        }
    }

    /// Report every command still in the outbox as failed.
    fn abandon(&mut self, cause: &str) {
        let reason = format!("delivery failed: {cause}");
        for lost in self.outbox.drain(..) {
            let span = start_command_span(&lost);
            match self
                .queue
                .report_result(lost.id, false, json!({"error": reason.as_str()}))
            {
                Ok(_) => record_status_transition(&span, "pending", "failed"),
                Err(err) => warn!(id = %lost.id, "could not mark undelivered command: {err}"),
            }
        }
    }

    /// Consume the buffered line and apply it.
    fn take_line(&mut self) -> Option<ServerMessage> {
        let raw = std::mem::take(&mut self.line);
        match String::from_utf8(raw) {
            Ok(line) => self.handle_line(&line),
            Err(e) => {
                warn!(error = %e.utf8_error(), "executor line is not UTF-8");
                None
            }
        }
    }

    fn handle_line(&self, line: &str) -> Option<ServerMessage> {
        if line.trim().is_empty() {
            return None;
        }
        match ExecutorMessage::from_line(line) {
            Ok(message) => handle_message(&self.queue, message),
            Err(e) => {
                warn!(error = %e, "unreadable executor message");
                None
            }
        }
    }

    async fn send(&mut self, message: &ServerMessage) -> Result<()> {
        let line = message.to_line()?;
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Apply one executor message to the queue. Returns the reply, if any.
///
/// Correlation failures (unknown id, double report) are logged by the queue
/// and do not end the session.
pub fn handle_message(queue: &CommandQueue, message: ExecutorMessage) -> Option<ServerMessage> {
    match message {
        ExecutorMessage::Ready => {
            info!("executor ready");
            Some(ServerMessage::ack())
        }
        ExecutorMessage::CommandResult {
            command_id,
            success,
            result,
        } => {
            if let Ok(command) = queue.report_result(command_id, success, result) {
                let span = start_command_span(&command);
                record_status_transition(
                    &span,
                    &Status::Pending.to_string(),
                    &command.status.to_string(),
                );
            }
            None
        }
        ExecutorMessage::Error { error } => {
            error!(%error, "executor reported an error");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// A writer whose peer has gone away.
    struct Broken;

    impl AsyncWrite for Broken {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn undelivered_commands_are_marked_failed() {
        let queue = Arc::new(CommandQueue::new());
        let a = queue.submit("say a", Metadata::new()).unwrap();
        let b = queue.submit("say b", Metadata::new()).unwrap();

        let mut session = Session::new(
            Arc::clone(&queue),
            tokio::io::empty(),
            Broken,
            Duration::from_millis(10),
            Arc::new(Notify::new()),
        );

        session.refill();
        assert!(session.deliver_next().await.is_err());

        for id in [a, b] {
            let command = queue.get(id).unwrap();
            assert_eq!(command.status, Status::Failed);
            let reason = command.result.unwrap();
            assert!(reason["error"].as_str().unwrap().starts_with("delivery failed"));
        }
        assert_eq!(queue.pending_len(), 0);
    }

    #[test]
    fn ready_is_acknowledged() {
        let queue = CommandQueue::new();
        assert_eq!(
            handle_message(&queue, ExecutorMessage::Ready),
            Some(ServerMessage::ack())
        );
    }

    #[test]
    fn unknown_result_is_ignored() {
        let queue = CommandQueue::new();
        let id = queue.submit("say hi", Metadata::new()).unwrap();

        let reply = handle_message(
            &queue,
            ExecutorMessage::CommandResult {
                command_id: crate::model::CommandId::new(),
                success: true,
                result: serde_json::Value::Null,
            },
        );

        assert!(reply.is_none());
        assert_eq!(queue.get(id).unwrap().status, Status::Pending);
    }
}
