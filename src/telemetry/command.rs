//! Command dispatch span helpers.
//!
//! Provides span creation and status-transition recording for commands
//! flowing from the queue to the executor.

use tracing::Span;

use crate::model::Command;

/// Start a span covering the delivery of one command to the executor.
///
/// The `command.status` field is declared empty and can be updated via
/// [`record_status_transition`].
pub fn start_command_span(command: &Command) -> Span {
    tracing::info_span!(
        "command.dispatch",
        "command.id" = %command.id,
        "command.seq" = command.seq,
        "command.status" = tracing::field::Empty,
    )
}

/// Record a status transition on the given span.
///
/// Emits a tracing `info` event scoped to the span.
pub fn record_status_transition(span: &Span, from: &str, to: &str) {
    span.record("command.status", to);
    span.in_scope(|| {
        tracing::info!(from = from, to = to, "status_transition");
    });
}
