//! Metric instrument factories for mcq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"mcq"` meter. Without a
//! configured provider they are no-ops.

use opentelemetry::metrics::{Counter, Meter};

/// Returns the shared meter for mcq instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("mcq")
}

/// Counter: commands accepted by `submit`.
pub fn commands_submitted() -> Counter<u64> {
    meter()
        .u64_counter("mcq.commands.submitted")
        .with_description("Number of commands submitted")
        .build()
}

/// Counter: commands handed to the executor by `drain_pending`.
pub fn commands_drained() -> Counter<u64> {
    meter()
        .u64_counter("mcq.commands.drained")
        .with_description("Number of commands drained from the pending queue")
        .build()
}

/// Counter: terminal transitions.
/// Labels: `status` ("completed" | "failed").
pub fn commands_finalized() -> Counter<u64> {
    meter()
        .u64_counter("mcq.commands.finalized")
        .with_description("Number of commands reaching a terminal status")
        .build()
}

/// Counter: rejected queue operations.
/// Labels: `kind` (error kind).
pub fn operations_rejected() -> Counter<u64> {
    meter()
        .u64_counter("mcq.operations.rejected")
        .with_description("Number of queue operations rejected with an error")
        .build()
}

/// Counter: executor bridge sessions.
/// Labels: `event` ("opened" | "closed").
pub fn bridge_sessions() -> Counter<u64> {
    meter()
        .u64_counter("mcq.bridge.sessions")
        .with_description("Number of executor bridge sessions opened and closed")
        .build()
}
