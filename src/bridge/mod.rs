//! Executor bridge: delivers queued commands to a connected executor and
//! correlates the results it reports back.

pub mod protocol;
pub mod server;
pub mod session;

pub use protocol::{ExecutorMessage, ServerMessage};
pub use server::{BridgeConfig, BridgeServer};
pub use session::{Session, SessionEnd};
