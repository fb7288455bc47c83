//! Bridge listener: accepts executor connections and runs one session at a time.

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::KeyValue;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use super::session::{Session, SessionEnd};
use crate::config::DEFAULT_POLL_INTERVAL_MS;
use crate::error::Result;
use crate::queue::CommandQueue;
use crate::telemetry::metrics;

/// Configuration for the bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Dispatch fallback when no submission wakes the session.
    pub poll_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Serves executors. Commands queued while none is connected stay pending
/// until one connects; a second executor waits until the first leaves.
#[derive(Clone)]
pub struct BridgeServer {
    queue: Arc<CommandQueue>,
    config: BridgeConfig,
    shutdown: Arc<Notify>,
}

impl BridgeServer {
    pub fn new(queue: Arc<CommandQueue>, config: BridgeConfig) -> Self {
        Self {
            queue,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Signal the bridge to shut down.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Build a session over an arbitrary byte stream.
    pub fn session<R, W>(&self, reader: R, writer: W) -> Session<R, W>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        Session::new(
            Arc::clone(&self.queue),
            reader,
            writer,
            self.config.poll_interval,
            Arc::clone(&self.shutdown),
        )
    }

    /// Accept executors until shutdown.
    pub async fn run(&self, listener: TcpListener) -> Result<()> {
        info!(addr = ?listener.local_addr().ok(), "executor bridge listening");

        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("executor bridge shutting down");
                    return Ok(());
                }
                conn = listener.accept() => conn,
            };

            let (stream, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("accept error: {e}");
                    tokio::time::sleep(self.config.poll_interval).await;
                    continue;
                }
            };

            info!(%peer, "executor connected");
            metrics::bridge_sessions().add(1, &[KeyValue::new("event", "opened")]);

            let (reader, writer) = stream.into_split();
            let end = self.session(reader, writer).run().await;

            metrics::bridge_sessions().add(1, &[KeyValue::new("event", "closed")]);

            match end {
                Ok(SessionEnd::Shutdown) => return Ok(()),
                Ok(SessionEnd::Disconnected) => info!(%peer, "executor disconnected"),
                Err(e) => warn!(%peer, "executor session ended: {e}"),
            }
        }
    }
}
