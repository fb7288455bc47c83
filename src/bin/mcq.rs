//! mcq CLI: runs the command queue with its executor bridge and console.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mcq::bridge::{BridgeConfig, BridgeServer};
use mcq::config::Config;
use mcq::console::{Console, Reply};
use mcq::queue::CommandQueue;
use mcq::telemetry::{TelemetryConfig, init_telemetry};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "mcq", about = "Minecraft command queue", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the executor bridge and the operator console
    Serve {
        /// Address the executor bridge listens on
        #[arg(long, env = "MCQ_BRIDGE_ADDR")]
        bridge_addr: Option<SocketAddr>,
        /// Do not read commands from stdin; run until Ctrl-C
        #[arg(long)]
        no_console: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            bridge_addr,
            no_console,
        } => cmd_serve(bridge_addr, no_console).await,
    }
}

async fn cmd_serve(bridge_addr: Option<SocketAddr>, no_console: bool) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(addr) = bridge_addr {
        config.bridge_addr = addr;
    }

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "mcq".to_string(),
        default_filter: config.log_level.clone(),
    })?;

    let queue = Arc::new(CommandQueue::new());
    let bridge = BridgeServer::new(
        Arc::clone(&queue),
        BridgeConfig {
            poll_interval: config.poll_interval,
        },
    );

    let listener = TcpListener::bind(config.bridge_addr).await?;
    info!(addr = %config.bridge_addr, "mcq serving");

    let server = bridge.clone();
    let bridge_task = tokio::spawn(async move { server.run(listener).await });

    if no_console {
        tokio::signal::ctrl_c().await?;
    } else {
        run_console(Console::new(queue, config.history_max)).await?;
    }

    bridge.shutdown();
    bridge_task.await??;
    Ok(())
}

/// Read console lines from stdin until `:quit`, EOF, or Ctrl-C.
async fn run_console(console: Console) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            return Ok(());
        };

        match console.handle_line(&line) {
            Ok(Reply::Quit) => return Ok(()),
            Ok(Reply::Text(text)) if text.is_empty() => {}
            Ok(Reply::Text(text)) => println!("{text}"),
            Err(e) => eprintln!("error: {e}"),
        }
    }
}
