//! HTTP relay server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Caller                ┌──────────────────────────────────────────────┐
//!     POST /mock/request ──▶│ http server → cipher → dispatch → upstream   │
//!                           │                                               │
//!     ResponseEnvelope  ◀───│ cipher ◀── normalizer ◀── decoder ◀──────────│
//!                           └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use http_relay::config::ConfigWatcher;
use http_relay::lifecycle::{bootstrap, wait_for_shutdown_signal, Shutdown};
use http_relay::HttpServer;

#[derive(Parser)]
#[command(name = "http-relay")]
#[command(about = "HTTP relay with optional payload encryption", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut boot = bootstrap(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        boot.config.listener.bind_address = bind;
    }

    tracing::info!("http-relay v{} starting", env!("CARGO_PKG_VERSION"));

    let listener = TcpListener::bind(&boot.config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // Hot reload is only available with a config file.
    let (config_updates, _watcher) = match &boot.config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(guard) => (updates, Some(guard)),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                    (updates, None)
                }
            }
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let shutdown = Shutdown::new();
    let server = HttpServer::new(boot.config, boot.cipher)?;
    let server_task = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    wait_for_shutdown_signal().await;
    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
