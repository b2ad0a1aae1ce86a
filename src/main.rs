mod config;
mod event_store;
mod mcp;
mod webhook;
mod workflows;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use event_store::FileEventStore;
use mcp::McpEventServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "github-events")]
#[command(about = "GitHub webhook event store with HTTP and MCP query surfaces")]
#[command(version)]
struct Cli {
    /// Directory holding the event container file (overrides
    /// GITHUB_EVENTS_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the webhook HTTP server
    Serve {
        /// Port to listen on (overrides PORT, default 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run the MCP server on stdin/stdout
    Mcp,
    /// Report the operational state of the event container
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // In MCP mode stdout carries the protocol, so logs go to stderr.
    let filter = EnvFilter::from_default_env();
    if matches!(cli.command, Command::Mcp) {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = Config::from_env();
    let events_path = match cli.data_dir {
        Some(dir) => dir.join(config::EVENTS_FILE_NAME),
        None => config.events_path(),
    };
    let store = Arc::new(FileEventStore::new(events_path));

    match cli.command {
        Command::Serve { port } => {
            let port = port.unwrap_or(config.port);
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            webhook::serve(store, addr).await
        }
        Command::Mcp => {
            let server = McpEventServer::new((*store).clone());
            tokio::task::spawn_blocking(move || server.run_sync()).await?
        }
        Command::Status => {
            println!("{}: {}", store.path().display(), store.status());
            Ok(())
        }
    }
}
