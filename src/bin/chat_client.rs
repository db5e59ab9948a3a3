//! Line Chat Client - Entry Point
//!
//! Connects to a chat server and runs the interactive menu on stdin/stdout.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use line_chat::config::{resolve_encoding, ClientConfig, DEFAULT_ENCODING};
use line_chat::console::run_client;

/// Interactive line chat client
#[derive(Parser, Debug)]
#[command(name = "chat_client", version, about)]
struct Args {
    /// Server IP address
    #[arg(short, long, default_value = "127.0.0.1")]
    ip: String,

    /// Server port
    #[arg(short, long, default_value_t = 8888)]
    port: u16,

    /// Wire text encoding label
    #[arg(short, long, default_value = DEFAULT_ENCODING)]
    encoding: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Quiet by default so log lines do not land in the middle of the chat
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("line_chat=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ClientConfig {
        ip: args.ip,
        port: args.port,
        encoding: resolve_encoding(&args.encoding)?,
    };

    if let Err(e) = run_client(config).await {
        eprintln!(">>> {}", e);
        return Err(e.into());
    }
    Ok(())
}
