//! Line Chat Server - Entry Point
//!
//! Parses flags, sets up logging, and runs the accept loop.

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use line_chat::config::{
    resolve_encoding, ServerConfig, DEFAULT_ENCODING, DEFAULT_IDLE_TIMEOUT, DEFAULT_LISTEN_ADDR,
    DEFAULT_MAILBOX_CAPACITY, DEFAULT_MAX_LINE_LENGTH,
};
use line_chat::serve;

/// Multi-user line chat server
#[derive(Parser, Debug)]
#[command(name = "chat_server", version, about)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = DEFAULT_LISTEN_ADDR)]
    addr: String,

    /// Seconds without input before a connection is closed
    #[arg(long, default_value_t = DEFAULT_IDLE_TIMEOUT.as_secs())]
    idle_timeout: u64,

    /// Outbound messages queued per connection before new ones are dropped
    #[arg(long, default_value_t = DEFAULT_MAILBOX_CAPACITY)]
    mailbox_capacity: usize,

    /// Longest accepted input line, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    max_line_length: usize,

    /// Wire text encoding label
    #[arg(short, long, default_value = DEFAULT_ENCODING)]
    encoding: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=line_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("line_chat=info")),
        )
        .init();

    let args = Args::parse();
    let config = ServerConfig {
        listen_addr: args.addr,
        idle_timeout: Duration::from_secs(args.idle_timeout),
        mailbox_capacity: args.mailbox_capacity,
        max_line_length: args.max_line_length,
        encoding: resolve_encoding(&args.encoding)?,
    };

    serve(config).await?;
    Ok(())
}
