//! Line-oriented TCP Chat Server Library
//!
//! A multi-user chat service over plain TCP: every line a client sends is
//! either a tiny inline command or public chat text. Text is transcoded to
//! and from a fixed wire encoding (GBK by default) at the socket boundary.
//!
//! # Protocol
//! - `who`: list online users, one `[addr]name: online...` line each
//! - `rename|<name>`: change display name (unique among online users)
//! - `to|<name>|<text>`: private message, delivered as bare `<text>`
//! - anything else: broadcast to everyone as `[addr]name: <text>`
//!
//! # Architecture
//! - `Registry` is the name → `Session` directory behind a single lock
//! - `Broadcaster` feeds one channel drained by a single `Dispatcher` task
//! - each connection runs a read task, a mailbox drain task, and an idle
//!   watchdog in `handle_connection`
//!
//! # Example
//! ```ignore
//! use line_chat::{serve, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     serve(ServerConfig::default()).await.unwrap();
//! }
//! ```

pub mod broadcast;
pub mod codec;
pub mod config;
pub mod console;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use broadcast::{Broadcaster, Dispatcher};
pub use codec::LineCodec;
pub use config::{ClientConfig, ServerConfig};
pub use error::{AppError, CodecError, SendError};
pub use handler::handle_connection;
pub use message::{Command, Notice};
pub use registry::Registry;
pub use router::CommandRouter;
pub use server::{serve, ChatServer};
pub use session::Session;
pub use types::SessionId;
