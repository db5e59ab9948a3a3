//! Error types for the chat server
//!
//! Defines application-level errors, line codec errors and mailbox send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// All of these are fatal to the operation that produced them: a failed
/// bind aborts startup, a codec or IO failure ends one connection. Protocol
/// mistakes made by a peer are never errors, they become in-band notices.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing or transcoding failure (fatal for the connection)
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Listening socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Could not reach the server (client side)
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid startup configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Line codec errors
///
/// Produced by `LineCodec` while turning socket bytes into lines.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A line exceeded the configured maximum length
    #[error("Line exceeds {max} bytes")]
    LineTooLong { max: usize },

    /// Bytes that are not valid in the wire encoding
    #[error("Malformed {encoding} input")]
    Malformed { encoding: &'static str },

    /// Underlying socket error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mailbox send errors
///
/// Occurs when pushing a message into a session's outbound mailbox.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The session has been torn down and its mailbox closed
    #[error("Mailbox closed")]
    MailboxClosed,

    /// The mailbox is at capacity; the message was dropped
    #[error("Mailbox full")]
    MailboxFull,
}
