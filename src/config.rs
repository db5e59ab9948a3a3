//! Runtime configuration
//!
//! Plain structs with defaults; the binaries fill them from command-line
//! flags and call `validate` before starting.

use std::time::Duration;

use encoding_rs::Encoding;

use crate::error::AppError;

/// Default server listen address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8888";

/// Connections with no inbound line for this long are closed
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-session outbound queue size
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Longest accepted inbound line, in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// Wire encoding label used when none is given
pub const DEFAULT_ENCODING: &str = "gbk";

/// Resolve a WHATWG encoding label (`gbk`, `utf-8`, `big5`, ...)
///
/// Only ASCII-compatible encodings are accepted, the line framing relies
/// on `\n` being a single byte.
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding, AppError> {
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| AppError::Config(format!("unknown encoding '{}'", label)))?;
    if !encoding.is_ascii_compatible() {
        return Err(AppError::Config(format!(
            "encoding '{}' is not ASCII-compatible",
            encoding.name()
        )));
    }
    Ok(encoding)
}

/// Server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub idle_timeout: Duration,
    pub mailbox_capacity: usize,
    pub max_line_length: usize,
    pub encoding: &'static Encoding,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            encoding: encoding_rs::GBK,
        }
    }
}

impl ServerConfig {
    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), AppError> {
        if self.idle_timeout.is_zero() {
            return Err(AppError::Config("idle timeout must be non-zero".into()));
        }
        if self.mailbox_capacity == 0 {
            return Err(AppError::Config("mailbox capacity must be non-zero".into()));
        }
        if self.max_line_length == 0 {
            return Err(AppError::Config("max line length must be non-zero".into()));
        }
        Ok(())
    }
}

/// Client settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub ip: String,
    pub port: u16,
    pub encoding: &'static Encoding,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ip: "127.0.0.1".to_string(),
            port: 8888,
            encoding: encoding_rs::GBK,
        }
    }
}

impl ClientConfig {
    /// `ip:port` string for dialing
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}
