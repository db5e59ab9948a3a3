//! Line protocol definitions
//!
//! One decoded line from a client becomes a `Command`. Everything the server
//! says that is not chat traffic is a `Notice`, rendered to plain text.
//!
//! Fields are separated by `|` with no escaping, so names can never contain
//! the separator. The body of a private message is the last field and may.

use std::fmt;

/// Field separator of the inline command syntax
pub const SEPARATOR: char = '|';

const WHO: &str = "who";
const RENAME_PREFIX: &str = "rename|";
const TO_PREFIX: &str = "to|";

/// Client → Server line, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `who`: list online users
    Who,
    /// `rename|<name>`
    Rename { name: String },
    /// `to|<target>|<body>`; a missing body field parses as empty
    Private { target: String, body: String },
    /// Any other line is public chat
    Broadcast { text: String },
}

impl Command {
    /// Classify one decoded line (already stripped of its terminator)
    pub fn parse(line: &str) -> Self {
        if line == WHO {
            return Command::Who;
        }
        if let Some(name) = line.strip_prefix(RENAME_PREFIX) {
            return Command::Rename {
                name: name.to_string(),
            };
        }
        if let Some(rest) = line.strip_prefix(TO_PREFIX) {
            let (target, body) = rest.split_once(SEPARATOR).unwrap_or((rest, ""));
            return Command::Private {
                target: target.to_string(),
                body: body.to_string(),
            };
        }
        Command::Broadcast {
            text: line.to_string(),
        }
    }

    /// Render back to the wire form the client sends
    pub fn to_line(&self) -> String {
        match self {
            Command::Who => WHO.to_string(),
            Command::Rename { name } => format!("{}{}", RENAME_PREFIX, name),
            Command::Private { target, body } => {
                format!("{}{}{}{}", TO_PREFIX, target, SEPARATOR, body)
            }
            Command::Broadcast { text } => text.clone(),
        }
    }
}

/// Whether `name` is usable as a display name
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(SEPARATOR)
}

/// Format a line as it appears in everyone's stream: `[addr]name: text`
pub fn format_chat(addr: &str, name: &str, text: &str) -> String {
    format!("[{}]{}: {}", addr, name, text)
}

/// Server → Client in-band notices
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Rename accepted
    Renamed { name: String },
    /// Rename rejected, another session holds the name
    NameInUse { name: String },
    /// Rename line without a usable name
    InvalidName,
    /// `to|` line without a target
    PrivateFormat,
    /// `to|` target is not online
    UnknownUser,
    /// `to|` line with nothing to say
    EmptyMessage,
    /// Sent right before an idle connection is closed
    IdleTimeout,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Renamed { name } => write!(f, "you are now known as {}", name),
            Notice::NameInUse { name } => write!(f, "name {} is already in use", name),
            Notice::InvalidName => write!(
                f,
                "invalid name, use \"rename|name\" without '{}'",
                SEPARATOR
            ),
            Notice::PrivateFormat => {
                write!(f, "invalid message format, use \"to|name|text\"")
            }
            Notice::UnknownUser => write!(f, "user does not exist"),
            Notice::EmptyMessage => write!(f, "empty message, resend"),
            Notice::IdleTimeout => write!(f, "disconnected: idle for too long"),
        }
    }
}

impl From<Notice> for String {
    fn from(notice: Notice) -> Self {
        notice.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_who() {
        assert_eq!(Command::parse("who"), Command::Who);
        // Only the exact word is a query
        assert_eq!(
            Command::parse("who?"),
            Command::Broadcast {
                text: "who?".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rename() {
        assert_eq!(
            Command::parse("rename|Alice"),
            Command::Rename {
                name: "Alice".to_string()
            }
        );
        assert_eq!(
            Command::parse("rename|"),
            Command::Rename {
                name: String::new()
            }
        );
    }

    #[test]
    fn test_parse_private() {
        assert_eq!(
            Command::parse("to|B|hi"),
            Command::Private {
                target: "B".to_string(),
                body: "hi".to_string()
            }
        );
        assert_eq!(
            Command::parse("to|B|a|b"),
            Command::Private {
                target: "B".to_string(),
                body: "a|b".to_string()
            }
        );
        assert_eq!(
            Command::parse("to|B"),
            Command::Private {
                target: "B".to_string(),
                body: String::new()
            }
        );
        assert_eq!(
            Command::parse("to||hi"),
            Command::Private {
                target: String::new(),
                body: "hi".to_string()
            }
        );
    }

    #[test]
    fn test_parse_plain_text() {
        assert_eq!(
            Command::parse("today|tomorrow"),
            Command::Broadcast {
                text: "today|tomorrow".to_string()
            }
        );
        assert_eq!(
            Command::parse("to"),
            Command::Broadcast {
                text: "to".to_string()
            }
        );
    }

    #[test]
    fn test_to_line_matches_parse() {
        let cmd = Command::Private {
            target: "Bob".to_string(),
            body: "hello".to_string(),
        };
        assert_eq!(cmd.to_line(), "to|Bob|hello");
        assert_eq!(Command::parse(&cmd.to_line()), cmd);
    }

    #[test]
    fn test_valid_name() {
        assert!(is_valid_name("Alice"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("a|b"));
    }

    #[test]
    fn test_format_chat() {
        assert_eq!(format_chat("1.1.1.1:1", "A", "hi"), "[1.1.1.1:1]A: hi");
    }

    #[test]
    fn test_notice_text() {
        assert_eq!(Notice::UnknownUser.to_string(), "user does not exist");
        assert_eq!(Notice::EmptyMessage.to_string(), "empty message, resend");
        assert_eq!(
            String::from(Notice::Renamed {
                name: "Alice".to_string()
            }),
            "you are now known as Alice"
        );
    }
}
