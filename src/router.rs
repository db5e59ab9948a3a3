//! Inline command routing
//!
//! Takes one decoded line from a session and acts on it: answer `who`,
//! rename through the registry, deliver `to|` messages straight into the
//! target's mailbox, or hand everything else to the broadcaster.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::broadcast::Broadcaster;
use crate::message::{format_chat, is_valid_name, Command, Notice};
use crate::registry::Registry;
use crate::session::Session;

/// Text shown next to each user in a `who` listing
pub const ONLINE_MARK: &str = "online...";

#[derive(Debug, Clone)]
pub struct CommandRouter {
    registry: Arc<Registry>,
    broadcaster: Broadcaster,
}

impl CommandRouter {
    pub fn new(registry: Arc<Registry>, broadcaster: Broadcaster) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }

    /// Act on one line received from `from`
    pub fn dispatch(&self, from: &Arc<Session>, line: &str) {
        match Command::parse(line) {
            Command::Who => self.handle_who(from),
            Command::Rename { name } => self.handle_rename(from, &name),
            Command::Private { target, body } => self.handle_private(from, &target, &body),
            Command::Broadcast { text } => {
                self.broadcaster.publish(from, &text);
            }
        }
    }

    /// One `[addr]name: online...` line per registered session
    ///
    /// The whole listing is queued as a single mailbox entry so it is
    /// delivered complete or not at all, however many users are online.
    fn handle_who(&self, from: &Session) {
        let listing = self
            .registry
            .snapshot()
            .iter()
            .map(|session| format_chat(session.addr(), &session.name(), ONLINE_MARK))
            .collect::<Vec<_>>()
            .join("\n");
        if let Err(e) = from.deliver(listing) {
            warn!("Listing for {} dropped: {}", from.id(), e);
        }
    }

    fn handle_rename(&self, from: &Arc<Session>, name: &str) {
        if !is_valid_name(name) {
            from.notify(Notice::InvalidName);
            return;
        }
        self.registry.rename(from, name);
    }

    fn handle_private(&self, from: &Session, target: &str, body: &str) {
        if target.is_empty() {
            from.notify(Notice::PrivateFormat);
            return;
        }
        let Some(recipient) = self.registry.get(target) else {
            from.notify(Notice::UnknownUser);
            return;
        };
        if body.is_empty() {
            from.notify(Notice::EmptyMessage);
            return;
        }

        match recipient.deliver(body) {
            Ok(()) => debug!("Private message {} -> {}", from.id(), recipient.id()),
            Err(e) => warn!(
                "Private message {} -> {} dropped: {}",
                from.id(),
                recipient.id(),
                e
            ),
        }
    }
}
