//! Public chat fan-out
//!
//! `Broadcaster` is the cheap, cloneable publishing handle; `Dispatcher` is
//! the single task that drains the shared channel and copies each message
//! into every registered session's mailbox. One channel and one consumer
//! means every recipient sees a given sender's messages in submit order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::SendError;
use crate::message::format_chat;
use crate::registry::Registry;
use crate::session::Session;

/// Publishing handle for the broadcast channel
#[derive(Debug, Clone)]
pub struct Broadcaster {
    sender: mpsc::UnboundedSender<String>,
}

impl Broadcaster {
    /// Create the channel; the returned `Dispatcher` must be spawned
    pub fn new(registry: Arc<Registry>) -> (Self, Dispatcher) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, Dispatcher { receiver, registry })
    }

    /// Tag `text` with the sender's address and name and queue it for everyone
    ///
    /// Never waits. Returns false only if the dispatcher has stopped.
    pub fn publish(&self, from: &Session, text: &str) -> bool {
        let line = format_chat(from.addr(), &from.name(), text);
        if self.sender.send(line).is_err() {
            warn!("Broadcast from {} dropped: dispatcher stopped", from.id());
            return false;
        }
        true
    }
}

/// Broadcast fan-out task
pub struct Dispatcher {
    receiver: mpsc::UnboundedReceiver<String>,
    registry: Arc<Registry>,
}

impl Dispatcher {
    /// Run until every `Broadcaster` handle has been dropped
    pub async fn run(mut self) {
        info!("Broadcast dispatcher started");

        while let Some(msg) = self.receiver.recv().await {
            self.fan_out(&msg);
        }

        info!("Broadcast dispatcher shutting down");
    }

    /// Deliver one message to every session registered right now
    fn fan_out(&self, msg: &str) {
        for session in self.registry.snapshot() {
            match session.deliver(msg) {
                Ok(()) => {}
                Err(SendError::MailboxFull) => {
                    warn!("Mailbox of {} full, broadcast dropped", session.id());
                }
                Err(SendError::MailboxClosed) => {
                    debug!("Skipping closed session {}", session.id());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(registry: &Registry, addr: &str) -> (Arc<Session>, mpsc::Receiver<String>) {
        let (session, rx) = Session::new(addr, 16);
        let session = Arc::new(session);
        registry.join(session.clone());
        (session, rx)
    }

    #[tokio::test]
    async fn test_publish_reaches_every_session() {
        let registry = Arc::new(Registry::new());
        let (a, mut rx_a) = joined(&registry, "1.1.1.1:1");
        let (_b, mut rx_b) = joined(&registry, "2.2.2.2:2");
        let (broadcaster, dispatcher) = Broadcaster::new(registry.clone());
        tokio::spawn(dispatcher.run());

        assert!(broadcaster.publish(&a, "hello"));

        assert_eq!(rx_a.recv().await.unwrap(), "[1.1.1.1:1]1.1.1.1:1: hello");
        assert_eq!(rx_b.recv().await.unwrap(), "[1.1.1.1:1]1.1.1.1:1: hello");
    }

    #[tokio::test]
    async fn test_sender_order_preserved() {
        let registry = Arc::new(Registry::new());
        let (a, _rx_a) = joined(&registry, "1.1.1.1:1");
        let (_b, mut rx_b) = joined(&registry, "2.2.2.2:2");
        let (broadcaster, dispatcher) = Broadcaster::new(registry.clone());
        tokio::spawn(dispatcher.run());

        for i in 0..10 {
            broadcaster.publish(&a, &format!("m{}", i));
        }

        for i in 0..10 {
            assert_eq!(
                rx_b.recv().await.unwrap(),
                format!("[1.1.1.1:1]1.1.1.1:1: m{}", i)
            );
        }
    }

    #[tokio::test]
    async fn test_full_mailbox_does_not_block_others() {
        let registry = Arc::new(Registry::new());
        let (slow, _slow_rx) = Session::new("9.9.9.9:9", 1);
        registry.join(Arc::new(slow));
        let (a, mut rx_a) = joined(&registry, "1.1.1.1:1");
        let (broadcaster, dispatcher) = Broadcaster::new(registry.clone());
        tokio::spawn(dispatcher.run());

        for i in 0..5 {
            broadcaster.publish(&a, &format!("m{}", i));
        }

        for i in 0..5 {
            assert_eq!(
                rx_a.recv().await.unwrap(),
                format!("[1.1.1.1:1]1.1.1.1:1: m{}", i)
            );
        }
    }

    #[tokio::test]
    async fn test_dispatcher_stops_when_handles_dropped() {
        let registry = Arc::new(Registry::new());
        let (broadcaster, dispatcher) = Broadcaster::new(registry);
        let handle = tokio::spawn(dispatcher.run());

        drop(broadcaster);

        handle.await.unwrap();
    }
}
