//! Session struct definition
//!
//! Represents one connected peer: its identity, current display name and
//! outbound mailbox. The mailbox is drained onto the socket by a dedicated
//! task (`drain_mailbox`) that lives exactly as long as the session.

use futures_util::{Sink, SinkExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{CodecError, SendError};
use crate::message::Notice;
use crate::types::SessionId;

/// Connected session
///
/// Shared as `Arc<Session>`: the connection supervisor owns teardown, the
/// registry and the broadcast dispatcher only hold references for routing.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    /// Remote address, also the initial display name
    addr: String,
    /// Display name; only written by the registry while it holds its lock
    name: Mutex<String>,
    /// Outbound queue, drained by `drain_mailbox`
    mailbox: mpsc::Sender<String>,
    /// Cancelled once the session is torn down
    closed: CancellationToken,
}

impl Session {
    /// Create a session for a peer at `addr` with a bounded mailbox
    ///
    /// Returns the receiving end of the mailbox, which must be handed to
    /// `drain_mailbox`.
    pub fn new(addr: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let addr = addr.into();
        let (tx, rx) = mpsc::channel(capacity);
        let session = Self {
            id: SessionId::new(),
            name: Mutex::new(addr.clone()),
            addr,
            mailbox: tx,
            closed: CancellationToken::new(),
        };
        (session, rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Current display name
    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    pub(crate) fn set_name(&self, name: String) {
        *self.name.lock() = name;
    }

    /// Queue a message for this session without waiting
    ///
    /// A full mailbox drops the message rather than stalling the caller,
    /// so one stuck peer cannot hold up delivery to everyone else.
    pub fn deliver(&self, msg: impl Into<String>) -> Result<(), SendError> {
        if self.closed.is_cancelled() {
            return Err(SendError::MailboxClosed);
        }
        self.mailbox.try_send(msg.into()).map_err(|e| match e {
            TrySendError::Full(_) => SendError::MailboxFull,
            TrySendError::Closed(_) => SendError::MailboxClosed,
        })
    }

    /// Send an in-band notice, logging if it cannot be queued
    pub fn notify(&self, notice: Notice) {
        if let Err(e) = self.deliver(notice) {
            warn!("Notice to {} dropped: {}", self.id, e);
        }
    }

    /// Close the mailbox; the drain task flushes what is queued and exits
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Token the drain task watches for teardown
    pub fn closed_token(&self) -> CancellationToken {
        self.closed.clone()
    }
}

/// Mailbox drain loop
///
/// Writes every queued message to `writer` (the codec appends the line
/// terminator) until the session is closed or a write fails. On close,
/// messages already queued are still written before the writer is shut down.
pub async fn drain_mailbox<W>(
    session_id: SessionId,
    mut mailbox: mpsc::Receiver<String>,
    mut writer: W,
    closed: CancellationToken,
) where
    W: Sink<String, Error = CodecError> + Unpin,
{
    loop {
        tokio::select! {
            biased;
            msg = mailbox.recv() => {
                let Some(msg) = msg else {
                    break;
                };
                if let Err(e) = writer.send(msg).await {
                    debug!("Write to {} failed: {}", session_id, e);
                    break;
                }
            }
            () = closed.cancelled() => {
                mailbox.close();
                while let Ok(msg) = mailbox.try_recv() {
                    if writer.send(msg).await.is_err() {
                        break;
                    }
                }
                break;
            }
        }
    }

    let _ = writer.close().await;
    debug!("Mailbox drain ended for {}", session_id);
}
