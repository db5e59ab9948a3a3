//! Connection handler
//!
//! Supervises one peer from accept to teardown: registers the session,
//! runs the read loop as its own task, and watches for inactivity. Whatever
//! ends the connection (peer close, read error, idle timeout), teardown runs
//! exactly once, here, after both loops have been told to stop.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Notify;
use tokio::task::JoinError;
use tokio::time;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec::LineCodec;
use crate::error::{AppError, CodecError};
use crate::message::Notice;
use crate::router::CommandRouter;
use crate::server::ChatServer;
use crate::session::{drain_mailbox, Session};

/// Broadcast text announcing an arrival
pub const ARRIVAL_TEXT: &str = "online";

/// Broadcast text announcing a departure
pub const DEPARTURE_TEXT: &str = "offline";

/// How long teardown waits for queued output to reach a departing peer
const FLUSH_GRACE: Duration = Duration::from_secs(5);

/// Why a connection ended
#[derive(Debug)]
enum Disconnect {
    PeerClosed,
    ReadError(CodecError),
    ReadTaskFailed(JoinError),
    IdleTimeout,
}

/// Handle a new connection
///
/// `peer_addr` becomes both the session's address tag and its initial
/// display name. Returns an error only when the connection ended because
/// the peer's input could not be read or decoded.
pub async fn handle_connection<S>(
    stream: S,
    peer_addr: String,
    server: Arc<ChatServer>,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let config = server.config();
    let codec = LineCodec::new(config.encoding, config.max_line_length);
    let (read_half, write_half) = tokio::io::split(stream);
    let reader = FramedRead::new(read_half, codec.clone());
    let writer = FramedWrite::new(write_half, codec);

    let (session, mailbox) = Session::new(peer_addr, config.mailbox_capacity);
    let session = Arc::new(session);
    let mut drain = tokio::spawn(drain_mailbox(
        session.id(),
        mailbox,
        writer,
        session.closed_token(),
    ));

    if !server.registry().join(session.clone()) {
        warn!("Refusing {}: its address is in use as a name", session.addr());
        session.close();
        let _ = drain.await;
        return Ok(());
    }
    info!("Session {} online from {}", session.id(), session.addr());
    server.broadcaster().publish(&session, ARRIVAL_TEXT);

    let activity = Arc::new(Notify::new());
    let shutdown = CancellationToken::new();
    let mut read_task = tokio::spawn(read_loop(
        reader,
        session.clone(),
        server.router().clone(),
        activity.clone(),
        shutdown.clone(),
    ));

    // Idle watchdog: every completed line resets the window
    let disconnect = loop {
        tokio::select! {
            joined = &mut read_task => {
                break match joined {
                    Ok(Ok(())) => Disconnect::PeerClosed,
                    Ok(Err(e)) => Disconnect::ReadError(e),
                    Err(e) => Disconnect::ReadTaskFailed(e),
                };
            }
            () = activity.notified() => {}
            () = time::sleep(config.idle_timeout) => {
                break Disconnect::IdleTimeout;
            }
        }
    };

    if matches!(disconnect, Disconnect::IdleTimeout) {
        info!("Session {} idle for {:?}, disconnecting", session.id(), config.idle_timeout);
        // Out of the registry and closed right after the notice, so
        // nothing can be queued behind it
        server.registry().leave(&session);
        session.notify(Notice::IdleTimeout);
        session.close();
        shutdown.cancel();
        let _ = read_task.await;
    }

    // Offline; leave and close are no-ops if the timeout path ran them
    server.registry().leave(&session);
    server.broadcaster().publish(&session, DEPARTURE_TEXT);
    session.close();

    if time::timeout(FLUSH_GRACE, &mut drain).await.is_err() {
        debug!("Output to {} not flushed in time, dropping it", session.id());
        drain.abort();
    }

    info!(
        "Session {} ({}) offline, {} still online",
        session.id(),
        session.name(),
        server.registry().len()
    );

    match disconnect {
        Disconnect::PeerClosed | Disconnect::IdleTimeout => Ok(()),
        Disconnect::ReadError(e) => Err(e.into()),
        Disconnect::ReadTaskFailed(e) => {
            error!("Read task for {} failed: {}", session.id(), e);
            Ok(())
        }
    }
}

/// Read loop: one routed command per line, then an activity signal
///
/// Ends with `Ok` on end of stream or when `shutdown` fires.
async fn read_loop<R>(
    mut reader: FramedRead<R, LineCodec>,
    session: Arc<Session>,
    router: CommandRouter,
    activity: Arc<Notify>,
    shutdown: CancellationToken,
) -> Result<(), CodecError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = tokio::select! {
            () = shutdown.cancelled() => return Ok(()),
            frame = reader.next() => frame,
        };

        match frame {
            Some(Ok(line)) => {
                router.dispatch(&session, &line);
                activity.notify_one();
            }
            Some(Err(e)) => {
                warn!("Read error from {}: {}", session.id(), e);
                return Err(e);
            }
            None => {
                debug!("Peer {} closed the connection", session.id());
                return Ok(());
            }
        }
    }
}
