//! ChatServer: shared state and the accept loop
//!
//! Owns the registry, the broadcast handle and the command router that every
//! connection handler works against. The broadcast dispatcher is returned
//! separately from `new` and must be spawned by the caller.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::broadcast::{Broadcaster, Dispatcher};
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::registry::Registry;
use crate::router::CommandRouter;

/// Process-wide chat state shared by all connection handlers
#[derive(Debug)]
pub struct ChatServer {
    config: ServerConfig,
    registry: Arc<Registry>,
    broadcaster: Broadcaster,
    router: CommandRouter,
}

impl ChatServer {
    /// Build the server state and its broadcast dispatcher
    pub fn new(config: ServerConfig) -> (Arc<Self>, Dispatcher) {
        let registry = Arc::new(Registry::new());
        let (broadcaster, dispatcher) = Broadcaster::new(registry.clone());
        let router = CommandRouter::new(registry.clone(), broadcaster.clone());
        let server = Self {
            config,
            registry,
            broadcaster,
            router,
        };
        (Arc::new(server), dispatcher)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    /// Accept connections forever, one handler task per peer
    ///
    /// A failed accept is logged and the loop keeps going.
    pub async fn run(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let server = Arc::clone(&self);

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr.to_string(), server).await {
                            error!("Connection handler error for {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Bind the configured address and run the server
pub async fn serve(config: ServerConfig) -> Result<(), AppError> {
    config.validate()?;

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|source| AppError::Bind {
            addr: config.listen_addr.clone(),
            source,
        })?;
    info!(
        "Chat server listening on {} ({} wire encoding, {}s idle timeout)",
        listener.local_addr()?,
        config.encoding.name(),
        config.idle_timeout.as_secs()
    );

    let (server, dispatcher) = ChatServer::new(config);
    tokio::spawn(dispatcher.run());
    info!("Broadcast dispatcher spawned");

    server.run(listener).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::LineCodec;
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpStream;
    use tokio_util::codec::Framed;

    async fn dial(addr: std::net::SocketAddr) -> Framed<TcpStream, LineCodec> {
        let stream = TcpStream::connect(addr).await.unwrap();
        Framed::new(stream, LineCodec::new(encoding_rs::GBK, 4096))
    }

    #[tokio::test]
    async fn test_server_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (server, dispatcher) = ChatServer::new(ServerConfig::default());
        tokio::spawn(dispatcher.run());
        tokio::spawn(Arc::clone(&server).run(listener));

        let mut alice = dial(addr).await;
        let greeting = alice.next().await.unwrap().unwrap();
        assert!(greeting.ends_with(": online"));

        alice.send("rename|阿丽").await.unwrap();
        assert_eq!(
            alice.next().await.unwrap().unwrap(),
            "you are now known as 阿丽"
        );

        let mut bob = dial(addr).await;
        let bob_arrival = bob.next().await.unwrap().unwrap();
        assert_eq!(alice.next().await.unwrap().unwrap(), bob_arrival);

        bob.send("who").await.unwrap();
        let mut listing = vec![
            bob.next().await.unwrap().unwrap(),
            bob.next().await.unwrap().unwrap(),
        ];
        listing.sort();
        assert!(listing.iter().all(|line| line.ends_with(": online...")));
        assert!(listing.iter().any(|line| line.contains("]阿丽: ")));
        assert_eq!(server.registry().len(), 2);
    }

    #[tokio::test]
    async fn test_serve_rejects_bad_config() {
        let config = ServerConfig {
            mailbox_capacity: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(serve(config).await, Err(AppError::Config(_))));
    }
}
