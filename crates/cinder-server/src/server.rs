//! Accept loop and graceful shutdown.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cinder_protocol::Frame;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::connection::WaitGroup;
use crate::engine::Engine;
use crate::handler;

/// How long shutdown waits for connection handlers to finish. Each
/// handler itself bounds its write drain, so this is an upper bound,
/// not a typical cost.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

/// A bound listener plus the engine it serves.
pub struct Server {
    listener: TcpListener,
    engine: Arc<Engine>,
    requirepass: Option<Arc<str>>,
    maxclients: usize,
}

impl Server {
    pub fn new(listener: TcpListener, engine: Engine, config: &Config) -> Self {
        Server {
            listener,
            engine: Arc::new(engine),
            requirepass: config.requirepass.as_deref().map(Arc::from),
            maxclients: config.maxclients,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the shutdown signal fires, then stops
    /// accepting, closes active connections, and drains the engine.
    pub async fn serve(self, mut shutdown: broadcast::Receiver<()>) {
        let (conn_shutdown_tx, _) = broadcast::channel(1);
        let clients = (self.maxclients > 0).then(|| Arc::new(Semaphore::new(self.maxclients)));
        let handlers = Arc::new(WaitGroup::new());

        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "listening");
        }

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                accepted = self.listener.accept() => {
                    let (mut stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!("accept failed: {e}");
                            continue;
                        }
                    };

                    let permit = match &clients {
                        None => None,
                        Some(semaphore) => match semaphore.clone().try_acquire_owned() {
                            Ok(permit) => Some(permit),
                            Err(_) => {
                                debug!(%peer, "maxclients reached, rejecting");
                                let reply = Frame::err("ERR max number of clients reached");
                                let _ = stream.write_all(&reply.to_bytes()).await;
                                continue;
                            }
                        },
                    };

                    debug!(%peer, "accepted connection");
                    let engine = self.engine.clone();
                    let requirepass = self.requirepass.clone();
                    let conn_shutdown = conn_shutdown_tx.subscribe();
                    let handlers = handlers.clone();
                    tokio::spawn(async move {
                        let _guard = handlers.enter();
                        let _permit = permit;
                        handler::handle(stream, engine, requirepass, conn_shutdown).await;
                    });
                }
            }
        }

        info!("shutting down: closing connections");
        drop(self.listener);
        let _ = conn_shutdown_tx.send(());
        if !handlers.wait_timeout(DRAIN_TIMEOUT).await {
            warn!("some connections did not drain before the deadline");
        }
        self.engine.close().await;
        info!("shutdown complete");
    }
}
