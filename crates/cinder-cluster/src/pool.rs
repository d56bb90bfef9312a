//! Borrow/return pool of peer clients.
//!
//! Each relay borrows a connection for its exclusive use and returns
//! it afterwards, so a client is never shared between concurrent
//! callers. Connections are created lazily and a bounded number of
//! idle ones are kept; the rest are closed on return.

use std::io;

use tokio::sync::Mutex;

use crate::client::PeerClient;

/// Idle connections retained per peer.
const MAX_IDLE: usize = 4;

pub struct ClientPool {
    addr: String,
    idle: Mutex<Vec<PeerClient>>,
}

impl ClientPool {
    pub fn new(addr: String) -> Self {
        ClientPool {
            addr,
            idle: Mutex::new(Vec::new()),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Takes an idle connection or dials a new one.
    pub async fn borrow(&self) -> io::Result<PeerClient> {
        if let Some(client) = self.idle.lock().await.pop() {
            return Ok(client);
        }
        PeerClient::connect(&self.addr).await
    }

    /// Returns a connection to the pool, closing it when the idle set
    /// is already full.
    pub async fn give_back(&self, client: PeerClient) {
        {
            let mut idle = self.idle.lock().await;
            if idle.len() < MAX_IDLE {
                idle.push(client);
                return;
            }
        }
        client.close().await;
    }

    /// Closes every idle connection.
    pub async fn close(&self) {
        let clients = std::mem::take(&mut *self.idle.lock().await);
        for client in clients {
            client.close().await;
        }
    }
}
