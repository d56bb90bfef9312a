//! Per-connection state and write serialization.
//!
//! Replies from the executor, the protocol-error path, and shutdown
//! all funnel through [`Connection::write_frame`], where a mutex keeps
//! frames from interleaving on the wire. A wait group counts writes in
//! flight so [`Connection::close`] can hold the socket open until they
//! drain (bounded by a timeout) instead of truncating a reply
//! mid-frame.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use cinder_protocol::Frame;
use cinder_store::Session;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, Notify};
use tokio::time::timeout;

/// How long `close` waits for in-flight writes.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// The writable half of a client connection plus its session.
pub struct Connection {
    session: Arc<Session>,
    writer: Mutex<OwnedWriteHalf>,
    writes: WaitGroup,
}

impl Connection {
    pub fn new(write_half: OwnedWriteHalf) -> Self {
        Connection {
            session: Arc::new(Session::new()),
            writer: Mutex::new(write_half),
            writes: WaitGroup::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Serializes and writes one reply frame.
    pub async fn write_frame(&self, frame: &Frame) -> io::Result<()> {
        let mut buf = BytesMut::with_capacity(64);
        frame.serialize(&mut buf);
        self.write_bytes(&buf).await
    }

    /// Writes raw reply bytes under the connection's write lock.
    pub async fn write_bytes(&self, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let _guard = self.writes.enter();
        let mut writer = self.writer.lock().await;
        writer.write_all(bytes).await
    }

    /// Waits (bounded) for outstanding writes, then shuts the socket
    /// down.
    pub async fn close(&self) {
        self.writes.wait_timeout(CLOSE_TIMEOUT).await;
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

/// An async wait group: `enter` returns a guard, `wait` resolves once
/// every guard has dropped.
#[derive(Debug, Default)]
pub struct WaitGroup {
    count: AtomicUsize,
    notify: Notify,
}

impl WaitGroup {
    pub fn new() -> Self {
        WaitGroup::default()
    }

    pub fn enter(&self) -> WaitGuard<'_> {
        self.count.fetch_add(1, Ordering::SeqCst);
        WaitGuard(self)
    }

    pub async fn wait(&self) {
        loop {
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            let notified = self.notify.notified();
            // re-check to close the gap between load and registering
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Returns `true` when the group drained within the deadline.
    pub async fn wait_timeout(&self, deadline: Duration) -> bool {
        timeout(deadline, self.wait()).await.is_ok()
    }
}

pub struct WaitGuard<'a>(&'a WaitGroup);

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.notify.notify_waiters();
        }
    }
}
