//! Pipelined client for one peer connection.
//!
//! Requests flow through two queues: **pending** (not yet written) and
//! **waiting** (bytes sent, reply awaited). A writer task drains
//! pending onto the socket and pushes each request's completion handle
//! onto waiting; a reader task parses replies off the socket and pairs
//! them with waiting handles in FIFO order, which is exactly the order
//! the peer will answer in. A heartbeat task keeps the connection warm
//! with a `PING` every 10 seconds.
//!
//! A failed write triggers up to three reconnect attempts; the fresh
//! read half is handed to the reader task over a side channel.

use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use cinder_protocol::{CmdLine, Frame, StreamParser};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Depth of the pending and waiting queues.
const QUEUE_SIZE: usize = 256;

/// Bounded wait for a single request's reply.
const MAX_WAIT: Duration = Duration::from_secs(3);

/// Heartbeat period.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Write failures tolerated before a request is failed outright.
const RECONNECT_ATTEMPTS: usize = 3;

struct Request {
    line: CmdLine,
    reply_tx: oneshot::Sender<Frame>,
}

/// One pipelined TCP connection to a peer node.
pub struct PeerClient {
    pending_tx: mpsc::Sender<Request>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

impl PeerClient {
    /// Connects and starts the writer, reader, and heartbeat tasks.
    pub async fn connect(addr: &str) -> io::Result<PeerClient> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();

        let (pending_tx, pending_rx) = mpsc::channel(QUEUE_SIZE);
        let (waiting_tx, waiting_rx) = mpsc::channel(QUEUE_SIZE);
        let (readers_tx, readers_rx) = mpsc::channel(4);

        let writer = tokio::spawn(write_loop(
            addr.to_string(),
            write_half,
            pending_rx,
            waiting_tx,
            readers_tx,
        ));
        let reader = tokio::spawn(read_loop(read_half, readers_rx, waiting_rx));
        let heartbeat = tokio::spawn(heartbeat_loop(pending_tx.clone()));

        Ok(PeerClient {
            pending_tx,
            writer,
            reader,
            heartbeat,
        })
    }

    /// Sends one command and waits for its reply, bounded by
    /// [`MAX_WAIT`]. Every failure mode maps to an error frame so the
    /// caller can relay it verbatim.
    pub async fn send(&self, line: CmdLine) -> Frame {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .pending_tx
            .send(Request { line, reply_tx })
            .await
            .is_err()
        {
            return Frame::err("ERR connection closed");
        }
        match timeout(MAX_WAIT, reply_rx).await {
            Err(_) => Frame::timeout_err(),
            Ok(Err(_)) => Frame::err("ERR connection closed"),
            Ok(Ok(frame)) => frame,
        }
    }

    /// Lets in-flight requests drain, then stops all three tasks.
    pub async fn close(mut self) {
        self.heartbeat.abort();
        drop(self.pending_tx);
        let _ = self.writer.await;
        // the writer shut the socket down; give the reader a moment to
        // observe EOF, then drop it
        if timeout(Duration::from_secs(1), &mut self.reader).await.is_err() {
            self.reader.abort();
        }
    }
}

async fn write_loop(
    addr: String,
    mut write_half: OwnedWriteHalf,
    mut pending_rx: mpsc::Receiver<Request>,
    waiting_tx: mpsc::Sender<oneshot::Sender<Frame>>,
    readers_tx: mpsc::Sender<OwnedReadHalf>,
) {
    let mut buf = BytesMut::with_capacity(4096);

    while let Some(request) = pending_rx.recv().await {
        buf.clear();
        Frame::from_cmdline(&request.line).serialize(&mut buf);

        let mut result = write_half.write_all(&buf).await;
        let mut attempts = 0;
        while result.is_err() && attempts < RECONNECT_ATTEMPTS {
            attempts += 1;
            match TcpStream::connect(&addr).await {
                Ok(stream) => {
                    let (read_half, new_write_half) = stream.into_split();
                    if readers_tx.send(read_half).await.is_err() {
                        break;
                    }
                    write_half = new_write_half;
                    result = write_half.write_all(&buf).await;
                }
                Err(e) => {
                    warn!(peer = %addr, attempt = attempts, "reconnect failed: {e}");
                }
            }
        }

        match result {
            Ok(()) => {
                if waiting_tx.send(request.reply_tx).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = request.reply_tx.send(Frame::err(format!("ERR request failed: {e}")));
            }
        }
    }

    // graceful close: signal EOF so the peer (and our reader) wind down
    let _ = write_half.shutdown().await;
    debug!(peer = %addr, "peer writer stopped");
}

async fn read_loop(
    first: OwnedReadHalf,
    mut readers_rx: mpsc::Receiver<OwnedReadHalf>,
    mut waiting_rx: mpsc::Receiver<oneshot::Sender<Frame>>,
) {
    let mut current = Some(first);
    while let Some(read_half) = current {
        if !drain_replies(read_half, &mut waiting_rx).await {
            return; // client closed
        }
        // the socket died; anything still waiting belongs to it
        while let Ok(reply_tx) = waiting_rx.try_recv() {
            let _ = reply_tx.send(Frame::err("ERR connection lost"));
        }
        current = readers_rx.recv().await;
    }
    debug!("peer reader stopped");
}

/// Reads one socket until EOF or error, pairing each parsed reply with
/// the next waiting request. Returns `false` once the waiting queue is
/// closed (client shutdown).
async fn drain_replies(
    mut read_half: OwnedReadHalf,
    waiting_rx: &mut mpsc::Receiver<oneshot::Sender<Frame>>,
) -> bool {
    let mut parser = StreamParser::new();
    let mut buf = BytesMut::with_capacity(4096);
    loop {
        while let Some(item) = parser.next(&mut buf) {
            let frame = match item {
                Ok(frame) => frame,
                Err(e) => Frame::Error(e.to_string()),
            };
            match waiting_rx.recv().await {
                Some(reply_tx) => {
                    let _ = reply_tx.send(frame);
                }
                None => return false,
            }
        }
        match read_half.read_buf(&mut buf).await {
            Ok(0) => return true,
            Ok(_) => {}
            Err(e) => {
                debug!("peer read failed: {e}");
                return true;
            }
        }
    }
}

async fn heartbeat_loop(pending_tx: mpsc::Sender<Request>) {
    let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
    ticker.tick().await; // the first tick fires immediately
    loop {
        ticker.tick().await;
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = Request {
            line: vec![Bytes::from_static(b"PING")],
            reply_tx,
        };
        if pending_tx.send(request).await.is_err() {
            return;
        }
        // reply content is irrelevant; the write keeps the link alive
        let _ = timeout(MAX_WAIT, reply_rx).await;
    }
}
