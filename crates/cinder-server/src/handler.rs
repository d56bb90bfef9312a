//! Per-connection read loop.
//!
//! Feeds socket bytes through the stream parser and dispatches each
//! multi-bulk frame to the engine, writing replies in command order.
//! Protocol errors are answered in-line and the connection stays open;
//! I/O errors (and a clean EOF) end it.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use cinder_protocol::{Frame, StreamParser};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::engine::Engine;

const BUF_CAPACITY: usize = 4096;

/// Drives one client connection until EOF, an I/O error, or server
/// shutdown.
pub async fn handle(
    stream: TcpStream,
    engine: Arc<Engine>,
    requirepass: Option<Arc<str>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".into());
    let (mut read_half, write_half) = stream.into_split();
    let connection = Connection::new(write_half);

    let mut parser = StreamParser::new();
    let mut buf = BytesMut::with_capacity(BUF_CAPACITY);

    loop {
        // serve everything already buffered before reading again, so
        // pipelined commands are answered in arrival order
        while let Some(item) = parser.next(&mut buf) {
            let reply = match item {
                Err(protocol_error) => Frame::Error(protocol_error.to_string()),
                Ok(frame) => {
                    let Some(line) = frame.into_cmdline() else {
                        warn!(%peer, "ignoring non-command frame");
                        continue;
                    };
                    if line.is_empty() {
                        continue;
                    }
                    dispatch(&connection, &engine, requirepass.as_deref(), &line).await
                }
            };
            if connection.write_frame(&reply).await.is_err() {
                debug!(%peer, "write failed, closing connection");
                connection.close().await;
                return;
            }
        }

        tokio::select! {
            _ = shutdown.recv() => {
                debug!(%peer, "server shutdown, closing connection");
                connection.close().await;
                return;
            }
            read = read_half.read_buf(&mut buf) => match read {
                Ok(0) => {
                    debug!(%peer, "connection closed by client");
                    connection.close().await;
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(%peer, "read failed: {e}");
                    connection.close().await;
                    return;
                }
            }
        }
    }
}

/// The static password gate, then the engine.
async fn dispatch(
    connection: &Connection,
    engine: &Engine,
    requirepass: Option<&str>,
    line: &[Bytes],
) -> Frame {
    let session = connection.session();
    let name = String::from_utf8_lossy(&line[0]).to_ascii_lowercase();

    match requirepass {
        Some(password) => {
            if name == "auth" {
                if line.len() != 2 {
                    return Frame::arg_num_err("auth");
                }
                if line[1].as_ref() == password.as_bytes() {
                    session.set_authenticated();
                    return Frame::Ok;
                }
                return Frame::err("ERR invalid password");
            }
            if !session.is_authenticated() {
                return Frame::err("NOAUTH Authentication required.");
            }
        }
        None => {
            if name == "auth" {
                return Frame::err("ERR Client sent AUTH, but no password is set");
            }
        }
    }

    engine.exec(session, line).await
}
