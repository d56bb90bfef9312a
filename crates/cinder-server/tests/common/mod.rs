//! Shared harness for wire-level tests: an in-process server plus a
//! raw RESP client.

// each integration test binary uses a different subset of this module
#![allow(dead_code)]

use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use cinder_protocol::{Frame, StreamParser};
use cinder_server::{Config, Engine, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub struct TestServer {
    addr: SocketAddr,
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Starts a server on an ephemeral port.
    pub async fn start(config: Config) -> TestServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        TestServer::start_on(listener, config).await
    }

    /// Starts a server on a listener bound by the caller (cluster
    /// tests bind first so the nodes can name each other).
    pub async fn start_on(listener: TcpListener, config: Config) -> TestServer {
        let addr = listener.local_addr().unwrap();
        let engine = Engine::from_config(&config).expect("engine startup");
        let (shutdown, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(Server::new(listener, engine, &config).serve(shutdown_rx));
        TestServer {
            addr,
            shutdown,
            handle,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn connect(&self) -> TestClient {
        TestClient::connect(self.addr).await
    }

    /// Graceful shutdown: waits for the accept loop to drain the
    /// engine (append-only pipeline included).
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}

/// Builds the config for node `index` of an `n`-node cluster whose
/// members are already bound to `addrs`.
pub fn cluster_config(addrs: &[SocketAddr], index: usize) -> Config {
    Config {
        self_addr: Some(addrs[index].to_string()),
        peers: addrs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, a)| a.to_string())
            .collect(),
        ..Config::default()
    }
}

/// Starts `n` servers that form one cluster.
pub async fn start_cluster(n: usize) -> Vec<TestServer> {
    let mut listeners = Vec::with_capacity(n);
    let mut addrs = Vec::with_capacity(n);
    for _ in 0..n {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        addrs.push(listener.local_addr().unwrap());
        listeners.push(listener);
    }

    let mut servers = Vec::with_capacity(n);
    for (index, listener) in listeners.into_iter().enumerate() {
        let config = cluster_config(&addrs, index);
        servers.push(TestServer::start_on(listener, config).await);
    }
    servers
}

/// A raw RESP client speaking directly over TCP.
pub struct TestClient {
    stream: TcpStream,
    parser: StreamParser,
    buf: BytesMut,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> TestClient {
        TestClient {
            stream: TcpStream::connect(addr).await.expect("connect"),
            parser: StreamParser::new(),
            buf: BytesMut::with_capacity(4096),
        }
    }

    /// Writes raw bytes, exactly as given.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.expect("write");
    }

    /// Reads the next reply frame.
    pub async fn read_frame(&mut self) -> Frame {
        loop {
            if let Some(item) = self.parser.next(&mut self.buf) {
                return item.expect("server sent a malformed frame");
            }
            let n = self.stream.read_buf(&mut self.buf).await.expect("read");
            assert!(n > 0, "server closed the connection");
        }
    }

    /// Sends one command as a multi-bulk frame and reads its reply.
    pub async fn cmd(&mut self, words: &[&str]) -> Frame {
        let line: Vec<Bytes> = words
            .iter()
            .map(|w| Bytes::copy_from_slice(w.as_bytes()))
            .collect();
        self.send_raw(&Frame::from_cmdline(&line).to_bytes()).await;
        self.read_frame().await
    }
}
