//! Append-only file writer.
//!
//! A bounded multi-producer channel feeds a dedicated writer thread —
//! the only place that ever touches the file. Producers block when the
//! channel is full, so the keyspace cannot outrun durability. Records
//! are RESP multi-bulk frames: the command exactly as a client would
//! send it, preceded by a `SELECT <n>` record whenever the writer's
//! shadow database index differs from the record's.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Mutex;
use std::thread::JoinHandle;

use bytes::{Bytes, BytesMut};
use cinder_protocol::{CmdLine, Frame};
use thiserror::Error;
use tracing::{debug, error, info};

/// Channel capacity. Producers block once this many records are
/// queued.
pub const QUEUE_SIZE: usize = 1 << 16;

/// Errors from opening or reading the log file. Write-side errors are
/// logged by the writer thread instead of propagating: a failed append
/// must not take down command execution.
#[derive(Debug, Error)]
pub enum AofError {
    #[error("aof io error: {0}")]
    Io(#[from] std::io::Error),
}

enum Message {
    Record { db_index: usize, line: CmdLine },
    Shutdown,
}

/// Cloneable producer handle onto the AOF channel.
///
/// Each database holds its own sink, so a record always carries the
/// index of the database it mutated.
#[derive(Clone)]
pub struct AofSink {
    tx: SyncSender<Message>,
}

impl AofSink {
    /// Queues one mutation record. Blocks while the channel is full;
    /// silently drops the record if the writer has already shut down
    /// (only possible during server teardown).
    pub fn append(&self, db_index: usize, line: CmdLine) {
        if self.tx.send(Message::Record { db_index, line }).is_err() {
            debug!("aof writer gone, dropping record");
        }
    }
}

/// The append-only log: owns the writer thread.
pub struct Aof {
    tx: SyncSender<Message>,
    handle: Mutex<Option<JoinHandle<()>>>,
    path: PathBuf,
}

impl Aof {
    /// Opens (or creates) the log for appending and starts the writer
    /// thread. Failure here is fatal to startup.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AofError> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let (tx, rx) = sync_channel(QUEUE_SIZE);

        let thread_path = path.clone();
        let handle = std::thread::Builder::new()
            .name("aof-writer".into())
            .spawn(move || writer_loop(file, rx, &thread_path))?;

        info!(path = %path.display(), "append-only file open");
        Ok(Aof {
            tx,
            handle: Mutex::new(Some(handle)),
            path,
        })
    }

    /// A new producer handle.
    pub fn sink(&self) -> AofSink {
        AofSink {
            tx: self.tx.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drains queued records and stops the writer thread. Records
    /// queued before this call are on disk when it returns.
    pub fn close(&self) {
        let handle = self.handle.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = handle {
            let _ = self.tx.send(Message::Shutdown);
            if handle.join().is_err() {
                error!("aof writer thread panicked");
            }
        }
    }
}

impl Drop for Aof {
    fn drop(&mut self) {
        self.close();
    }
}

/// The single writer: receives records in channel order and appends
/// them, tracking which database the file "is in" so replay selects
/// the right one.
fn writer_loop(file: File, rx: Receiver<Message>, path: &Path) {
    let mut writer = BufWriter::new(file);
    let mut current_db = 0usize;
    let mut buf = BytesMut::new();

    while let Ok(msg) = rx.recv() {
        let (db_index, line) = match msg {
            Message::Record { db_index, line } => (db_index, line),
            Message::Shutdown => break,
        };

        buf.clear();
        if db_index != current_db {
            let select: CmdLine = vec![
                Bytes::from_static(b"SELECT"),
                Bytes::from(db_index.to_string()),
            ];
            Frame::from_cmdline(&select).serialize(&mut buf);
            current_db = db_index;
        }
        Frame::from_cmdline(&line).serialize(&mut buf);

        if let Err(e) = writer.write_all(&buf).and_then(|_| writer.flush()) {
            error!(path = %path.display(), "aof append failed: {e}");
        }
    }

    if let Err(e) = writer.flush() {
        error!(path = %path.display(), "aof final flush failed: {e}");
    }
    debug!("aof writer stopped");
}
