//! AOF replay.
//!
//! Runs the RESP stream parser over the log file and feeds each
//! multi-bulk record to the caller's executor, exactly as if a client
//! had sent it. `SELECT` records pass through the executor too, which
//! keeps database-selection ordering correct without any special
//! casing here.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use bytes::BytesMut;
use cinder_protocol::{CmdLine, StreamParser};
use tracing::{info, warn};

use crate::aof::AofError;

const READ_CHUNK: usize = 64 * 1024;

/// Replays every record in the file at `path` through `exec`.
///
/// A missing file is a fresh start, not an error. Protocol errors in
/// the middle of the file are logged and skipped; the parser resumes
/// at the next record. Executor failures are the executor's to report.
pub fn load(path: &Path, mut exec: impl FnMut(CmdLine)) -> Result<(), AofError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no append-only file, starting empty");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut parser = StreamParser::new();
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut records = 0usize;

    loop {
        // drain every complete frame currently buffered
        while let Some(item) = parser.next(&mut buf) {
            match item {
                Ok(frame) => match frame.into_cmdline() {
                    Some(line) if !line.is_empty() => {
                        exec(line);
                        records += 1;
                    }
                    _ => warn!("aof record is not a command, skipping"),
                },
                Err(e) => warn!("aof parse error, skipping record: {e}"),
            }
        }

        let n = file.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    if !buf.is_empty() {
        warn!(
            trailing = buf.len(),
            "append-only file ends mid-record, ignoring tail"
        );
    }
    info!(records, path = %path.display(), "append-only file replayed");
    Ok(())
}
