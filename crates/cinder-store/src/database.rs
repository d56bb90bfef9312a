//! The standalone database set: N keyspaces behind one executor.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use bytes::Bytes;
use cinder_persistence::{self as persistence, Aof, AofError};
use cinder_protocol::Frame;
use tracing::{error, warn};

use crate::db::Db;
use crate::session::Session;

/// Number of databases when the configuration does not say otherwise.
pub const DEFAULT_DATABASES: usize = 16;

/// N independent keyspaces selectable per connection, with optional
/// append-only persistence fanned in from every one of them.
pub struct StandaloneDatabase {
    dbs: Vec<Db>,
    aof: Option<Aof>,
}

impl StandaloneDatabase {
    /// A database set with no persistence.
    pub fn new(databases: usize) -> Self {
        let databases = if databases == 0 {
            DEFAULT_DATABASES
        } else {
            databases
        };
        StandaloneDatabase {
            dbs: (0..databases).map(Db::new).collect(),
            aof: None,
        }
    }

    /// A database set backed by the append-only file at `path`.
    ///
    /// Existing records are replayed first — before the sinks are
    /// attached, so replay does not re-append what it reads. Failure
    /// to open the file for appending is fatal.
    pub fn with_aof(databases: usize, path: &Path) -> Result<Self, AofError> {
        let mut database = StandaloneDatabase::new(databases);

        let replay_session = Session::new();
        persistence::load(path, |line| {
            let reply = database.dispatch(&replay_session, &line);
            if reply.is_error() {
                warn!(
                    command = %String::from_utf8_lossy(&line[0]),
                    "aof replay error: {}",
                    reply.error_message().unwrap_or("unknown")
                );
            }
        })?;

        let aof = Aof::open(path)?;
        for db in &mut database.dbs {
            db.attach_sink(aof.sink());
        }
        database.aof = Some(aof);
        Ok(database)
    }

    /// Number of configured databases.
    pub fn databases(&self) -> usize {
        self.dbs.len()
    }

    /// Executes one command line for a session. Panics inside an
    /// executor are converted into the generic unknown-error reply and
    /// the server keeps running.
    pub fn exec(&self, session: &Session, line: &[Bytes]) -> Frame {
        catch_unwind(AssertUnwindSafe(|| self.dispatch(session, line))).unwrap_or_else(|_| {
            error!("executor panicked, replying unknown error");
            Frame::unknown_err()
        })
    }

    fn dispatch(&self, session: &Session, line: &[Bytes]) -> Frame {
        let Some(word) = line.first() else {
            return Frame::unknown_err();
        };
        let name = String::from_utf8_lossy(word).to_ascii_lowercase();

        // SELECT touches connection state, not a keyspace, so it is
        // handled above the per-database dispatcher
        if name == "select" {
            if line.len() != 2 {
                return Frame::arg_num_err("select");
            }
            return self.select(session, &line[1]);
        }

        let index = session.db_index();
        let Some(db) = self.dbs.get(index) else {
            return Frame::err("ERR DB index is out of range");
        };
        db.exec(line)
    }

    fn select(&self, session: &Session, arg: &Bytes) -> Frame {
        let Ok(index) = String::from_utf8_lossy(arg).parse::<usize>() else {
            return Frame::err("ERR invalid DB index");
        };
        if index >= self.dbs.len() {
            return Frame::err("ERR DB index is out of range");
        }
        session.select(index);
        Frame::Ok
    }

    /// Drains the append-only pipeline and releases it.
    pub fn close(&self) {
        if let Some(aof) = &self.aof {
            aof.close();
        }
    }
}
