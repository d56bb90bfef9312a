//! One numbered database: a keyspace plus its append-only sink.

use bytes::Bytes;
use cinder_core::{Entity, Keyspace, Value};
use cinder_persistence::AofSink;
use cinder_protocol::Frame;

use crate::registry;

/// A single database. Executors reach the keyspace through this and
/// report mutations through [`Db::record`].
pub struct Db {
    index: usize,
    keyspace: Keyspace,
    aof: Option<AofSink>,
}

impl Db {
    pub(crate) fn new(index: usize) -> Self {
        Db {
            index,
            keyspace: Keyspace::new(),
            aof: None,
        }
    }

    pub(crate) fn attach_sink(&mut self, sink: AofSink) {
        self.aof = Some(sink);
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    /// Dispatches one command line against this database. The name is
    /// matched case-insensitively; arity violations and unknown names
    /// are answered without reaching a handler.
    pub fn exec(&self, line: &[Bytes]) -> Frame {
        let Some(word) = line.first() else {
            return Frame::unknown_err();
        };
        let name = String::from_utf8_lossy(word).to_ascii_lowercase();
        let Some(cmd) = registry::lookup(&name) else {
            return Frame::unknown_command_err(&name);
        };
        if !registry::arity_ok(cmd.arity, line.len()) {
            return Frame::arg_num_err(&name);
        }
        (cmd.handler)(self, &line[1..])
    }

    /// Appends a mutation record tagged with this database's index.
    /// Called by executors after the keyspace change took effect.
    pub(crate) fn record(&self, name: &str, args: &[Bytes]) {
        if let Some(sink) = &self.aof {
            let mut line = Vec::with_capacity(args.len() + 1);
            line.push(Bytes::copy_from_slice(name.as_bytes()));
            line.extend(args.iter().cloned());
            sink.append(self.index, line);
        }
    }

    /// Reads the string value under `key`. `Ok(None)` when absent,
    /// `Err` with a WRONGTYPE reply when the key holds something else.
    pub(crate) fn get_string(&self, key: &[u8]) -> Result<Option<Bytes>, Frame> {
        match self.keyspace.view(key, |e| e.as_bytes().cloned()) {
            None => Ok(None),
            Some(Some(data)) => Ok(Some(data)),
            Some(None) => Err(Frame::wrong_type_err()),
        }
    }

    /// Stores a plain string value with no expiration.
    pub(crate) fn put_string(&self, key: Bytes, value: impl Into<Bytes>) {
        self.keyspace
            .put(key, Entity::new(Value::Bytes(value.into())));
    }
}
