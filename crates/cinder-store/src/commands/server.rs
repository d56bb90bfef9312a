//! Server commands.

use bytes::Bytes;
use cinder_protocol::Frame;

use crate::db::Db;
use crate::registry::{register, Table};

pub(crate) fn register_all(table: &mut Table) {
    register(table, "ping", ping, -1);
}

/// `PING [message]` — `PONG`, or the message echoed as a simple
/// string.
fn ping(_db: &Db, args: &[Bytes]) -> Frame {
    match args {
        [] => Frame::Pong,
        [msg] => Frame::Simple(String::from_utf8_lossy(msg).into_owned()),
        _ => Frame::arg_num_err("ping"),
    }
}
