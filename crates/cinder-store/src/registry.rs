//! The command table: name → (handler, arity).
//!
//! Registration is static — the table is assembled once from each
//! command module. Names are stored lowercase and matched
//! case-insensitively by lowercasing the incoming word.
//!
//! Arity counts the command word itself: a positive arity `a` accepts
//! exactly `a` words (`SET k v` is 3), a negative arity `-a` accepts
//! at least `a` words (`DEL k [k ...]` is -2).

use std::collections::HashMap;
use std::sync::LazyLock;

use bytes::Bytes;
use cinder_protocol::Frame;

use crate::commands;
use crate::db::Db;

/// Executor signature: the target database and the words after the
/// command name.
pub type Handler = fn(&Db, &[Bytes]) -> Frame;

pub struct Command {
    pub handler: Handler,
    pub arity: i32,
}

pub type Table = HashMap<&'static str, Command>;

static TABLE: LazyLock<Table> = LazyLock::new(|| {
    let mut table = Table::new();
    commands::server::register_all(&mut table);
    commands::keys::register_all(&mut table);
    commands::strings::register_all(&mut table);
    commands::zset::register_all(&mut table);
    table
});

pub(crate) fn register(table: &mut Table, name: &'static str, handler: Handler, arity: i32) {
    debug_assert!(name.chars().all(|c| c.is_ascii_lowercase()));
    table.insert(name, Command { handler, arity });
}

/// Looks up an already-lowercased command name.
pub fn lookup(name: &str) -> Option<&'static Command> {
    TABLE.get(name)
}

/// Checks a full command line length (command word included) against
/// an arity declaration.
pub fn arity_ok(arity: i32, words: usize) -> bool {
    if arity >= 0 {
        words == arity as usize
    } else {
        words >= (-arity) as usize
    }
}
