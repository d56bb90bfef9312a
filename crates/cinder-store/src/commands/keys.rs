//! Generic key commands: DEL, EXISTS, KEYS, FLUSHDB, TYPE, RENAME,
//! RENAMENX, EXPIRE, TTL.

use bytes::Bytes;
use cinder_core::{clock, pattern};
use cinder_protocol::Frame;

use super::parse_i64;
use crate::db::Db;
use crate::registry::{register, Table};

pub(crate) fn register_all(table: &mut Table) {
    register(table, "del", del, -2);
    register(table, "exists", exists, -2);
    register(table, "keys", keys, 2);
    register(table, "flushdb", flushdb, -1);
    register(table, "type", key_type, 2);
    register(table, "rename", rename, 3);
    register(table, "renamenx", renamenx, 3);
    register(table, "expire", expire, 3);
    register(table, "ttl", ttl, 2);
}

/// `DEL key [key ...]` — number of keys actually removed.
fn del(db: &Db, args: &[Bytes]) -> Frame {
    let deleted = db.keyspace().remove_many(args);
    if deleted > 0 {
        db.record("del", args);
    }
    Frame::Integer(deleted as i64)
}

/// `EXISTS key [key ...]` — number of the named keys that exist.
fn exists(db: &Db, args: &[Bytes]) -> Frame {
    let count = args
        .iter()
        .filter(|key| db.keyspace().view(key, |_| ()).is_some())
        .count();
    Frame::Integer(count as i64)
}

/// `KEYS pattern` — all keys matching the glob pattern, in no
/// particular order.
fn keys(db: &Db, args: &[Bytes]) -> Frame {
    let pattern = &args[0];
    let mut matched = Vec::new();
    db.keyspace().for_each(|key, _| {
        if pattern::matches(pattern, key) {
            matched.push(key.clone());
        }
        true
    });
    Frame::multi_bulk(matched)
}

/// `FLUSHDB` — removes every key in the selected database.
fn flushdb(db: &Db, args: &[Bytes]) -> Frame {
    db.keyspace().flush();
    db.record("flushdb", args);
    Frame::Ok
}

/// `TYPE key` — `string`, `zset`, or `none`.
fn key_type(db: &Db, args: &[Bytes]) -> Frame {
    match db.keyspace().view(&args[0], |e| e.value.type_name()) {
        Some(name) => Frame::Simple(name.into()),
        None => Frame::Simple("none".into()),
    }
}

/// `RENAME src dst` — moves the entity (expiration included),
/// replacing any existing destination.
fn rename(db: &Db, args: &[Bytes]) -> Frame {
    let (src, dst) = (&args[0], &args[1]);
    let Some(entity) = db.keyspace().get(src) else {
        return Frame::no_such_key_err();
    };
    db.keyspace().put(dst.clone(), entity);
    db.keyspace().remove(src);
    db.record("rename", args);
    Frame::Ok
}

/// `RENAMENX src dst` — like RENAME but a no-op returning 0 when the
/// destination already exists.
fn renamenx(db: &Db, args: &[Bytes]) -> Frame {
    let (src, dst) = (&args[0], &args[1]);
    if db.keyspace().view(dst, |_| ()).is_some() {
        return Frame::Integer(0);
    }
    let Some(entity) = db.keyspace().get(src) else {
        return Frame::no_such_key_err();
    };
    db.keyspace().remove(src);
    db.keyspace().put(dst.clone(), entity);
    db.record("renamenx", args);
    Frame::Integer(1)
}

/// `EXPIRE key seconds` — sets an absolute deadline. A non-positive
/// TTL deletes the key outright.
fn expire(db: &Db, args: &[Bytes]) -> Frame {
    let key = &args[0];
    let Some(seconds) = parse_i64(&args[1]) else {
        return Frame::not_integer_err();
    };
    if db.keyspace().view(key, |_| ()).is_none() {
        return Frame::Integer(0);
    }
    if seconds <= 0 {
        db.keyspace().remove(key);
        db.record("expire", args);
        return Frame::Integer(1);
    }
    db.keyspace()
        .set_deadline(key, clock::now_ms() + seconds as u64 * 1000);
    db.record("expire", args);
    Frame::Integer(1)
}

/// `TTL key` — remaining seconds, `-1` without a deadline, `-2` when
/// absent (or already expired).
fn ttl(db: &Db, args: &[Bytes]) -> Frame {
    match db.keyspace().view(&args[0], |e| e.expires_at_ms) {
        None => Frame::Integer(-2),
        Some(clock::NO_EXPIRY) => Frame::Integer(-1),
        Some(deadline) => {
            let secs = clock::remaining_secs(deadline).unwrap_or(0);
            Frame::Integer(secs as i64)
        }
    }
}
