//! String commands.

use bytes::{BufMut, Bytes, BytesMut};
use cinder_core::{clock, Entity, Value};
use cinder_protocol::Frame;

use super::parse_i64;
use crate::db::Db;
use crate::registry::{register, Table};

pub(crate) fn register_all(table: &mut Table) {
    register(table, "get", get, 2);
    register(table, "set", set, -3);
    register(table, "setnx", setnx, 3);
    register(table, "mset", mset, -3);
    register(table, "mget", mget, -2);
    register(table, "msetnx", msetnx, -3);
    register(table, "getset", getset, 3);
    register(table, "incr", incr, 2);
    register(table, "incrby", incrby, 3);
    register(table, "decr", decr, 2);
    register(table, "decrby", decrby, 3);
    register(table, "strlen", strlen, 2);
    register(table, "append", append, 3);
    register(table, "setrange", setrange, 4);
    register(table, "getrange", getrange, 4);
}

/// `GET key`
fn get(db: &Db, args: &[Bytes]) -> Frame {
    match db.get_string(&args[0]) {
        Err(reply) => reply,
        Ok(None) => Frame::NullBulk,
        Ok(Some(data)) => Frame::Bulk(data),
    }
}

#[derive(PartialEq)]
enum SetPolicy {
    Upsert,
    Insert,
    Update,
}

/// `SET key value [NX|XX] [EX seconds]`
///
/// NX and XX are mutually exclusive. An EX of zero or less deletes the
/// key: the write happened, then instantly expired.
fn set(db: &Db, args: &[Bytes]) -> Frame {
    let key = &args[0];
    let value = args[1].clone();
    let mut policy = SetPolicy::Upsert;
    let mut ttl_secs: Option<i64> = None;

    let mut i = 2;
    while i < args.len() {
        let opt = args[i].to_ascii_uppercase();
        match opt.as_slice() {
            b"NX" => {
                if policy == SetPolicy::Update {
                    return Frame::syntax_err();
                }
                policy = SetPolicy::Insert;
                i += 1;
            }
            b"XX" => {
                if policy == SetPolicy::Insert {
                    return Frame::syntax_err();
                }
                policy = SetPolicy::Update;
                i += 1;
            }
            b"EX" => {
                let Some(raw) = args.get(i + 1) else {
                    return Frame::syntax_err();
                };
                let Some(seconds) = parse_i64(raw) else {
                    return Frame::err("ERR invalid expire time in 'set' command");
                };
                ttl_secs = Some(seconds);
                i += 2;
            }
            _ => return Frame::syntax_err(),
        }
    }

    let entity = match ttl_secs {
        Some(seconds) if seconds > 0 => Entity::with_deadline(
            Value::Bytes(value),
            clock::now_ms() + seconds as u64 * 1000,
        ),
        _ => Entity::new(Value::Bytes(value)),
    };

    let stored = match policy {
        SetPolicy::Upsert => {
            db.keyspace().put(key.clone(), entity);
            1
        }
        SetPolicy::Insert => db.keyspace().put_if_absent(key.clone(), entity),
        SetPolicy::Update => db.keyspace().put_if_exists(key.clone(), entity),
    };

    if stored == 0 {
        return Frame::NullBulk;
    }
    if matches!(ttl_secs, Some(s) if s <= 0) {
        db.keyspace().remove(key);
    }
    db.record("set", args);
    Frame::Ok
}

/// `SETNX key value`
fn setnx(db: &Db, args: &[Bytes]) -> Frame {
    let inserted = db
        .keyspace()
        .put_if_absent(args[0].clone(), Entity::new(Value::Bytes(args[1].clone())));
    if inserted > 0 {
        db.record("setnx", args);
    }
    Frame::Integer(inserted as i64)
}

/// `MSET key value [key value ...]`
fn mset(db: &Db, args: &[Bytes]) -> Frame {
    if args.len() % 2 != 0 {
        return Frame::syntax_err();
    }
    for pair in args.chunks_exact(2) {
        db.put_string(pair[0].clone(), pair[1].clone());
    }
    db.record("mset", args);
    Frame::Ok
}

/// `MGET key [key ...]` — a nil element for each absent or
/// wrong-typed key.
fn mget(db: &Db, args: &[Bytes]) -> Frame {
    let values = args
        .iter()
        .map(|key| db.get_string(key).unwrap_or(None))
        .collect();
    Frame::MultiBulk(values)
}

/// `MSETNX key value [key value ...]` — all-or-nothing: stores only
/// when none of the keys exist.
fn msetnx(db: &Db, args: &[Bytes]) -> Frame {
    if args.len() % 2 != 0 {
        return Frame::syntax_err();
    }
    let any_exist = args
        .chunks_exact(2)
        .any(|pair| db.keyspace().view(&pair[0], |_| ()).is_some());
    if any_exist {
        return Frame::Integer(0);
    }
    for pair in args.chunks_exact(2) {
        db.put_string(pair[0].clone(), pair[1].clone());
    }
    db.record("msetnx", args);
    Frame::Integer(1)
}

/// `GETSET key value` — stores the new value, returns the old one.
fn getset(db: &Db, args: &[Bytes]) -> Frame {
    let old = match db.get_string(&args[0]) {
        Err(reply) => return reply,
        Ok(old) => old,
    };
    db.put_string(args[0].clone(), args[1].clone());
    db.record("getset", args);
    match old {
        Some(data) => Frame::Bulk(data),
        None => Frame::NullBulk,
    }
}

fn incr(db: &Db, args: &[Bytes]) -> Frame {
    apply_delta(db, args, "incr", 1)
}

fn incrby(db: &Db, args: &[Bytes]) -> Frame {
    match parse_i64(&args[1]) {
        Some(delta) => apply_delta(db, args, "incrby", delta),
        None => Frame::not_integer_err(),
    }
}

fn decr(db: &Db, args: &[Bytes]) -> Frame {
    apply_delta(db, args, "decr", -1)
}

fn decrby(db: &Db, args: &[Bytes]) -> Frame {
    match parse_i64(&args[1]) {
        Some(delta) => match delta.checked_neg() {
            Some(neg) => apply_delta(db, args, "decrby", neg),
            None => Frame::not_integer_err(),
        },
        None => Frame::not_integer_err(),
    }
}

/// Shared INCR/DECR body: an absent key counts from zero.
fn apply_delta(db: &Db, args: &[Bytes], name: &str, delta: i64) -> Frame {
    let key = &args[0];
    let current = match db.get_string(key) {
        Err(reply) => return reply,
        Ok(current) => current,
    };
    let next = match current {
        None => delta,
        Some(data) => {
            let Some(value) = parse_i64(&data) else {
                return Frame::not_integer_err();
            };
            match value.checked_add(delta) {
                Some(next) => next,
                None => return Frame::not_integer_err(),
            }
        }
    };
    db.put_string(key.clone(), next.to_string());
    db.record(name, args);
    Frame::Integer(next)
}

/// `STRLEN key` — 0 for an absent key.
fn strlen(db: &Db, args: &[Bytes]) -> Frame {
    match db.get_string(&args[0]) {
        Err(reply) => reply,
        Ok(None) => Frame::Integer(0),
        Ok(Some(data)) => Frame::Integer(data.len() as i64),
    }
}

/// `APPEND key value` — returns the resulting length.
fn append(db: &Db, args: &[Bytes]) -> Frame {
    let current = match db.get_string(&args[0]) {
        Err(reply) => return reply,
        Ok(current) => current,
    };
    let mut combined = BytesMut::from(current.as_deref().unwrap_or_default());
    combined.put_slice(&args[1]);
    let len = combined.len();
    db.put_string(args[0].clone(), combined.freeze());
    db.record("append", args);
    Frame::Integer(len as i64)
}

/// `SETRANGE key offset value` — zero-pads up to `offset` when the
/// current value is shorter.
fn setrange(db: &Db, args: &[Bytes]) -> Frame {
    let Some(offset) = parse_i64(&args[1]) else {
        return Frame::not_integer_err();
    };
    if offset < 0 {
        return Frame::err("ERR offset is out of range");
    }
    let offset = offset as usize;
    let patch = &args[2];

    let current = match db.get_string(&args[0]) {
        Err(reply) => return reply,
        Ok(current) => current,
    };

    let mut data = BytesMut::from(current.as_deref().unwrap_or_default());
    if data.len() < offset {
        data.resize(offset, 0);
    }
    let overlap = (data.len() - offset).min(patch.len());
    data[offset..offset + overlap].copy_from_slice(&patch[..overlap]);
    data.put_slice(&patch[overlap..]);

    let len = data.len();
    db.put_string(args[0].clone(), data.freeze());
    db.record("setrange", args);
    Frame::Integer(len as i64)
}

/// `GETRANGE key start end` — inclusive end; negative indices count
/// from the tail; an empty or invalid window yields null.
fn getrange(db: &Db, args: &[Bytes]) -> Frame {
    let (Some(start), Some(end)) = (parse_i64(&args[1]), parse_i64(&args[2])) else {
        return Frame::not_integer_err();
    };
    let data = match db.get_string(&args[0]) {
        Err(reply) => return reply,
        Ok(None) => return Frame::NullBulk,
        Ok(Some(data)) => data,
    };
    let len = data.len() as i64;

    let start = if start < 0 { len + start } else { start };
    if start < 0 || start >= len {
        return Frame::NullBulk;
    }
    // convert the inclusive end into an exclusive bound
    let end = if end < 0 { len + end + 1 } else { (end + 1).min(len) };
    if end <= start {
        return Frame::NullBulk;
    }
    Frame::Bulk(data.slice(start as usize..end as usize))
}
