//! Sorted-set commands.

use bytes::Bytes;
use cinder_core::{Element, Entity, SortedSet, Value};
use cinder_protocol::Frame;

use super::{eq_ignore_case, format_score, parse_i64, parse_score};
use crate::db::Db;
use crate::registry::{register, Table};

pub(crate) fn register_all(table: &mut Table) {
    register(table, "zadd", zadd, -4);
    register(table, "zscore", zscore, 3);
    register(table, "zrem", zrem, -3);
    register(table, "zcard", zcard, 2);
    register(table, "zrank", zrank, 3);
    register(table, "zrevrank", zrevrank, 3);
    register(table, "zrange", zrange, -4);
    register(table, "zrevrange", zrevrange, -4);
    register(table, "zrangebyscore", zrangebyscore, -4);
    register(table, "zrevrangebyscore", zrevrangebyscore, -4);
    register(table, "zcount", zcount, 4);
    register(table, "zrangebylex", zrangebylex, -4);
    register(table, "zlexcount", zlexcount, 4);
}

/// Reads the sorted set under `key`. `Ok(None)` when absent, a
/// WRONGTYPE reply when the key holds a string.
fn read_zset<R>(db: &Db, key: &[u8], f: impl FnOnce(&SortedSet) -> R) -> Result<Option<R>, Frame> {
    match db.keyspace().view(key, |entity| match &entity.value {
        Value::SortedSet(zset) => Ok(f(zset)),
        Value::Bytes(_) => Err(Frame::wrong_type_err()),
    }) {
        None => Ok(None),
        Some(Ok(result)) => Ok(Some(result)),
        Some(Err(reply)) => Err(reply),
    }
}

/// `ZADD key score member [score member ...]` — number of members
/// newly added.
fn zadd(db: &Db, args: &[Bytes]) -> Frame {
    if (args.len() - 1) % 2 != 0 {
        return Frame::syntax_err();
    }
    let mut pairs = Vec::with_capacity((args.len() - 1) / 2);
    for pair in args[1..].chunks_exact(2) {
        let Some(score) = parse_score(&pair[0]) else {
            return Frame::not_float_err();
        };
        pairs.push((score, pair[1].clone()));
    }

    let reply = db.keyspace().upsert(
        args[0].clone(),
        || Entity::new(Value::SortedSet(SortedSet::new())),
        |entity| match &mut entity.value {
            Value::SortedSet(zset) => {
                let mut added = 0;
                for (score, member) in &pairs {
                    if !zset.add(member.clone(), *score) {
                        added += 1;
                    }
                }
                Frame::Integer(added)
            }
            Value::Bytes(_) => Frame::wrong_type_err(),
        },
    );
    if !reply.is_error() {
        db.record("zadd", args);
    }
    reply
}

/// `ZSCORE key member`
fn zscore(db: &Db, args: &[Bytes]) -> Frame {
    match read_zset(db, &args[0], |zset| zset.score(&args[1])) {
        Err(reply) => reply,
        Ok(Some(Some(score))) => Frame::bulk(format_score(score)),
        _ => Frame::NullBulk,
    }
}

/// `ZREM key member [member ...]` — number of members removed. An
/// emptied set is deleted.
fn zrem(db: &Db, args: &[Bytes]) -> Frame {
    let result = db.keyspace().update(&args[0], |entity| match &mut entity.value {
        Value::SortedSet(zset) => {
            let removed = args[1..].iter().filter(|m| zset.remove(m)).count();
            Ok((removed, zset.is_empty()))
        }
        Value::Bytes(_) => Err(Frame::wrong_type_err()),
    });
    match result {
        None => Frame::Integer(0),
        Some(Err(reply)) => reply,
        Some(Ok((removed, emptied))) => {
            if emptied {
                db.keyspace().remove(&args[0]);
            }
            if removed > 0 {
                db.record("zrem", args);
            }
            Frame::Integer(removed as i64)
        }
    }
}

/// `ZCARD key`
fn zcard(db: &Db, args: &[Bytes]) -> Frame {
    match read_zset(db, &args[0], |zset| zset.len()) {
        Err(reply) => reply,
        Ok(None) => Frame::Integer(0),
        Ok(Some(len)) => Frame::Integer(len as i64),
    }
}

fn zrank(db: &Db, args: &[Bytes]) -> Frame {
    rank_generic(db, args, false)
}

fn zrevrank(db: &Db, args: &[Bytes]) -> Frame {
    rank_generic(db, args, true)
}

/// `ZRANK / ZREVRANK key member` — 0-based position or nil.
fn rank_generic(db: &Db, args: &[Bytes], reverse: bool) -> Frame {
    match read_zset(db, &args[0], |zset| zset.rank(&args[1], reverse)) {
        Err(reply) => reply,
        Ok(Some(Some(rank))) => Frame::Integer(rank as i64),
        _ => Frame::NullBulk,
    }
}

fn zrange(db: &Db, args: &[Bytes]) -> Frame {
    range_generic(db, args, false)
}

fn zrevrange(db: &Db, args: &[Bytes]) -> Frame {
    range_generic(db, args, true)
}

/// `ZRANGE / ZREVRANGE key start stop [WITHSCORES]` — rank range with
/// negative-index support.
fn range_generic(db: &Db, args: &[Bytes], reverse: bool) -> Frame {
    let (Some(start), Some(stop)) = (parse_i64(&args[1]), parse_i64(&args[2])) else {
        return Frame::not_integer_err();
    };
    let withscores = match args.len() {
        3 => false,
        4 if eq_ignore_case(&args[3], b"WITHSCORES") => true,
        _ => return Frame::syntax_err(),
    };
    match read_zset(db, &args[0], |zset| zset.range(start, stop, reverse)) {
        Err(reply) => reply,
        Ok(None) => Frame::EmptyMultiBulk,
        Ok(Some(elements)) => reply_elements(&elements, withscores),
    }
}

fn zrangebyscore(db: &Db, args: &[Bytes]) -> Frame {
    score_range_generic(db, args, false)
}

fn zrevrangebyscore(db: &Db, args: &[Bytes]) -> Frame {
    score_range_generic(db, args, true)
}

/// `ZRANGEBYSCORE key min max [WITHSCORES] [LIMIT offset count]` and
/// its reverse twin, which takes `max min`. Bounds are inclusive;
/// a negative LIMIT count means unbounded.
fn score_range_generic(db: &Db, args: &[Bytes], reverse: bool) -> Frame {
    let (first, second) = (&args[1], &args[2]);
    let (raw_min, raw_max) = if reverse { (second, first) } else { (first, second) };
    let (Some(min), Some(max)) = (parse_score(raw_min), parse_score(raw_max)) else {
        return Frame::not_float_err();
    };

    let mut withscores = false;
    let mut offset = 0i64;
    let mut limit = -1i64;
    let mut i = 3;
    while i < args.len() {
        if eq_ignore_case(&args[i], b"WITHSCORES") {
            withscores = true;
            i += 1;
        } else if eq_ignore_case(&args[i], b"LIMIT") {
            let (Some(raw_offset), Some(raw_count)) = (args.get(i + 1), args.get(i + 2)) else {
                return Frame::syntax_err();
            };
            let (Some(o), Some(c)) = (parse_i64(raw_offset), parse_i64(raw_count)) else {
                return Frame::not_integer_err();
            };
            offset = o;
            limit = c;
            i += 3;
        } else {
            return Frame::syntax_err();
        }
    }

    match read_zset(db, &args[0], |zset| {
        zset.range_by_score(min, max, offset, limit, reverse)
    }) {
        Err(reply) => reply,
        Ok(None) => Frame::EmptyMultiBulk,
        Ok(Some(elements)) => reply_elements(&elements, withscores),
    }
}

/// `ZCOUNT key min max`
fn zcount(db: &Db, args: &[Bytes]) -> Frame {
    let (Some(min), Some(max)) = (parse_score(&args[1]), parse_score(&args[2])) else {
        return Frame::not_float_err();
    };
    match read_zset(db, &args[0], |zset| zset.count_by_score(min, max)) {
        Err(reply) => reply,
        Ok(None) => Frame::Integer(0),
        Ok(Some(count)) => Frame::Integer(count as i64),
    }
}

/// A lexicographic bound: `-` / `+` are the open ends, a leading `[`
/// marks (and is stripped from) an inclusive value. Exclusive `(`
/// bounds are not supported.
fn parse_lex_bound(raw: &Bytes, open_end: &[u8]) -> Result<Option<Bytes>, Frame> {
    if raw.as_ref() == open_end {
        return Ok(None);
    }
    match raw.first() {
        Some(b'[') => Ok(Some(raw.slice(1..))),
        Some(b'(') => Err(Frame::err("ERR min or max not valid string range item")),
        Some(b'+') | Some(b'-') if raw.len() == 1 => {
            Err(Frame::err("ERR min or max not valid string range item"))
        }
        _ => Ok(Some(raw.clone())),
    }
}

/// `ZRANGEBYLEX key min max [LIMIT offset count]`
fn zrangebylex(db: &Db, args: &[Bytes]) -> Frame {
    let min = match parse_lex_bound(&args[1], b"-") {
        Ok(bound) => bound,
        Err(reply) => return reply,
    };
    let max = match parse_lex_bound(&args[2], b"+") {
        Ok(bound) => bound,
        Err(reply) => return reply,
    };

    let mut offset = 0i64;
    let mut limit = -1i64;
    match args.len() {
        3 => {}
        6 if eq_ignore_case(&args[3], b"LIMIT") => {
            let (Some(o), Some(c)) = (parse_i64(&args[4]), parse_i64(&args[5])) else {
                return Frame::not_integer_err();
            };
            offset = o;
            limit = c;
        }
        _ => return Frame::syntax_err(),
    }

    match read_zset(db, &args[0], |zset| {
        zset.range_by_lex(min.as_deref(), max.as_deref(), offset, limit, false)
    }) {
        Err(reply) => reply,
        Ok(None) => Frame::EmptyMultiBulk,
        Ok(Some(elements)) => reply_elements(&elements, false),
    }
}

/// `ZLEXCOUNT key min max`
fn zlexcount(db: &Db, args: &[Bytes]) -> Frame {
    let min = match parse_lex_bound(&args[1], b"-") {
        Ok(bound) => bound,
        Err(reply) => return reply,
    };
    let max = match parse_lex_bound(&args[2], b"+") {
        Ok(bound) => bound,
        Err(reply) => return reply,
    };
    match read_zset(db, &args[0], |zset| {
        zset.count_by_lex(min.as_deref(), max.as_deref())
    }) {
        Err(reply) => reply,
        Ok(None) => Frame::Integer(0),
        Ok(Some(count)) => Frame::Integer(count as i64),
    }
}

fn reply_elements(elements: &[Element], withscores: bool) -> Frame {
    let mut items = Vec::with_capacity(elements.len() * if withscores { 2 } else { 1 });
    for element in elements {
        items.push(element.member.clone());
        if withscores {
            items.push(Bytes::from(format_score(element.score)));
        }
    }
    Frame::multi_bulk(items)
}
