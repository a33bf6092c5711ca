//! # Command Layer
//!
//! Per-command argument validation and store calls. Each handler receives
//! the fully parsed argument list (first element is the command name) and
//! returns a wire reply frame; it never panics on client input.

use std::time::Duration;

use hkv_common::{HkvError, HkvResult};
use hkv_common::Frame;
use hkv_engine::{
    ExpireCondition, ExpireOptions, KVEngine, PttlStatus, SetOptions, StoredValue, TtlStatus,
    WriteCondition,
};

/// Dispatches one parsed command frame to its handler.
///
/// `args[0]` is matched case-insensitively against the command table;
/// an unrecognized name yields the wire error `invalid command`.
pub fn dispatch(args: &[Vec<u8>], engine: &dyn KVEngine) -> (Frame, &'static str) {
    if args.is_empty() {
        return (Frame::error("ERR empty command"), "");
    }

    let name = match std::str::from_utf8(&args[0]) {
        Ok(name) => name.to_ascii_uppercase(),
        Err(_) => return (Frame::error("ERR invalid command"), ""),
    };

    let reply = match name.as_str() {
        "PING" => handle_ping(args),
        "GET" => handle_get(args, engine),
        "SET" => handle_set(args, engine),
        "DEL" => handle_del(args, engine),
        "EXPIRE" => handle_expire(args, engine),
        "PERSIST" => handle_persist(args, engine),
        "TTL" => handle_ttl(args, engine),
        "PTTL" => handle_pttl(args, engine),
        "INCR" => handle_incr(args, engine),
        "INCRBY" => handle_incr_by(args, engine),
        "DECR" => handle_decr(args, engine),
        "COMMAND" => Frame::simple("OK"),
        _ => Frame::error("ERR invalid command"),
    };

    (reply, command_label(&name))
}

/// Interns the command name to a `'static` label for observer callbacks,
/// falling back to a generic label for unknown commands (which are never
/// charged per-name metrics beyond a coarse bucket).
fn command_label(name: &str) -> &'static str {
    match name {
        "PING" => "PING",
        "GET" => "GET",
        "SET" => "SET",
        "DEL" => "DEL",
        "EXPIRE" => "EXPIRE",
        "PERSIST" => "PERSIST",
        "TTL" => "TTL",
        "PTTL" => "PTTL",
        "INCR" => "INCR",
        "INCRBY" => "INCRBY",
        "DECR" => "DECR",
        "COMMAND" => "COMMAND",
        _ => "UNKNOWN",
    }
}

fn wrong_arity(command: &str) -> Frame {
    Frame::error(format!("ERR wrong number of arguments for '{command}'"))
}

fn value_frame(value: StoredValue) -> Frame {
    match value {
        StoredValue::Int(n) => Frame::Integer(n),
        StoredValue::Str(bytes) => Frame::bulk(bytes.to_vec()),
    }
}

fn handle_ping(args: &[Vec<u8>]) -> Frame {
    match args.len() {
        1 => Frame::simple("PONG"),
        2 => Frame::bulk(args[1].clone()),
        _ => wrong_arity("PING"),
    }
}

fn handle_get(args: &[Vec<u8>], engine: &dyn KVEngine) -> Frame {
    if args.len() != 2 {
        return wrong_arity("GET");
    }
    match engine.get(&args[1]) {
        Ok(Some(value)) => value_frame(value),
        Ok(None) => Frame::nil(),
        Err(err) => Frame::error(format!("ERR {err}")),
    }
}

/// Parsed `SET` option tail: `EX <s>` / `PX <ms>` / `XX` / `NX`, any
/// combination except mutually exclusive pairs.
struct SetArgs {
    ttl: Option<Duration>,
    condition: Option<WriteCondition>,
}

fn parse_set_args(tail: &[Vec<u8>]) -> Result<SetArgs, Frame> {
    let mut ttl = None;
    let mut condition = None;
    let mut idx = 0;

    while idx < tail.len() {
        let token = tail[idx].to_ascii_uppercase();
        match token.as_slice() {
            b"EX" | b"PX" => {
                if ttl.is_some() {
                    return Err(Frame::error("ERR syntax error"));
                }
                let raw = tail.get(idx + 1).ok_or_else(|| Frame::error("ERR syntax error"))?;
                let amount = parse_i64(raw).map_err(|_| Frame::error("ERR value is not an integer or out of range"))?;
                if amount <= 0 {
                    return Err(Frame::error("ERR invalid expire time in 'set' command"));
                }
                ttl = Some(if token == b"EX" {
                    Duration::from_secs(amount as u64)
                } else {
                    Duration::from_millis(amount as u64)
                });
                idx += 2;
            }
            b"XX" => {
                if condition.is_some() {
                    return Err(Frame::error("ERR syntax error"));
                }
                condition = Some(WriteCondition::IfExists);
                idx += 1;
            }
            b"NX" => {
                if condition.is_some() {
                    return Err(Frame::error("ERR syntax error"));
                }
                condition = Some(WriteCondition::IfAbsent);
                idx += 1;
            }
            _ => return Err(Frame::error("ERR syntax error")),
        }
    }

    Ok(SetArgs { ttl, condition })
}

fn handle_set(args: &[Vec<u8>], engine: &dyn KVEngine) -> Frame {
    if args.len() < 3 {
        return wrong_arity("SET");
    }

    let parsed = match parse_set_args(&args[3..]) {
        Ok(parsed) => parsed,
        Err(reply) => return reply,
    };

    let options = SetOptions {
        ttl: parsed.ttl,
        condition: parsed.condition,
    };

    match engine.set(args[1].clone(), args[2].clone(), options) {
        Ok(true) => Frame::simple("OK"),
        Ok(false) => Frame::nil(),
        Err(err) => Frame::error(format!("ERR {err}")),
    }
}

fn handle_del(args: &[Vec<u8>], engine: &dyn KVEngine) -> Frame {
    if args.len() < 2 {
        return wrong_arity("DEL");
    }

    let mut removed = 0i64;
    for key in &args[1..] {
        match engine.delete(key) {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(err) => return Frame::error(format!("ERR {err}")),
        }
    }
    Frame::Integer(removed)
}

fn parse_expire_condition(tail: &[Vec<u8>]) -> Result<Option<ExpireCondition>, Frame> {
    match tail.len() {
        0 => Ok(None),
        1 => {
            let token = tail[0].to_ascii_uppercase();
            match token.as_slice() {
                b"XX" => Ok(Some(ExpireCondition::IfHasExpiry)),
                b"NX" => Ok(Some(ExpireCondition::IfNoExpiry)),
                _ => Err(Frame::error("ERR syntax error")),
            }
        }
        _ => Err(Frame::error("ERR syntax error")),
    }
}

fn handle_expire(args: &[Vec<u8>], engine: &dyn KVEngine) -> Frame {
    if args.len() < 3 {
        return wrong_arity("EXPIRE");
    }

    let seconds = match parse_i64(&args[2]) {
        Ok(value) => value,
        Err(_) => return Frame::error("ERR value is not an integer or out of range"),
    };

    let condition = match parse_expire_condition(&args[3..]) {
        Ok(condition) => condition,
        Err(reply) => return reply,
    };

    match engine.expire(&args[1], seconds, ExpireOptions { condition }) {
        Ok(true) => Frame::Integer(1),
        Ok(false) => Frame::Integer(0),
        Err(err) => Frame::error(format!("ERR {err}")),
    }
}

fn handle_persist(args: &[Vec<u8>], engine: &dyn KVEngine) -> Frame {
    if args.len() != 2 {
        return wrong_arity("PERSIST");
    }
    match engine.persist(&args[1]) {
        Ok(true) => Frame::Integer(1),
        Ok(false) => Frame::Integer(0),
        Err(err) => Frame::error(format!("ERR {err}")),
    }
}

fn handle_ttl(args: &[Vec<u8>], engine: &dyn KVEngine) -> Frame {
    if args.len() != 2 {
        return wrong_arity("TTL");
    }
    match engine.ttl(&args[1]) {
        Ok(TtlStatus::Missing) => Frame::Integer(-2),
        Ok(TtlStatus::NoExpiry) => Frame::Integer(-1),
        Ok(TtlStatus::ExpiresIn(remaining)) => Frame::Integer(remaining.as_secs() as i64),
        Err(err) => Frame::error(format!("ERR {err}")),
    }
}

fn handle_pttl(args: &[Vec<u8>], engine: &dyn KVEngine) -> Frame {
    if args.len() != 2 {
        return wrong_arity("PTTL");
    }
    match engine.pttl(&args[1]) {
        Ok(PttlStatus::Missing) => Frame::Integer(-2),
        Ok(PttlStatus::NoExpiry) => Frame::Integer(-1),
        Ok(PttlStatus::ExpiresIn(remaining)) => Frame::Integer(remaining.as_millis() as i64),
        Err(err) => Frame::error(format!("ERR {err}")),
    }
}

fn handle_incr(args: &[Vec<u8>], engine: &dyn KVEngine) -> Frame {
    if args.len() != 2 {
        return wrong_arity("INCR");
    }
    incr_reply(engine.incr(&args[1]))
}

fn handle_incr_by(args: &[Vec<u8>], engine: &dyn KVEngine) -> Frame {
    if args.len() != 3 {
        return wrong_arity("INCRBY");
    }
    let delta = match parse_i64(&args[2]) {
        Ok(value) => value,
        Err(_) => return Frame::error("ERR value is not an integer or out of range"),
    };
    incr_reply(engine.incr_by(&args[1], delta))
}

fn handle_decr(args: &[Vec<u8>], engine: &dyn KVEngine) -> Frame {
    if args.len() != 2 {
        return wrong_arity("DECR");
    }
    incr_reply(engine.decr(&args[1]))
}

fn incr_reply(result: HkvResult<i64>) -> Frame {
    match result {
        Ok(value) => Frame::Integer(value),
        Err(HkvError::NotInteger) => Frame::error("ERR value is not an integer or out of range"),
        Err(err) => Frame::error(format!("ERR {err}")),
    }
}

fn parse_i64(bytes: &[u8]) -> Result<i64, ()> {
    std::str::from_utf8(bytes).ok().and_then(|s| s.parse().ok()).ok_or(())
}
