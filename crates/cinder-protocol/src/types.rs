//! RESP reply and frame model.
//!
//! [`Frame`] is the closed set of RESP2 values the server parses and
//! produces. A command travels as a multi-bulk frame; a reply is any
//! variant. Bulk payloads use `Bytes` so frames can move through the
//! pipeline without copying.

use bytes::Bytes;

/// A command line: the command word followed by its arguments, each a
/// binary-safe byte string.
pub type CmdLine = Vec<Bytes>;

/// A single RESP2 frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Simple string, e.g. `+string\r\n`.
    Simple(String),

    /// Error reply, e.g. `-ERR unknown command\r\n`.
    Error(String),

    /// 64-bit signed integer, e.g. `:42\r\n`.
    Integer(i64),

    /// Bulk (binary-safe) string, e.g. `$3\r\nfoo\r\n`.
    Bulk(Bytes),

    /// Absent bulk string, `$-1\r\n`.
    NullBulk,

    /// Array of bulk strings, e.g. `*1\r\n$4\r\nPING\r\n`. A `None`
    /// element is encoded as a null bulk in place.
    MultiBulk(Vec<Option<Bytes>>),

    /// The zero-element array, `*0\r\n`.
    EmptyMultiBulk,

    /// Canned `+OK\r\n`.
    Ok,

    /// Canned `+PONG\r\n`.
    Pong,
}

impl Frame {
    /// Builds a bulk frame from anything convertible to `Bytes`.
    pub fn bulk(data: impl Into<Bytes>) -> Frame {
        Frame::Bulk(data.into())
    }

    /// Builds a multi-bulk frame where every element is present.
    pub fn multi_bulk(args: Vec<Bytes>) -> Frame {
        if args.is_empty() {
            return Frame::EmptyMultiBulk;
        }
        Frame::MultiBulk(args.into_iter().map(Some).collect())
    }

    /// Builds the multi-bulk frame for a command line. This is the
    /// canonical on-wire form of a command, used by the append-only
    /// log and the peer client.
    pub fn from_cmdline(line: &[Bytes]) -> Frame {
        Frame::MultiBulk(line.iter().cloned().map(Some).collect())
    }

    /// Extracts a command line from a multi-bulk frame. Null elements
    /// become empty byte strings. Returns `None` for any other variant.
    pub fn into_cmdline(self) -> Option<CmdLine> {
        match self {
            Frame::MultiBulk(args) => Some(
                args.into_iter()
                    .map(|a| a.unwrap_or_else(Bytes::new))
                    .collect(),
            ),
            Frame::EmptyMultiBulk => Some(Vec::new()),
            _ => None,
        }
    }

    /// Whether this frame is an error reply: its serialized form
    /// begins with `-`.
    pub fn is_error(&self) -> bool {
        matches!(self, Frame::Error(_))
    }

    /// The human-readable message of an error reply.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Frame::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

// Canonical error replies. Each constructor produces the exact
// user-visible string for one entry of the error taxonomy.
impl Frame {
    /// A free-form `-ERR ...` reply. `msg` should already carry the
    /// `ERR ` prefix unless it has a dedicated code such as `WRONGTYPE`.
    pub fn err(msg: impl Into<String>) -> Frame {
        Frame::Error(msg.into())
    }

    /// Arity mismatch for a named command.
    pub fn arg_num_err(cmd: &str) -> Frame {
        Frame::Error(format!("ERR wrong number of arguments for '{cmd}' command"))
    }

    /// Name not present in the command registry.
    pub fn unknown_command_err(cmd: &str) -> Frame {
        Frame::Error(format!("ERR unknown command '{cmd}'"))
    }

    /// Conflicting or unrecognized command options.
    pub fn syntax_err() -> Frame {
        Frame::Error("ERR syntax error".to_string())
    }

    /// Operation applied to a key holding another value type.
    pub fn wrong_type_err() -> Frame {
        Frame::Error(
            "WRONGTYPE Operation against a key holding the wrong kind of value".to_string(),
        )
    }

    /// Argument that must be an integer but is not.
    pub fn not_integer_err() -> Frame {
        Frame::Error("ERR value is not an integer or out of range".to_string())
    }

    /// Argument that must be a float but is not.
    pub fn not_float_err() -> Frame {
        Frame::Error("ERR value is not a valid float".to_string())
    }

    /// RENAME with an absent source key.
    pub fn no_such_key_err() -> Frame {
        Frame::Error("ERR no such key".to_string())
    }

    /// RENAME whose source and destination hash to different nodes.
    pub fn cross_slot_err() -> Frame {
        Frame::Error("ERR rename must within one slot in cluster mode".to_string())
    }

    /// Peer request that exceeded its bounded wait.
    pub fn timeout_err() -> Frame {
        Frame::Error("ERR server time out".to_string())
    }

    /// Unexpected executor failure.
    pub fn unknown_err() -> Frame {
        Frame::Error("ERR unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_bulk_of_empty_vec_is_empty_frame() {
        assert_eq!(Frame::multi_bulk(vec![]), Frame::EmptyMultiBulk);
    }

    #[test]
    fn cmdline_round_trip() {
        let line: CmdLine = vec![Bytes::from_static(b"SET"), Bytes::from_static(b"k")];
        let frame = Frame::from_cmdline(&line);
        assert_eq!(frame.into_cmdline().unwrap(), line);
    }

    #[test]
    fn into_cmdline_maps_nil_to_empty() {
        let frame = Frame::MultiBulk(vec![Some(Bytes::from_static(b"GET")), None]);
        let line = frame.into_cmdline().unwrap();
        assert_eq!(line[1], Bytes::new());
    }

    #[test]
    fn into_cmdline_rejects_non_arrays() {
        assert!(Frame::Ok.into_cmdline().is_none());
        assert!(Frame::Integer(1).into_cmdline().is_none());
    }

    #[test]
    fn error_predicate() {
        assert!(Frame::syntax_err().is_error());
        assert!(Frame::wrong_type_err().is_error());
        assert!(!Frame::Ok.is_error());
        assert!(!Frame::NullBulk.is_error());
    }

    #[test]
    fn canonical_error_strings() {
        assert_eq!(
            Frame::arg_num_err("get").error_message().unwrap(),
            "ERR wrong number of arguments for 'get' command"
        );
        assert_eq!(
            Frame::wrong_type_err().error_message().unwrap(),
            "WRONGTYPE Operation against a key holding the wrong kind of value"
        );
        assert_eq!(
            Frame::cross_slot_err().error_message().unwrap(),
            "ERR rename must within one slot in cluster mode"
        );
        assert_eq!(Frame::unknown_err().error_message().unwrap(), "ERR unknown");
    }
}
