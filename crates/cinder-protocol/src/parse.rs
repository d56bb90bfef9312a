//! Streaming RESP parser.
//!
//! [`StreamParser`] is an incremental decoder driven off a caller-owned
//! read buffer. It consumes complete lines and bulk payloads as they
//! become available and never blocks: when the buffer does not yet hold
//! enough bytes, [`StreamParser::next`] returns `None` and the caller
//! reads more from the socket (or file) before trying again.
//!
//! Protocol errors do not poison the stream. The parser consumes the
//! offending line, resets to its initial state, and the next call picks
//! up at the following line. I/O error handling belongs to the caller's
//! read loop.
//!
//! For compatibility with line-protocol clients, a header line that
//! starts with none of the RESP type prefixes is treated as an inline
//! command: its space-separated tokens become a multi-bulk frame.

use bytes::{Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::types::Frame;

/// Upper bound on a declared multi-bulk element count. Prevents memory
/// amplification from a tiny header declaring a huge array.
const MAX_MULTIBULK_LEN: i64 = 1_048_576;

/// Upper bound on a declared bulk payload length (512 MB, matching
/// the reference server).
const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Cap for `Vec::with_capacity` on declared element counts, so a
/// hostile header cannot force a large up-front allocation.
const PREALLOC_CAP: usize = 1024;

#[derive(Debug)]
enum State {
    /// Expecting the header line of a new frame.
    AwaitingHeader,
    /// Collecting the bulk elements of a multi-bulk (or standalone
    /// bulk) frame.
    ReadingBody(Body),
}

#[derive(Debug)]
struct Body {
    /// Number of bulk elements the header declared.
    expected: usize,
    /// Elements collected so far.
    args: Vec<Option<Bytes>>,
    /// Staged payload length from a `$L` line, cleared once the
    /// payload (plus CRLF) has been consumed.
    bulk_len: Option<usize>,
    /// Whether the frame was opened by a standalone `$` header rather
    /// than a `*` header, and should be emitted as a single bulk.
    standalone: bool,
}

/// Incremental RESP decoder over a caller-owned buffer.
#[derive(Debug, Default)]
pub struct StreamParser {
    state: Option<State>,
}

impl StreamParser {
    /// Creates a parser in the initial (awaiting-header) state.
    pub fn new() -> Self {
        StreamParser {
            state: Some(State::AwaitingHeader),
        }
    }

    /// Decodes the next frame out of `buf`, consuming exactly the bytes
    /// it parses.
    ///
    /// Returns `None` when the buffer does not yet contain enough data,
    /// `Some(Err(_))` on a protocol error (state has been reset), and
    /// `Some(Ok(frame))` for each complete frame.
    pub fn next(&mut self, buf: &mut BytesMut) -> Option<Result<Frame, ProtocolError>> {
        loop {
            match self.state.take().unwrap_or(State::AwaitingHeader) {
                State::AwaitingHeader => {
                    let line = match take_line(buf) {
                        None => {
                            self.state = Some(State::AwaitingHeader);
                            return None;
                        }
                        Some(Err(e)) => return self.fail(e),
                        Some(Ok(line)) => line,
                    };
                    match self.header(&line) {
                        Ok(Some(frame)) => {
                            self.state = Some(State::AwaitingHeader);
                            return Some(Ok(frame));
                        }
                        // header opened a body; keep consuming
                        Ok(None) => {}
                        Err(e) => return self.fail(e),
                    }
                }
                State::ReadingBody(mut body) => {
                    match self.body_step(&mut body, buf) {
                        // need more bytes
                        Ok(BodyStep::Starved) => {
                            self.state = Some(State::ReadingBody(body));
                            return None;
                        }
                        Ok(BodyStep::Progress) => {
                            if body.args.len() == body.expected {
                                self.state = Some(State::AwaitingHeader);
                                return Some(Ok(finish_body(body)));
                            }
                            self.state = Some(State::ReadingBody(body));
                        }
                        Err(e) => return self.fail(e),
                    }
                }
            }
        }
    }

    /// Resets to the initial state and reports a protocol error.
    fn fail(&mut self, e: ProtocolError) -> Option<Result<Frame, ProtocolError>> {
        self.state = Some(State::AwaitingHeader);
        Some(Err(e))
    }

    /// Handles one header line. Returns a complete frame for the
    /// single-line types, or transitions into `ReadingBody` and
    /// returns `Ok(None)`.
    fn header(&mut self, line: &[u8]) -> Result<Option<Frame>, ProtocolError> {
        match line.first() {
            Some(b'*') => {
                let count = parse_int(&line[1..]).ok_or_else(|| ProtocolError::bad_line(line))?;
                if count < 0 {
                    return Err(ProtocolError::bad_line(line));
                }
                if count > MAX_MULTIBULK_LEN {
                    return Err(ProtocolError::LengthTooLarge);
                }
                if count == 0 {
                    return Ok(Some(Frame::EmptyMultiBulk));
                }
                self.state = Some(State::ReadingBody(Body {
                    expected: count as usize,
                    args: Vec::with_capacity((count as usize).min(PREALLOC_CAP)),
                    bulk_len: None,
                    standalone: false,
                }));
                Ok(None)
            }
            Some(b'$') => {
                let len = parse_int(&line[1..]).ok_or_else(|| ProtocolError::bad_line(line))?;
                if len == -1 {
                    return Ok(Some(Frame::NullBulk));
                }
                if len < 0 {
                    return Err(ProtocolError::bad_line(line));
                }
                if len > MAX_BULK_LEN {
                    return Err(ProtocolError::LengthTooLarge);
                }
                self.state = Some(State::ReadingBody(Body {
                    expected: 1,
                    args: Vec::with_capacity(1),
                    bulk_len: Some(len as usize),
                    standalone: true,
                }));
                Ok(None)
            }
            Some(b'+') => Ok(Some(Frame::Simple(lossy(&line[1..])))),
            Some(b'-') => Ok(Some(Frame::Error(lossy(&line[1..])))),
            Some(b':') => {
                let val = parse_int(&line[1..]).ok_or_else(|| ProtocolError::bad_line(line))?;
                Ok(Some(Frame::Integer(val)))
            }
            // inline command: split on spaces for line-protocol clients
            Some(_) => {
                let args: Vec<Option<Bytes>> = line
                    .split(|&b| b == b' ')
                    .filter(|tok| !tok.is_empty())
                    .map(|tok| Some(Bytes::copy_from_slice(tok)))
                    .collect();
                if args.is_empty() {
                    return Err(ProtocolError::bad_line(line));
                }
                Ok(Some(Frame::MultiBulk(args)))
            }
            None => Err(ProtocolError::bad_line(line)),
        }
    }

    /// Advances a body by one line or one staged payload.
    fn body_step(&mut self, body: &mut Body, buf: &mut BytesMut) -> Result<BodyStep, ProtocolError> {
        match body.bulk_len {
            // a `$L` payload is staged: wait for L bytes plus CRLF
            Some(len) => {
                if buf.len() < len + 2 {
                    return Ok(BodyStep::Starved);
                }
                let chunk = buf.split_to(len + 2).freeze();
                if &chunk[len..] != b"\r\n" {
                    return Err(ProtocolError::BadBulkTerminator);
                }
                body.args.push(Some(chunk.slice(..len)));
                body.bulk_len = None;
                Ok(BodyStep::Progress)
            }
            // expecting the next element's `$L` header line
            None => {
                let line = match take_line(buf) {
                    None => return Ok(BodyStep::Starved),
                    Some(Err(e)) => return Err(e),
                    Some(Ok(line)) => line,
                };
                if line.first() != Some(&b'$') {
                    return Err(ProtocolError::bad_line(&line));
                }
                let len = parse_int(&line[1..]).ok_or_else(|| ProtocolError::bad_line(&line))?;
                if len > MAX_BULK_LEN {
                    return Err(ProtocolError::LengthTooLarge);
                }
                if len <= 0 {
                    // `$-1` and `$0` both stand for an empty argument
                    // in a command body
                    body.args.push(Some(Bytes::new()));
                } else {
                    body.bulk_len = Some(len as usize);
                }
                Ok(BodyStep::Progress)
            }
        }
    }
}

enum BodyStep {
    Starved,
    Progress,
}

fn finish_body(body: Body) -> Frame {
    if body.standalone {
        let data = body
            .args
            .into_iter()
            .next()
            .flatten()
            .unwrap_or_else(Bytes::new);
        Frame::Bulk(data)
    } else {
        Frame::MultiBulk(body.args)
    }
}

/// Removes the next `\r\n`-terminated line from `buf` and returns its
/// content without the terminator. A line whose `\n` is not preceded
/// by `\r` is a protocol error (the line is still consumed).
fn take_line(buf: &mut BytesMut) -> Option<Result<Bytes, ProtocolError>> {
    let nl = memchr::memchr(b'\n', buf)?;
    let line = buf.split_to(nl + 1).freeze();
    if nl == 0 || line[nl - 1] != b'\r' {
        return Some(Err(ProtocolError::bad_line(&line)));
    }
    Some(Ok(line.slice(..nl - 1)))
}

/// Parses a decimal i64 from raw line bytes without allocating.
fn parse_int(digits: &[u8]) -> Option<i64> {
    let s = std::str::from_utf8(digits).ok()?;
    s.parse().ok()
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feeds the whole input at once and collects every emitted item.
    fn parse_all(input: &[u8]) -> Vec<Result<Frame, ProtocolError>> {
        let mut parser = StreamParser::new();
        let mut buf = BytesMut::from(input);
        let mut out = Vec::new();
        while let Some(item) = parser.next(&mut buf) {
            out.push(item);
        }
        out
    }

    fn parse_one(input: &[u8]) -> Frame {
        let mut items = parse_all(input);
        assert_eq!(items.len(), 1, "expected exactly one frame");
        items.pop().unwrap().expect("expected a frame, got an error")
    }

    #[test]
    fn simple_string() {
        assert_eq!(parse_one(b"+OK\r\n"), Frame::Simple("OK".into()));
    }

    #[test]
    fn error_frame() {
        assert_eq!(
            parse_one(b"-ERR unknown command\r\n"),
            Frame::Error("ERR unknown command".into())
        );
    }

    #[test]
    fn integers() {
        assert_eq!(parse_one(b":42\r\n"), Frame::Integer(42));
        assert_eq!(parse_one(b":-7\r\n"), Frame::Integer(-7));
        assert_eq!(
            parse_one(b":9223372036854775807\r\n"),
            Frame::Integer(i64::MAX)
        );
    }

    #[test]
    fn standalone_bulk() {
        assert_eq!(
            parse_one(b"$5\r\nhello\r\n"),
            Frame::Bulk(Bytes::from_static(b"hello"))
        );
    }

    #[test]
    fn standalone_empty_bulk() {
        assert_eq!(parse_one(b"$0\r\n\r\n"), Frame::Bulk(Bytes::new()));
    }

    #[test]
    fn null_bulk() {
        assert_eq!(parse_one(b"$-1\r\n"), Frame::NullBulk);
    }

    #[test]
    fn bulk_with_binary_payload() {
        assert_eq!(
            parse_one(b"$4\r\n\x00\x01\r\n\r\n"),
            Frame::Bulk(Bytes::from_static(b"\x00\x01\r\n"))
        );
    }

    #[test]
    fn multi_bulk_command() {
        let frame = parse_one(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n");
        assert_eq!(
            frame,
            Frame::MultiBulk(vec![
                Some(Bytes::from_static(b"SET")),
                Some(Bytes::from_static(b"foo")),
                Some(Bytes::from_static(b"bar")),
            ])
        );
    }

    #[test]
    fn empty_multi_bulk() {
        assert_eq!(parse_one(b"*0\r\n"), Frame::EmptyMultiBulk);
    }

    #[test]
    fn nil_element_inside_multi_bulk_becomes_empty_arg() {
        let frame = parse_one(b"*2\r\n$-1\r\n$1\r\na\r\n");
        assert_eq!(
            frame,
            Frame::MultiBulk(vec![
                Some(Bytes::new()),
                Some(Bytes::from_static(b"a")),
            ])
        );
    }

    #[test]
    fn inline_command_becomes_multi_bulk() {
        let frame = parse_one(b"SET foo bar\r\n");
        assert_eq!(
            frame,
            Frame::MultiBulk(vec![
                Some(Bytes::from_static(b"SET")),
                Some(Bytes::from_static(b"foo")),
                Some(Bytes::from_static(b"bar")),
            ])
        );
    }

    #[test]
    fn inline_command_collapses_repeated_spaces() {
        let frame = parse_one(b"PING   message\r\n");
        assert_eq!(
            frame,
            Frame::MultiBulk(vec![
                Some(Bytes::from_static(b"PING")),
                Some(Bytes::from_static(b"message")),
            ])
        );
    }

    #[test]
    fn incomplete_input_returns_none() {
        for partial in [
            &b"+OK"[..],
            b"+OK\r",
            b"$5\r\nhel",
            b"*2\r\n$3\r\nGET\r\n",
            b"*2\r\n$3\r\nGET\r\n$2\r\n",
        ] {
            let mut parser = StreamParser::new();
            let mut buf = BytesMut::from(partial);
            assert!(parser.next(&mut buf).is_none(), "input {partial:?}");
        }
    }

    #[test]
    fn frame_split_across_reads() {
        let mut parser = StreamParser::new();
        let mut buf = BytesMut::new();

        buf.extend_from_slice(b"*2\r\n$4\r\n");
        assert!(parser.next(&mut buf).is_none());

        buf.extend_from_slice(b"ECHO\r\n$2\r\nhi\r\n");
        let frame = parser.next(&mut buf).unwrap().unwrap();
        assert_eq!(
            frame,
            Frame::MultiBulk(vec![
                Some(Bytes::from_static(b"ECHO")),
                Some(Bytes::from_static(b"hi")),
            ])
        );
    }

    #[test]
    fn pipelined_frames_in_one_buffer() {
        let items = parse_all(b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n");
        assert_eq!(items.len(), 2);
        for item in items {
            assert_eq!(
                item.unwrap(),
                Frame::MultiBulk(vec![Some(Bytes::from_static(b"PING"))])
            );
        }
    }

    #[test]
    fn line_without_carriage_return_is_protocol_error() {
        let items = parse_all(b"+OK\n");
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[test]
    fn bad_array_header_is_protocol_error() {
        let items = parse_all(b"*abc\r\n");
        assert!(items[0].is_err());
    }

    #[test]
    fn negative_array_header_is_protocol_error() {
        let items = parse_all(b"*-1\r\n");
        assert!(items[0].is_err());
    }

    #[test]
    fn bulk_payload_without_crlf_terminator_is_protocol_error() {
        let items = parse_all(b"*1\r\n$3\r\nfooXY");
        assert_eq!(items[0], Err(ProtocolError::BadBulkTerminator));
    }

    #[test]
    fn parser_recovers_after_protocol_error() {
        // a malformed header, then a valid frame on the same stream
        let items = parse_all(b"*bad\r\n*1\r\n$4\r\nPING\r\n");
        assert_eq!(items.len(), 2);
        assert!(items[0].is_err());
        assert_eq!(
            items[1].as_ref().unwrap(),
            &Frame::MultiBulk(vec![Some(Bytes::from_static(b"PING"))])
        );
    }

    #[test]
    fn recovery_resets_body_state() {
        // body dies mid-frame on a bad element header; the next full
        // frame parses cleanly
        let items = parse_all(b"*2\r\n$3\r\nGET\r\n:5\r\n+OK\r\n");
        assert_eq!(items.len(), 2);
        assert!(items[0].is_err());
        assert_eq!(items[1].as_ref().unwrap(), &Frame::Simple("OK".into()));
    }

    #[test]
    fn oversized_declarations_rejected() {
        let items = parse_all(b"*99999999\r\n");
        assert_eq!(items[0], Err(ProtocolError::LengthTooLarge));

        let items = parse_all(b"$999999999999\r\n");
        assert_eq!(items[0], Err(ProtocolError::LengthTooLarge));
    }

    #[test]
    fn round_trip_every_reply_variant() {
        // serialized replies must reparse to an equivalent wire form
        let frames = vec![
            Frame::Simple("string".into()),
            Frame::Error("ERR nope".into()),
            Frame::Integer(i64::MIN),
            Frame::Bulk(Bytes::from_static(b"binary\x00\r\ndata")),
            Frame::NullBulk,
            Frame::MultiBulk(vec![Some(Bytes::from_static(b"GET")), Some(Bytes::new())]),
            Frame::EmptyMultiBulk,
            Frame::Ok,
            Frame::Pong,
        ];

        for original in &frames {
            let mut buf = BytesMut::new();
            original.serialize(&mut buf);
            let wire = buf.clone();

            let mut parser = StreamParser::new();
            let reparsed = parser
                .next(&mut buf)
                .expect("complete frame")
                .expect("no protocol error");
            assert!(buf.is_empty(), "frame fully consumed for {original:?}");
            assert_eq!(
                reparsed.to_bytes(),
                wire.freeze(),
                "round trip failed for {original:?}"
            );
        }
    }
}
