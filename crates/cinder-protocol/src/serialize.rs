//! Direct-to-buffer RESP serialization.
//!
//! Writes frames into a `BytesMut` with no intermediate allocations.
//! Integer-to-decimal conversion uses `itoa` for stack-based
//! formatting.

use bytes::{BufMut, Bytes, BytesMut};

use crate::types::Frame;

const CRLF: &[u8] = b"\r\n";
const NULL_BULK: &[u8] = b"$-1\r\n";

impl Frame {
    /// Serializes this frame into the provided buffer, including the
    /// type prefix and trailing `\r\n` delimiters.
    pub fn serialize(&self, dst: &mut BytesMut) {
        match self {
            Frame::Simple(s) => {
                dst.put_u8(b'+');
                dst.put_slice(s.as_bytes());
                dst.put_slice(CRLF);
            }
            Frame::Error(msg) => {
                dst.put_u8(b'-');
                dst.put_slice(msg.as_bytes());
                dst.put_slice(CRLF);
            }
            Frame::Integer(n) => {
                dst.put_u8(b':');
                write_i64(*n, dst);
                dst.put_slice(CRLF);
            }
            Frame::Bulk(data) => write_bulk(data, dst),
            Frame::NullBulk => dst.put_slice(NULL_BULK),
            Frame::MultiBulk(args) => {
                dst.put_u8(b'*');
                write_i64(args.len() as i64, dst);
                dst.put_slice(CRLF);
                for arg in args {
                    match arg {
                        Some(data) => write_bulk(data, dst),
                        None => dst.put_slice(NULL_BULK),
                    }
                }
            }
            Frame::EmptyMultiBulk => dst.put_slice(b"*0\r\n"),
            Frame::Ok => dst.put_slice(b"+OK\r\n"),
            Frame::Pong => dst.put_slice(b"+PONG\r\n"),
        }
    }

    /// Serializes this frame into a fresh byte buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.serialize(&mut buf);
        buf.freeze()
    }
}

fn write_bulk(data: &[u8], dst: &mut BytesMut) {
    dst.put_u8(b'$');
    write_i64(data.len() as i64, dst);
    dst.put_slice(CRLF);
    dst.put_slice(data);
    dst.put_slice(CRLF);
}

fn write_i64(val: i64, dst: &mut BytesMut) {
    let mut buf = itoa::Buffer::new();
    dst.put_slice(buf.format(val).as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialize(frame: &Frame) -> Vec<u8> {
        frame.to_bytes().to_vec()
    }

    #[test]
    fn simple_string() {
        assert_eq!(serialize(&Frame::Simple("string".into())), b"+string\r\n");
    }

    #[test]
    fn error() {
        assert_eq!(serialize(&Frame::Error("ERR bad".into())), b"-ERR bad\r\n");
    }

    #[test]
    fn integer() {
        assert_eq!(serialize(&Frame::Integer(42)), b":42\r\n");
        assert_eq!(serialize(&Frame::Integer(-1)), b":-1\r\n");
        assert_eq!(serialize(&Frame::Integer(0)), b":0\r\n");
    }

    #[test]
    fn bulk_string() {
        assert_eq!(
            serialize(&Frame::Bulk(Bytes::from_static(b"foo"))),
            b"$3\r\nfoo\r\n"
        );
    }

    #[test]
    fn empty_bulk_is_not_null() {
        assert_eq!(serialize(&Frame::Bulk(Bytes::new())), b"$0\r\n\r\n");
        assert_eq!(serialize(&Frame::NullBulk), b"$-1\r\n");
    }

    #[test]
    fn multi_bulk() {
        let frame = Frame::multi_bulk(vec![
            Bytes::from_static(b"SET"),
            Bytes::from_static(b"k"),
            Bytes::from_static(b"v"),
        ]);
        assert_eq!(serialize(&frame), b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n");
    }

    #[test]
    fn multi_bulk_with_nil_element() {
        let frame = Frame::MultiBulk(vec![Some(Bytes::from_static(b"a")), None]);
        assert_eq!(serialize(&frame), b"*2\r\n$1\r\na\r\n$-1\r\n");
    }

    #[test]
    fn canned_frames() {
        assert_eq!(serialize(&Frame::Ok), b"+OK\r\n");
        assert_eq!(serialize(&Frame::Pong), b"+PONG\r\n");
        assert_eq!(serialize(&Frame::EmptyMultiBulk), b"*0\r\n");
    }

    #[test]
    fn bulk_with_embedded_crlf() {
        assert_eq!(
            serialize(&Frame::Bulk(Bytes::from_static(b"a\r\nb\x00c"))),
            b"$6\r\na\r\nb\x00c\r\n"
        );
    }
}
