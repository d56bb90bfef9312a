//! Protocol error type for RESP parsing.

use thiserror::Error;

/// Errors produced while decoding the RESP wire format.
///
/// A protocol error is recoverable: the parser resets to its initial
/// state and continues with the next line, and the connection that fed
/// it stays open. The `Display` form is the exact error string sent
/// back to the client (minus the leading `-`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A header or body line that does not follow the RESP grammar,
    /// including lines not terminated by exactly `\r\n`.
    #[error("ERR Protocol error: '{0}'")]
    BadLine(String),

    /// A bulk payload whose final two bytes are not `\r\n`.
    #[error("ERR Protocol error: 'invalid bulk terminator'")]
    BadBulkTerminator,

    /// A declared element count or payload length beyond what the
    /// server is willing to buffer.
    #[error("ERR Protocol error: 'invalid bulk length'")]
    LengthTooLarge,
}

impl ProtocolError {
    /// Builds a [`ProtocolError::BadLine`] from raw line bytes,
    /// stripping the trailing CRLF and escaping non-UTF-8 content.
    pub fn bad_line(line: &[u8]) -> Self {
        let trimmed = line.strip_suffix(b"\r\n").unwrap_or(line);
        let trimmed = trimmed.strip_suffix(b"\n").unwrap_or(trimmed);
        ProtocolError::BadLine(String::from_utf8_lossy(trimmed).into_owned())
    }
}
