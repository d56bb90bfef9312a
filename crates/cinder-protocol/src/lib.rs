//! cinder-protocol: the RESP wire codec.
//!
//! Implements RESP2 framing in both directions: a streaming,
//! error-recovering parser ([`StreamParser`]) that turns arbitrary byte
//! streams into [`Frame`] values, and a direct-to-buffer serializer
//! that turns frames back into wire bytes.
//!
//! The same codec is used on every byte boundary in the system: client
//! connections, the append-only file, and peer-to-peer links between
//! cluster nodes.

pub mod error;
pub mod parse;
pub mod serialize;
pub mod types;

pub use error::ProtocolError;
pub use parse::StreamParser;
pub use types::{CmdLine, Frame};
