//! cinder-persistence: the append-only file pipeline.
//!
//! Mutating commands flow through a bounded channel to a single writer
//! thread that serializes them as RESP multi-bulk frames, prefixing a
//! `SELECT` record whenever the target database changes. On startup the
//! same file is replayed through the regular command executor to
//! rebuild state.

pub mod aof;
pub mod replay;

pub use aof::{Aof, AofError, AofSink};
pub use replay::load;
