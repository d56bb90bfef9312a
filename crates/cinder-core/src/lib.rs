//! cinder-core: the storage engine.
//!
//! Owns the concurrent keyspace, the tagged value types stored under
//! each key, lazy expiration, and the skiplist-backed sorted set.
//! Everything here is synchronous and runtime-agnostic; the server
//! layers decide how it is shared between tasks.

pub mod clock;
pub mod entity;
pub mod keyspace;
pub mod pattern;
pub mod sorted_set;

pub use entity::{Entity, Value};
pub use keyspace::Keyspace;
pub use sorted_set::{Element, SortedSet};
