//! Stored values: a tagged payload plus an optional expiration.

use bytes::Bytes;

use crate::clock;
use crate::sorted_set::SortedSet;

/// The payload stored under a key.
///
/// Executors match exhaustively on this, so adding a variant forces
/// every command to decide how it treats the new type.
#[derive(Debug, Clone)]
pub enum Value {
    /// A binary-safe string.
    Bytes(Bytes),
    /// A sorted set of scored members.
    SortedSet(SortedSet),
}

impl Value {
    /// The type name reported by `TYPE`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bytes(_) => "string",
            Value::SortedSet(_) => "zset",
        }
    }
}

/// A value plus its expiration deadline, as stored in a keyspace.
#[derive(Debug, Clone)]
pub struct Entity {
    pub value: Value,
    /// Absolute deadline in milliseconds since the epoch;
    /// [`clock::NO_EXPIRY`] means the entity never expires.
    pub expires_at_ms: u64,
}

impl Entity {
    /// An entity with no expiration.
    pub fn new(value: Value) -> Self {
        Entity {
            value,
            expires_at_ms: clock::NO_EXPIRY,
        }
    }

    /// A string entity with no expiration.
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Entity::new(Value::Bytes(data.into()))
    }

    /// An entity with an absolute deadline.
    pub fn with_deadline(value: Value, expires_at_ms: u64) -> Self {
        Entity {
            value,
            expires_at_ms,
        }
    }

    /// Whether the deadline has passed.
    pub fn is_expired(&self) -> bool {
        clock::is_expired(self.expires_at_ms)
    }

    /// The string payload, or `None` for other types.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match &self.value {
            Value::Bytes(data) => Some(data),
            _ => None,
        }
    }
}
