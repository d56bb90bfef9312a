//! Wall-clock helpers for expiration deadlines.
//!
//! Deadlines are absolute milliseconds since the Unix epoch so that a
//! deadline recorded before a restart still means the same instant
//! when the append-only log is replayed.

use std::time::{SystemTime, UNIX_EPOCH};

/// Sentinel deadline meaning "no expiration".
pub const NO_EXPIRY: u64 = 0;

/// Current wall-clock time in milliseconds since the Unix epoch.
#[inline]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Whether the given deadline has passed. The sentinel never expires.
#[inline]
pub fn is_expired(expires_at_ms: u64) -> bool {
    expires_at_ms != NO_EXPIRY && now_ms() >= expires_at_ms
}

/// Converts a deadline to remaining whole seconds, or `None` for the
/// no-expiry sentinel.
#[inline]
pub fn remaining_secs(expires_at_ms: u64) -> Option<u64> {
    if expires_at_ms == NO_EXPIRY {
        None
    } else {
        Some(expires_at_ms.saturating_sub(now_ms()) / 1000)
    }
}
