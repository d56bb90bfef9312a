//! Per-client logical state shared with the executors.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// The part of a connection the database layer cares about: which
/// numbered database is selected, and whether the client has passed
/// the static password check.
///
/// Replay and relay paths use free-standing sessions with no socket
/// behind them.
#[derive(Debug, Default)]
pub struct Session {
    db_index: AtomicUsize,
    authenticated: AtomicBool,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    /// The currently selected database index. Starts at 0.
    pub fn db_index(&self) -> usize {
        self.db_index.load(Ordering::Relaxed)
    }

    /// Selects a database. The caller validates the range.
    pub fn select(&self, index: usize) {
        self.db_index.store(index, Ordering::Relaxed);
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Relaxed)
    }

    pub fn set_authenticated(&self) {
        self.authenticated.store(true, Ordering::Relaxed);
    }
}
