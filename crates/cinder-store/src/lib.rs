//! cinder-store: command execution against in-memory databases.
//!
//! A [`StandaloneDatabase`] holds N independent keyspaces; per-client
//! state (which database is selected) lives in a [`Session`]. Commands
//! dispatch through a static registry of `(handler, arity)` entries
//! and return protocol frames. Mutations are fanned into the
//! append-only log through each database's sink handle.

pub mod commands;
pub mod database;
pub mod db;
pub mod registry;
pub mod session;

pub use database::StandaloneDatabase;
pub use db::Db;
pub use session::Session;
