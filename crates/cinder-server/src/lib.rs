//! cinder-server: the TCP face of the engine.
//!
//! Owns everything between the listening socket and the command
//! executors: configuration, per-connection state and write
//! serialization, the RESP read loop, and graceful shutdown.

pub mod config;
pub mod connection;
pub mod engine;
pub mod handler;
pub mod server;

pub use config::Config;
pub use engine::Engine;
pub use server::Server;
