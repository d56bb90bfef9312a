//! cinder-cluster: transparent sharding across nodes.
//!
//! A client may connect to any node and see the whole keyspace: each
//! key lives on exactly one node, chosen by a consistent-hash ring
//! over the fixed membership. Single-key commands are relayed to the
//! owner, multi-key administrative commands are broadcast, and
//! everything else is rejected as unsupported in cluster mode.

pub mod client;
pub mod facade;
pub mod pool;
pub mod ring;

pub use client::PeerClient;
pub use facade::ClusterFacade;
pub use pool::ClientPool;
pub use ring::Ring;
