//! The cluster facade: a drop-in for the standalone database when
//! peers are configured.
//!
//! Routing per command:
//! - `ping`, `select`: local.
//! - `del`: broadcast to every node, sum the integer replies.
//! - `flushdb`: broadcast, `OK` iff every node succeeded.
//! - `rename`, `renamenx`: both keys must hash to one owner.
//! - single-key reads/writes: relay to the ring owner.
//! - anything else is unsupported in cluster mode.
//!
//! A relay first issues `SELECT <origin db>` on the borrowed
//! connection so the peer operates on the caller's database, then
//! forwards the original command line. When the owner is this node,
//! the wire is bypassed entirely.

use std::collections::HashMap;

use bytes::Bytes;
use cinder_protocol::{CmdLine, Frame};
use cinder_store::{Session, StandaloneDatabase};

use crate::pool::ClientPool;
use crate::ring::Ring;

pub struct ClusterFacade {
    self_addr: String,
    nodes: Vec<String>,
    ring: Ring,
    pools: HashMap<String, ClientPool>,
    local: StandaloneDatabase,
}

impl ClusterFacade {
    /// Builds the facade for a fixed membership of `peers ∪ {self}`.
    pub fn new(self_addr: String, peers: Vec<String>, local: StandaloneDatabase) -> Self {
        let mut nodes = peers.clone();
        nodes.push(self_addr.clone());
        nodes.sort();
        nodes.dedup();

        let pools = peers
            .into_iter()
            .filter(|peer| *peer != self_addr)
            .map(|peer| (peer.clone(), ClientPool::new(peer)))
            .collect();

        ClusterFacade {
            ring: Ring::new(nodes.iter().cloned()),
            self_addr,
            nodes,
            pools,
            local,
        }
    }

    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    pub fn local(&self) -> &StandaloneDatabase {
        &self.local
    }

    /// Executes one command line, routing it to wherever its keys
    /// live.
    pub async fn exec(&self, session: &Session, line: &[Bytes]) -> Frame {
        let Some(word) = line.first() else {
            return Frame::unknown_err();
        };
        let name = String::from_utf8_lossy(word).to_ascii_lowercase();

        match name.as_str() {
            "ping" | "select" => self.local.exec(session, line),
            "del" => self.del(session, line).await,
            "flushdb" => self.flushdb(session, line).await,
            "rename" | "renamenx" => self.rename(&name, session, line).await,
            "exists" | "type" | "get" | "set" | "setnx" | "getset" => {
                let Some(key) = line.get(1) else {
                    return Frame::arg_num_err(&name);
                };
                match self.ring.pick(key) {
                    Some(owner) => self.relay(owner, session, line).await,
                    None => Frame::unknown_err(),
                }
            }
            _ => Frame::err(format!(
                "ERR unknown command '{name}', or not supported in cluster mode"
            )),
        }
    }

    /// Forwards a command line to `peer` and returns its reply. The
    /// local node is executed directly, skipping the wire.
    async fn relay(&self, peer: &str, session: &Session, line: &[Bytes]) -> Frame {
        if peer == self.self_addr {
            return self.local.exec(session, line);
        }
        let Some(pool) = self.pools.get(peer) else {
            return Frame::err(format!("ERR no connection pool for peer {peer}"));
        };
        let client = match pool.borrow().await {
            Ok(client) => client,
            Err(e) => return Frame::err(format!("ERR peer {peer} unreachable: {e}")),
        };

        let select: CmdLine = vec![
            Bytes::from_static(b"SELECT"),
            Bytes::from(session.db_index().to_string()),
        ];
        let _ = client.send(select).await;
        let reply = client.send(line.to_vec()).await;

        pool.give_back(client).await;
        reply
    }

    /// Relays `line` to every node (self included), collecting replies
    /// in membership order.
    async fn broadcast(&self, session: &Session, line: &[Bytes]) -> Vec<Frame> {
        let mut replies = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            replies.push(self.relay(node, session, line).await);
        }
        replies
    }

    /// `DEL` across the cluster: every node deletes what it owns; the
    /// counts are summed. The first error, if any, is surfaced.
    async fn del(&self, session: &Session, line: &[Bytes]) -> Frame {
        let mut deleted = 0i64;
        for reply in self.broadcast(session, line).await {
            match reply {
                Frame::Integer(n) => deleted += n,
                Frame::Error(_) => return reply,
                other => {
                    return Frame::err(format!(
                        "ERR unexpected DEL reply from peer: {other:?}"
                    ))
                }
            }
        }
        Frame::Integer(deleted)
    }

    /// `FLUSHDB` across the cluster: each node clears its currently
    /// selected database.
    async fn flushdb(&self, session: &Session, line: &[Bytes]) -> Frame {
        for reply in self.broadcast(session, line).await {
            if reply.is_error() {
                return reply;
            }
        }
        Frame::Ok
    }

    /// `RENAME`/`RENAMENX`: both keys must live on one node; a rename
    /// cannot move data between slots.
    async fn rename(&self, name: &str, session: &Session, line: &[Bytes]) -> Frame {
        if line.len() != 3 {
            return Frame::arg_num_err(name);
        }
        let src_owner = self.ring.pick(&line[1]);
        let dst_owner = self.ring.pick(&line[2]);
        match (src_owner, dst_owner) {
            (Some(src), Some(dst)) if src == dst => {
                let owner = src.to_string();
                self.relay(&owner, session, line).await
            }
            (Some(_), Some(_)) => Frame::cross_slot_err(),
            _ => Frame::unknown_err(),
        }
    }

    /// Closes every peer pool and the local database.
    pub async fn close(&self) {
        for pool in self.pools.values() {
            pool.close().await;
        }
        self.local.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    fn line(words: &[&str]) -> Vec<Bytes> {
        words.iter().map(|w| b(w)).collect()
    }

    /// A single-node cluster: every key hashes to self, so all paths
    /// stay local and need no sockets.
    fn solo() -> ClusterFacade {
        ClusterFacade::new(
            "127.0.0.1:7000".into(),
            Vec::new(),
            StandaloneDatabase::new(4),
        )
    }

    #[tokio::test]
    async fn single_key_commands_execute_locally() {
        let cluster = solo();
        let session = Session::new();

        assert_eq!(cluster.exec(&session, &line(&["SET", "k", "v"])).await, Frame::Ok);
        assert_eq!(
            cluster.exec(&session, &line(&["GET", "k"])).await,
            Frame::bulk("v")
        );
        assert_eq!(
            cluster.exec(&session, &line(&["TYPE", "k"])).await,
            Frame::Simple("string".into())
        );
        assert_eq!(
            cluster.exec(&session, &line(&["EXISTS", "k"])).await,
            Frame::Integer(1)
        );
    }

    #[tokio::test]
    async fn ping_and_select_are_local() {
        let cluster = solo();
        let session = Session::new();
        assert_eq!(cluster.exec(&session, &line(&["PING"])).await, Frame::Pong);
        assert_eq!(
            cluster.exec(&session, &line(&["SELECT", "2"])).await,
            Frame::Ok
        );
        assert_eq!(session.db_index(), 2);
    }

    #[tokio::test]
    async fn del_sums_across_the_single_node() {
        let cluster = solo();
        let session = Session::new();
        cluster.exec(&session, &line(&["SET", "a", "1"])).await;
        cluster.exec(&session, &line(&["SET", "b", "2"])).await;
        assert_eq!(
            cluster.exec(&session, &line(&["DEL", "a", "b", "c"])).await,
            Frame::Integer(2)
        );
    }

    #[tokio::test]
    async fn flushdb_broadcast_returns_ok() {
        let cluster = solo();
        let session = Session::new();
        cluster.exec(&session, &line(&["SET", "a", "1"])).await;
        assert_eq!(
            cluster.exec(&session, &line(&["FLUSHDB"])).await,
            Frame::Ok
        );
        assert_eq!(
            cluster.exec(&session, &line(&["EXISTS", "a"])).await,
            Frame::Integer(0)
        );
    }

    #[tokio::test]
    async fn unsupported_commands_are_rejected() {
        let cluster = solo();
        let session = Session::new();
        let reply = cluster.exec(&session, &line(&["MSET", "a", "1"])).await;
        assert_eq!(
            reply.error_message().unwrap(),
            "ERR unknown command 'mset', or not supported in cluster mode"
        );
        assert!(cluster
            .exec(&session, &line(&["ZADD", "z", "1", "m"]))
            .await
            .is_error());
    }

    #[tokio::test]
    async fn rename_across_owners_is_cross_slot() {
        // two (unreachable) peers plus self: find keys with distinct
        // owners and prove the rename is refused before any dial
        let cluster = ClusterFacade::new(
            "127.0.0.1:7000".into(),
            vec!["10.255.0.1:7001".into(), "10.255.0.2:7002".into()],
            StandaloneDatabase::new(4),
        );
        let session = Session::new();

        let keys: Vec<String> = (0..300).map(|i| format!("key:{i}")).collect();
        let (mut split_pair, mut same_pair) = (None, None);
        for pair in keys.windows(2) {
            let a = cluster.ring().pick(pair[0].as_bytes()).unwrap();
            let b = cluster.ring().pick(pair[1].as_bytes()).unwrap();
            if a == b {
                same_pair.get_or_insert((pair[0].clone(), pair[1].clone()));
            } else {
                split_pair.get_or_insert((pair[0].clone(), pair[1].clone()));
            }
        }

        let (src, dst) = split_pair.expect("no cross-owner key pair in 300 keys");
        let reply = cluster
            .exec(&session, &line(&["RENAME", &src, &dst]))
            .await;
        assert_eq!(
            reply.error_message().unwrap(),
            "ERR rename must within one slot in cluster mode"
        );

        // a same-owner pair owned by self relays locally and hits the
        // regular missing-source error
        if let Some((src, dst)) = same_pair {
            if cluster.ring().pick(src.as_bytes()) == Some("127.0.0.1:7000") {
                let reply = cluster
                    .exec(&session, &line(&["RENAME", &src, &dst]))
                    .await;
                assert_eq!(reply.error_message().unwrap(), "ERR no such key");
            }
        }
    }

    #[tokio::test]
    async fn cluster_respects_selected_database_locally() {
        let cluster = solo();
        let session = Session::new();
        cluster.exec(&session, &line(&["SELECT", "1"])).await;
        cluster.exec(&session, &line(&["SET", "k", "one"])).await;
        cluster.exec(&session, &line(&["SELECT", "0"])).await;
        assert_eq!(
            cluster.exec(&session, &line(&["GET", "k"])).await,
            Frame::NullBulk
        );
    }
}
