//! Consistent-hash ring over the cluster membership.
//!
//! Each node is hashed under several virtual replicas to smooth the
//! key distribution. A key maps to the first virtual point at or after
//! its own hash, wrapping around the ring. CRC32 (IEEE) keeps the
//! placement stable across processes, so every node computes the same
//! owner for a key.
//!
//! Membership is fixed at startup; there is no resharding.

/// Virtual points per physical node.
pub const DEFAULT_REPLICAS: usize = 100;

#[derive(Debug)]
pub struct Ring {
    /// (virtual point hash, node index), sorted by hash.
    points: Vec<(u32, usize)>,
    nodes: Vec<String>,
}

impl Ring {
    pub fn new(nodes: impl IntoIterator<Item = String>) -> Self {
        Ring::with_replicas(DEFAULT_REPLICAS, nodes)
    }

    pub fn with_replicas(replicas: usize, nodes: impl IntoIterator<Item = String>) -> Self {
        let nodes: Vec<String> = nodes.into_iter().collect();
        let mut points = Vec::with_capacity(nodes.len() * replicas);
        for (index, node) in nodes.iter().enumerate() {
            for replica in 0..replicas {
                let hash = crc32fast::hash(format!("{replica}-{node}").as_bytes());
                points.push((hash, index));
            }
        }
        points.sort_unstable();
        Ring { points, nodes }
    }

    /// The node owning `key`, or `None` for an empty ring.
    pub fn pick(&self, key: &[u8]) -> Option<&str> {
        if self.points.is_empty() {
            return None;
        }
        let hash = crc32fast::hash(key);
        let at = self.points.partition_point(|&(point, _)| point < hash);
        let (_, index) = self.points[if at == self.points.len() { 0 } else { at }];
        Some(&self.nodes[index])
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }
}
