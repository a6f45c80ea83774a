use {
    crate::{Node, Position, RingError, RingHasher, RingResult},
    std::collections::HashSet,
    tracing::trace,
};

/// Upper bound of salted retries for a single replica.
///
/// With a uniform hash and a ring that still has free positions, each retry
/// succeeds with probability of at least `free / ring_size`, so the bound is
/// only ever hit by degenerate hashers or nearly saturated tiny rings.
pub const MAX_SALT_ATTEMPTS: u32 = 1 << 16;

/// Derives ring positions for the virtual nodes of a node.
///
/// Replica `i` of node `id` is placed at the hash of `"{id}-{i}"`. If that
/// position is already taken (by another node or by an earlier replica of the
/// same node), the placer retries with `"{id}-{i}-{salt}"` for `salt = 1, 2,
/// ...` until a free position is found.
pub struct VirtualNodePlacer<'a, H> {
    hasher: &'a H,
    ring_bits: u32,
}

impl<'a, H: RingHasher> VirtualNodePlacer<'a, H> {
    pub fn new(hasher: &'a H, ring_bits: u32) -> Self {
        Self { hasher, ring_bits }
    }

    /// Maps raw bytes onto the ring.
    pub fn position(&self, bytes: &[u8]) -> Position {
        ring_position(self.hasher, self.ring_bits, bytes)
    }

    /// Places all virtual nodes of the given node.
    ///
    /// `is_taken` reports whether a position is held by another node. Returned
    /// positions are unique and in replica order.
    pub fn place<F>(&self, node: &Node, is_taken: F) -> RingResult<Vec<Position>>
    where
        F: Fn(Position) -> bool,
    {
        let replicas = node.effective_replicas();
        let mut placed = Vec::with_capacity(replicas as usize);
        let mut own = HashSet::with_capacity(replicas as usize);

        for replica in 0..replicas {
            let mut position = self.position(replica_label(node.id(), replica, 0).as_bytes());
            let mut salt = 0;
            while is_taken(position) || own.contains(&position) {
                salt += 1;
                if salt > MAX_SALT_ATTEMPTS {
                    return Err(RingError::PlacementExhausted {
                        id: node.id().clone(),
                        replica,
                    });
                }
                trace!(node_id = %node.id(), replica, salt, position, "virtual node collision");
                position = self.position(replica_label(node.id(), replica, salt).as_bytes());
            }
            own.insert(position);
            placed.push(position);
        }

        Ok(placed)
    }
}

/// Hash input for a replica: `"{id}-{replica}"`, salted as `"{id}-{replica}-{salt}"`.
pub fn replica_label(id: &str, replica: u32, salt: u32) -> String {
    if salt == 0 {
        format!("{id}-{replica}")
    } else {
        format!("{id}-{replica}-{salt}")
    }
}

/// Reduces hasher output to a `ring_bits` wide position by keeping its top
/// bits.
pub(crate) fn ring_position<H: RingHasher>(hasher: &H, ring_bits: u32, bytes: &[u8]) -> Position {
    let hash = hasher.hash_bytes(bytes);
    hash >> (hasher.output_bits() - ring_bits)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::HashAlgorithm,
        std::collections::HashMap,
    };

    /// Hasher that answers from a fixed table, falling back to FNV-1a.
    struct TableHasher(HashMap<&'static str, u64>);

    impl RingHasher for TableHasher {
        fn output_bits(&self) -> u32 {
            64
        }

        fn hash_bytes(&self, bytes: &[u8]) -> u64 {
            std::str::from_utf8(bytes)
                .ok()
                .and_then(|s| self.0.get(s).copied())
                .unwrap_or_else(|| HashAlgorithm::Fnv1a.hash_bytes(bytes))
        }
    }

    #[test]
    fn labels() {
        assert_eq!(replica_label("node", 3, 0), "node-3");
        assert_eq!(replica_label("node", 3, 2), "node-3-2");
    }

    #[test]
    fn unsalted_positions() {
        let hasher = HashAlgorithm::Sha256;
        let placer = VirtualNodePlacer::new(&hasher, 64);
        let node = Node::new("node-0").with_replicas(3);
        let positions = placer.place(&node, |_| false).unwrap();
        let expected: Vec<_> = (0..3)
            .map(|i| hasher.hash_bytes(format!("node-0-{i}").as_bytes()))
            .collect();
        assert_eq!(positions, expected);
    }

    #[test]
    fn reduces_to_ring_bits() {
        let hasher = HashAlgorithm::Sha256;
        let full = ring_position(&hasher, 64, b"key");
        assert_eq!(ring_position(&hasher, 16, b"key"), full >> 48);
        assert!(ring_position(&hasher, 16, b"key") < 1 << 16);

        let fnv = HashAlgorithm::Fnv1a;
        assert_eq!(ring_position(&fnv, 32, b"key"), fnv.hash_bytes(b"key"));
        assert_eq!(ring_position(&fnv, 8, b"key"), fnv.hash_bytes(b"key") >> 24);
    }

    #[test]
    fn collision_with_other_node() {
        let hasher = TableHasher(HashMap::from([("b-0", 100), ("b-0-1", 100), ("b-0-2", 200)]));
        let placer = VirtualNodePlacer::new(&hasher, 64);

        // Position 100 is held by someone else: two salted retries are needed.
        let positions = placer.place(&Node::new("b"), |pos| pos == 100).unwrap();
        assert_eq!(positions, vec![200]);
    }

    #[test]
    fn collision_within_node() {
        let hasher = TableHasher(HashMap::from([("a-0", 7), ("a-1", 7), ("a-1-1", 9)]));
        let placer = VirtualNodePlacer::new(&hasher, 64);

        let positions = placer.place(&Node::new("a").with_replicas(2), |_| false).unwrap();
        assert_eq!(positions, vec![7, 9]);
    }

    #[test]
    fn exhausted() {
        struct Constant;
        impl RingHasher for Constant {
            fn output_bits(&self) -> u32 {
                64
            }

            fn hash_bytes(&self, _bytes: &[u8]) -> u64 {
                42
            }
        }

        let placer = VirtualNodePlacer::new(&Constant, 64);
        assert_eq!(
            placer.place(&Node::new("a").with_replicas(2), |_| false),
            Err(RingError::PlacementExhausted {
                id: "a".into(),
                replica: 1
            })
        );
    }
}
