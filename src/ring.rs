use {
    crate::{
        HashAlgorithm,
        Node,
        NodeId,
        Position,
        RingBuilder,
        RingError,
        RingHasher,
        RingResult,
        interval::{Interval, KeyRange},
        node::Nodes,
        placement::{VirtualNodePlacer, ring_position},
    },
    parking_lot::{Mutex, RwLock},
    std::{collections::BTreeSet, fmt, sync::Arc},
    tracing::debug,
};

/// Single position on the ring, owned by a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualNode {
    position: Position,
    owner: NodeId,
}

impl VirtualNode {
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn owner(&self) -> &NodeId {
        &self.owner
    }
}

/// One immutable version of the ring.
struct RingState<H> {
    hasher: Arc<H>,
    ring_bits: u32,
    /// Virtual nodes, strictly increasing by position.
    vnodes: Vec<VirtualNode>,
    nodes: Nodes,
}

impl<H> Clone for RingState<H> {
    fn clone(&self) -> Self {
        Self {
            hasher: Arc::clone(&self.hasher),
            ring_bits: self.ring_bits,
            vnodes: self.vnodes.clone(),
            nodes: self.nodes.clone(),
        }
    }
}

impl<H: RingHasher> RingState<H> {
    fn ring_size(&self) -> u128 {
        1u128 << self.ring_bits
    }

    fn is_taken(&self, position: Position) -> bool {
        self.vnodes
            .binary_search_by_key(&position, |vnode| vnode.position)
            .is_ok()
    }

    /// Returns a copy of the state with the node placed on it.
    ///
    /// The node must not be part of the state. Positions of other nodes are
    /// left untouched.
    fn with_node(&self, node: Node) -> RingResult<Self> {
        node.validate()?;

        let requested = node.effective_replicas() as u128;
        let available = self.ring_size() - self.vnodes.len() as u128;
        if requested > available {
            return Err(RingError::RingFull {
                requested: requested as u64,
                available: u64::try_from(available).unwrap_or(u64::MAX),
            });
        }

        let placer = VirtualNodePlacer::new(self.hasher.as_ref(), self.ring_bits);
        let positions = placer.place(&node, |position| self.is_taken(position))?;

        let mut next = self.clone();
        next.vnodes.extend(positions.iter().map(|position| VirtualNode {
            position: *position,
            owner: node.id().clone(),
        }));
        next.vnodes.sort_unstable_by_key(|vnode| vnode.position);
        next.nodes.insert(node, positions);

        Ok(next)
    }

    /// Returns a copy of the state without the node, and the removed node.
    fn without_node(&self, id: &str) -> RingResult<(Self, Node)> {
        let mut next = self.clone();
        let member = next
            .nodes
            .remove(id)
            .ok_or_else(|| RingError::NodeNotFound(id.to_string()))?;

        let before = next.vnodes.len();
        next.vnodes.retain(|vnode| vnode.owner.as_ref() != id);
        assert_eq!(
            before - next.vnodes.len(),
            member.positions.len(),
            "virtual nodes of {id} out of sync with its member record"
        );

        Ok((next, member.node))
    }

    /// Index of the first virtual node at or after the position, wrapping to
    /// the first virtual node of the ring.
    fn successor_idx(&self, position: Position) -> RingResult<usize> {
        if self.vnodes.is_empty() {
            return Err(RingError::EmptyRing);
        }
        let idx = self
            .vnodes
            .partition_point(|vnode| vnode.position < position);
        Ok(if idx == self.vnodes.len() { 0 } else { idx })
    }

    fn interval_at(&self, idx: usize) -> Interval {
        let len = self.vnodes.len();
        let prev = &self.vnodes[(idx + len - 1) % len];
        let vnode = &self.vnodes[idx];
        Interval::new(
            KeyRange::new(prev.position, vnode.position),
            vnode.owner.clone(),
        )
    }
}

/// Immutable view of the ring at some version.
///
/// Snapshots are cheap to clone and never change: mutations of the [`Ring`]
/// publish a new version and leave existing snapshots as they were. All
/// read-side analysis runs against a snapshot without holding any lock.
pub struct RingSnapshot<H = HashAlgorithm> {
    state: Arc<RingState<H>>,
}

impl<H> Clone for RingSnapshot<H> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<H> fmt::Debug for RingSnapshot<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingSnapshot")
            .field("ring_bits", &self.state.ring_bits)
            .field("version", &self.state.nodes.version())
            .field("nodes", &self.state.nodes.len())
            .field("vnodes", &self.state.vnodes.len())
            .finish()
    }
}

impl<H: RingHasher> RingSnapshot<H> {
    /// Returns the node owning the given key.
    ///
    /// The owner is the node of the first virtual node at or after the key's
    /// position, wrapping around to the first virtual node of the ring.
    pub fn get_owner<K: AsRef<[u8]>>(&self, key: K) -> RingResult<NodeId> {
        self.owner(key.as_ref()).cloned()
    }

    pub(crate) fn owner(&self, key: &[u8]) -> RingResult<&NodeId> {
        let idx = self.state.successor_idx(self.position(key))?;
        Ok(&self.state.vnodes[idx].owner)
    }

    /// Returns ring position to which a given key will be assigned.
    pub fn position<K: AsRef<[u8]>>(&self, key: K) -> Position {
        ring_position(
            self.state.hasher.as_ref(),
            self.state.ring_bits,
            key.as_ref(),
        )
    }

    /// Returns `(after..until]` intervals of the ring controlled by the given
    /// node, in ring order.
    ///
    /// Whenever the node is not part of the ring, `NodeNotFound` is returned.
    pub fn intervals(&self, id: &str) -> RingResult<Vec<Interval>> {
        if !self.state.nodes.contains(id) {
            return Err(RingError::NodeNotFound(id.to_string()));
        }
        Ok((0..self.state.vnodes.len())
            .filter(|idx| self.state.vnodes[*idx].owner.as_ref() == id)
            .map(|idx| self.state.interval_at(idx))
            .collect())
    }

    /// Returns every interval of the ring, in ring order.
    pub fn all_intervals(&self) -> Vec<Interval> {
        (0..self.state.vnodes.len())
            .map(|idx| self.state.interval_at(idx))
            .collect()
    }

    /// Fraction of the ring's position space owned by the given node.
    ///
    /// This is the share of keys the node is expected to receive under a
    /// uniform key distribution.
    pub fn ownership_share(&self, id: &str) -> RingResult<f64> {
        let ring_size = self.ring_size();
        let owned: u128 = self
            .intervals(id)?
            .iter()
            .map(|interval| interval.key_range().span(ring_size))
            .sum();
        Ok(owned as f64 / ring_size as f64)
    }
}

impl<H> RingSnapshot<H> {
    /// Set of distinct node ids on the ring.
    pub fn node_ids(&self) -> BTreeSet<NodeId> {
        self.state.nodes.ids().cloned().collect()
    }

    /// Returns the node with the given id, if it is part of the ring.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.state.nodes.get(id).map(|member| &member.node)
    }

    /// Positions of the node's virtual nodes, in replica order.
    pub fn positions(&self, id: &str) -> Option<&[Position]> {
        self.state
            .nodes
            .get(id)
            .map(|member| member.positions.as_slice())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.nodes.contains(id)
    }

    /// Virtual nodes ordered by position.
    pub fn virtual_nodes(&self) -> &[VirtualNode] {
        &self.state.vnodes
    }

    /// Number of nodes on the ring.
    pub fn len(&self) -> usize {
        self.state.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.nodes.is_empty()
    }

    /// Number of virtual nodes on the ring.
    pub fn vnode_count(&self) -> usize {
        self.state.vnodes.len()
    }

    pub fn ring_bits(&self) -> u32 {
        self.state.ring_bits
    }

    /// Number of positions on the ring, `2^ring_bits`.
    pub fn ring_size(&self) -> u128 {
        1u128 << self.state.ring_bits
    }

    /// Version of the ring, bumped by every membership change.
    pub fn version(&self) -> u64 {
        self.state.nodes.version()
    }

    /// Hasher the ring was built with.
    pub fn hasher(&self) -> &H {
        &self.state.hasher
    }
}

/// Consistent hashing ring.
///
/// Maps keys to nodes. Each node occupies one or more virtual nodes on a ring
/// of `2^ring_bits` positions and a key belongs to the node owning the first
/// virtual node at or after the key's position.
///
/// The ring is meant to be shared between threads. Mutations are serialized
/// and each of them publishes a new immutable version; lookups and
/// [`snapshot()`](Self::snapshot) only grab the current version.
pub struct Ring<H = HashAlgorithm> {
    current: RwLock<Arc<RingState<H>>>,
    writer: Mutex<()>,
}

impl Ring {
    /// Creates an empty ring using the named hash algorithm.
    ///
    /// Fails with `UnknownAlgorithm` if the name is not recognized and with
    /// `InvalidRingBits` if the algorithm cannot produce `ring_bits` bits.
    pub fn new(algorithm: &str, ring_bits: u32) -> RingResult<Self> {
        RingBuilder::new()
            .with_algorithm_name(algorithm)
            .with_ring_bits(ring_bits)
            .build()
    }
}

impl<H: RingHasher> Ring<H> {
    /// Creates an empty ring with the given hasher.
    pub(crate) fn with_hasher(hasher: H, ring_bits: u32) -> RingResult<Self> {
        let max = hasher.output_bits().min(Position::BITS);
        if ring_bits == 0 || ring_bits > max {
            return Err(RingError::InvalidRingBits {
                bits: ring_bits,
                max,
            });
        }

        debug!(ring_bits, "created ring");
        Ok(Self {
            current: RwLock::new(Arc::new(RingState {
                hasher: Arc::new(hasher),
                ring_bits,
                vnodes: Vec::new(),
                nodes: Nodes::new(),
            })),
            writer: Mutex::new(()),
        })
    }

    /// Add a node to the ring.
    ///
    /// Fails with `DuplicateNode` if a node with the same id is already
    /// present, use [`replace_node()`](Self::replace_node) to swap it.
    pub fn add_node(&self, node: Node) -> RingResult<()> {
        self.mutate(|state| {
            if state.nodes.contains(node.id()) {
                return Err(RingError::DuplicateNode(node.id().clone()));
            }
            let id = node.id().clone();
            let next = state.with_node(node)?;
            debug!(
                node_id = %id,
                vnodes = next.nodes.get(&id).map_or(0, |member| member.positions.len()),
                version = next.nodes.version(),
                "added node to ring"
            );
            Ok((next, ()))
        })
    }

    /// Add a node, replacing the node with the same id if present.
    ///
    /// Equivalent to a removal followed by an addition, done as a single
    /// mutation. Returns the replaced node.
    pub fn replace_node(&self, node: Node) -> RingResult<Option<Node>> {
        self.mutate(|state| {
            let (base, previous) = match state.without_node(node.id()) {
                Ok((base, previous)) => (base, Some(previous)),
                Err(RingError::NodeNotFound(_)) => (state.clone(), None),
                Err(err) => return Err(err),
            };
            let id = node.id().clone();
            let next = base.with_node(node)?;
            debug!(
                node_id = %id,
                replaced = previous.is_some(),
                version = next.nodes.version(),
                "replaced node on ring"
            );
            Ok((next, previous))
        })
    }

    /// Remove a node and all of its virtual nodes from the ring.
    ///
    /// Returns the removed node, fails with `NodeNotFound` if the id is absent.
    pub fn remove_node(&self, id: &str) -> RingResult<Node> {
        self.mutate(|state| {
            let (next, node) = state.without_node(id)?;
            debug!(node_id = %id, version = next.nodes.version(), "removed node from ring");
            Ok((next, node))
        })
    }

    /// Returns the node owning the given key.
    ///
    /// Fails with `EmptyRing` if no nodes have been added.
    pub fn get_owner<K: AsRef<[u8]>>(&self, key: K) -> RingResult<NodeId> {
        self.snapshot().get_owner(key)
    }

    /// Returns ring position to which a given key will be assigned.
    pub fn position<K: AsRef<[u8]>>(&self, key: K) -> Position {
        self.snapshot().position(key)
    }
}

impl<H> Ring<H> {
    /// Returns an immutable view of the current version of the ring.
    pub fn snapshot(&self) -> RingSnapshot<H> {
        RingSnapshot {
            state: self.current.read().clone(),
        }
    }

    /// Set of distinct node ids on the ring.
    pub fn node_ids(&self) -> BTreeSet<NodeId> {
        self.snapshot().node_ids()
    }

    /// Number of nodes on the ring.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.snapshot().contains(id)
    }

    /// Applies a mutation to the current version and publishes the result.
    ///
    /// Writers are serialized, so the state handed to `f` is the latest one
    /// for the whole duration of the mutation. On error nothing is published.
    fn mutate<T, F>(&self, f: F) -> RingResult<T>
    where
        F: FnOnce(&RingState<H>) -> RingResult<(RingState<H>, T)>,
    {
        let _writer = self.writer.lock();
        let current = self.current.read().clone();
        let (next, output) = f(current.as_ref())?;
        *self.current.write() = Arc::new(next);
        Ok(output)
    }
}

impl<H> fmt::Debug for Ring<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ring").field(&self.snapshot()).finish()
    }
}
