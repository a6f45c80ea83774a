use {
    crate::{Position, RingError, RingResult},
    std::{collections::HashMap, fmt, sync::Arc},
};

/// Identity of a node.
///
/// Cheap to clone, so it can be stored with every virtual node and handed out
/// from lookups without allocating.
pub type NodeId = Arc<str>;

/// Largest number of virtual nodes a single node may occupy.
pub const MAX_VIRTUAL_NODES: u32 = 1 << 20;

/// Physical endpoint that owns keys.
///
/// Node owns one or more virtual nodes on the ring. Keys which hash between
/// the previous virtual node and one of node's virtual nodes are routed to
/// the node.
///
/// Two nodes with the same id are the same logical node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    weight: f64,
    replicas: u32,
}

impl Node {
    /// Creates a node with weight `1.0` and a single replica.
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            weight: 1.0,
            replicas: 1,
        }
    }

    /// Sets the weight of the node.
    ///
    /// Weight scales the number of virtual nodes, so a node with weight `2.0`
    /// receives roughly twice the share of keys of a node with weight `1.0`.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Sets the requested number of virtual nodes.
    pub fn with_replicas(mut self, replicas: u32) -> Self {
        self.replicas = replicas;
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn replicas(&self) -> u32 {
        self.replicas
    }

    /// Number of virtual nodes the node occupies on the ring.
    ///
    /// Computed as `round(replicas * weight)`, never less than one. Nodes
    /// asking for more than [`MAX_VIRTUAL_NODES`] are rejected by the ring.
    pub fn effective_replicas(&self) -> u32 {
        // Float to int casts saturate, huge weights end up at `u32::MAX`.
        (self.scaled_replicas() as u32).max(1)
    }

    fn scaled_replicas(&self) -> f64 {
        (self.replicas as f64 * self.weight).round()
    }

    /// Checks that the node can be placed on a ring.
    pub(crate) fn validate(&self) -> RingResult<()> {
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(RingError::InvalidWeight {
                id: self.id.clone(),
                weight: self.weight,
            });
        }
        if self.replicas == 0 {
            return Err(RingError::InvalidReplicas(self.id.clone()));
        }
        let scaled = self.scaled_replicas();
        if scaled > MAX_VIRTUAL_NODES as f64 {
            return Err(RingError::TooManyVirtualNodes {
                id: self.id.clone(),
                requested: scaled as u64,
                max: MAX_VIRTUAL_NODES,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Node({}, replicas={}, weight={})",
            self.id, self.replicas, self.weight
        )
    }
}

/// Node together with the ring positions it occupies.
#[derive(Debug, Clone)]
pub(crate) struct Member {
    pub node: Node,
    pub positions: Vec<Position>,
}

/// Nodes collection.
///
/// Keeps every member node keyed by its id along with the positions that were
/// assigned to its virtual nodes, so that removal touches exactly those
/// positions. Every change bumps the version.
#[derive(Debug, Clone, Default)]
pub(crate) struct Nodes {
    nodes: HashMap<NodeId, Member>,
    version: u64,
}

impl Nodes {
    /// Creates a new empty nodes collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member to the collection.
    ///
    /// Returns the previous member with the same id, if any.
    pub fn insert(&mut self, node: Node, positions: Vec<Position>) -> Option<Member> {
        self.version += 1;
        self.nodes.insert(node.id().clone(), Member { node, positions })
    }

    /// Removes and returns (if existed) a member from the collection.
    pub fn remove(&mut self, id: &str) -> Option<Member> {
        self.nodes.remove(id).inspect(|_| {
            self.version += 1;
        })
    }

    pub fn get(&self, id: &str) -> Option<&Member> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Returns the version of the collection.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of nodes in the collection.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterator over the node ids in the collection.
    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }
}
