use crate::node::NodeId;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RingError {
    /// Hash algorithm name is not recognized.
    #[error("Unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Ring bit width is outside of what the hasher can produce.
    #[error("Invalid ring bit width {bits}, expected 1..={max}")]
    InvalidRingBits { bits: u32, max: u32 },

    /// Node with the same id is already part of the ring.
    #[error("Node already present: {0}")]
    DuplicateNode(NodeId),

    /// Node is not part of the ring.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Read-side operation on a ring without nodes.
    #[error("Empty ring")]
    EmptyRing,

    /// Node weight must be finite and positive.
    #[error("Invalid weight for node {id}: {weight}")]
    InvalidWeight { id: NodeId, weight: f64 },

    /// Node must ask for at least one replica.
    #[error("Invalid replica count for node {0}")]
    InvalidReplicas(NodeId),

    /// Node asks for more virtual nodes than a single node may occupy.
    #[error("Node {id} asks for {requested} virtual nodes, at most {max} allowed")]
    TooManyVirtualNodes { id: NodeId, requested: u64, max: u32 },

    /// Not enough free positions left for the node's virtual nodes.
    #[error("Ring is full: {requested} positions requested, {available} available")]
    RingFull { requested: u64, available: u64 },

    /// Salted retries did not produce a free position.
    #[error("Could not place replica {replica} of node {id}")]
    PlacementExhausted { id: NodeId, replica: u32 },
}

pub type RingResult<T> = Result<T, RingError>;
