//! Consistent hashing ring with virtual nodes.
//!
//! Keys and nodes are hashed onto the same ring of `2^ring_bits` positions.
//! Each node occupies one or more virtual nodes, and a key belongs to the node
//! owning the first virtual node at or after the key's position, wrapping
//! around the end of the ring.
//!
//! Adding or removing a node only moves the keys of the ring arcs adjacent to
//! its virtual nodes; every other key keeps its owner. The [`diff()`] and
//! [`distribution()`] functions measure exactly that, along with how evenly
//! the keys are spread.
//!
//! ```
//! use hashring_lab::{Node, Ring, diff, distribution};
//!
//! let ring = Ring::new("sha256", 64)?;
//! for id in ["a", "b", "c"] {
//!     ring.add_node(Node::new(id).with_replicas(50))?;
//! }
//!
//! let keys: Vec<String> = (0..1000).map(|i| format!("key{i}")).collect();
//! let before = ring.snapshot();
//! ring.remove_node("b")?;
//! let after = ring.snapshot();
//!
//! let moved = diff(&before, &after, &keys)?;
//! assert_eq!(moved.moved_count, distribution(&before, &keys)?.per_node_counts["b"]);
//! # Ok::<(), hashring_lab::RingError>(())
//! ```

mod balance;
mod builder;
mod error;
mod hash;
mod interval;
mod movement;
mod node;
mod placement;
mod ring;
mod session;
mod sweep;

/// Position on the ring.
pub type Position = u64;

pub use {
    balance::{DistributionReport, distribution, par_distribution},
    builder::RingBuilder,
    error::{RingError, RingResult},
    hash::{HashAlgorithm, RingHasher},
    interval::{Interval, KeyRange},
    movement::{MovementReport, diff},
    node::{MAX_VIRTUAL_NODES, Node, NodeId},
    placement::{MAX_SALT_ATTEMPTS, VirtualNodePlacer, replica_label},
    ring::{Ring, RingSnapshot, VirtualNode},
    session::{Session, SessionStatus},
    sweep::{SweepConfig, SweepStep, sweep, sweep_node_id},
};
