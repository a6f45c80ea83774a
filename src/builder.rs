use {
    super::{HashAlgorithm, Node, Ring, RingHasher, RingResult},
    std::str::FromStr,
};

/// Ring builder.
///
/// Collects the configuration of a ring: hash algorithm, bit width of the
/// position space and the initial set of nodes.
pub struct RingBuilder<H = HashAlgorithm> {
    hasher: H,
    algorithm_name: Option<String>,
    ring_bits: Option<u32>,
    nodes: Vec<Node>,
}

impl Default for RingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RingBuilder {
    /// Create new ring builder.
    ///
    /// Defaults to SHA-256 over the full width of its output.
    pub fn new() -> Self {
        Self {
            hasher: HashAlgorithm::default(),
            algorithm_name: None,
            ring_bits: None,
            nodes: Vec::new(),
        }
    }

    /// Use one of the built-in hash algorithms.
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hasher = algorithm;
        self.algorithm_name = None;
        self
    }

    /// Use one of the built-in hash algorithms, selected by name.
    ///
    /// The name is resolved by [`build()`](Self::build), which fails with
    /// `UnknownAlgorithm` if the name is not recognized.
    pub fn with_algorithm_name(mut self, name: impl Into<String>) -> Self {
        self.algorithm_name = Some(name.into());
        self
    }

    /// Build the ring.
    pub fn build(self) -> RingResult<Ring> {
        let hasher = match &self.algorithm_name {
            Some(name) => HashAlgorithm::from_str(name)?,
            None => self.hasher,
        };
        build_ring(hasher, self.ring_bits, self.nodes)
    }
}

impl<H: RingHasher> RingBuilder<H> {
    /// Transform the builder into one with a custom hasher.
    pub fn with_hasher<CustomH: RingHasher>(self, hasher: CustomH) -> RingBuilder<CustomH> {
        RingBuilder {
            hasher,
            algorithm_name: None,
            ring_bits: self.ring_bits,
            nodes: self.nodes,
        }
    }

    /// Width of the position space, the ring has `2^ring_bits` positions.
    ///
    /// Defaults to the output width of the hasher.
    pub fn with_ring_bits(mut self, ring_bits: u32) -> Self {
        self.ring_bits = Some(ring_bits);
        self
    }

    /// Nodes to add to the ring on construction, in order.
    pub fn with_nodes<I: IntoIterator<Item = Node>>(mut self, nodes: I) -> Self {
        self.nodes.extend(nodes);
        self
    }

    /// Build the ring with the custom hasher.
    pub fn build_with_hasher(self) -> RingResult<Ring<H>> {
        build_ring(self.hasher, self.ring_bits, self.nodes)
    }
}

fn build_ring<H: RingHasher>(
    hasher: H,
    ring_bits: Option<u32>,
    nodes: Vec<Node>,
) -> RingResult<Ring<H>> {
    let ring_bits = ring_bits.unwrap_or_else(|| hasher.output_bits());
    let ring = Ring::with_hasher(hasher, ring_bits)?;
    for node in nodes {
        ring.add_node(node)?;
    }
    Ok(ring)
}
