use {
    super::{
        DistributionReport,
        HashAlgorithm,
        Node,
        RingBuilder,
        RingResult,
        balance::par_distribution,
        movement::diff,
    },
    tracing::debug,
};

/// Parameters of a node count sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    /// Smallest number of nodes.
    pub min_nodes: usize,
    /// Largest number of nodes (inclusive).
    pub max_nodes: usize,
    /// Virtual nodes per physical node.
    pub replicas: u32,
    pub algorithm: HashAlgorithm,
    /// Ring bit width, `None` for the full output width of the algorithm.
    pub ring_bits: Option<u32>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            min_nodes: 2,
            max_nodes: 10,
            replicas: 3,
            algorithm: HashAlgorithm::default(),
            ring_bits: None,
        }
    }
}

/// Result of a single step of the sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepStep {
    /// Number of nodes on the ring.
    pub nodes: usize,
    pub distribution: DistributionReport,
    /// Fraction of keys that moved since the previous step, `None` for the
    /// first step.
    pub moved_fraction: Option<f64>,
}

/// Id of the `idx`-th node of a sweep.
pub fn sweep_node_id(idx: usize) -> String {
    format!("node-{idx:02}")
}

/// Measures balance and movement while growing a ring one node at a time.
///
/// The ring for `n` nodes holds nodes `node-00` up to `node-{n-1}`, so each
/// step adds exactly one node to the previous one.
pub fn sweep<K>(config: &SweepConfig, keys: &[K]) -> RingResult<Vec<SweepStep>>
where
    K: AsRef<[u8]> + Clone + Eq + std::hash::Hash + Sync,
{
    let mut builder = RingBuilder::new().with_algorithm(config.algorithm);
    if let Some(ring_bits) = config.ring_bits {
        builder = builder.with_ring_bits(ring_bits);
    }
    let ring = builder.build()?;

    let node = |idx| Node::new(sweep_node_id(idx)).with_replicas(config.replicas);
    for idx in 0..config.min_nodes {
        ring.add_node(node(idx))?;
    }

    let mut steps = Vec::new();
    let mut previous = None;
    for count in config.min_nodes..=config.max_nodes {
        if count > config.min_nodes {
            ring.add_node(node(count - 1))?;
        }

        let snapshot = ring.snapshot();
        let distribution = par_distribution(&snapshot, keys)?;
        let moved_fraction = match &previous {
            Some(previous) => Some(diff(previous, &snapshot, keys)?.fraction),
            None => None,
        };
        debug!(
            nodes = count,
            balance_ratio = distribution.balance_ratio,
            moved_fraction,
            "sweep step"
        );

        steps.push(SweepStep {
            nodes: count,
            distribution,
            moved_fraction,
        });
        previous = Some(snapshot);
    }

    Ok(steps)
}
