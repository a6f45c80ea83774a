use {
    super::{NodeId, RingError, RingHasher, RingResult, RingSnapshot},
    rayon::prelude::*,
    std::collections::{BTreeMap, HashMap},
};

/// Distribution of a key set over the nodes of a ring.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionReport {
    /// Number of keys per node. Nodes without keys are present with zero.
    pub per_node_counts: BTreeMap<NodeId, usize>,

    /// Number of keys.
    pub total: usize,

    /// Average number of keys per node.
    pub mean: f64,

    /// Smallest per-node count.
    pub min: usize,

    /// Largest per-node count.
    pub max: usize,

    /// `max / mean`, `1.0` is perfect balance and lower is better.
    pub balance_ratio: f64,

    /// Population standard deviation of the per-node counts.
    pub std_dev: f64,
}

impl DistributionReport {
    /// Builds the report out of per-node counts.
    ///
    /// Every node of the ring must already be present in `counts`.
    fn from_counts(per_node_counts: BTreeMap<NodeId, usize>) -> RingResult<Self> {
        if per_node_counts.is_empty() {
            return Err(RingError::EmptyRing);
        }

        let nodes = per_node_counts.len() as f64;
        let total: usize = per_node_counts.values().sum();
        let mean = total as f64 / nodes;
        let min = per_node_counts.values().copied().min().unwrap_or_default();
        let max = per_node_counts.values().copied().max().unwrap_or_default();
        let balance_ratio = if per_node_counts.len() == 1 || mean == 0.0 {
            1.0
        } else {
            max as f64 / mean
        };
        let variance = per_node_counts
            .values()
            .map(|count| (*count as f64 - mean).powi(2))
            .sum::<f64>()
            / nodes;

        Ok(Self {
            per_node_counts,
            total,
            mean,
            min,
            max,
            balance_ratio,
            std_dev: variance.sqrt(),
        })
    }

    /// Fraction of keys owned by the given node, zero for unknown nodes or an
    /// empty key set.
    pub fn share(&self, id: &str) -> f64 {
        match self.per_node_counts.get(id) {
            Some(count) if self.total > 0 => *count as f64 / self.total as f64,
            _ => 0.0,
        }
    }

    /// Number of keys owned by the given node.
    pub fn count(&self, id: &str) -> Option<usize> {
        self.per_node_counts.get(id).copied()
    }
}

/// Counts the keys owned by every node of the snapshot.
///
/// Fails with `EmptyRing` if the snapshot has no nodes.
pub fn distribution<H, K>(
    snapshot: &RingSnapshot<H>,
    keys: &[K],
) -> RingResult<DistributionReport>
where
    H: RingHasher,
    K: AsRef<[u8]>,
{
    let counts = tally(snapshot, keys)?;
    DistributionReport::from_counts(with_all_nodes(snapshot, counts))
}

/// Same as [`distribution()`], with keys split across the rayon thread pool.
///
/// Produces exactly the same report.
pub fn par_distribution<H, K>(
    snapshot: &RingSnapshot<H>,
    keys: &[K],
) -> RingResult<DistributionReport>
where
    H: RingHasher,
    K: AsRef<[u8]> + Sync,
{
    if snapshot.is_empty() {
        return Err(RingError::EmptyRing);
    }

    let counts = keys
        .par_chunks(PAR_CHUNK_SIZE)
        .map(|chunk| tally(snapshot, chunk))
        .try_reduce(HashMap::new, |mut acc, counts| {
            for (id, count) in counts {
                *acc.entry(id).or_insert(0) += count;
            }
            Ok(acc)
        })?;

    DistributionReport::from_counts(with_all_nodes(snapshot, counts))
}

const PAR_CHUNK_SIZE: usize = 4096;

fn tally<'a, H, K>(
    snapshot: &'a RingSnapshot<H>,
    keys: &[K],
) -> RingResult<HashMap<&'a NodeId, usize>>
where
    H: RingHasher,
    K: AsRef<[u8]>,
{
    if snapshot.is_empty() {
        return Err(RingError::EmptyRing);
    }

    let mut counts = HashMap::new();
    for key in keys {
        *counts.entry(snapshot.owner(key.as_ref())?).or_insert(0) += 1;
    }
    Ok(counts)
}

fn with_all_nodes<H>(
    snapshot: &RingSnapshot<H>,
    counts: HashMap<&NodeId, usize>,
) -> BTreeMap<NodeId, usize> {
    let mut per_node: BTreeMap<NodeId, usize> =
        snapshot.node_ids().into_iter().map(|id| (id, 0)).collect();
    for (id, count) in counts {
        *per_node.entry(id.clone()).or_insert(0) += count;
    }
    per_node
}
