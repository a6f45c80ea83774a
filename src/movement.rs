use {
    super::{NodeId, RingError, RingHasher, RingResult, RingSnapshot},
    std::{
        collections::{BTreeMap, HashSet},
        hash::Hash,
    },
};

/// Keys whose owner changed between two versions of the ring.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementReport<K: Eq + Hash> {
    /// Keys that changed owner.
    pub moved_keys: HashSet<K>,

    /// Number of moved keys.
    pub moved_count: usize,

    /// Number of distinct keys compared.
    pub total: usize,

    /// `moved_count / total`, zero for an empty key set.
    pub fraction: f64,

    /// Number of moved keys per `(from, to)` pair of owners.
    pub transfers: BTreeMap<(NodeId, NodeId), usize>,
}

impl<K: Eq + Hash> MovementReport<K> {
    fn new(
        moved_keys: HashSet<K>,
        total: usize,
        transfers: BTreeMap<(NodeId, NodeId), usize>,
    ) -> Self {
        let moved_count = moved_keys.len();
        let fraction = if total == 0 {
            0.0
        } else {
            moved_count as f64 / total as f64
        };
        Self {
            moved_keys,
            moved_count,
            total,
            fraction,
            transfers,
        }
    }

    /// Whether no key changed owner.
    pub fn is_empty(&self) -> bool {
        self.moved_count == 0
    }

    /// Number of keys that left the given node.
    pub fn moved_from(&self, id: &str) -> usize {
        self.transfers
            .iter()
            .filter(|((from, _), _)| from.as_ref() == id)
            .map(|(_, count)| count)
            .sum()
    }

    /// Number of keys that arrived at the given node.
    pub fn moved_to(&self, id: &str) -> usize {
        self.transfers
            .iter()
            .filter(|((_, to), _)| to.as_ref() == id)
            .map(|(_, count)| count)
            .sum()
    }
}

/// Compares key ownership between two ring snapshots.
///
/// Resolves the owner of every key against both snapshots and collects the
/// keys whose owner differs. Duplicate keys are counted once. The result only
/// depends on the arguments.
///
/// Fails with `EmptyRing` if either snapshot has no nodes.
pub fn diff<H, K>(
    before: &RingSnapshot<H>,
    after: &RingSnapshot<H>,
    keys: &[K],
) -> RingResult<MovementReport<K>>
where
    H: RingHasher,
    K: AsRef<[u8]> + Clone + Eq + Hash,
{
    if before.is_empty() || after.is_empty() {
        return Err(RingError::EmptyRing);
    }

    let mut seen = HashSet::with_capacity(keys.len());
    let mut moved_keys = HashSet::new();
    let mut transfers = BTreeMap::new();

    for key in keys {
        if !seen.insert(key) {
            continue;
        }
        let old_owner = before.owner(key.as_ref())?;
        let new_owner = after.owner(key.as_ref())?;
        if old_owner != new_owner {
            moved_keys.insert(key.clone());
            *transfers
                .entry((old_owner.clone(), new_owner.clone()))
                .or_insert(0) += 1;
        }
    }

    Ok(MovementReport::new(moved_keys, seen.len(), transfers))
}

/// Same as [`diff()`], but an empty snapshot is treated as a ring where no
/// key has an owner.
///
/// Going from an empty ring to a non-empty one, or back, moves every key.
/// Such keys have no `(from, to)` pair, so `transfers` stays empty. Two empty
/// snapshots move nothing.
pub(crate) fn diff_allowing_empty<H, K>(
    before: &RingSnapshot<H>,
    after: &RingSnapshot<H>,
    keys: &[K],
) -> RingResult<MovementReport<K>>
where
    H: RingHasher,
    K: AsRef<[u8]> + Clone + Eq + Hash,
{
    if !before.is_empty() && !after.is_empty() {
        return diff(before, after, keys);
    }

    let distinct: HashSet<K> = keys.iter().cloned().collect();
    let total = distinct.len();
    let moved_keys = if before.is_empty() && after.is_empty() {
        HashSet::new()
    } else {
        distinct
    };
    Ok(MovementReport::new(moved_keys, total, BTreeMap::new()))
}
