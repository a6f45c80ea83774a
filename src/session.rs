use {
    super::{
        DistributionReport,
        HashAlgorithm,
        MovementReport,
        Node,
        Ring,
        RingHasher,
        RingResult,
        RingSnapshot,
        balance::distribution,
        movement::diff_allowing_empty,
    },
    tracing::info,
};

/// Interactive session over a single ring.
///
/// Holds a ring and a fixed set of sample keys. Every membership change
/// reports how many sample keys it moved, and [`status()`](Self::status)
/// reports the current distribution together with the movement accumulated
/// since the baseline (the ring as it was when the session started, or at the
/// last [`reset_baseline()`](Self::reset_baseline)).
///
/// The session is owned by the caller; nothing about it is global.
pub struct Session<H = HashAlgorithm> {
    ring: Ring<H>,
    keys: Vec<String>,
    baseline: RingSnapshot<H>,
}

/// Current state of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    /// Distribution of the sample keys over the current ring.
    pub distribution: DistributionReport,

    /// Keys moved since the baseline.
    pub since_baseline: MovementReport<String>,
}

impl<H: RingHasher> Session<H> {
    /// Starts a session, the current ring becomes the baseline.
    pub fn new(ring: Ring<H>, keys: Vec<String>) -> Self {
        let baseline = ring.snapshot();
        Self {
            ring,
            keys,
            baseline,
        }
    }

    /// Adds a node, returning the keys it took over.
    pub fn add_node(&mut self, node: Node) -> RingResult<MovementReport<String>> {
        let before = self.ring.snapshot();
        let id = node.id().clone();
        self.ring.add_node(node)?;
        let report = self.impact(&before)?;
        info!(
            node_id = %id,
            moved = report.moved_count,
            fraction = report.fraction,
            "node added"
        );
        Ok(report)
    }

    /// Removes a node, returning the keys it handed over.
    pub fn remove_node(&mut self, id: &str) -> RingResult<MovementReport<String>> {
        let before = self.ring.snapshot();
        self.ring.remove_node(id)?;
        let report = self.impact(&before)?;
        info!(
            node_id = %id,
            moved = report.moved_count,
            fraction = report.fraction,
            "node removed"
        );
        Ok(report)
    }

    /// Distribution of the sample keys and movement since the baseline.
    ///
    /// Fails with `EmptyRing` only if the current ring has no nodes.
    pub fn status(&self) -> RingResult<SessionStatus> {
        let current = self.ring.snapshot();
        Ok(SessionStatus {
            distribution: distribution(&current, &self.keys)?,
            since_baseline: diff_allowing_empty(&self.baseline, &current, &self.keys)?,
        })
    }

    /// Makes the current ring the new baseline.
    pub fn reset_baseline(&mut self) {
        self.baseline = self.ring.snapshot();
    }

    pub fn ring(&self) -> &Ring<H> {
        &self.ring
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn baseline(&self) -> &RingSnapshot<H> {
        &self.baseline
    }

    /// Movement between `before` and the current ring.
    ///
    /// Keys have no owner on an empty ring, so adding the first node or
    /// removing the last one moves every key.
    fn impact(&self, before: &RingSnapshot<H>) -> RingResult<MovementReport<String>> {
        diff_allowing_empty(before, &self.ring.snapshot(), &self.keys)
    }
}
