use {
    super::{NodeId, Position},
    std::fmt,
};

/// A clockwise arc of the ring.
///
/// Range bounded exclusively below and inclusively above i.e. `(after..until]`,
/// wrapping past the end of the ring when `after >= until`. An arc with
/// `after == until` spans the whole ring.
///
/// This is exactly the set of positions that the virtual node at `until`
/// answers for: a key is routed to the first virtual node at or after its
/// position, so everything past the previous virtual node `after` up to and
/// including `until` lands there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange {
    after: Position,
    until: Position,
}

impl KeyRange {
    pub(crate) fn new(after: Position, until: Position) -> Self {
        Self { after, until }
    }

    /// Position of the preceding virtual node (exclusive).
    pub fn after(&self) -> Position {
        self.after
    }

    /// Position of the virtual node owning the range (inclusive).
    pub fn until(&self) -> Position {
        self.until
    }

    /// Whether the range wraps past the end of the ring.
    pub fn wraps(&self) -> bool {
        self.after >= self.until
    }

    /// Check if the given position is in the range.
    ///
    /// Note not the key itself, but the hash of the key provides the position
    /// within the ring.
    pub fn contains(&self, position: Position) -> bool {
        if self.wraps() {
            position > self.after || position <= self.until
        } else {
            position > self.after && position <= self.until
        }
    }

    /// Number of positions covered by the range on a ring of `ring_size`
    /// positions.
    pub fn span(&self, ring_size: u128) -> u128 {
        if self.after == self.until {
            ring_size
        } else if self.wraps() {
            ring_size - self.after as u128 + self.until as u128
        } else {
            (self.until - self.after) as u128
        }
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}..{}]", self.after, self.until)
    }
}

/// A range of the ring with the node responsible for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    key_range: KeyRange,
    owner: NodeId,
}

impl Interval {
    pub(crate) fn new(key_range: KeyRange, owner: NodeId) -> Self {
        Self { key_range, owner }
    }

    /// Returns the key range of the interval.
    pub fn key_range(&self) -> &KeyRange {
        &self.key_range
    }

    /// Returns the node responsible for the interval.
    pub fn owner(&self) -> &NodeId {
        &self.owner
    }
}
