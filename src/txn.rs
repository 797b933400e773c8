//! The transaction overlay: an in-memory buffer of pending mutations
//! owned by exactly one handle.
//!
//! Reads check the overlay first and fall back to committed state;
//! commit converts the whole overlay into a single batch record, so the
//! engine applies it all-or-nothing. Tombstones are explicit
//! (`Option::None`) — empty values are legal and must stay distinct
//! from deletions.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::log::{Batch, Op};
use crate::types::{Direction, Key, Value};

/// What the overlay knows about a key.
pub(crate) enum Visibility<'a> {
    /// Pending put; this value wins over committed state.
    Found(&'a Value),
    /// Pending delete (or the whole store was cleared); the committed
    /// record, if any, is hidden.
    Deleted,
    /// The overlay says nothing; fall back to committed state.
    Unknown,
}

/// Buffered mutations of one open transaction.
pub(crate) struct Overlay {
    /// A pending `clear` hides all committed records; only writes made
    /// after it are visible.
    cleared: bool,
    /// Pending writes: `Some` = put, `None` = tombstone.
    writes: BTreeMap<Key, Option<Value>>,
}

impl Overlay {
    pub fn new() -> Self {
        Overlay {
            cleared: false,
            writes: BTreeMap::new(),
        }
    }

    pub fn put(&mut self, key: Key, value: Value) {
        self.writes.insert(key, Some(value));
    }

    pub fn delete(&mut self, key: Key) {
        self.writes.insert(key, None);
    }

    pub fn clear(&mut self) {
        self.cleared = true;
        self.writes.clear();
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    pub fn get(&self, key: &[u8]) -> Visibility<'_> {
        match self.writes.get(key) {
            Some(Some(value)) => Visibility::Found(value),
            Some(None) => Visibility::Deleted,
            None if self.cleared => Visibility::Deleted,
            None => Visibility::Unknown,
        }
    }

    /// All pending writes, for count adjustments against committed state.
    pub fn writes(&self) -> impl Iterator<Item = (&Key, &Option<Value>)> {
        self.writes.iter()
    }

    /// Number of pending puts. With `cleared` set this is the full
    /// visible record count.
    pub fn put_count(&self) -> usize {
        self.writes.values().filter(|v| v.is_some()).count()
    }

    /// Ordered view of pending writes, optionally starting at a key
    /// (inclusive bound toward the direction of travel).
    pub fn range(
        &self,
        direction: Direction,
        start: Option<&[u8]>,
    ) -> Box<dyn Iterator<Item = (&Key, &Option<Value>)> + '_> {
        match direction {
            Direction::Ascending => {
                let bounds: (Bound<&[u8]>, Bound<&[u8]>) = match start {
                    Some(s) => (Bound::Included(s), Bound::Unbounded),
                    None => (Bound::Unbounded, Bound::Unbounded),
                };
                Box::new(self.writes.range::<[u8], _>(bounds))
            }
            Direction::Descending => {
                let bounds: (Bound<&[u8]>, Bound<&[u8]>) = match start {
                    Some(s) => (Bound::Unbounded, Bound::Included(s)),
                    None => (Bound::Unbounded, Bound::Unbounded),
                };
                Box::new(self.writes.range::<[u8], _>(bounds).rev())
            }
        }
    }

    /// Convert the overlay into one atomic commit batch. A pending
    /// `clear` leads the batch; tombstones recorded after a clear are
    /// dropped (the key cannot exist once `Clear` replays).
    pub fn into_batch(self) -> Batch {
        let cleared = self.cleared;
        let mut ops = Vec::with_capacity(self.writes.len() + usize::from(cleared));
        if cleared {
            ops.push(Op::Clear);
        }
        for (key, value) in self.writes {
            match value {
                Some(value) => ops.push(Op::Put { key, value }),
                None if !cleared => ops.push(Op::Delete { key }),
                None => {}
            }
        }
        Batch { ops }
    }
}
