use std::cmp::Ordering;
use std::iter::Peekable;

use crate::types::{Direction, Key, Value};

type CommittedIter<'a> = Box<dyn Iterator<Item = (&'a Key, &'a Value)> + 'a>;
type OverlayIter<'a> = Box<dyn Iterator<Item = (&'a Key, &'a Option<Value>)> + 'a>;

/// A lazy, ordered, one-shot sequence of (key, value) pairs.
///
/// Merges two sorted sources: committed records and — when a
/// transaction is active — the overlay's pending writes. The overlay
/// wins ties (its puts shadow committed values, its tombstones hide
/// committed records entirely).
///
/// Consuming the cursor exhausts it; a fresh call to
/// [`Store::cursor`](crate::Store::cursor) re-evaluates against current
/// state. The cursor borrows the handle, so the state it walks cannot
/// be mutated out from under it — iteration always sees a consistent
/// snapshot.
pub struct Cursor<'a> {
    committed: Peekable<CommittedIter<'a>>,
    overlay: Peekable<OverlayIter<'a>>,
    direction: Direction,
}

#[derive(Clone, Copy)]
enum Side {
    Committed,
    Overlay,
    Both,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(
        committed: CommittedIter<'a>,
        overlay: OverlayIter<'a>,
        direction: Direction,
    ) -> Self {
        Cursor {
            committed: committed.peekable(),
            overlay: overlay.peekable(),
            direction,
        }
    }

    /// Which source holds the next key in iteration order.
    fn pick(&mut self) -> Option<Side> {
        let ahead = match self.direction {
            Direction::Ascending => Ordering::Less,
            Direction::Descending => Ordering::Greater,
        };
        match (self.committed.peek(), self.overlay.peek()) {
            (None, None) => None,
            (Some(_), None) => Some(Side::Committed),
            (None, Some(_)) => Some(Side::Overlay),
            (Some((ck, _)), Some((ok, _))) => {
                let ord = ck.cmp(ok);
                if ord == Ordering::Equal {
                    Some(Side::Both)
                } else if ord == ahead {
                    Some(Side::Committed)
                } else {
                    Some(Side::Overlay)
                }
            }
        }
    }
}

impl Iterator for Cursor<'_> {
    type Item = (Key, Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let side = self.pick()?;
            match side {
                Side::Committed => {
                    if let Some((key, value)) = self.committed.next() {
                        return Some((key.clone(), value.clone()));
                    }
                }
                Side::Overlay | Side::Both => {
                    if let Side::Both = side {
                        // Same key on both sides: the committed record is
                        // shadowed either way, step past it.
                        self.committed.next();
                    }
                    match self.overlay.next() {
                        Some((key, Some(value))) => return Some((key.clone(), value.clone())),
                        // Tombstone: nothing to yield for this key.
                        Some((_, None)) => continue,
                        None => return None,
                    }
                }
            }
        }
    }
}
