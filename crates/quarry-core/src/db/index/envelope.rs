use crate::db::direction::Direction;
use std::{cmp::Ordering, ops::Bound};

///
/// continuation_advances
///
/// Shared directional strict-advancement check for resumed scans.
/// `candidate` advances only when it is strictly after `anchor` under direction.
///
#[must_use]
pub(crate) fn continuation_advances<K: Ord + ?Sized>(
    direction: Direction,
    anchor: &K,
    candidate: &K,
) -> bool {
    let ordering = match direction {
        Direction::Asc => candidate.cmp(anchor),
        Direction::Desc => anchor.cmp(candidate),
    };

    ordering == Ordering::Greater
}

///
/// KeyEnvelope
///
/// Raw column envelope in ascending terms, with direction-aware anchor
/// rewrite. Descending traversal reads the same envelope reversed.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct KeyEnvelope {
    direction: Direction,
    lower: Bound<Vec<u8>>,
    upper: Bound<Vec<u8>>,
}

impl KeyEnvelope {
    pub(crate) const fn new(
        direction: Direction,
        lower: Bound<Vec<u8>>,
        upper: Bound<Vec<u8>>,
    ) -> Self {
        Self {
            direction,
            lower,
            upper,
        }
    }

    /// Envelope covering every column that starts with `prefix`.
    pub(crate) fn for_prefix(direction: Direction, prefix: Vec<u8>) -> Self {
        let upper = prefix_successor(&prefix).map_or(Bound::Unbounded, Bound::Excluded);

        Self::new(direction, Bound::Included(prefix), upper)
    }

    pub(crate) const fn direction(&self) -> Direction {
        self.direction
    }

    pub(crate) fn bounds(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        (as_slice_bound(&self.lower), as_slice_bound(&self.upper))
    }

    /// Narrow the near bound so traversal resumes strictly after `anchor`.
    /// An anchor outside the envelope never widens it.
    #[must_use]
    pub(crate) fn resume_after(&self, anchor: &[u8]) -> Self {
        let mut next = self.clone();

        match self.direction {
            Direction::Asc => {
                let tighter = match &self.lower {
                    Bound::Unbounded => true,
                    Bound::Included(b) | Bound::Excluded(b) => anchor >= b.as_slice(),
                };
                if tighter {
                    next.lower = Bound::Excluded(anchor.to_vec());
                }
            }
            Direction::Desc => {
                let tighter = match &self.upper {
                    Bound::Unbounded => true,
                    Bound::Included(b) | Bound::Excluded(b) => anchor <= b.as_slice(),
                };
                if tighter {
                    next.upper = Bound::Excluded(anchor.to_vec());
                }
            }
        }

        next
    }

    pub(crate) fn contains(&self, key: &[u8]) -> bool {
        let lower_ok = match &self.lower {
            Bound::Unbounded => true,
            Bound::Included(boundary) => key >= boundary.as_slice(),
            Bound::Excluded(boundary) => key > boundary.as_slice(),
        };
        let upper_ok = match &self.upper {
            Bound::Unbounded => true,
            Bound::Included(boundary) => key <= boundary.as_slice(),
            Bound::Excluded(boundary) => key < boundary.as_slice(),
        };

        lower_ok && upper_ok
    }

    /// Whether no key can satisfy both bounds.
    pub(crate) fn is_empty(&self) -> bool {
        bounds_are_empty(&as_slice_bound(&self.lower), &as_slice_bound(&self.upper))
    }
}

/// Whether a `(lower, upper)` pair admits no key at all.
pub(crate) fn bounds_are_empty(lower: &Bound<&[u8]>, upper: &Bound<&[u8]>) -> bool {
    match (lower, upper) {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo) | Bound::Excluded(lo), Bound::Excluded(hi))
        | (Bound::Excluded(lo), Bound::Included(hi)) => lo >= hi,
        _ => false,
    }
}

/// Smallest key greater than every key that starts with `prefix`, if any.
pub(crate) fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut out = prefix.to_vec();
    while let Some(last) = out.pop() {
        if last < u8::MAX {
            out.push(last + 1);
            return Some(out);
        }
    }

    None
}

fn as_slice_bound(bound: &Bound<Vec<u8>>) -> Bound<&[u8]> {
    match bound {
        Bound::Included(key) => Bound::Included(key.as_slice()),
        Bound::Excluded(key) => Bound::Excluded(key.as_slice()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_rewrites_lower_bound_for_ascending_scans() {
        let envelope = KeyEnvelope::new(
            Direction::Asc,
            Bound::Included(vec![0x10]),
            Bound::Excluded(vec![0x20]),
        );
        let resumed = envelope.resume_after(&[0x15]);

        assert!(!resumed.contains(&[0x15]));
        assert!(resumed.contains(&[0x15, 0x00]));
        assert!(!resumed.contains(&[0x20]));
    }

    #[test]
    fn resume_rewrites_upper_bound_for_descending_scans() {
        let envelope = KeyEnvelope::new(Direction::Desc, Bound::Unbounded, Bound::Unbounded);
        let resumed = envelope.resume_after(&[0x15]);

        assert!(resumed.contains(&[0x14, 0xFF]));
        assert!(!resumed.contains(&[0x15]));
    }

    #[test]
    fn anchors_outside_the_envelope_never_widen_it() {
        let envelope = KeyEnvelope::new(
            Direction::Asc,
            Bound::Included(vec![0x10]),
            Bound::Unbounded,
        );
        let resumed = envelope.resume_after(&[0x01]);

        assert_eq!(resumed, envelope);
    }

    #[test]
    fn resuming_at_the_far_edge_empties_the_envelope() {
        let envelope = KeyEnvelope::new(
            Direction::Asc,
            Bound::Included(vec![0x10]),
            Bound::Included(vec![0x20]),
        );

        assert!(!envelope.is_empty());
        assert!(envelope.resume_after(&[0x20]).is_empty());
    }

    #[test]
    fn continuation_advances_is_strict_in_both_directions() {
        assert!(continuation_advances(Direction::Asc, &1, &2));
        assert!(!continuation_advances(Direction::Asc, &2, &2));
        assert!(continuation_advances(Direction::Desc, &2, &1));
        assert!(!continuation_advances(Direction::Desc, &1, &2));
    }

    #[test]
    fn prefix_successor_carries_past_max_bytes() {
        assert_eq!(prefix_successor(&[0x01, 0xFF]), Some(vec![0x02]));
        assert_eq!(prefix_successor(&[0xFF, 0xFF]), None);

        let envelope = KeyEnvelope::for_prefix(Direction::Asc, vec![0x40, b'a', 0, 0]);
        assert!(envelope.contains(&[0x40, b'a', 0, 0, 0x20]));
        assert!(!envelope.contains(&[0x40, b'a', 0, 1]));
    }
}
