use crate::{
    db::{direction::Direction, executor::iter::ScanColumn},
    error::InternalError,
};
use std::cmp::Ordering;

///
/// KeyOrderComparator
///
/// Direction policy for sort-key merge decisions, so combinators never
/// branch on direction at each call site.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct KeyOrderComparator {
    direction: Direction,
}

impl KeyOrderComparator {
    #[must_use]
    pub(crate) const fn from_direction(direction: Direction) -> Self {
        Self { direction }
    }

    pub(crate) const fn direction(self) -> Direction {
        self.direction
    }

    /// Compare in emission order: `Less` means `left` comes first.
    pub(crate) fn compare(self, left: &[u8], right: &[u8]) -> Ordering {
        match self.direction {
            Direction::Asc => left.cmp(right),
            Direction::Desc => right.cmp(left),
        }
    }

    /// Whether `candidate` comes strictly after `anchor`.
    pub(crate) fn advances(self, anchor: &[u8], candidate: &[u8]) -> bool {
        self.compare(anchor, candidate).is_lt()
    }

    pub(crate) const fn order_label(self) -> &'static str {
        match self.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

///
/// MonotonicWitness
///
/// Last sort key seen from one node, used to reject out-of-order or
/// repeated keys on every pull.
///

#[derive(Debug)]
pub(crate) struct MonotonicWitness {
    comparator: KeyOrderComparator,
    last: Option<Vec<u8>>,
}

impl MonotonicWitness {
    pub(crate) const fn new(comparator: KeyOrderComparator) -> Self {
        Self {
            comparator,
            last: None,
        }
    }

    pub(crate) fn observe(
        &mut self,
        column: &ScanColumn,
        node: &'static str,
    ) -> Result<(), InternalError> {
        if let Some(previous) = &self.last
            && !self.comparator.advances(previous, column.sort_key())
        {
            return Err(InternalError::iterator_invariant(format!(
                "iterator invariant violated: {node} emitted out-of-order key for {} (previous: {previous:02x?}, current: {:02x?})",
                self.comparator.order_label(),
                column.sort_key(),
            )));
        }
        self.last = Some(column.sort_key().to_vec());

        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.last = None;
    }
}
