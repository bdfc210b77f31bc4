use crate::{
    db::{
        cursor::{CursorCache, NodePath},
        direction::Direction,
        executor::iter::{
            Batch, KeyOrderComparator, ResultIterator, ResultNode, ScanColumn,
            node::{NodeOps, shared_direction},
        },
        identity::Identifier,
    },
    error::InternalError,
};
use std::cmp::Ordering;

///
/// NotNode
///
/// Difference `include \ exclude`. The exclude side is advanced in lockstep
/// with the include head and never read further ahead than needed.
/// Include order is preserved.
///

pub(crate) struct NotNode<'s> {
    include: Box<ResultNode<'s>>,
    exclude: Box<ResultNode<'s>>,
    comparator: KeyOrderComparator,
}

impl<'s> NotNode<'s> {
    pub(crate) fn new(
        include: ResultNode<'s>,
        exclude: ResultNode<'s>,
    ) -> Result<Self, InternalError> {
        let children = [include, exclude];
        let direction = shared_direction(&children, "not")?;
        let [include, exclude] = children;

        Ok(Self {
            include: Box::new(include),
            exclude: Box::new(exclude),
            comparator: KeyOrderComparator::from_direction(direction),
        })
    }
}

impl NodeOps for NotNode<'_> {
    fn advance(&mut self) -> Result<Option<Batch>, InternalError> {
        loop {
            let Some(head) = self.include.peek_column()? else {
                return Ok(None);
            };
            let target = head.sort_key().to_vec();

            let excluded = loop {
                let Some(blocker) = self.exclude.peek_column()? else {
                    break false;
                };
                match self.comparator.compare(blocker.sort_key(), &target) {
                    Ordering::Less => {
                        self.exclude.take_column();
                    }
                    Ordering::Equal => break true,
                    Ordering::Greater => break false,
                }
            };

            let column = self.include.take_column();
            if !excluded {
                return Ok(column.map(Batch::single));
            }
        }
    }

    fn rewind(&mut self) {
        self.include.reset();
        self.exclude.reset();
    }

    fn finalize(&self, cache: &mut CursorCache, path: &NodePath, last: &ScanColumn) {
        self.include.finalize_cursor(cache, &path.child(0), last);
        self.exclude.finalize_cursor(cache, &path.child(1), last);
    }

    fn contains(&mut self, owner: Identifier) -> Result<bool, InternalError> {
        Ok(self.include.contains(owner)? && !self.exclude.contains(owner)?)
    }

    fn direction(&self) -> Direction {
        self.comparator.direction()
    }
}
