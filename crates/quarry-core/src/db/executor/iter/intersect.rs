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
/// IntersectionNode
///
/// AND over N children by merge-join on their heads. Emits a key once every
/// child holds it; otherwise advances the children furthest behind.
/// Exhausted as soon as any child is.
///

pub(crate) struct IntersectionNode<'s> {
    children: Vec<ResultNode<'s>>,
    comparator: KeyOrderComparator,
}

impl<'s> IntersectionNode<'s> {
    pub(crate) fn new(children: Vec<ResultNode<'s>>) -> Result<Self, InternalError> {
        let direction = shared_direction(&children, "intersection")?;

        Ok(Self {
            children,
            comparator: KeyOrderComparator::from_direction(direction),
        })
    }

    // Furthest-ahead head across all children, or `None` if any is exhausted.
    fn leading_key(&mut self) -> Result<Option<Vec<u8>>, InternalError> {
        let mut leading: Option<Vec<u8>> = None;

        for child in &mut self.children {
            let Some(head) = child.peek_column()? else {
                return Ok(None);
            };
            let ahead = leading
                .as_deref()
                .is_none_or(|key| self.comparator.advances(key, head.sort_key()));
            if ahead {
                leading = Some(head.sort_key().to_vec());
            }
        }

        Ok(leading)
    }
}

impl NodeOps for IntersectionNode<'_> {
    fn advance(&mut self) -> Result<Option<Batch>, InternalError> {
        loop {
            let Some(target) = self.leading_key()? else {
                return Ok(None);
            };

            let mut matched = true;
            for child in &mut self.children {
                let Some(head) = child.peek_column()? else {
                    return Ok(None);
                };
                if self.comparator.compare(head.sort_key(), &target) == Ordering::Less {
                    child.take_column();
                    matched = false;
                }
            }
            if !matched {
                continue;
            }

            let mut emitted = None;
            for child in &mut self.children {
                let column = child.take_column();
                if emitted.is_none() {
                    emitted = column;
                }
            }

            return Ok(emitted.map(Batch::single));
        }
    }

    fn rewind(&mut self) {
        for child in &mut self.children {
            child.reset();
        }
    }

    fn finalize(&self, cache: &mut CursorCache, path: &NodePath, last: &ScanColumn) {
        for (index, child) in self.children.iter().enumerate() {
            child.finalize_cursor(cache, &path.child(index), last);
        }
    }

    fn contains(&mut self, owner: Identifier) -> Result<bool, InternalError> {
        for child in &mut self.children {
            if !child.contains(owner)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn direction(&self) -> Direction {
        self.comparator.direction()
    }
}
