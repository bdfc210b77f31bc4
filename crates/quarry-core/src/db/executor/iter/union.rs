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

///
/// UnionNode
///
/// OR over N children. Emits the earliest head once and advances every
/// child holding it. Exhausted when all children are.
///

pub(crate) struct UnionNode<'s> {
    children: Vec<ResultNode<'s>>,
    comparator: KeyOrderComparator,
}

impl<'s> UnionNode<'s> {
    pub(crate) fn new(children: Vec<ResultNode<'s>>) -> Result<Self, InternalError> {
        let direction = shared_direction(&children, "union")?;

        Ok(Self {
            children,
            comparator: KeyOrderComparator::from_direction(direction),
        })
    }
}

impl NodeOps for UnionNode<'_> {
    fn advance(&mut self) -> Result<Option<Batch>, InternalError> {
        let mut earliest: Option<Vec<u8>> = None;
        for child in &mut self.children {
            if let Some(head) = child.peek_column()? {
                let first = earliest
                    .as_deref()
                    .is_none_or(|key| self.comparator.advances(head.sort_key(), key));
                if first {
                    earliest = Some(head.sort_key().to_vec());
                }
            }
        }
        let Some(target) = earliest else {
            return Ok(None);
        };

        // Every head is buffered by now; these peeks never fetch.
        let mut emitted = None;
        for child in &mut self.children {
            let holds_target = child
                .peek_column()?
                .is_some_and(|head| head.sort_key() == target.as_slice());
            if holds_target {
                let column = child.take_column();
                if emitted.is_none() {
                    emitted = column;
                }
            }
        }

        Ok(emitted.map(Batch::single))
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
            if child.contains(owner)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn direction(&self) -> Direction {
        self.comparator.direction()
    }
}
