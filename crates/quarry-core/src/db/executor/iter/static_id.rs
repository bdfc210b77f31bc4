use crate::{
    db::{
        cursor::{CursorCache, NodePath},
        direction::Direction,
        executor::iter::{Batch, ScanColumn, node::NodeOps},
        identity::Identifier,
    },
    error::InternalError,
};

///
/// StaticIdIterator
///
/// Zero-scan leaf over one precomputed identifier. Yields it once with an
/// empty position; there is nothing physical to resume, so finalization
/// writes nothing.
///

#[derive(Debug)]
pub(crate) struct StaticIdIterator {
    id: Identifier,
    direction: Direction,
    emitted: bool,
}

impl StaticIdIterator {
    pub(crate) const fn new(id: Identifier, direction: Direction) -> Self {
        Self {
            id,
            direction,
            emitted: false,
        }
    }
}

impl NodeOps for StaticIdIterator {
    fn advance(&mut self) -> Result<Option<Batch>, InternalError> {
        if self.emitted {
            return Ok(None);
        }
        self.emitted = true;

        Ok(Some(Batch::single(ScanColumn::new(
            self.id,
            self.id.to_bytes().to_vec(),
            Vec::new(),
        ))))
    }

    fn rewind(&mut self) {
        self.emitted = false;
    }

    fn finalize(&self, _: &mut CursorCache, _: &NodePath, _: &ScanColumn) {}

    fn contains(&mut self, owner: Identifier) -> Result<bool, InternalError> {
        Ok(owner == self.id)
    }

    fn direction(&self) -> Direction {
        self.direction
    }
}
