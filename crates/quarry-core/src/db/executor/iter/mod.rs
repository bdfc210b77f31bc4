//! Pull-based result iterators.
//!
//! Leaves read index rows through the column store; combinators merge their
//! children's ordered columns. Every node emits strictly monotonic sort keys
//! for its direction and can write its resume position into a cursor cache.

mod comparator;
mod intersect;
mod node;
mod not;
mod order_by;
mod scan;
mod static_id;
mod union;


pub(crate) use comparator::KeyOrderComparator;
pub use node::ResultNode;
pub(crate) use node::NodeKind;
pub(crate) use intersect::IntersectionNode;
pub(crate) use not::NotNode;
pub(crate) use order_by::{OrderByNode, OrderKey};
pub(crate) use scan::{IndexScanner, ScanContext, ScanLayout};
pub(crate) use union::UnionNode;

use crate::{
    db::{
        cursor::{CursorCache, NodePath},
        identity::Identifier,
    },
    error::InternalError,
};
use derive_more::Deref;

///
/// ScanColumn
///
/// One result column: the entity it belongs to, the key it merges on in the
/// producing node's key space, and the raw physical column it was read from.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScanColumn {
    owner: Identifier,
    sort_key: Vec<u8>,
    position: Vec<u8>,
}

impl ScanColumn {
    pub(crate) const fn new(owner: Identifier, sort_key: Vec<u8>, position: Vec<u8>) -> Self {
        Self {
            owner,
            sort_key,
            position,
        }
    }

    #[must_use]
    pub const fn owner(&self) -> Identifier {
        self.owner
    }

    #[must_use]
    pub const fn sort_key(&self) -> &[u8] {
        self.sort_key.as_slice()
    }

    #[must_use]
    pub const fn position(&self) -> &[u8] {
        self.position.as_slice()
    }
}

///
/// Batch
///
/// Ordered, non-empty run of columns sharing one logical rank. Usually a
/// single column; an ordered tie group may carry several.
///

#[derive(Clone, Debug, Deref, Eq, PartialEq)]
pub struct Batch(Vec<ScanColumn>);

impl Batch {
    pub(crate) fn single(column: ScanColumn) -> Self {
        Self(vec![column])
    }

    pub(crate) fn from_columns(columns: Vec<ScanColumn>) -> Option<Self> {
        (!columns.is_empty()).then_some(Self(columns))
    }

    #[must_use]
    pub fn into_columns(self) -> Vec<ScanColumn> {
        self.0
    }
}

///
/// IterState
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum IterState {
    #[default]
    Fresh,
    Iterating,
    Exhausted,
}

///
/// ResultIterator
///
/// Uniform contract of every node in an iterator tree.
///
/// `Fresh -> Iterating -> Exhausted`; `reset` returns to `Fresh` from any
/// state. `Exhausted` is terminal until reset. Store failures surface as
/// errors and never as exhaustion.
///

pub trait ResultIterator {
    /// Discard buffered state and return to `Fresh`.
    fn reset(&mut self);

    /// Whether another batch is available, pulling from children if needed.
    fn has_next(&mut self) -> Result<bool, InternalError>;

    /// Next batch, or `None` once exhausted.
    fn next_batch(&mut self) -> Result<Option<Batch>, InternalError>;

    /// Write this subtree's resume positions for continuing strictly after
    /// `last`, the final column the caller consumed from the root.
    fn finalize_cursor(&self, cache: &mut CursorCache, path: &NodePath, last: &ScanColumn);

    /// Iterators are read-only; always fails with an unsupported error.
    fn remove(&mut self) -> Result<(), InternalError>;
}
