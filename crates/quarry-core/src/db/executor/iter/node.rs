use crate::{
    db::{
        cursor::{CursorCache, NodePath},
        direction::Direction,
        executor::iter::{
            Batch, IterState, ResultIterator, ScanColumn,
            comparator::{KeyOrderComparator, MonotonicWitness},
            intersect::IntersectionNode,
            not::NotNode,
            order_by::OrderByNode,
            scan::IndexScanner,
            static_id::StaticIdIterator,
            union::UnionNode,
        },
        identity::Identifier,
    },
    error::InternalError,
    obs::sink::{MetricsEvent, record},
};
use std::collections::VecDeque;

///
/// NodeOps
///
/// Per-kind behavior behind the shared `ResultNode` state machine.
///

pub(crate) trait NodeOps {
    /// Produce the next batch from this node's source.
    fn advance(&mut self) -> Result<Option<Batch>, InternalError>;

    /// Return to the pre-iteration state, rewinding children.
    fn rewind(&mut self);

    fn finalize(&self, cache: &mut CursorCache, path: &NodePath, last: &ScanColumn);

    /// Whether `owner` is a member of this node's result set.
    fn contains(&mut self, owner: Identifier) -> Result<bool, InternalError>;

    fn direction(&self) -> Direction;
}

///
/// NodeKind
///
/// Closed set of iterator node kinds.
///

pub(crate) enum NodeKind<'s> {
    Scan(IndexScanner<'s>),
    Static(StaticIdIterator),
    Intersection(IntersectionNode<'s>),
    Union(UnionNode<'s>),
    Not(NotNode<'s>),
    OrderBy(OrderByNode<'s>),
}

impl NodeKind<'_> {
    const fn label(&self) -> &'static str {
        match self {
            Self::Scan(_) => "scan",
            Self::Static(_) => "static",
            Self::Intersection(_) => "intersection",
            Self::Union(_) => "union",
            Self::Not(_) => "not",
            Self::OrderBy(_) => "order_by",
        }
    }

    fn ops(&self) -> &dyn NodeOps {
        match self {
            Self::Scan(node) => node,
            Self::Static(node) => node,
            Self::Intersection(node) => node,
            Self::Union(node) => node,
            Self::Not(node) => node,
            Self::OrderBy(node) => node,
        }
    }

    fn ops_mut(&mut self) -> &mut dyn NodeOps {
        match self {
            Self::Scan(node) => node,
            Self::Static(node) => node,
            Self::Intersection(node) => node,
            Self::Union(node) => node,
            Self::Not(node) => node,
            Self::OrderBy(node) => node,
        }
    }
}

///
/// ResultNode
///
/// One node of an iterator tree: its kind plus the lookahead and lifecycle
/// state shared by every kind. Columns pulled from the kind are checked for
/// strict monotonicity before they are buffered.
///

pub struct ResultNode<'s> {
    kind: NodeKind<'s>,
    buffered: VecDeque<ScanColumn>,
    state: IterState,
    witness: MonotonicWitness,
}

impl<'s> ResultNode<'s> {
    pub(crate) fn new(kind: NodeKind<'s>) -> Self {
        let comparator = KeyOrderComparator::from_direction(kind.ops().direction());

        Self {
            kind,
            buffered: VecDeque::new(),
            state: IterState::Fresh,
            witness: MonotonicWitness::new(comparator),
        }
    }

    /// A leaf that yields exactly one known identifier.
    #[must_use]
    pub fn static_id(id: Identifier, direction: Direction) -> Self {
        Self::new(NodeKind::Static(StaticIdIterator::new(id, direction)))
    }

    #[must_use]
    pub const fn state(&self) -> IterState {
        self.state
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.kind.ops().direction()
    }

    pub(crate) fn comparator(&self) -> KeyOrderComparator {
        KeyOrderComparator::from_direction(self.direction())
    }

    /// Head column without consuming it.
    pub(crate) fn peek_column(&mut self) -> Result<Option<&ScanColumn>, InternalError> {
        self.fill()?;

        Ok(self.buffered.front())
    }

    /// Consume the head column. Only meaningful after `peek_column`.
    pub(crate) fn take_column(&mut self) -> Option<ScanColumn> {
        self.buffered.pop_front()
    }

    /// Membership check used when this subtree filters an ordered driver.
    pub(crate) fn contains(&mut self, owner: Identifier) -> Result<bool, InternalError> {
        record(&MetricsEvent::MembershipCheck);

        self.kind.ops_mut().contains(owner)
    }

    // Ensure the lookahead holds at least one column unless exhausted.
    fn fill(&mut self) -> Result<(), InternalError> {
        if !self.buffered.is_empty() || self.state == IterState::Exhausted {
            return Ok(());
        }
        self.state = IterState::Iterating;

        let Some(batch) = self.kind.ops_mut().advance()? else {
            self.state = IterState::Exhausted;
            return Ok(());
        };

        let label = self.kind.label();
        for column in batch.iter() {
            self.witness.observe(column, label)?;
        }
        self.buffered.extend(batch.into_columns());

        Ok(())
    }
}

impl ResultIterator for ResultNode<'_> {
    fn reset(&mut self) {
        self.kind.ops_mut().rewind();
        self.buffered.clear();
        self.witness.reset();
        self.state = IterState::Fresh;
    }

    fn has_next(&mut self) -> Result<bool, InternalError> {
        self.fill()?;

        Ok(!self.buffered.is_empty())
    }

    fn next_batch(&mut self) -> Result<Option<Batch>, InternalError> {
        self.fill()?;

        Ok(Batch::from_columns(self.buffered.drain(..).collect()))
    }

    fn finalize_cursor(&self, cache: &mut CursorCache, path: &NodePath, last: &ScanColumn) {
        self.kind.ops().finalize(cache, path, last);
    }

    fn remove(&mut self) -> Result<(), InternalError> {
        Err(InternalError::iterator_unsupported(format!(
            "{} iterator does not support removal",
            self.kind.label()
        )))
    }
}

/// Require every child of a combinator to traverse in one direction.
pub(crate) fn shared_direction(
    children: &[ResultNode<'_>],
    combinator: &'static str,
) -> Result<Direction, InternalError> {
    let Some(first) = children.first() else {
        return Err(InternalError::query_unsupported(format!(
            "{combinator} requires at least one child"
        )));
    };
    let direction = first.direction();

    if let Some(other) = children.iter().find(|child| child.direction() != direction) {
        return Err(InternalError::iterator_invariant(format!(
            "{combinator} children disagree on direction: {} and {}",
            direction.label(),
            other.direction().label()
        )));
    }

    Ok(direction)
}
