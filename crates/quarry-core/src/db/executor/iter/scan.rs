//! Module: executor::iter::scan
//! Responsibility: buffered, resumable range scans over one index row.
//! Does not own: choosing which row to scan or how results combine.

use crate::{
    db::{
        cursor::{CursorCache, NodePath},
        direction::Direction,
        executor::iter::{Batch, ScanColumn, node::NodeOps},
        identity::Identifier,
        index::{
            ApplicationId, ComponentRange, IndexRowKey, Scope,
            envelope::{KeyEnvelope, continuation_advances},
            key::{IndexColumn, MULTI_VALUED_CELL, decode_owner_column, owner_column},
            point_bounds,
        },
        store::{ColumnStore, read_envelope},
    },
    error::InternalError,
    obs::sink::{MetricsEvent, record},
};
use std::{collections::VecDeque, ops::Bound};

///
/// ScanContext
///
/// Per-request inputs shared by every scanner in one tree.
///

#[derive(Clone, Copy)]
pub(crate) struct ScanContext<'s> {
    pub(crate) store: &'s dyn ColumnStore,
    pub(crate) app: &'s ApplicationId,
    pub(crate) scope: &'s Scope,
    pub(crate) batch_size: usize,
    /// Most results one request can deliver, including the lookahead that
    /// decides whether another page exists.
    pub(crate) window: usize,
}

impl ScanContext<'_> {
    /// Value components `owner` holds under `prefix` in its entity-entries
    /// row, ascending.
    pub(crate) fn entity_values(
        &self,
        owner: Identifier,
        prefix: &[u8],
    ) -> Result<Vec<Vec<u8>>, InternalError> {
        let cells = read_envelope(
            self.store,
            &IndexRowKey::entity_entries(self.app, owner),
            KeyEnvelope::for_prefix(Direction::Asc, prefix.to_vec()),
            self.batch_size,
        )?;

        Ok(cells
            .into_iter()
            .filter_map(|cell| cell.column.get(prefix.len()..).map(<[u8]>::to_vec))
            .collect())
    }
}

///
/// ScanLayout
///
/// How a row's physical columns map onto emitted sort keys.
///

pub(crate) enum ScanLayout {
    /// Bare owner columns (membership rows). Identifier space.
    Owner,

    /// `value ++ owner` columns of one fixed value. Identifier space.
    Fixed { component: Vec<u8> },

    /// `value ++ owner` columns across a value range. Value space: the sort
    /// key is the whole column. `entries_prefix` selects the property in an
    /// owner's entity-entries row for membership checks.
    Value {
        range: ComponentRange,
        entries_prefix: Vec<u8>,
    },
}

impl ScanLayout {
    fn decode(&self, column: Vec<u8>) -> Result<ScanColumn, InternalError> {
        match self {
            Self::Owner => {
                let owner = decode_owner_column(&column)?;
                Ok(ScanColumn::new(owner, column.clone(), column))
            }
            Self::Fixed { component } => {
                let decoded = IndexColumn::decode(&column)?;
                if decoded.component() != component.as_slice() {
                    return Err(InternalError::index_invariant(
                        "point scan returned a column for a different value",
                    ));
                }
                let owner = decoded.owner();
                Ok(ScanColumn::new(owner, owner_column(owner), column))
            }
            Self::Value { .. } => {
                let owner = IndexColumn::decode(&column)?.owner();
                Ok(ScanColumn::new(owner, column.clone(), column))
            }
        }
    }

    // Physical column that resumes this layout strictly after `last`.
    fn resume_position(&self, last: &ScanColumn) -> Vec<u8> {
        match self {
            Self::Owner => owner_column(last.owner()),
            Self::Fixed { component } => IndexColumn::encode(component, last.owner()),
            Self::Value { .. } => last.sort_key().to_vec(),
        }
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Owner => "members",
            Self::Fixed { .. } => "point",
            Self::Value { .. } => "range",
        }
    }
}

///
/// Buffered
///
/// One decoded column and whether its owner holds other values in the
/// same property row.
///

struct Buffered {
    column: ScanColumn,
    multi_valued: bool,
}

///
/// IndexScanner
///
/// Leaf over one index row. Reads `batch_size` columns per store round trip
/// and refetches when the buffer drains. The anchor is the last physical
/// column read; each fetch resumes strictly after it, and a failed fetch
/// leaves anchor and buffer untouched.
///

pub(crate) struct IndexScanner<'s> {
    ctx: ScanContext<'s>,
    row: IndexRowKey,
    layout: ScanLayout,
    envelope: KeyEnvelope,
    resume_from: Option<Vec<u8>>,
    anchor: Option<Vec<u8>>,
    buffer: VecDeque<Buffered>,
    physical_done: bool,
}

impl<'s> IndexScanner<'s> {
    pub(crate) fn new(
        ctx: ScanContext<'s>,
        row: IndexRowKey,
        layout: ScanLayout,
        direction: Direction,
        resume_from: Option<Vec<u8>>,
    ) -> Self {
        let envelope = match &layout {
            ScanLayout::Owner => KeyEnvelope::new(direction, Bound::Unbounded, Bound::Unbounded),
            ScanLayout::Fixed { component } => {
                let (lower, upper) = point_bounds(component);
                KeyEnvelope::new(direction, lower, upper)
            }
            ScanLayout::Value { range, .. } => {
                let (lower, upper) = range.raw_bounds();
                KeyEnvelope::new(direction, lower, upper)
            }
        };

        Self {
            ctx,
            row,
            layout,
            envelope,
            anchor: resume_from.clone(),
            resume_from,
            buffer: VecDeque::new(),
            physical_done: false,
        }
    }

    pub(crate) const fn layout(&self) -> &ScanLayout {
        &self.layout
    }

    pub(crate) const fn row(&self) -> &IndexRowKey {
        &self.row
    }

    /// Move the scan so the next fetch starts strictly after `anchor`,
    /// dropping anything buffered.
    pub(crate) fn seek_after(&mut self, anchor: Vec<u8>) {
        self.buffer.clear();
        self.physical_done = false;
        self.anchor = Some(anchor);
    }

    /// Head column without consuming it.
    pub(crate) fn peek(&mut self) -> Result<Option<&ScanColumn>, InternalError> {
        while self.buffer.is_empty() && !self.physical_done {
            self.fetch()?;
        }

        Ok(self.buffer.front().map(|cell| &cell.column))
    }

    /// Whether the buffered head's owner holds more than one value in this
    /// property row. Always false outside property rows.
    pub(crate) fn head_multi_valued(&self) -> bool {
        self.buffer.front().is_some_and(|cell| cell.multi_valued)
    }

    pub(crate) fn take(&mut self) -> Option<ScanColumn> {
        self.buffer.pop_front().map(|cell| cell.column)
    }

    // One physical round trip. State changes only after the whole fetch
    // validated.
    fn fetch(&mut self) -> Result<(), InternalError> {
        let direction = self.envelope.direction();
        let envelope = match &self.anchor {
            Some(anchor) => self.envelope.resume_after(anchor),
            None => self.envelope.clone(),
        };
        if envelope.is_empty() {
            self.physical_done = true;
            return Ok(());
        }

        let (lower, upper) = envelope.bounds();
        let cells = self
            .ctx
            .store
            .range_scan(
                &self.row,
                lower,
                upper,
                self.ctx.batch_size,
                direction.is_reversed(),
            )
            .inspect_err(|err| {
                record(&MetricsEvent::StoreReadFailed);
                tracing::warn!(row = %self.row, error = %err, "index scan fetch failed");
            })?;

        let fetched = cells.len();
        tracing::debug!(
            row = %self.row,
            layout = self.layout.label(),
            direction = direction.label(),
            columns = fetched,
            "index scan fetch"
        );
        record(&MetricsEvent::ScanFetch {
            scope: self.ctx.scope.to_string(),
            columns: fetched as u64,
        });

        let mut anchor = self.anchor.clone();
        let mut columns = Vec::with_capacity(fetched);
        for cell in cells {
            if !envelope.contains(&cell.column) {
                return Err(InternalError::index_invariant(format!(
                    "store returned a column outside the scan envelope for row {}",
                    self.row
                )));
            }
            if let Some(previous) = &anchor
                && !continuation_advances(direction, previous.as_slice(), cell.column.as_slice())
            {
                return Err(InternalError::index_invariant(format!(
                    "index scan did not advance past its anchor for row {}",
                    self.row
                )));
            }

            let multi_valued = cell.value == MULTI_VALUED_CELL;
            let column = self.layout.decode(cell.column)?;
            anchor = Some(column.position().to_vec());
            columns.push(Buffered {
                column,
                multi_valued,
            });
        }

        self.anchor = anchor;
        self.buffer.extend(columns);
        if fetched < self.ctx.batch_size {
            self.physical_done = true;
        }

        Ok(())
    }
}

impl NodeOps for IndexScanner<'_> {
    fn advance(&mut self) -> Result<Option<Batch>, InternalError> {
        self.peek()?;

        Ok(self.take().map(Batch::single))
    }

    fn rewind(&mut self) {
        self.buffer.clear();
        self.physical_done = false;
        self.anchor.clone_from(&self.resume_from);
    }

    fn finalize(&self, cache: &mut CursorCache, path: &NodePath, last: &ScanColumn) {
        cache.insert(path.clone(), self.layout.resume_position(last));
    }

    fn contains(&mut self, owner: Identifier) -> Result<bool, InternalError> {
        match &self.layout {
            ScanLayout::Owner => Ok(self
                .ctx
                .store
                .get(&self.row, &owner_column(owner))?
                .is_some()),
            ScanLayout::Fixed { component } => Ok(self
                .ctx
                .store
                .get(&self.row, &IndexColumn::encode(component, owner))?
                .is_some()),
            ScanLayout::Value {
                range,
                entries_prefix,
            } => Ok(self
                .ctx
                .entity_values(owner, entries_prefix)?
                .iter()
                .any(|component| range.contains_component(component))),
        }
    }

    fn direction(&self) -> Direction {
        self.envelope.direction()
    }
}
