//! Column store boundary.
//!
//! The engine reads through [`ColumnStore::range_scan`] only; index
//! maintenance writes through [`ColumnWriter`].

mod memory;

pub use memory::MemoryColumnStore;

use crate::{
    db::index::{IndexRowKey, envelope::KeyEnvelope},
    error::InternalError,
};
use std::ops::Bound;

///
/// StoredColumn
///
/// One physical `(column, value)` cell of a row.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoredColumn {
    pub column: Vec<u8>,
    pub value: Vec<u8>,
}

///
/// ColumnStore
///
/// Ordered range reads over one row. Results are ascending by column, or
/// descending when `reversed`; at most `count` cells come back.
///

pub trait ColumnStore: Send + Sync {
    fn range_scan(
        &self,
        row: &IndexRowKey,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        count: usize,
        reversed: bool,
    ) -> Result<Vec<StoredColumn>, InternalError>;

    /// Point read of one column.
    fn get(&self, row: &IndexRowKey, column: &[u8]) -> Result<Option<Vec<u8>>, InternalError> {
        let mut cells = self.range_scan(
            row,
            Bound::Included(column),
            Bound::Included(column),
            1,
            false,
        )?;

        Ok(cells.pop().map(|cell| cell.value))
    }
}

/// Read every cell of `row` inside `envelope`, at most `page` cells per
/// round trip.
pub(crate) fn read_envelope<S: ColumnStore + ?Sized>(
    store: &S,
    row: &IndexRowKey,
    mut envelope: KeyEnvelope,
    page: usize,
) -> Result<Vec<StoredColumn>, InternalError> {
    let page = page.max(1);
    let mut cells = Vec::new();

    loop {
        let (lower, upper) = envelope.bounds();
        let fetched =
            store.range_scan(row, lower, upper, page, envelope.direction().is_reversed())?;
        let next = fetched
            .last()
            .filter(|_| fetched.len() == page)
            .map(|last| envelope.resume_after(&last.column));
        cells.extend(fetched);

        match next {
            Some(next) => envelope = next,
            None => return Ok(cells),
        }
    }
}

///
/// ColumnWriter
///
/// Cell-level mutation used by index maintenance.
///

pub trait ColumnWriter: Send + Sync {
    fn put(&self, row: &IndexRowKey, column: Vec<u8>, value: Vec<u8>) -> Result<(), InternalError>;

    fn delete(&self, row: &IndexRowKey, column: &[u8]) -> Result<(), InternalError>;
}
