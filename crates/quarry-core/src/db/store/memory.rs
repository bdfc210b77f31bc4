use crate::{
    db::{
        index::{IndexRowKey, envelope::bounds_are_empty},
        store::{ColumnStore, ColumnWriter, StoredColumn},
    },
    error::InternalError,
};
use std::{
    collections::BTreeMap,
    ops::Bound,
    sync::{
        Mutex, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

type Row = BTreeMap<Vec<u8>, Vec<u8>>;

///
/// FaultPlan
///
/// Pending injected read failures: skip `after` reads, then fail `count`.
///

#[derive(Debug, Default)]
struct FaultPlan {
    after: u64,
    count: u64,
}

///
/// MemoryColumnStore
///
/// In-memory wide-column store over ordered maps.
/// Many readers may scan concurrently; writers take the row map exclusively.
///

#[derive(Debug, Default)]
pub struct MemoryColumnStore {
    rows: RwLock<BTreeMap<IndexRowKey, Row>>,
    faults: Mutex<FaultPlan>,
    reads: AtomicU64,
}

impl MemoryColumnStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` range scans with a store read error.
    pub fn fail_next_reads(&self, count: u64) {
        self.fail_reads_after(0, count);
    }

    /// Let `after` range scans succeed, then fail the following `count`.
    pub fn fail_reads_after(&self, after: u64, count: u64) {
        if let Ok(mut plan) = self.faults.lock() {
            *plan = FaultPlan { after, count };
        }
    }

    /// Number of range scans served (including failed ones).
    #[must_use]
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of cells stored in one row.
    pub fn row_len(&self, row: &IndexRowKey) -> Result<usize, InternalError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| InternalError::store_read("column store lock poisoned"))?;

        Ok(rows.get(row).map_or(0, BTreeMap::len))
    }

    fn take_fault(&self, row: &IndexRowKey) -> Result<(), InternalError> {
        let mut plan = self
            .faults
            .lock()
            .map_err(|_| InternalError::store_read("fault plan lock poisoned"))?;

        if plan.count == 0 {
            return Ok(());
        }
        if plan.after > 0 {
            plan.after -= 1;
            return Ok(());
        }
        plan.count -= 1;

        Err(InternalError::store_read(format!(
            "injected read failure for row {row}"
        )))
    }
}

impl ColumnStore for MemoryColumnStore {
    fn range_scan(
        &self,
        row: &IndexRowKey,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        count: usize,
        reversed: bool,
    ) -> Result<Vec<StoredColumn>, InternalError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.take_fault(row)?;

        if count == 0 || bounds_are_empty(&lower, &upper) {
            return Ok(Vec::new());
        }

        let rows = self
            .rows
            .read()
            .map_err(|_| InternalError::store_read("column store lock poisoned"))?;
        let Some(cells) = rows.get(row) else {
            return Ok(Vec::new());
        };

        let range = cells.range::<[u8], _>((lower, upper));
        let to_cell = |(column, value): (&Vec<u8>, &Vec<u8>)| StoredColumn {
            column: column.clone(),
            value: value.clone(),
        };

        let out = if reversed {
            range.rev().take(count).map(to_cell).collect()
        } else {
            range.take(count).map(to_cell).collect()
        };

        Ok(out)
    }
}

impl ColumnWriter for MemoryColumnStore {
    fn put(&self, row: &IndexRowKey, column: Vec<u8>, value: Vec<u8>) -> Result<(), InternalError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| InternalError::store_read("column store lock poisoned"))?;
        rows.entry(row.clone()).or_default().insert(column, value);

        Ok(())
    }

    fn delete(&self, row: &IndexRowKey, column: &[u8]) -> Result<(), InternalError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| InternalError::store_read("column store lock poisoned"))?;

        if let Some(cells) = rows.get_mut(row) {
            cells.remove(column);
            if cells.is_empty() {
                rows.remove(row);
            }
        }

        Ok(())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{
            direction::Direction,
            index::{ApplicationId, Scope, envelope::KeyEnvelope},
            store::read_envelope,
        },
        error::ErrorClass,
    };

    fn row() -> IndexRowKey {
        IndexRowKey::members(&ApplicationId::from("app"), &Scope::collection("items"))
    }

    fn seeded() -> MemoryColumnStore {
        let store = MemoryColumnStore::new();
        for byte in 1u8..=5 {
            store.put(&row(), vec![byte], Vec::new()).expect("put");
        }
        store
    }

    fn columns(cells: &[StoredColumn]) -> Vec<u8> {
        cells.iter().map(|cell| cell.column[0]).collect()
    }

    #[test]
    fn range_scan_honors_bounds_count_and_direction() {
        let store = seeded();

        let asc = store
            .range_scan(&row(), Bound::Excluded(&[1][..]), Bound::Unbounded, 2, false)
            .expect("scan");
        assert_eq!(columns(&asc), vec![2, 3]);

        let desc = store
            .range_scan(&row(), Bound::Unbounded, Bound::Excluded(&[5][..]), 10, true)
            .expect("scan");
        assert_eq!(columns(&desc), vec![4, 3, 2, 1]);
    }

    #[test]
    fn empty_and_inverted_ranges_return_nothing() {
        let store = seeded();

        let inverted = store
            .range_scan(&row(), Bound::Included(&[4][..]), Bound::Included(&[2][..]), 10, false)
            .expect("scan");
        assert!(inverted.is_empty());

        let point_excluded = store
            .range_scan(&row(), Bound::Excluded(&[3][..]), Bound::Excluded(&[3][..]), 10, false)
            .expect("scan");
        assert!(point_excluded.is_empty());
    }

    #[test]
    fn injected_faults_fail_then_clear() {
        let store = seeded();
        store.fail_reads_after(1, 1);

        assert!(store.get(&row(), &[1]).expect("first read passes").is_some());
        let err = store.get(&row(), &[1]).expect_err("second read fails");
        assert_eq!(err.class, ErrorClass::StoreRead);
        assert!(store.get(&row(), &[1]).expect("fault cleared").is_some());
        assert_eq!(store.read_count(), 3);
    }

    #[test]
    fn envelope_reads_page_through_the_row() {
        let store = seeded();
        let whole = |direction| KeyEnvelope::for_prefix(direction, Vec::new());

        let asc = read_envelope(&store, &row(), whole(Direction::Asc), 2).expect("paged read");
        assert_eq!(columns(&asc), vec![1, 2, 3, 4, 5]);
        assert_eq!(store.read_count(), 3);

        let desc = read_envelope(&store, &row(), whole(Direction::Desc), 2).expect("paged read");
        assert_eq!(columns(&desc), vec![5, 4, 3, 2, 1]);
        assert_eq!(store.read_count(), 6);

        // A full final page costs one empty fetch to confirm the end.
        read_envelope(&store, &row(), whole(Direction::Asc), 5).expect("paged read");
        assert_eq!(store.read_count(), 8);
    }

    #[test]
    fn deleting_the_last_cell_drops_the_row() {
        let store = MemoryColumnStore::new();
        store.put(&row(), vec![9], Vec::new()).expect("put");
        store.delete(&row(), &[9]).expect("delete");

        assert_eq!(store.row_len(&row()).expect("len"), 0);
    }
}
