//! Contract tests for sequential scans: ordering, batching, pin
//! accounting, lifecycle, and error reporting.

use heapscan::catalog::{ColumnDef, RelationKind, TableSchema};
use heapscan::executor::{
    AccessMethod, BatchPhase, ComparisonOp, PhysicalOperator, Predicate, Qualification,
    ScanConfig, ScanDirection, ScanPhase, ScanTuple, SeqScanState, TableScanCursor,
};
use heapscan::storage::{HeapCursor, LockMode, Snapshot};
use heapscan::{AccessFailure, DataType, Database, DatabaseConfig, HeapScanError, Result, Value};
use tempfile::TempDir;

/// Database plus the directory backing it; the database drops first.
struct Fixture {
    db: Database,
    _dir: TempDir,
}

fn items_schema(name: &str) -> TableSchema {
    TableSchema::new(
        name.into(),
        vec![
            ColumnDef::new("id".into(), DataType::Int64).unwrap().not_null(),
            ColumnDef::new("name".into(), DataType::String).unwrap(),
        ],
    )
    .unwrap()
}

fn fixture(rows: i64) -> Fixture {
    let dir = TempDir::new().unwrap();
    let db = Database::open(&dir.path().join("db"), DatabaseConfig::default()).unwrap();
    db.create_table(items_schema("items")).unwrap();
    let txn = db.begin();
    for i in 0..rows {
        db.insert(
            txn,
            "items",
            vec![Value::Int64(i), Value::String(format!("item-{i}"))],
        )
        .unwrap();
    }
    db.commit(txn).unwrap();
    Fixture { db, _dir: dir }
}

fn batched(capacity: usize) -> ScanConfig {
    ScanConfig::new().with_batch_size(capacity)
}

fn drain_ids(scan: &mut SeqScanState) -> Vec<i64> {
    let mut ids = Vec::new();
    while let Some(slot) = scan.next_slot().unwrap() {
        ids.push(slot.values().unwrap()[0].as_int64().unwrap());
    }
    ids
}

fn assert_no_pins(db: &Database) {
    let stats = db.buffer_pool_stats();
    assert_eq!(stats.pinned_pages, 0);
    assert_eq!(stats.outstanding_pins(), 0);
}

// =============================================================================
// Ordering
// =============================================================================

mod ordering {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_and_batched_agree() {
        let f = fixture(10);
        let mut single = f
            .db
            .seq_scan_with("items", Snapshot::Any, &ScanConfig::single_row())
            .unwrap();
        let mut batch = f.db.seq_scan_with("items", Snapshot::Any, &batched(3)).unwrap();

        let expected: Vec<i64> = (0..10).collect();
        assert_eq!(drain_ids(&mut single), expected);
        assert_eq!(drain_ids(&mut batch), expected);
        single.shutdown();
        batch.shutdown();
    }

    #[test]
    fn test_rows_span_many_pages() {
        let f = fixture(600);
        let mut scan = f.db.seq_scan_with("items", Snapshot::Any, &batched(16)).unwrap();
        assert_eq!(drain_ids(&mut scan), (0..600).collect::<Vec<_>>());
        scan.shutdown();
        assert!(f.db.buffer_pool_stats().pages_used > 1);
    }

    #[test]
    fn test_backward_scan_reverses_order() {
        let f = fixture(7);
        let config = batched(3).with_direction(ScanDirection::Backward);
        let mut scan = f.db.seq_scan_with("items", Snapshot::Any, &config).unwrap();
        assert_eq!(drain_ids(&mut scan), (0..7).rev().collect::<Vec<_>>());
        scan.shutdown();
    }

    fn next_id(cursor: &mut HeapCursor, direction: ScanDirection) -> Option<i64> {
        cursor
            .next(direction)
            .unwrap()
            .map(|t| t.values().unwrap()[0].as_int64().unwrap())
    }

    #[test]
    fn test_cursor_changes_direction_mid_scan() {
        let f = fixture(5);
        let mut cursor = f
            .db
            .access()
            .open("items", Snapshot::Any, ScanDirection::Forward)
            .unwrap();
        assert_eq!(next_id(&mut cursor, ScanDirection::Forward), Some(0));
        assert_eq!(next_id(&mut cursor, ScanDirection::Forward), Some(1));
        assert_eq!(next_id(&mut cursor, ScanDirection::Forward), Some(2));
        assert_eq!(next_id(&mut cursor, ScanDirection::Backward), Some(1));
        assert_eq!(next_id(&mut cursor, ScanDirection::Forward), Some(2));

        while next_id(&mut cursor, ScanDirection::Forward).is_some() {}
        assert!(!cursor.holds_pin());
        assert_eq!(next_id(&mut cursor, ScanDirection::Forward), None);
        assert_eq!(next_id(&mut cursor, ScanDirection::Backward), Some(4));
        drop(cursor);
        assert_no_pins(&f.db);
    }

    /// Drains `config` through `fill_batch` and checks it against `fetch_one`.
    fn check_batches(
        rows: i64,
        capacity: usize,
        direction: ScanDirection,
    ) -> std::result::Result<(), TestCaseError> {
        let f = fixture(rows);
        let single_config = ScanConfig::single_row().with_direction(direction);
        let mut single = f.db.seq_scan_with("items", Snapshot::Any, &single_config).unwrap();
        let mut single_ids = Vec::new();
        while let Some(slot) = single.fetch_one().unwrap() {
            single_ids.push(slot.values().unwrap()[0].as_int64().unwrap());
        }

        let config = batched(capacity).with_direction(direction);
        let mut batch = f.db.seq_scan_with("items", Snapshot::Any, &config).unwrap();
        let mut counts = Vec::new();
        let mut batch_ids = Vec::new();
        loop {
            let filled = batch.fill_batch().unwrap();
            if filled == 0 {
                break;
            }
            counts.push(filled);
            for slot in batch.batch() {
                batch_ids.push(slot.values().unwrap()[0].as_int64().unwrap());
            }
        }
        prop_assert_eq!(batch.fill_batch().unwrap(), 0);
        prop_assert_eq!(batch.fill_batch().unwrap(), 0);

        let mut expected: Vec<i64> = (0..rows).collect();
        if direction == ScanDirection::Backward {
            expected.reverse();
        }
        prop_assert_eq!(&single_ids, &expected);
        prop_assert_eq!(&batch_ids, &expected);

        let rows = usize::try_from(rows).unwrap();
        prop_assert_eq!(counts.len(), rows.div_ceil(capacity));
        if let Some((&last, full)) = counts.split_last() {
            prop_assert!(full.iter().all(|&n| n == capacity));
            let tail = if rows % capacity == 0 { capacity } else { rows % capacity };
            prop_assert_eq!(last, tail);
        }

        single.shutdown();
        batch.shutdown();
        prop_assert_eq!(single.stores(), single.releases());
        prop_assert_eq!(batch.stores(), batch.releases());
        assert_no_pins(&f.db);
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_batches_match_single_forward(rows in 0i64..80, capacity in 1usize..12) {
            check_batches(rows, capacity, ScanDirection::Forward)?;
        }

        #[test]
        fn prop_batches_match_single_backward(rows in 0i64..80, capacity in 1usize..12) {
            check_batches(rows, capacity, ScanDirection::Backward)?;
        }

        #[test]
        fn prop_next_slot_matches_single(rows in 0i64..80, capacity in 1usize..12) {
            let f = fixture(rows);
            let mut single = f
                .db
                .seq_scan_with("items", Snapshot::Any, &ScanConfig::single_row())
                .unwrap();
            let mut batch = f.db.seq_scan_with("items", Snapshot::Any, &batched(capacity)).unwrap();

            let expected: Vec<i64> = (0..rows).collect();
            prop_assert_eq!(drain_ids(&mut single), expected.clone());
            prop_assert_eq!(drain_ids(&mut batch), expected);
            single.shutdown();
            batch.shutdown();
            prop_assert_eq!(single.stores(), single.releases());
            prop_assert_eq!(batch.stores(), batch.releases());
            assert_no_pins(&f.db);
        }
    }
}

// =============================================================================
// Batching
// =============================================================================

mod batching {
    use super::*;

    #[test]
    fn test_batch_sizes_then_zero() {
        let f = fixture(5);
        let mut scan = f.db.seq_scan_with("items", Snapshot::Any, &batched(2)).unwrap();
        assert_eq!(scan.fill_batch().unwrap(), 2);
        assert_eq!(scan.phase(), ScanPhase::Open(BatchPhase::NeedsFetch));
        assert_eq!(scan.fill_batch().unwrap(), 2);
        assert_eq!(scan.fill_batch().unwrap(), 1);
        assert_eq!(scan.batch().len(), 1);
        assert_eq!(scan.phase(), ScanPhase::Open(BatchPhase::Exhausted));
        assert_eq!(scan.fill_batch().unwrap(), 0);
        assert_eq!(scan.fill_batch().unwrap(), 0);
        assert!(scan.batch().is_empty());
        assert_eq!(scan.phase(), ScanPhase::Open(BatchPhase::Exhausted));
        scan.shutdown();
    }

    #[test]
    fn test_batch_slots_in_cursor_order() {
        let f = fixture(4);
        let mut scan = f.db.seq_scan_with("items", Snapshot::Any, &batched(4)).unwrap();
        assert_eq!(scan.fill_batch().unwrap(), 4);
        let ids: Vec<i64> = scan
            .batch()
            .iter()
            .map(|slot| slot.values().unwrap()[0].as_int64().unwrap())
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert!(scan
            .batch()
            .iter()
            .all(|slot| slot.qualification() == Qualification::Unevaluated));
        scan.shutdown();
    }

    #[test]
    fn test_empty_table() {
        let f = fixture(0);
        let mut scan = f.db.seq_scan_with("items", Snapshot::Any, &batched(4)).unwrap();
        assert_eq!(scan.phase(), ScanPhase::Open(BatchPhase::NeedsFetch));
        assert_eq!(scan.fill_batch().unwrap(), 0);
        assert_eq!(scan.fill_batch().unwrap(), 0);
        scan.shutdown();
        assert_eq!(scan.stores(), 0);
        assert_eq!(scan.releases(), 0);
    }

    #[test]
    fn test_single_row_fetch() {
        let f = fixture(2);
        let mut scan = f
            .db
            .seq_scan_with("items", Snapshot::Any, &ScanConfig::single_row())
            .unwrap();
        let first = scan.fetch_one().unwrap().unwrap();
        assert_eq!(first.values().unwrap()[0], Value::Int64(0));
        assert!(scan.fetch_one().unwrap().is_some());
        assert!(scan.fetch_one().unwrap().is_none());
        assert!(scan.fetch_one().unwrap().is_none());
        scan.shutdown();
    }

    #[test]
    fn test_fetch_one_rejected_on_batched_scan() {
        let f = fixture(3);
        let mut scan = f.db.seq_scan_with("items", Snapshot::Any, &batched(2)).unwrap();
        assert!(matches!(
            scan.fetch_one(),
            Err(HeapScanError::UnsupportedOperation(_))
        ));
        // The rejected call did not disturb the scan.
        assert_eq!(drain_ids(&mut scan), vec![0, 1, 2]);
        scan.shutdown();
    }

    #[test]
    fn test_next_slot_after_fill_batch_starts_new_batch() {
        let f = fixture(5);
        let mut scan = f.db.seq_scan_with("items", Snapshot::Any, &batched(2)).unwrap();
        assert_eq!(scan.fill_batch().unwrap(), 2);
        let mut seen: Vec<i64> = scan
            .batch()
            .iter()
            .map(|slot| slot.values().unwrap()[0].as_int64().unwrap())
            .collect();
        seen.extend(drain_ids(&mut scan));
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        scan.shutdown();
        assert_eq!(scan.stores(), scan.releases());
    }

    #[test]
    fn test_fill_batch_refuses_to_drop_unreturned_slots() {
        let f = fixture(5);
        let mut scan = f.db.seq_scan_with("items", Snapshot::Any, &batched(2)).unwrap();
        let first = scan.next_slot().unwrap().unwrap().values().unwrap()[0].clone();
        assert_eq!(first, Value::Int64(0));
        assert_eq!(scan.phase(), ScanPhase::Open(BatchPhase::Partial));
        assert!(matches!(
            scan.fill_batch(),
            Err(HeapScanError::UnsupportedOperation(_))
        ));

        // Finishing the batch with next_slot hands fill_batch the rest.
        let second = scan.next_slot().unwrap().unwrap().values().unwrap()[0].clone();
        assert_eq!(second, Value::Int64(1));
        let mut seen = vec![0, 1];
        loop {
            let filled = scan.fill_batch().unwrap();
            if filled == 0 {
                break;
            }
            seen.extend(
                scan.batch()
                    .iter()
                    .map(|slot| slot.values().unwrap()[0].as_int64().unwrap()),
            );
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        scan.shutdown();
        assert_eq!(scan.stores(), scan.releases());
    }

    #[test]
    fn test_fill_batch_rejected_on_single_scan() {
        let f = fixture(3);
        let mut scan = f
            .db
            .seq_scan_with("items", Snapshot::Any, &ScanConfig::single_row())
            .unwrap();
        assert!(matches!(
            scan.fill_batch(),
            Err(HeapScanError::UnsupportedOperation(_))
        ));
        scan.shutdown();
    }
}

// =============================================================================
// Pin accounting
// =============================================================================

mod pins {
    use super::*;

    #[test]
    fn test_stores_match_releases_after_full_scan() {
        let f = fixture(50);
        let mut scan = f.db.seq_scan_with("items", Snapshot::Any, &batched(8)).unwrap();
        let ids = drain_ids(&mut scan);
        assert_eq!(ids.len(), 50);
        scan.shutdown();
        assert_eq!(scan.stores(), 50);
        assert_eq!(scan.stores(), scan.releases());
        assert_no_pins(&f.db);
    }

    #[test]
    fn test_stores_match_releases_after_early_shutdown() {
        let f = fixture(50);
        let mut scan = f.db.seq_scan_with("items", Snapshot::Any, &batched(8)).unwrap();
        assert_eq!(scan.fill_batch().unwrap(), 8);
        assert!(f.db.buffer_pool_stats().pinned_pages > 0);
        scan.shutdown();
        assert_eq!(scan.stores(), 8);
        assert_eq!(scan.releases(), 8);
        assert_no_pins(&f.db);
    }

    #[test]
    fn test_drop_without_shutdown_releases_pins() {
        let f = fixture(20);
        {
            let mut scan = f.db.seq_scan_with("items", Snapshot::Any, &batched(4)).unwrap();
            scan.fill_batch().unwrap();
        }
        assert_no_pins(&f.db);
        // The table lock went with it.
        assert!(f.db.lock_table("items", LockMode::AccessExclusive).is_ok());
    }
}

// =============================================================================
// Rescan and shutdown
// =============================================================================

mod lifecycle {
    use super::*;

    #[test]
    fn test_rescan_is_idempotent() {
        let f = fixture(6);
        let mut scan = f.db.seq_scan_with("items", Snapshot::Any, &batched(4)).unwrap();
        let first = drain_ids(&mut scan);
        scan.reinitialize().unwrap();
        scan.reinitialize().unwrap();
        assert_eq!(drain_ids(&mut scan), first);
        scan.shutdown();
        assert_eq!(scan.stores(), scan.releases());
    }

    #[test]
    fn test_rescan_mid_batch() {
        let f = fixture(5);
        let mut scan = f.db.seq_scan_with("items", Snapshot::Any, &batched(2)).unwrap();
        assert_eq!(scan.fill_batch().unwrap(), 2);
        scan.next_slot().unwrap();
        scan.reinitialize().unwrap();
        assert!(scan.batch().is_empty());
        assert_eq!(scan.phase(), ScanPhase::Open(BatchPhase::NeedsFetch));
        assert_eq!(drain_ids(&mut scan), vec![0, 1, 2, 3, 4]);
        scan.shutdown();
        assert_eq!(scan.stores(), scan.releases());
    }

    #[test]
    fn test_rescan_sees_pages_added_since_open() {
        let f = fixture(1);
        let mut scan = f.db.seq_scan_with("items", Snapshot::Any, &batched(4)).unwrap();
        assert_eq!(drain_ids(&mut scan), vec![0]);

        let txn = f.db.begin();
        for i in 1..400 {
            f.db
                .insert(txn, "items", vec![Value::Int64(i), Value::Null])
                .unwrap();
        }
        f.db.commit(txn).unwrap();

        scan.reinitialize().unwrap();
        assert_eq!(drain_ids(&mut scan).len(), 400);
        scan.shutdown();
    }

    #[test]
    fn test_calls_after_shutdown_fail() {
        let f = fixture(3);
        let mut scan = f.db.seq_scan_with("items", Snapshot::Any, &batched(2)).unwrap();
        scan.shutdown();
        scan.shutdown();
        assert_eq!(scan.phase(), ScanPhase::Closed);
        assert!(matches!(scan.fill_batch(), Err(HeapScanError::ScanClosed(_))));
        assert!(matches!(scan.fetch_one(), Err(HeapScanError::ScanClosed(_))));
        assert!(matches!(scan.next_slot(), Err(HeapScanError::ScanClosed(_))));
        assert!(matches!(
            scan.reinitialize(),
            Err(HeapScanError::ScanClosed(_))
        ));
    }
}

// =============================================================================
// Errors
// =============================================================================

mod errors {
    use super::*;

    fn access_failure(result: Result<SeqScanState>) -> AccessFailure {
        match result {
            Err(HeapScanError::AccessError { reason, .. }) => reason,
            other => panic!("expected access error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_table() {
        let f = fixture(0);
        let result = f.db.seq_scan("nope", Snapshot::Any);
        assert_eq!(access_failure(result), AccessFailure::NotFound);
    }

    #[test]
    fn test_index_cannot_be_scanned() {
        let f = fixture(0);
        let index = TableSchema::with_kind(
            "items_pkey".into(),
            RelationKind::Index,
            vec![ColumnDef::new("id".into(), DataType::Int64).unwrap()],
        )
        .unwrap();
        f.db.create_table(index).unwrap();
        let result = f.db.seq_scan("items_pkey", Snapshot::Any);
        assert_eq!(
            access_failure(result),
            AccessFailure::WrongRelationKind(RelationKind::Index)
        );
    }

    #[test]
    fn test_exclusive_lock_blocks_scan() {
        let f = fixture(3);
        let lock = f.db.lock_table("items", LockMode::AccessExclusive).unwrap();
        let result = f.db.seq_scan("items", Snapshot::Any);
        assert_eq!(access_failure(result), AccessFailure::LockConflict);
        drop(lock);

        let mut scan = f.db.seq_scan("items", Snapshot::Any).unwrap();
        assert!(matches!(
            f.db.lock_table("items", LockMode::AccessExclusive),
            Err(HeapScanError::AccessError {
                reason: AccessFailure::LockConflict,
                ..
            })
        ));
        scan.shutdown();
    }

    #[test]
    fn test_zero_batch_is_invalid_config() {
        let f = fixture(1);
        let result = f.db.seq_scan_with("items", Snapshot::Any, &batched(0));
        assert!(matches!(result, Err(HeapScanError::InvalidConfig(_))));
    }

    #[test]
    fn test_unallocatable_batch_is_resource_exhaustion() {
        let f = fixture(1);
        let result = f.db.seq_scan_with("items", Snapshot::Any, &batched(usize::MAX));
        assert!(matches!(result, Err(HeapScanError::ResourceExhaustion(_))));
        // No lock was left behind.
        assert!(f.db.lock_table("items", LockMode::AccessExclusive).is_ok());
    }

    /// Yields `remaining` tuples from `inner`, then fails; optionally
    /// refuses to rewind.
    struct FailingCursor {
        inner: Box<dyn TableScanCursor>,
        remaining: usize,
        rescan_fails: bool,
    }

    impl TableScanCursor for FailingCursor {
        fn table(&self) -> &str {
            self.inner.table()
        }

        fn next(&mut self, direction: ScanDirection) -> Result<Option<ScanTuple<'_>>> {
            if self.remaining == 0 {
                return Err(HeapScanError::StorageError("disk went away".into()));
            }
            self.remaining -= 1;
            self.inner.next(direction)
        }

        fn rescan(&mut self) -> Result<()> {
            if self.rescan_fails {
                return Err(HeapScanError::StorageError("cannot rewind".into()));
            }
            self.inner.rescan()
        }

        fn end_scan(self: Box<Self>) {
            self.inner.end_scan();
        }
    }

    #[test]
    fn test_error_mid_batch_clears_slots() {
        let f = fixture(10);
        let inner = f
            .db
            .access()
            .begin_scan("items", Snapshot::Any, ScanDirection::Forward)
            .unwrap();
        let cursor = Box::new(FailingCursor {
            inner,
            remaining: 3,
            rescan_fails: false,
        });
        let mut scan = SeqScanState::from_cursor(cursor, &batched(4)).unwrap();

        assert!(matches!(
            scan.fill_batch(),
            Err(HeapScanError::StorageError(_))
        ));
        assert!(scan.batch().is_empty());
        assert_eq!(scan.stores(), 3);
        assert_eq!(scan.releases(), 3);
        scan.shutdown();
        assert_no_pins(&f.db);
    }

    #[test]
    fn test_failed_rescan_keeps_position() {
        let f = fixture(5);
        let inner = f
            .db
            .access()
            .begin_scan("items", Snapshot::Any, ScanDirection::Forward)
            .unwrap();
        let cursor = Box::new(FailingCursor {
            inner,
            remaining: usize::MAX,
            rescan_fails: true,
        });
        let mut scan = SeqScanState::from_cursor(cursor, &batched(2)).unwrap();

        let first = scan.next_slot().unwrap().unwrap().values().unwrap()[0].clone();
        assert_eq!(first, Value::Int64(0));
        assert!(matches!(
            scan.reinitialize(),
            Err(HeapScanError::StorageError(_))
        ));
        assert_eq!(scan.phase(), ScanPhase::Open(BatchPhase::Partial));
        assert_eq!(drain_ids(&mut scan), vec![1, 2, 3, 4]);
        scan.shutdown();
        assert_eq!(scan.stores(), scan.releases());
        assert_no_pins(&f.db);
    }
}

// =============================================================================
// Visibility
// =============================================================================

mod visibility {
    use super::*;

    #[test]
    fn test_uncommitted_rows_hidden_from_others() {
        let f = fixture(3);
        let writer = f.db.begin();
        f.db
            .insert(writer, "items", vec![Value::Int64(3), Value::Null])
            .unwrap();

        let reader = f.db.begin();
        let mut scan = f.db.seq_scan("items", f.db.snapshot(reader).unwrap()).unwrap();
        assert_eq!(drain_ids(&mut scan), vec![0, 1, 2]);
        scan.shutdown();

        let mut own = f.db.seq_scan("items", f.db.snapshot(writer).unwrap()).unwrap();
        assert_eq!(drain_ids(&mut own), vec![0, 1, 2, 3]);
        own.shutdown();
    }

    #[test]
    fn test_aborted_rows_never_visible() {
        let f = fixture(2);
        let writer = f.db.begin();
        f.db
            .insert(writer, "items", vec![Value::Int64(99), Value::Null])
            .unwrap();
        f.db.abort(writer).unwrap();

        let reader = f.db.begin();
        let mut scan = f.db.seq_scan("items", f.db.snapshot(reader).unwrap()).unwrap();
        assert_eq!(drain_ids(&mut scan), vec![0, 1]);
        scan.shutdown();
    }

    #[test]
    fn test_delete_respects_snapshot() {
        let f = fixture(3);
        let mut scan = f.db.seq_scan("items", Snapshot::Any).unwrap();
        let rid = scan.next_slot().unwrap().unwrap().rid().unwrap();
        scan.shutdown();

        let old_reader = f.db.begin();
        let old_snapshot = f.db.snapshot(old_reader).unwrap();

        let deleter = f.db.begin();
        f.db.delete(deleter, "items", rid).unwrap();
        f.db.commit(deleter).unwrap();

        let mut old = f.db.seq_scan("items", old_snapshot).unwrap();
        assert_eq!(drain_ids(&mut old), vec![0, 1, 2]);
        old.shutdown();

        let reader = f.db.begin();
        let mut new = f.db.seq_scan("items", f.db.snapshot(reader).unwrap()).unwrap();
        assert_eq!(drain_ids(&mut new), vec![1, 2]);
        new.shutdown();
    }
}

// =============================================================================
// Operators
// =============================================================================

mod operators {
    use super::*;
    use heapscan::executor::{FilterOperator, ProjectOperator, ScanOperator};

    #[test]
    fn test_scan_predicate_marks_qualification() {
        let f = fixture(5);
        let mut op = f
            .db
            .scan_operator("items", Snapshot::Any, &batched(8))
            .unwrap()
            .with_predicate(Predicate::new("id", ComparisonOp::Gte, Value::Int64(3)));

        let row = op.next().unwrap().unwrap();
        assert_eq!(row.get("id"), Some(&Value::Int64(3)));
        let marks: Vec<Qualification> = op
            .scan()
            .batch()
            .iter()
            .map(|slot| slot.qualification())
            .collect();
        assert_eq!(
            marks,
            vec![
                Qualification::Failed,
                Qualification::Failed,
                Qualification::Failed,
                Qualification::Passed,
                Qualification::Passed,
            ]
        );
        assert_eq!(op.next().unwrap().unwrap().get("id"), Some(&Value::Int64(4)));
        assert!(op.next().unwrap().is_none());
        op.close();
    }

    #[test]
    fn test_operator_pipeline_with_rescan() {
        let f = fixture(10);
        let scan: ScanOperator = f
            .db
            .scan_operator("items", Snapshot::Any, &ScanConfig::single_row())
            .unwrap();
        let filter = FilterOperator::new(
            Box::new(scan),
            Predicate::new("id", ComparisonOp::Lt, Value::Int64(3)),
        );
        let mut project = ProjectOperator::new(Box::new(filter), vec!["name".into()]);

        let mut names = Vec::new();
        while let Some(row) = project.next().unwrap() {
            assert_eq!(row.len(), 1);
            names.push(row.get("name").cloned().unwrap());
        }
        assert_eq!(
            names,
            vec![
                Value::String("item-0".into()),
                Value::String("item-1".into()),
                Value::String("item-2".into()),
            ]
        );

        project.rescan().unwrap();
        assert!(project.next().unwrap().is_some());
        project.close();
        assert_no_pins(&f.db);
    }
}
