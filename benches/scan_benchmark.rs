//! Sequential scan benchmarks.
//!
//! Measures:
//! - Single-row fetch vs batched fetch at several batch sizes
//! - Scan cost under MVCC snapshots vs `Snapshot::Any`
//! - Opening and closing a scan (lock, cursor, slot pool)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use heapscan::catalog::{ColumnDef, TableSchema};
use heapscan::executor::ScanConfig;
use heapscan::storage::Snapshot;
use heapscan::{DataType, Database, DatabaseConfig, Value};
use rand::Rng;
use tempfile::TempDir;

const ROWS: i64 = 10_000;

/// Creates a database with `ROWS` committed rows in `readings`.
fn setup() -> (TempDir, Database) {
    let temp_dir = TempDir::new().expect("create temp dir");
    let db = Database::open(&temp_dir.path().join("db"), DatabaseConfig::default())
        .expect("open database");
    let schema = TableSchema::new(
        "readings".to_string(),
        vec![
            ColumnDef::new("id".to_string(), DataType::Int64).unwrap(),
            ColumnDef::new("sensor".to_string(), DataType::String).unwrap(),
            ColumnDef::new("value".to_string(), DataType::Float64).unwrap(),
        ],
    )
    .unwrap();
    db.create_table(schema).expect("create table");

    let mut rng = rand::thread_rng();
    let txn = db.begin();
    for i in 0..ROWS {
        let sensor = format!("sensor-{}", rng.gen_range(0..64));
        db.insert(
            txn,
            "readings",
            vec![
                Value::Int64(i),
                Value::String(sensor),
                Value::Float64(rng.gen_range(-50.0..50.0)),
            ],
        )
        .expect("insert row");
    }
    db.commit(txn).expect("commit");
    (temp_dir, db)
}

fn scan_all(db: &Database, snapshot: Snapshot, config: &ScanConfig) -> usize {
    let mut scan = db
        .seq_scan_with("readings", snapshot, config)
        .expect("open scan");
    let mut rows = 0;
    while let Some(slot) = scan.next_slot().expect("next slot") {
        black_box(slot.rid());
        rows += 1;
    }
    scan.shutdown();
    rows
}

/// Benchmark single-row vs batched fetch
fn bench_fetch_strategy(c: &mut Criterion) {
    let (_dir, db) = setup();
    let mut group = c.benchmark_group("seq_scan_strategy");
    group.throughput(Throughput::Elements(ROWS as u64));

    group.bench_function("single", |b| {
        let config = ScanConfig::single_row();
        b.iter(|| scan_all(&db, Snapshot::Any, &config));
    });

    for batch_size in [1usize, 16, 64, 256] {
        let config = ScanConfig::new().with_batch_size(batch_size);
        group.bench_with_input(
            BenchmarkId::new("batched", batch_size),
            &config,
            |b, config| b.iter(|| scan_all(&db, Snapshot::Any, config)),
        );
    }

    group.finish();
}

/// Benchmark visibility checks
fn bench_snapshot(c: &mut Criterion) {
    let (_dir, db) = setup();
    let mut group = c.benchmark_group("seq_scan_snapshot");
    group.throughput(Throughput::Elements(ROWS as u64));
    let config = ScanConfig::default();

    group.bench_function("any", |b| {
        b.iter(|| scan_all(&db, Snapshot::Any, &config));
    });

    let reader = db.begin();
    group.bench_function("mvcc", |b| {
        b.iter(|| scan_all(&db, db.snapshot(reader).expect("snapshot"), &config));
    });

    group.finish();
}

/// Benchmark decoding rows out of batch slots
fn bench_decode(c: &mut Criterion) {
    let (_dir, db) = setup();
    let config = ScanConfig::new().with_batch_size(64);

    c.bench_function("seq_scan_decode_values", |b| {
        b.iter(|| {
            let mut scan = db
                .seq_scan_with("readings", Snapshot::Any, &config)
                .expect("open scan");
            while scan.fill_batch().expect("fill batch") > 0 {
                for slot in scan.batch() {
                    black_box(slot.values().expect("decode"));
                }
            }
            scan.shutdown();
        });
    });
}

/// Benchmark scan setup and teardown with one batch
fn bench_open_close(c: &mut Criterion) {
    let (_dir, db) = setup();

    c.bench_function("seq_scan_open_close", |b| {
        b.iter(|| {
            let mut scan = db.seq_scan("readings", Snapshot::Any).expect("open scan");
            black_box(scan.fill_batch().expect("fill batch"));
            scan.shutdown();
        });
    });
}

criterion_group!(
    benches,
    bench_fetch_strategy,
    bench_snapshot,
    bench_decode,
    bench_open_close
);
criterion_main!(benches);
