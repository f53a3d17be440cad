use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use regatta::{
    Column, DataType, Table, Value, from_arrow, from_dlpack, gather_metadata, to_arrow, to_dlpack,
};

const ROWS: usize = 10_000;

fn build_table(rows: usize) -> Table {
    let ints = Column::from_values(
        &DataType::Int64,
        (0..rows).map(|i| {
            if i % 97 == 0 {
                Value::Null
            } else {
                Value::Int64(i as i64)
            }
        }),
    )
    .unwrap();
    let floats = Column::from_values(
        &DataType::Float64,
        (0..rows).map(|i| Value::float64(i as f64 * 0.5)),
    )
    .unwrap();
    let strings = Column::from_values(
        &DataType::String,
        (0..rows).map(|i| Value::String(format!("row-{}", i % 100))),
    )
    .unwrap();
    Table::try_new(vec![ints, floats, strings]).unwrap()
}

fn build_numeric_table(rows: usize) -> Table {
    let columns = (0..4)
        .map(|c| {
            Column::from_values(
                &DataType::Float64,
                (0..rows).map(|i| Value::float64((i + c * rows) as f64)),
            )
            .unwrap()
        })
        .collect();
    Table::try_new(columns).unwrap()
}

fn bench_arrow(c: &mut Criterion) {
    let table = build_table(ROWS);
    let metadata = gather_metadata(&table, None).unwrap();

    let mut group = c.benchmark_group("arrow");
    group.throughput(Throughput::Elements(ROWS as u64));
    group.bench_function("to_arrow", |b| {
        b.iter(|| to_arrow(black_box(&table), black_box(&metadata)).unwrap())
    });

    let batch = to_arrow(&table, &metadata).unwrap();
    group.bench_function("from_arrow", |b| {
        b.iter(|| from_arrow(black_box(&batch)).unwrap())
    });
    group.bench_function("roundtrip", |b| {
        b.iter(|| {
            let batch = to_arrow(black_box(&table), &metadata).unwrap();
            from_arrow(&batch).unwrap()
        })
    });
    group.finish();
}

fn bench_dlpack(c: &mut Criterion) {
    let table = build_numeric_table(ROWS);

    let mut group = c.benchmark_group("dlpack");
    group.throughput(Throughput::Elements((ROWS * 4) as u64));
    group.bench_function("to_dlpack", |b| {
        b.iter(|| to_dlpack(black_box(&table)).unwrap())
    });
    group.bench_function("roundtrip", |b| {
        b.iter(|| {
            let mut capsule = to_dlpack(black_box(&table)).unwrap();
            from_dlpack(&mut capsule).unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_arrow, bench_dlpack);
criterion_main!(benches);
