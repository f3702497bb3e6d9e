//! Benchmark suite for streaming read throughput.
//!
//! Measures full-iteration throughput over an in-memory input across the
//! snapshot modes and string materialization modes, plus a typed-column
//! configuration.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use railcar::{scan_csv_slice, ColumnKind, CsvOptions};

/// Generate a synthetic input with mixed field shapes.
fn synthetic_csv(rows: usize) -> Vec<u8> {
    let mut out = String::from("id,name,score,flag,when,note\n");
    for i in 0..rows {
        out.push_str(&format!(
            "{},user{},{}.5,{},2021-03-{:02},note text {}\n",
            i,
            i % 1000,
            i % 90,
            if i % 2 == 0 { "true" } else { "false" },
            (i % 27) + 1,
            i % 50
        ));
    }
    out.into_bytes()
}

fn iterate(data: &[u8], options: CsvOptions) -> usize {
    let mut rows = scan_csv_slice(data, options).unwrap();
    let mut count = 0;
    while let Some(row) = rows.advance().unwrap() {
        black_box(row.get("name").unwrap());
        black_box(row.get(2).unwrap());
        count += 1;
    }
    count
}

fn bench_read_throughput(c: &mut Criterion) {
    let data = synthetic_csv(10_000);
    let mut group = c.benchmark_group("read_throughput");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function(BenchmarkId::new("lazy", "safe"), |b| {
        b.iter(|| iterate(&data, CsvOptions::default()))
    });
    group.bench_function(BenchmarkId::new("lazy", "reuse"), |b| {
        b.iter(|| iterate(&data, CsvOptions::default().with_buffer_reuse(true)))
    });
    group.bench_function(BenchmarkId::new("owned", "safe"), |b| {
        b.iter(|| iterate(&data, CsvOptions::default().owned_strings()))
    });
    group.bench_function(BenchmarkId::new("typed", "reuse"), |b| {
        b.iter(|| {
            iterate(
                &data,
                CsvOptions::default()
                    .with_buffer_reuse(true)
                    .with_column_type("id", ColumnKind::Int64)
                    .with_column_type("score", ColumnKind::Float64)
                    .with_column_type("flag", ColumnKind::Bool),
            )
        })
    });

    group.finish();
}

criterion_group!(benches, bench_read_throughput);
criterion_main!(benches);
