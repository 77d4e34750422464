//! Benchmarks for the automaton and the prefix tree.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sm_core::{AcBuilder, AcFlags, AhoCorasick, ConsumeFlags, Prefix, RadixTree};

fn automaton(count: usize) -> AhoCorasick<usize> {
    let mut builder = AcBuilder::new(AcFlags::NOCASE);
    for i in 0..count {
        let pattern = format!("select{i}from");
        builder.add_pattern(pattern.as_bytes(), None, i).unwrap();
    }
    builder.add_pattern(b"union select", None, count).unwrap();
    builder.build_links().unwrap()
}

fn payload(len: usize) -> Vec<u8> {
    b"GET /index.php?id=1 UNION SELECT password FROM users HTTP/1.1\r\n"
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}

fn bench_consume(c: &mut Criterion) {
    let data = payload(64 * 1024);
    let mut group = c.benchmark_group("ac_consume");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for count in [10, 1_000, 10_000] {
        let ac = automaton(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &ac, |b, ac| {
            b.iter(|| {
                let mut ctx = ac.context();
                ctx.consume(black_box(&data), ConsumeFlags::MATCH_ALL).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_consume_chunked(c: &mut Criterion) {
    let data = payload(64 * 1024);
    let ac = automaton(1_000);

    let mut group = c.benchmark_group("ac_consume_chunked");
    group.throughput(Throughput::Bytes(data.len() as u64));
    for chunk in [64, 1500, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut ctx = ac.context();
                for piece in data.chunks(chunk) {
                    ctx.consume(black_box(piece), ConsumeFlags::DO_LIST).unwrap();
                    ctx.drain_matches().for_each(drop);
                }
                ctx.match_count()
            })
        });
    }
    group.finish();
}

fn bench_radix(c: &mut Criterion) {
    let mut tree = RadixTree::new();
    for i in 0..10_000u32 {
        let addr = (10u32 << 24) | (i << 8);
        let key = Prefix::new(&addr.to_be_bytes(), 24).unwrap();
        tree.insert_data(&key, i).unwrap();
    }
    let hit = Prefix::new(&((10u32 << 24) | (4_242 << 8) | 7).to_be_bytes(), 32).unwrap();
    let miss = Prefix::new(&[192, 168, 1, 1], 32).unwrap();

    c.bench_function("radix_closest_hit", |b| {
        b.iter(|| tree.match_closest(black_box(&hit)).copied())
    });
    c.bench_function("radix_closest_miss", |b| {
        b.iter(|| tree.match_closest(black_box(&miss)).copied())
    });
    c.bench_function("radix_all_data", |b| {
        b.iter(|| tree.match_all_data(black_box(&hit)).map(|v| v.len()))
    });
}

criterion_group!(benches, bench_consume, bench_consume_chunked, bench_radix);
criterion_main!(benches);
