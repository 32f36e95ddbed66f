//! Benchmarks for sandbox heap operations and dump rendering

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use memlab::buffer::{allocate_buffer, ByteBuffer, OverflowMode};
use memlab::config::SandboxConfig;
use memlab::hexdump::format_dump;
use memlab::sandbox::SandboxHeap;

/// Benchmark hex dump rendering for varying sizes
fn bench_format_dump(c: &mut Criterion) {
    let mut group = c.benchmark_group("format_dump");

    for &size in &[5, 64, 512, 4096] {
        let bytes: Vec<u8> = (0..size).map(|i| i as u8).collect();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_function(format!("{}_bytes", size), |b| {
            b.iter(|| black_box(format_dump(black_box(&bytes))))
        });
    }

    group.finish();
}

/// Benchmark arena setup (seeded garbage fill) plus one allocate/release
fn bench_heap_cycle(c: &mut Criterion) {
    let config = SandboxConfig::default();

    c.bench_function("heap_allocate_release", |b| {
        b.iter(|| {
            let mut heap = SandboxHeap::new(&config);
            let id = heap.allocate(5).unwrap();
            black_box(heap.release(id))
        })
    });
}

/// Benchmark a terminated copy in each overflow mode
fn bench_copy_modes(c: &mut Criterion) {
    let config = SandboxConfig::default();
    let mut group = c.benchmark_group("copy_terminated");

    for mode in [OverflowMode::Faithful, OverflowMode::Strict, OverflowMode::Grow] {
        group.bench_function(mode.to_string(), |b| {
            b.iter(|| {
                let mut buf = allocate_buffer(mode, 5, &config).unwrap();
                black_box(buf.copy_terminated(black_box(b"hi")).unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_format_dump, bench_heap_cycle, bench_copy_modes);
criterion_main!(benches);
