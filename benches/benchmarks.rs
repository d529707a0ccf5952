//! Criterion benchmarks for pagevault's core operations.
//!
//! Benchmarks cover:
//! - The codec pipeline's encode/decode round trip, with and without
//!   compression/encryption
//! - The hole manager's best-fit search under load
//! - A full page-store write/flush/read cycle over an in-memory file

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use pagevault::config::{Config, HoleConfig};
use pagevault::file_io::MemFile;
use pagevault::holes::HoleManager;
use pagevault::pipeline::Pipeline;
use pagevault::store::PageStore;

fn bench_pipeline_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_roundtrip");

    let page = vec![0x5Au8; 16384];

    for (label, config) in [
        ("plain", Config::default()),
        ("zlib", Config::default().with_compression("zlib")),
        ("lz4", Config::default().with_compression("lz4")),
        (
            "lz4+aes256",
            Config::default()
                .with_compression("lz4")
                .with_encryption("aes256-cbc", vec![0x11u8; 32]),
        ),
    ] {
        let pipeline = Pipeline::from_config(&config).unwrap();
        group.throughput(Throughput::Bytes(page.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", label), &page, |b, page| {
            b.iter(|| pipeline.encode(black_box(page)).unwrap());
        });

        let encoded = pipeline.encode(&page).unwrap();
        let entry = pagevault::container::PageEntry {
            offset: 0,
            stored_size: encoded.bytes.len() as u32,
            original_size: encoded.original_size,
            checksum: encoded.checksum,
            compressed: encoded.compressed,
            encrypted: encoded.encrypted,
            is_hole: false,
        };
        group.bench_with_input(BenchmarkId::new("decode", label), &encoded.bytes, |b, bytes| {
            b.iter(|| pipeline.decode(black_box(0), &entry, bytes).unwrap());
        });
    }

    group.finish();
}

fn bench_hole_best_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("hole_best_fit");

    for hole_count in [16usize, 256, 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(hole_count),
            &hole_count,
            |b, &hole_count| {
                b.iter_batched(
                    || {
                        let mut manager = HoleManager::new(HoleConfig {
                            enabled: true,
                            max_holes: hole_count + 1,
                            min_hole_size: 16,
                        });
                        for i in 0..hole_count {
                            manager.add_hole((i * 4096) as u64, 128 + (i % 64) as u32);
                        }
                        manager
                    },
                    |mut manager| manager.take_best_fit(black_box(100)),
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

fn bench_store_write_flush_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_write_flush_read");
    let page = vec![0x7Bu8; 4096];

    group.bench_function("write_100_pages_then_flush", |b| {
        b.iter_batched(
            || PageStore::create(Box::new(MemFile::new()), Config::default()).unwrap(),
            |mut store| {
                for i in 0..100u64 {
                    store.write_page(i, black_box(&page)).unwrap();
                }
                store.flush().unwrap();
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.bench_function("read_after_flush", |b| {
        b.iter_batched(
            || {
                let mut store =
                    PageStore::create(Box::new(MemFile::new()), Config::default()).unwrap();
                for i in 0..100u64 {
                    store.write_page(i, &page).unwrap();
                }
                store.flush().unwrap();
                store
            },
            |mut store| {
                for i in 0..100u64 {
                    black_box(store.read_page(i).unwrap());
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_pipeline_roundtrip,
    bench_hole_best_fit,
    bench_store_write_flush_read
);
criterion_main!(benches);
