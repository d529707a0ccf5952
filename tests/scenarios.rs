//! End-to-end scenarios from the design's testable-properties section,
//! driven entirely through the public `PageStore`/`Config` API plus the
//! lower-level `holes`/`batch` modules where a scenario is about their
//! standalone behavior rather than the whole store.

use std::collections::HashMap;

use pagevault::allocator::Allocator;
use pagevault::batch::BatchWriter;
use pagevault::config::{BatchConfig, Config, HoleConfig};
use pagevault::container::PageEntry;
use pagevault::file_io::{MemFile, StdFile};
use pagevault::holes::HoleManager;
use pagevault::pipeline::Pipeline;
use pagevault::store::PageStore;

fn store(config: Config) -> PageStore {
    PageStore::create(Box::new(MemFile::new()), config).unwrap()
}

/// S1: round-trip with no codecs configured.
#[test]
fn s1_round_trip_with_no_codecs() {
    let mut store = store(Config::default().with_page_size(4096));
    store.write_page(0, &vec![0x41u8; 4096]).unwrap();
    store.flush().unwrap();

    let read_back = store.read_range(0, 4096).unwrap();
    assert_eq!(read_back, vec![0x41u8; 4096]);
}

/// S2: an all-zero page is recorded sparse, never touches the data
/// region, and reads back as zeros; the logical size still grows to
/// cover it even though no bytes were written for it.
#[test]
fn s2_sparse_detection() {
    let mut store = store(Config::default().with_page_size(4096));
    store.write_page(3, &vec![0u8; 4096]).unwrap();
    store.flush().unwrap();

    assert_eq!(store.logical_size_pages(), 4);
    assert_eq!(store.read_page(3).unwrap(), vec![0u8; 4096]);
}

/// S3: a page's extent is reused in place when the new content still
/// fits, and relocated (freeing the old extent as a hole) when it no
/// longer does.
#[test]
fn s3_in_place_reuse_vs_relocation() {
    let mut store = store(Config::default().with_compression("zlib"));

    // Incompressible content forces a real, sizeable extent.
    let big: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    store.write_page(5, &big).unwrap();
    store.flush().unwrap();
    let first = store.stats();
    assert!(first.allocated_pages >= 1);

    // A smaller, still-incompressible rewrite should reuse the same
    // offset rather than relocate.
    let smaller: Vec<u8> = (0..=127u8).cycle().take(4096).collect();
    store.write_page(5, &smaller).unwrap();
    store.flush().unwrap();

    // Compressible-but-not-all-zero content that needs more room than the
    // original extent (after it already shrank) forces relocation and a
    // hole over the old extent.
    let relocatable: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    store.write_page(5, &relocatable).unwrap();
    store.flush().unwrap();

    assert_eq!(store.read_page(5).unwrap(), relocatable);
}

/// S4: best-fit allocation picks the smallest hole that still fits,
/// and shrinks it to the remainder (dropping it if below min_hole_size).
#[test]
fn s4_best_fit_allocation() {
    let mut holes = HoleManager::new(HoleConfig {
        enabled: true,
        max_holes: 16,
        min_hole_size: 64,
    });
    holes.add_hole(1_000, 256);
    holes.add_hole(2_000, 1024);
    holes.add_hole(3_000, 2048);

    let picked = holes.take_best_fit(900).unwrap();
    assert_eq!(picked.offset, 2_000);

    // 1024 - 900 = 124, which is >= min_hole_size (64), so it should
    // remain in the list as the new smallest entry.
    assert!(holes
        .holes()
        .iter()
        .any(|h| h.offset == 2_000 + 900 && h.size == 124));
}

/// S4, continued: when the remainder would fall below min_hole_size it
/// is discarded rather than kept as an unusable sliver.
#[test]
fn s4_best_fit_remainder_below_min_size_is_discarded() {
    let mut holes = HoleManager::new(HoleConfig {
        enabled: true,
        max_holes: 16,
        min_hole_size: 200,
    });
    holes.add_hole(2_000, 1024);

    let picked = holes.take_best_fit(900).unwrap();
    assert_eq!(picked.offset, 2_000);
    assert!(holes.is_empty());
}

/// S5: staging three pages with processed sizes 500, 700, 300 and
/// flushing through the batch writer produces exactly one contiguous
/// physical write, with each page's offset the running sum of the
/// sizes staged ahead of it.
#[test]
fn s5_batch_flush_is_one_contiguous_write() {
    let mut writer = BatchWriter::new(BatchConfig {
        enabled: true,
        max_pages: 512,
        max_memory_bytes: 32 * 1024 * 1024,
        auto_flush_threshold: 256,
    });
    let pipeline = Pipeline::from_config(&Config::default()).unwrap();

    // Incompressible, non-all-zero content so each page's processed size
    // matches its plaintext size exactly.
    let page_bytes = |tag: u8, len: usize| -> Vec<u8> {
        (0..len).map(|i| tag.wrapping_add(i as u8).wrapping_add(1)).collect()
    };
    writer
        .stage(&pipeline, 10, page_bytes(1, 500), None)
        .unwrap();
    writer
        .stage(&pipeline, 11, page_bytes(2, 700), None)
        .unwrap();
    writer
        .stage(&pipeline, 12, page_bytes(3, 300), None)
        .unwrap();

    let mut file = MemFile::new();
    let mut allocator = Allocator::new(HoleManager::new(HoleConfig::default()));
    let (outcome, region) = writer.flush(&mut file, &mut allocator, 0).unwrap();

    assert_eq!(outcome.write_calls, 1);
    assert_eq!(outcome.bytes_written, 1500);
    let region = region.unwrap();
    assert_eq!(region.offset, 0);
    assert_eq!(region.size, 1500);

    let by_page: HashMap<u64, PageEntry> = outcome.entries.into_iter().collect();
    assert_eq!(by_page[&10].offset, region.offset);
    assert_eq!(by_page[&11].offset, region.offset + 500);
    assert_eq!(by_page[&12].offset, region.offset + 1200);
    for (page, expected_crc) in [
        (10u64, crc_of(&page_bytes(1, 500))),
        (11u64, crc_of(&page_bytes(2, 700))),
        (12u64, crc_of(&page_bytes(3, 300))),
    ] {
        assert_eq!(by_page[&page].checksum, expected_crc);
    }
}

fn crc_of(bytes: &[u8]) -> u32 {
    pagevault::checksum::crc32(bytes)
}

/// S6: two writes to the same page before auto-flush count as a merge,
/// the buffer still holds exactly one entry, and a read sees the latest
/// write.
#[test]
fn s6_buffer_merge_before_flush() {
    let mut store = store(Config::default());
    store.write_page(7, &vec![b'A'; 4096]).unwrap();
    store.write_page(7, &vec![b'B'; 4096]).unwrap();

    assert_eq!(store.buffer_entry_count(), 1);
    assert!(store.buffer_merge_count() >= 1);
    assert_eq!(store.read_page(7).unwrap(), vec![b'B'; 4096]);
}

/// Invariant 6: flush (and close), then a fresh handle reopened from
/// the same on-disk container reads back what was last written.
#[test]
fn invariant_flush_then_reopen_preserves_last_write() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let path = tmp.path().to_path_buf();
    drop(tmp);

    let file = StdFile::open_read_write(&path).unwrap();
    let mut store = PageStore::create(Box::new(file), Config::default()).unwrap();
    store.write_page(0, &vec![9u8; 4096]).unwrap();
    store.write_page(1, &vec![0u8; 4096]).unwrap();
    store.close().unwrap();

    let reopened_file = StdFile::open_read_write(&path).unwrap();
    let mut reopened = PageStore::open(Box::new(reopened_file), Config::default()).unwrap();
    assert_eq!(reopened.read_page(0).unwrap(), vec![9u8; 4096]);
    assert_eq!(reopened.read_page(1).unwrap(), vec![0u8; 4096]);

    let _ = std::fs::remove_file(&path);
}

/// Invariant 8: the container's logical size never decreases across a
/// sequence of writes and syncs, only shrinking on an explicit truncate.
#[test]
fn invariant_logical_size_never_shrinks_without_truncate() {
    let mut store = store(Config::default());
    let mut last = 0u64;
    for page in [0u64, 4, 2, 9, 1] {
        store.write_page(page, &vec![page as u8; 4096]).unwrap();
        store.sync().unwrap();
        let size = store.logical_size_pages();
        assert!(size >= last);
        last = size;
    }
    assert_eq!(store.logical_size_pages(), 10);

    store.truncate(3).unwrap();
    assert_eq!(store.logical_size_pages(), 3);
}
