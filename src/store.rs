//! The page store (C7): ties the container format, codec pipeline,
//! allocator, write-behind buffer and batch writer together behind a
//! byte-range read/write API, matching the teacher's `Tablespace` as the
//! single entry point a caller actually holds onto
//! (`innodb::tablespace::Tablespace::open` / `read_page`), generalized
//! from a read-only forensic view to a full read/write store.
//!
//! Single-threaded and cooperative: nothing here takes a lock across an
//! `&mut self` call, matching the "no internal parallelism" model this
//! store was designed for.

use std::sync::Arc;

use crate::allocator::{Allocation, Allocator};
use crate::batch::BatchWriter;
use crate::buffer::WriteBuffer;
use crate::config::{Config, StrictChecksumMode};
use crate::container::{Container, PageEntry};
use crate::event_log::{Event, EventLog};
use crate::file_io::UnderlyingFile;
use crate::holes::HoleManager;
use crate::pipeline::Pipeline;
use crate::stats::Stats;
use crate::PageStoreError;

/// An open page store. Owns the underlying file handle and every piece
/// of in-memory state needed to serve reads and writes against it.
pub struct PageStore {
    file: Box<dyn UnderlyingFile>,
    container: Container,
    pipeline: Pipeline,
    allocator: Allocator,
    buffer: WriteBuffer,
    batch: BatchWriter,
    page_size: u32,
    strict_checksum_mode: StrictChecksumMode,
    event_log: Option<Arc<EventLog>>,
}

impl PageStore {
    /// Initialize a brand-new, empty container in `file`.
    pub fn create(mut file: Box<dyn UnderlyingFile>, config: Config) -> Result<Self, PageStoreError> {
        config.validate()?;
        let pipeline = Pipeline::from_config(&config)?;
        let mut container = Container::create(
            config.page_size,
            pipeline.compress_name(),
            pipeline.encrypt_name(),
            config.encryption_key.as_deref(),
        );
        container.save(&mut *file)?;

        let mut store = PageStore {
            file,
            container,
            pipeline,
            allocator: Allocator::new(HoleManager::new(config.holes)),
            buffer: WriteBuffer::new(config.buffer),
            batch: BatchWriter::new(config.batch),
            page_size: config.page_size,
            strict_checksum_mode: config.strict_checksum_mode,
            event_log: None,
        };
        store.log(Event::SessionStart {
            page_size: store.page_size,
        });
        Ok(store)
    }

    /// Open an existing container in `file`. The page size, compression
    /// and encryption algorithms already recorded in the header take
    /// precedence over `config`'s — a container's codec choices are
    /// fixed at creation time, not re-negotiated on every open.
    pub fn open(mut file: Box<dyn UnderlyingFile>, mut config: Config) -> Result<Self, PageStoreError> {
        let container = Container::open(&mut *file)?;
        config.page_size = container.header.page_size;
        if !container.header.compress_name.is_empty() {
            config.compress_algorithm = Some(container.header.compress_name.clone());
        }
        if !container.header.encrypt_name.is_empty() {
            config.encrypt_algorithm = Some(container.header.encrypt_name.clone());
        }
        config.validate()?;
        let pipeline = Pipeline::from_config(&config)?;

        let mut store = PageStore {
            file,
            container,
            pipeline,
            allocator: Allocator::new(HoleManager::new(config.holes)),
            buffer: WriteBuffer::new(config.buffer),
            batch: BatchWriter::new(config.batch),
            page_size: config.page_size,
            strict_checksum_mode: config.strict_checksum_mode,
            event_log: None,
        };
        store.log(Event::SessionStart {
            page_size: store.page_size,
        });
        Ok(store)
    }

    /// Attach an event log; all subsequent activity on this handle is
    /// recorded to it. Optional, and `None` by default — see
    /// [`crate::event_log`].
    pub fn with_event_log(mut self, log: Arc<EventLog>) -> Self {
        self.event_log = Some(log);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn logical_size_pages(&self) -> u64 {
        self.container.header.logical_size_pages
    }

    fn log(&self, event: Event) {
        if let Some(log) = &self.event_log {
            let _ = log.record(event);
        }
    }

    /// Read one full page, honoring any staged-but-unflushed write.
    pub fn read_page(&mut self, page: u64) -> Result<Vec<u8>, PageStoreError> {
        let staged = if self.batch.is_enabled() {
            self.batch.serve_read(page)
        } else {
            self.buffer.get(page)
        };
        if let Some(staged) = staged {
            return Ok(staged.to_vec());
        }

        let entry = match self.container.index.get(page) {
            Some(e) if e.is_allocated() => e,
            _ => return Ok(vec![0u8; self.page_size as usize]),
        };

        if entry.is_hole {
            return Ok(vec![0u8; self.page_size as usize]);
        }

        let mut stored = vec![0u8; entry.stored_size as usize];
        let n = self.file.read(&mut stored, entry.offset)?;
        if n != stored.len() {
            return Err(PageStoreError::CorruptPage {
                page,
                reason: format!("short read: expected {} bytes, got {}", stored.len(), n),
            });
        }

        match self.pipeline.decode(page, &entry, &stored) {
            Ok(bytes) => Ok(bytes),
            Err(err @ PageStoreError::CorruptPage { .. }) => {
                self.log(Event::ChecksumMismatch {
                    page,
                    reason: err.to_string(),
                });
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Stage a full page write. Written through to disk on the next
    /// flush (explicit, or automatic once the active write path's bounds
    /// are hit). Delegates to the write-behind buffer (C8), or bypasses
    /// it for the batch writer (C9) when batching is configured — the
    /// two paths are mutually exclusive, not layered.
    pub fn write_page(&mut self, page: u64, data: &[u8]) -> Result<(), PageStoreError> {
        if data.len() != self.page_size as usize {
            return Err(PageStoreError::Argument(format!(
                "page write must be exactly {} bytes, got {}",
                self.page_size,
                data.len()
            )));
        }

        let needs_flush = if self.batch.is_enabled() {
            let old_entry = self.container.index.get(page);
            self.batch.stage(&self.pipeline, page, data.to_vec(), old_entry)?;
            self.batch.needs_flush()
        } else {
            self.buffer.stage(page, data.to_vec());
            self.buffer.needs_flush()
        };

        if page + 1 > self.container.header.logical_size_pages {
            self.container.header.logical_size_pages = page + 1;
            self.container.header.mark_dirty();
        }

        if needs_flush {
            self.flush()?;
        }
        Ok(())
    }

    /// Read `len` bytes starting at byte `offset`, translating across
    /// page boundaries as needed.
    pub fn read_range(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, PageStoreError> {
        let page_size = self.page_size as u64;
        let mut out = Vec::with_capacity(len);
        let mut remaining = len;
        let mut cursor = offset;

        while remaining > 0 {
            let page = cursor / page_size;
            let in_page_offset = (cursor % page_size) as usize;
            let page_bytes = self.read_page(page)?;
            let take = remaining.min(page_bytes.len() - in_page_offset);
            out.extend_from_slice(&page_bytes[in_page_offset..in_page_offset + take]);
            cursor += take as u64;
            remaining -= take;
        }
        Ok(out)
    }

    /// Write `data` starting at byte `offset`, read-modify-writing any
    /// partially covered page at the ends of the range.
    pub fn write_range(&mut self, offset: u64, data: &[u8]) -> Result<(), PageStoreError> {
        let page_size = self.page_size as usize;
        let page_size_u64 = page_size as u64;
        let mut cursor = offset;
        let mut src_offset = 0usize;

        while src_offset < data.len() {
            let page = cursor / page_size_u64;
            let in_page_offset = (cursor % page_size_u64) as usize;
            let take = (page_size - in_page_offset).min(data.len() - src_offset);

            let mut page_bytes = if in_page_offset == 0 && take == page_size {
                vec![0u8; page_size]
            } else {
                self.read_page(page)?
            };
            page_bytes[in_page_offset..in_page_offset + take]
                .copy_from_slice(&data[src_offset..src_offset + take]);
            self.write_page(page, &page_bytes)?;

            cursor += take as u64;
            src_offset += take;
        }
        Ok(())
    }

    /// Shrink the logical size, freeing every page at or beyond
    /// `new_logical_pages`.
    pub fn truncate(&mut self, new_logical_pages: u64) -> Result<(), PageStoreError> {
        let current = self.container.header.logical_size_pages;
        for page in new_logical_pages..current {
            if self.batch.is_enabled() {
                self.batch.discard(page);
            } else {
                self.buffer.discard(page);
            }
            if let Some(entry) = self.container.index.get(page) {
                if entry.is_allocated() {
                    self.allocator.free(entry);
                    self.container.header.adjust_page_bytes(
                        entry.original_size as u64,
                        entry.stored_size as u64,
                        0,
                        0,
                    );
                    self.container.index.set(page, PageEntry::EMPTY);
                    self.log(Event::PageFreed {
                        page,
                        offset: entry.offset,
                        size: entry.stored_size,
                    });
                }
            }
        }
        self.container.header.logical_size_pages = new_logical_pages;
        self.container.header.mark_dirty();
        Ok(())
    }

    /// Encode and place every staged write, persist the index and
    /// header, and issue the disk writes. Delegates to whichever of the
    /// write-behind buffer (C8) or the batch writer (C9) is active.
    pub fn flush(&mut self) -> Result<(), PageStoreError> {
        if self.batch.is_enabled() {
            self.flush_batch()
        } else {
            self.flush_direct()
        }
    }

    /// C8 path: encode and place each staged page individually, one
    /// `write()` call per page.
    fn flush_direct(&mut self) -> Result<(), PageStoreError> {
        let staged = self.buffer.drain_sorted();
        if staged.is_empty() {
            if self.container.header.is_dirty() {
                self.container.save(&mut *self.file)?;
            }
            return Ok(());
        }

        let mut append_cursor = self.file.file_size()?;
        let mut pages = 0usize;
        let mut bytes = 0usize;

        for (page, plaintext) in staged {
            let encoded = self.pipeline.encode(&plaintext)?;
            let old_entry = self.container.index.get(page);
            let old_original = old_entry.map(|e| e.original_size as u64).unwrap_or(0);
            let old_stored = old_entry.map(|e| e.stored_size as u64).unwrap_or(0);

            if encoded.is_sparse {
                if let Some(old) = old_entry {
                    if old.offset != 0 {
                        self.log(Event::PageFreed {
                            page,
                            offset: old.offset,
                            size: old.stored_size,
                        });
                    }
                    self.allocator.free(old);
                }
                let entry = PageEntry {
                    offset: 0,
                    stored_size: 0,
                    original_size: encoded.original_size,
                    checksum: 0,
                    compressed: false,
                    encrypted: false,
                    is_hole: true,
                };
                self.container.header.adjust_page_bytes(
                    old_original,
                    old_stored,
                    entry.original_size as u64,
                    0,
                );
                self.container.index.set(page, entry);
                self.log(Event::PageAllocated {
                    page,
                    offset: 0,
                    stored_size: 0,
                });
                continue;
            }

            let placement = self
                .allocator
                .allocate(old_entry, encoded.bytes.len() as u32);
            let offset = match placement {
                Allocation::Offset(offset) => offset,
                Allocation::Append => {
                    let offset = append_cursor;
                    append_cursor += encoded.bytes.len() as u64;
                    offset
                }
            };

            self.file.write(&encoded.bytes, offset)?;
            pages += 1;
            bytes += encoded.bytes.len();

            let entry = PageEntry {
                offset,
                stored_size: encoded.bytes.len() as u32,
                original_size: encoded.original_size,
                checksum: encoded.checksum,
                compressed: encoded.compressed,
                encrypted: encoded.encrypted,
                is_hole: false,
            };
            self.container.header.adjust_page_bytes(
                old_original,
                old_stored,
                entry.original_size as u64,
                entry.stored_size as u64,
            );
            self.container.index.set(page, entry);
            self.log(Event::PageAllocated {
                page,
                offset,
                stored_size: entry.stored_size,
            });
        }

        self.container.save(&mut *self.file)?;
        self.log(Event::Flush {
            pages,
            write_calls: pages,
            bytes,
        });
        Ok(())
    }

    /// C9 path: commit every staged page as one contiguous write, then
    /// persist the index. If the write went down but the index (or
    /// header) fails to persist afterward, the in-memory index is
    /// reverted to what was on disk before this flush, the whole written
    /// region is handed back to the allocator as one hole, and the
    /// caller gets `WriteCommittedIndexStale` rather than a silently
    /// mismatched index (§4.7, §7).
    fn flush_batch(&mut self) -> Result<(), PageStoreError> {
        if self.batch.is_empty() {
            if self.container.header.is_dirty() {
                self.container.save(&mut *self.file)?;
            }
            return Ok(());
        }

        let append_cursor = self.file.file_size()?;
        let (outcome, committed) =
            self.batch
                .flush(&mut *self.file, &mut self.allocator, append_cursor)?;

        let previous: Vec<(u64, PageEntry)> = outcome
            .entries
            .iter()
            .map(|(page, _)| (*page, self.container.index.get(*page).unwrap_or(PageEntry::EMPTY)))
            .collect();

        let apply_outcome = (|| -> Result<(), PageStoreError> {
            for (page, entry) in &outcome.entries {
                let old = self.container.index.get(*page).unwrap_or(PageEntry::EMPTY);
                self.container.header.adjust_page_bytes(
                    old.original_size as u64,
                    old.stored_size as u64,
                    entry.original_size as u64,
                    entry.stored_size as u64,
                );
                self.container.index.set(*page, *entry);
            }
            self.container.save(&mut *self.file)
        })();

        match apply_outcome {
            Ok(()) => {
                for (page, entry) in &outcome.entries {
                    self.log(Event::PageAllocated {
                        page: *page,
                        offset: entry.offset,
                        stored_size: entry.stored_size,
                    });
                }
                self.log(Event::Flush {
                    pages: outcome.entries.len(),
                    write_calls: outcome.write_calls,
                    bytes: outcome.bytes_written,
                });
                Ok(())
            }
            Err(err) => {
                for (page, entry) in &outcome.entries {
                    let old = previous
                        .iter()
                        .find(|(p, _)| p == page)
                        .map(|(_, e)| *e)
                        .unwrap_or(PageEntry::EMPTY);
                    self.container.header.adjust_page_bytes(
                        entry.original_size as u64,
                        entry.stored_size as u64,
                        old.original_size as u64,
                        old.stored_size as u64,
                    );
                    self.container.index.set(*page, old);
                }

                match committed {
                    Some(region) => {
                        self.batch.rollback(&mut self.allocator, region);
                        let page = outcome.entries.first().map(|(p, _)| *p).unwrap_or(0);
                        self.log(Event::PageFreed {
                            page,
                            offset: region.offset,
                            size: region.size,
                        });
                        Err(PageStoreError::WriteCommittedIndexStale {
                            page,
                            reason: err.to_string(),
                        })
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Flush, then fsync the underlying file. Maintenance on the hole
    /// free list runs unconditionally here regardless of the T=50
    /// operations counter (§4.3): a sync is the point a caller actually
    /// wants the free list in its tightest, most merged state.
    pub fn sync(&mut self) -> Result<(), PageStoreError> {
        self.flush()?;
        self.allocator.holes_mut().maintenance();
        self.file.sync()?;
        Ok(())
    }

    pub fn stats(&self) -> Stats {
        Stats::compute(&self.container, self.allocator.holes())
    }

    /// Number of pages currently staged in the write-behind buffer,
    /// awaiting flush.
    pub fn buffer_entry_count(&self) -> usize {
        self.buffer.len()
    }

    /// How many times a staged write has replaced another staged write
    /// to the same page since this handle was opened (C8 "merges"
    /// statistic, §4.6).
    pub fn buffer_merge_count(&self) -> usize {
        self.buffer.merges()
    }

    pub fn strict_checksum_mode(&self) -> StrictChecksumMode {
        self.strict_checksum_mode
    }

    /// Tolerant-mode checksum mismatches observed on this handle (§7).
    pub fn checksum_mismatches(&self) -> u64 {
        self.pipeline.checksum_mismatches()
    }

    /// Of those mismatches, how many `enable_data_recovery` nonetheless
    /// turned into a correctly sized page (§6.5).
    pub fn recovered_pages(&self) -> u64 {
        self.pipeline.recoveries()
    }

    /// Flush, fsync, and record session end. Consumes the handle since
    /// nothing should touch the store after this.
    pub fn close(mut self) -> Result<(), PageStoreError> {
        self.sync()?;
        self.log(Event::SessionEnd);
        Ok(())
    }
}
