//! Page index: the fixed-position, fixed-stride array of per-page
//! descriptors (§3.1 region 2, §6.1 entry layout, C3 `load_index` /
//! `save_index` / `grow_index`).

use byteorder::{ByteOrder, NativeEndian};

use crate::checksum::crc32;
use crate::file_io::UnderlyingFile;
use crate::PageStoreError;

/// Per-entry on-disk size in bytes.
pub const ENTRY_SIZE: usize = 32;

const OFF_OFFSET: usize = 0;
const OFF_STORED_SIZE: usize = 8;
const OFF_ORIGINAL_SIZE: usize = 12;
const OFF_CHECKSUM: usize = 16;
const OFF_FLAGS: usize = 20;
// bytes [24, 32) reserved.

/// One page's descriptor: where its stored bytes live and how to
/// interpret them. `offset == 0 && stored_size == 0` means "never
/// allocated" (a page beyond `logical_size_pages` but within
/// `total_pages`'s backing array is never constructed that way; see
/// `PageIndex::get`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEntry {
    pub offset: u64,
    pub stored_size: u32,
    pub original_size: u32,
    pub checksum: u32,
    pub compressed: bool,
    pub encrypted: bool,
    pub is_hole: bool,
}

impl PageEntry {
    pub const EMPTY: PageEntry = PageEntry {
        offset: 0,
        stored_size: 0,
        original_size: 0,
        checksum: 0,
        compressed: false,
        encrypted: false,
        is_hole: false,
    };

    /// Whether this page has ever been written: either it has real
    /// backing bytes (`offset != 0`) or it was written as an all-zero
    /// page and recorded as sparse (§3.2: "offset 0 ⇒ sparse").
    pub fn is_allocated(&self) -> bool {
        self.offset != 0 || self.is_hole
    }

    fn to_bytes(self, out: &mut [u8]) {
        let mut flags = 0u32;
        if self.compressed {
            flags |= 1 << 0;
        }
        if self.encrypted {
            flags |= 1 << 1;
        }
        if self.is_hole {
            flags |= 1 << 2;
        }
        NativeEndian::write_u64(&mut out[OFF_OFFSET..], self.offset);
        NativeEndian::write_u32(&mut out[OFF_STORED_SIZE..], self.stored_size);
        NativeEndian::write_u32(&mut out[OFF_ORIGINAL_SIZE..], self.original_size);
        NativeEndian::write_u32(&mut out[OFF_CHECKSUM..], self.checksum);
        NativeEndian::write_u32(&mut out[OFF_FLAGS..], flags);
    }

    fn from_bytes(buf: &[u8]) -> Self {
        let flags = NativeEndian::read_u32(&buf[OFF_FLAGS..]);
        PageEntry {
            offset: NativeEndian::read_u64(&buf[OFF_OFFSET..]),
            stored_size: NativeEndian::read_u32(&buf[OFF_STORED_SIZE..]),
            original_size: NativeEndian::read_u32(&buf[OFF_ORIGINAL_SIZE..]),
            checksum: NativeEndian::read_u32(&buf[OFF_CHECKSUM..]),
            compressed: flags & (1 << 0) != 0,
            encrypted: flags & (1 << 1) != 0,
            is_hole: flags & (1 << 2) != 0,
        }
    }
}

/// The in-memory page index: a `Vec` standing in for the source's
/// intrusive array, matching the "owned `Vec` over intrusive linked
/// structures" idiom used throughout this crate.
#[derive(Debug, Clone)]
pub struct PageIndex {
    entries: Vec<PageEntry>,
    offset: u64,
    reserved_capacity: u32,
}

impl PageIndex {
    pub fn new(offset: u64, reserved_capacity: u32) -> Self {
        PageIndex {
            entries: Vec::new(),
            offset,
            reserved_capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, page: u64) -> Option<PageEntry> {
        self.entries.get(page as usize).copied()
    }

    pub fn set(&mut self, page: u64, entry: PageEntry) {
        let idx = page as usize;
        if idx >= self.entries.len() {
            self.grow_to(idx + 1);
        }
        self.entries[idx] = entry;
    }

    /// `grow_index`: extend the in-memory array to hold at least
    /// `new_count` entries. Always succeeds — the reserved on-disk
    /// capacity is enforced at `save` time, not here, so a write that
    /// briefly outgrows the index region can still be read back and
    /// synced until the next `save` actually refuses it (§4.1).
    ///
    /// `Vec::resize` already amortizes growth, but its doubling is keyed
    /// to element count, not the page-index's own capacity; matching the
    /// source's explicit `max(new_count + 16, capacity + capacity / 2)`
    /// keeps the reallocation cadence identical regardless of `Vec`'s
    /// internal growth factor.
    pub fn grow_to(&mut self, new_count: usize) {
        if new_count <= self.entries.len() {
            return;
        }
        let current_cap = self.entries.capacity();
        let target_cap = (new_count + 16).max(current_cap + current_cap / 2);
        if target_cap > current_cap {
            self.entries.reserve(target_cap - current_cap);
        }
        self.entries.resize(new_count, PageEntry::EMPTY);
    }

    pub fn reserved_capacity(&self) -> u32 {
        self.reserved_capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &PageEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i as u64, e))
    }

    /// `load_index`: read `total_pages` entries starting at `offset`.
    pub fn load(
        file: &mut dyn UnderlyingFile,
        offset: u64,
        total_pages: u32,
        reserved_capacity: u32,
    ) -> Result<Self, PageStoreError> {
        let mut entries = Vec::with_capacity(total_pages as usize);
        if total_pages > 0 {
            let mut buf = vec![0u8; total_pages as usize * ENTRY_SIZE];
            let n = file.read(&mut buf, offset)?;
            if n != buf.len() {
                return Err(PageStoreError::CorruptHeader(
                    "page index truncated".to_string(),
                ));
            }
            for chunk in buf.chunks_exact(ENTRY_SIZE) {
                entries.push(PageEntry::from_bytes(chunk));
            }
        }
        Ok(PageIndex {
            entries,
            offset,
            reserved_capacity,
        })
    }

    /// `save_index`: write every entry back out in one contiguous
    /// region-sized write, matching the batch writer's "one write beats
    /// many small writes" idiom (C9). This is where the reserved on-disk
    /// capacity is actually enforced — `grow_index` never refuses, so a
    /// write that outgrew the index region can still live in memory (and
    /// even be read back) until a `save` finds it doesn't fit.
    pub fn save(&self, file: &mut dyn UnderlyingFile) -> Result<(), PageStoreError> {
        if self.entries.len() as u64 > self.reserved_capacity as u64 {
            return Err(PageStoreError::OutOfSpaceInIndex(format!(
                "index holds {} entries, reserved capacity is {}",
                self.entries.len(),
                self.reserved_capacity
            )));
        }
        if self.entries.is_empty() {
            return Ok(());
        }
        let mut buf = vec![0u8; self.entries.len() * ENTRY_SIZE];
        for (i, entry) in self.entries.iter().enumerate() {
            entry.to_bytes(&mut buf[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE]);
        }
        file.write(&buf, self.offset)?;
        Ok(())
    }

    /// CRC over the serialized index, used only for in-process sanity
    /// checks (the on-disk layout has no per-entry checksum field — see
    /// the Open Questions decision to keep the 32-byte entry bit-exact).
    pub fn content_crc(&self) -> u32 {
        let mut buf = vec![0u8; self.entries.len() * ENTRY_SIZE];
        for (i, entry) in self.entries.iter().enumerate() {
            entry.to_bytes(&mut buf[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE]);
        }
        crc32(&buf)
    }
}
