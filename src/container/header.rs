//! Container header: load, validate, persist (C3, §6.1).
//!
//! The on-disk layout is bit-exact and in host byte order (the Open
//! Questions in the design leave cross-architecture portability
//! unaddressed, so `byteorder::NativeEndian` is used throughout, matching
//! the teacher's choice not to force a wire-format endianness on data that
//! never leaves one machine).

use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::{ByteOrder, NativeEndian};
use sha2::{Digest, Sha256};

use crate::checksum::crc32;
use crate::file_io::UnderlyingFile;
use crate::PageStoreError;

/// 8-byte magic identifying a pagevault container.
pub const MAGIC: &[u8; 8] = b"PGVAULT\0";
/// Current on-disk major version. A mismatch here is `CorruptHeader`.
pub const MAJOR_VERSION: u16 = 1;
/// Highest minor version this implementation understands.
pub const MAX_MINOR_VERSION: u16 = 0;

/// Fixed header size in bytes. 124 bytes of real fields, padded to a round
/// number so future minor-version fields fit without relocating the index.
pub const HEADER_SIZE: u64 = 256;

const NAME_FIELD_LEN: usize = 16;

const OFF_MAGIC: usize = 0;
const OFF_MAJOR: usize = 8;
const OFF_MINOR: usize = 10;
const OFF_HEADER_SIZE: usize = 12;
const OFF_ENGINE_PAGE_SIZE: usize = 16;
const OFF_ENGINE_VERSION: usize = 20;
const OFF_LOGICAL_SIZE_PAGES: usize = 24;
const OFF_COMPRESS_NAME: usize = 32;
const OFF_ENCRYPT_NAME: usize = 48;
const OFF_PAGE_SIZE: usize = 64;
const OFF_TOTAL_PAGES: usize = 68;
const OFF_INDEX_OFFSET: usize = 72;
const OFF_ORIGINAL_TOTAL_BYTES: usize = 80;
const OFF_STORED_TOTAL_BYTES: usize = 88;
const OFF_COMPRESSION_RATIO_PERCENT: usize = 96;
const OFF_CREATION_FLAGS: usize = 100;
const OFF_MASTER_KEY_HASH: usize = 104;
const OFF_CREATION_TIMESTAMP: usize = 112;
// bytes [120, HEADER_SIZE - 4) are reserved padding.
const OFF_CRC: usize = HEADER_SIZE as usize - 4;

/// Reserved page-index capacity, in entries, allocated at container
/// creation. Exceeding it on `grow_index` surfaces `OutOfSpaceInIndex`
/// rather than relocating the data region — a compile-time constant in
/// the source this was distilled from, carried forward unchanged here.
pub const DEFAULT_RESERVED_INDEX_ENTRIES: u32 = 1024;

/// The container header (§3.1 region 1, §6.1 byte-exact layout).
#[derive(Debug, Clone)]
pub struct Header {
    pub major: u16,
    pub minor: u16,
    pub compatible_engine_page_size: u32,
    pub engine_version: u32,
    pub logical_size_pages: u64,
    pub compress_name: String,
    pub encrypt_name: String,
    pub page_size: u32,
    pub total_pages: u32,
    pub index_offset: u64,
    pub original_total_bytes: u64,
    pub stored_total_bytes: u64,
    pub creation_flags: u32,
    pub master_key_hash: u64,
    pub creation_timestamp: u64,
    dirty: bool,
}

impl Header {
    /// Build a fresh header for a new container (`init_header`).
    pub fn init(page_size: u32, compress_name: &str, encrypt_name: &str, key: Option<&[u8]>) -> Self {
        Header {
            major: MAJOR_VERSION,
            minor: MAX_MINOR_VERSION,
            compatible_engine_page_size: page_size,
            engine_version: 1,
            logical_size_pages: 0,
            compress_name: truncate_name(compress_name),
            encrypt_name: truncate_name(encrypt_name),
            page_size,
            total_pages: 0,
            index_offset: HEADER_SIZE,
            original_total_bytes: 0,
            stored_total_bytes: 0,
            creation_flags: 0,
            master_key_hash: key.map(master_key_hash).unwrap_or(0),
            creation_timestamp: now_unix(),
            dirty: true,
        }
    }

    /// `load_header`: read and validate the header from offset 0.
    pub fn load(file: &mut dyn UnderlyingFile) -> Result<Self, PageStoreError> {
        let size = file.file_size()?;
        if size < HEADER_SIZE {
            return Err(PageStoreError::NotContainer);
        }

        let mut buf = vec![0u8; HEADER_SIZE as usize];
        let n = file.read(&mut buf, 0)?;
        if (n as u64) < HEADER_SIZE {
            return Err(PageStoreError::NotContainer);
        }

        if &buf[OFF_MAGIC..OFF_MAGIC + 8] != MAGIC {
            return Err(PageStoreError::NotContainer);
        }

        let major = NativeEndian::read_u16(&buf[OFF_MAJOR..]);
        let minor = NativeEndian::read_u16(&buf[OFF_MINOR..]);
        if major != MAJOR_VERSION {
            return Err(PageStoreError::CorruptHeader(format!(
                "unsupported major version {}",
                major
            )));
        }
        if minor > MAX_MINOR_VERSION {
            return Err(PageStoreError::CorruptHeader(format!(
                "unsupported minor version {}",
                minor
            )));
        }

        let stored_crc = NativeEndian::read_u32(&buf[OFF_CRC..]);
        let computed_crc = crc32(&buf[..OFF_CRC]);
        if stored_crc != computed_crc {
            return Err(PageStoreError::CorruptHeader(
                "header checksum mismatch".to_string(),
            ));
        }

        Ok(Header {
            major,
            minor,
            compatible_engine_page_size: NativeEndian::read_u32(&buf[OFF_ENGINE_PAGE_SIZE..]),
            engine_version: NativeEndian::read_u32(&buf[OFF_ENGINE_VERSION..]),
            logical_size_pages: NativeEndian::read_u64(&buf[OFF_LOGICAL_SIZE_PAGES..]),
            compress_name: read_name(&buf[OFF_COMPRESS_NAME..OFF_COMPRESS_NAME + NAME_FIELD_LEN]),
            encrypt_name: read_name(&buf[OFF_ENCRYPT_NAME..OFF_ENCRYPT_NAME + NAME_FIELD_LEN]),
            page_size: NativeEndian::read_u32(&buf[OFF_PAGE_SIZE..]),
            total_pages: NativeEndian::read_u32(&buf[OFF_TOTAL_PAGES..]),
            index_offset: NativeEndian::read_u64(&buf[OFF_INDEX_OFFSET..]),
            original_total_bytes: NativeEndian::read_u64(&buf[OFF_ORIGINAL_TOTAL_BYTES..]),
            stored_total_bytes: NativeEndian::read_u64(&buf[OFF_STORED_TOTAL_BYTES..]),
            creation_flags: NativeEndian::read_u32(&buf[OFF_CREATION_FLAGS..]),
            master_key_hash: NativeEndian::read_u64(&buf[OFF_MASTER_KEY_HASH..]),
            creation_timestamp: NativeEndian::read_u64(&buf[OFF_CREATION_TIMESTAMP..]),
            dirty: false,
        })
    }

    /// `save_index`'s header counterpart: persist the header, computing
    /// and storing its CRC. Always writes (the header is small and cheap);
    /// callers that want to skip unnecessary I/O can check `is_dirty`.
    pub fn save(&mut self, file: &mut dyn UnderlyingFile) -> Result<(), PageStoreError> {
        let mut buf = vec![0u8; HEADER_SIZE as usize];
        buf[OFF_MAGIC..OFF_MAGIC + 8].copy_from_slice(MAGIC);
        NativeEndian::write_u16(&mut buf[OFF_MAJOR..], self.major);
        NativeEndian::write_u16(&mut buf[OFF_MINOR..], self.minor);
        NativeEndian::write_u32(&mut buf[OFF_HEADER_SIZE..], HEADER_SIZE as u32);
        NativeEndian::write_u32(
            &mut buf[OFF_ENGINE_PAGE_SIZE..],
            self.compatible_engine_page_size,
        );
        NativeEndian::write_u32(&mut buf[OFF_ENGINE_VERSION..], self.engine_version);
        NativeEndian::write_u64(&mut buf[OFF_LOGICAL_SIZE_PAGES..], self.logical_size_pages);
        write_name(
            &mut buf[OFF_COMPRESS_NAME..OFF_COMPRESS_NAME + NAME_FIELD_LEN],
            &self.compress_name,
        );
        write_name(
            &mut buf[OFF_ENCRYPT_NAME..OFF_ENCRYPT_NAME + NAME_FIELD_LEN],
            &self.encrypt_name,
        );
        NativeEndian::write_u32(&mut buf[OFF_PAGE_SIZE..], self.page_size);
        NativeEndian::write_u32(&mut buf[OFF_TOTAL_PAGES..], self.total_pages);
        NativeEndian::write_u64(&mut buf[OFF_INDEX_OFFSET..], self.index_offset);
        NativeEndian::write_u64(
            &mut buf[OFF_ORIGINAL_TOTAL_BYTES..],
            self.original_total_bytes,
        );
        NativeEndian::write_u64(&mut buf[OFF_STORED_TOTAL_BYTES..], self.stored_total_bytes);
        NativeEndian::write_u32(
            &mut buf[OFF_COMPRESSION_RATIO_PERCENT..],
            self.compression_ratio_percent(),
        );
        NativeEndian::write_u32(&mut buf[OFF_CREATION_FLAGS..], self.creation_flags);
        NativeEndian::write_u64(&mut buf[OFF_MASTER_KEY_HASH..], self.master_key_hash);
        NativeEndian::write_u64(&mut buf[OFF_CREATION_TIMESTAMP..], self.creation_timestamp);

        let crc = crc32(&buf[..OFF_CRC]);
        NativeEndian::write_u32(&mut buf[OFF_CRC..], crc);

        file.write(&buf, 0)?;
        self.dirty = false;
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn reserved_index_entries(&self) -> u32 {
        DEFAULT_RESERVED_INDEX_ENTRIES
    }

    /// Start of the data region, D = I + reserved-index-size. Never
    /// persisted directly; always derived from `index_offset` and the
    /// reserved index capacity so the index can grow in place.
    pub fn data_region_offset(&self) -> u64 {
        self.index_offset + (self.reserved_index_entries() as u64) * super::index::ENTRY_SIZE as u64
    }

    pub fn compression_ratio_percent(&self) -> u32 {
        if self.original_total_bytes == 0 {
            return 100;
        }
        ((self.stored_total_bytes * 100) / self.original_total_bytes) as u32
    }

    /// Record a page's contribution to the container-wide byte totals for
    /// a page with no prior entry (`old_original`/`old_stored` both 0).
    pub fn record_page_bytes(&mut self, original: u64, stored: u64) {
        self.adjust_page_bytes(0, 0, original, stored);
    }

    /// Replace one page's contribution to the container-wide byte totals:
    /// subtract what it used to account for, add what it accounts for now.
    /// Using this instead of accumulating blindly keeps
    /// `original_total_bytes`/`stored_total_bytes` a live total across
    /// currently-indexed pages rather than a lifetime sum that would grow
    /// without bound across repeated overwrites of the same page.
    pub fn adjust_page_bytes(
        &mut self,
        old_original: u64,
        old_stored: u64,
        new_original: u64,
        new_stored: u64,
    ) {
        self.original_total_bytes = self.original_total_bytes - old_original + new_original;
        self.stored_total_bytes = self.stored_total_bytes - old_stored + new_stored;
        self.dirty = true;
    }
}

fn truncate_name(name: &str) -> String {
    name.chars().take(NAME_FIELD_LEN - 1).collect()
}

fn read_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn write_name(dst: &mut [u8], name: &str) {
    for b in dst.iter_mut() {
        *b = 0;
    }
    let bytes = name.as_bytes();
    let n = bytes.len().min(dst.len() - 1);
    dst[..n].copy_from_slice(&bytes[..n]);
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// First 8 bytes of SHA-256(key), as a native-endian u64. Stored in the
/// header so a host can detect "wrong key" before attempting any page
/// decode, without ever persisting the key itself.
pub fn master_key_hash(key: &[u8]) -> u64 {
    let digest = Sha256::digest(key);
    NativeEndian::read_u64(&digest[..8])
}
