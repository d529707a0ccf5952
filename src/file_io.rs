//! The collaborator file interface (§6.2/§6.3).
//!
//! The core never talks to `std::fs::File` directly; it talks to whatever
//! implements [`UnderlyingFile`]. That keeps the fixed, out-of-scope host
//! contract explicit and lets tests swap in an in-memory double instead of
//! touching the filesystem, the same way the teacher crate kept tablespace
//! I/O behind a narrow read/seek surface in `Tablespace`.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use fs2::FileExt;

use crate::PageStoreError;

/// Lock levels forwarded unchanged to the host's own file locking; the core
/// never interprets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockLevel {
    None,
    Shared,
    Reserved,
    Exclusive,
}

/// Bits describing what the underlying storage can do. The container
/// never satisfies memory-mapped fetch requests itself (§6.3); this flag
/// lets a host ask before trying.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceCharacteristics {
    pub supports_mmap: bool,
    pub atomic_write: bool,
}

/// The fixed interface the core calls on its underlying file handle, and
/// exposes (augmented with the compatibility flag) back up to the host.
///
/// Every operation maps directly onto §6.2. Implementations should not
/// retry or hide errors; the core is the only layer allowed to interpret
/// failures.
pub trait UnderlyingFile {
    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<usize, PageStoreError>;
    fn write(&mut self, buf: &[u8], offset: u64) -> Result<usize, PageStoreError>;
    fn truncate(&mut self, size: u64) -> Result<(), PageStoreError>;
    fn sync(&mut self) -> Result<(), PageStoreError>;
    fn file_size(&mut self) -> Result<u64, PageStoreError>;
    fn lock(&mut self, level: LockLevel) -> Result<(), PageStoreError>;
    fn unlock(&mut self) -> Result<(), PageStoreError>;
    fn check_reserved_lock(&mut self) -> Result<bool, PageStoreError>;
    fn sector_size(&self) -> u32;
    fn device_characteristics(&self) -> DeviceCharacteristics;
    /// Opaque vendor file-control hook; unsupported ops return `Ok(None)`.
    fn file_control(&mut self, op: u32, arg: i64) -> Result<Option<i64>, PageStoreError>;
}

/// A real on-disk file, the implementation the CLI driver opens.
pub struct StdFile {
    file: File,
    locked: Option<LockLevel>,
}

impl StdFile {
    pub fn open_read_write<P: AsRef<Path>>(path: P) -> Result<Self, PageStoreError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(|e| {
                PageStoreError::UnderlyingIo(format!("cannot open {}: {}", path.display(), e))
            })?;
        Ok(Self { file, locked: None })
    }

    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, PageStoreError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PageStoreError::UnderlyingIo(format!("cannot open {}: {}", path.display(), e))
        })?;
        Ok(Self { file, locked: None })
    }
}

impl UnderlyingFile for StdFile {
    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<usize, PageStoreError> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| PageStoreError::UnderlyingIo(e.to_string()))?;
        let mut total = 0;
        while total < buf.len() {
            match self.file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) => return Err(PageStoreError::UnderlyingIo(e.to_string())),
            }
        }
        Ok(total)
    }

    fn write(&mut self, buf: &[u8], offset: u64) -> Result<usize, PageStoreError> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| PageStoreError::UnderlyingIo(e.to_string()))?;
        self.file
            .write_all(buf)
            .map_err(|e| PageStoreError::UnderlyingIo(e.to_string()))?;
        Ok(buf.len())
    }

    fn truncate(&mut self, size: u64) -> Result<(), PageStoreError> {
        self.file
            .set_len(size)
            .map_err(|e| PageStoreError::UnderlyingIo(e.to_string()))
    }

    fn sync(&mut self) -> Result<(), PageStoreError> {
        self.file
            .sync_all()
            .map_err(|e| PageStoreError::UnderlyingIo(e.to_string()))
    }

    fn file_size(&mut self) -> Result<u64, PageStoreError> {
        self.file
            .metadata()
            .map(|m| m.len())
            .map_err(|e| PageStoreError::UnderlyingIo(e.to_string()))
    }

    fn lock(&mut self, level: LockLevel) -> Result<(), PageStoreError> {
        let result = match level {
            LockLevel::None => {
                self.locked = None;
                return Ok(());
            }
            LockLevel::Shared => self.file.lock_shared(),
            LockLevel::Reserved | LockLevel::Exclusive => self.file.lock_exclusive(),
        };
        result.map_err(|e| PageStoreError::UnderlyingIo(e.to_string()))?;
        self.locked = Some(level);
        Ok(())
    }

    fn unlock(&mut self) -> Result<(), PageStoreError> {
        if self.locked.is_some() {
            self.file
                .unlock()
                .map_err(|e| PageStoreError::UnderlyingIo(e.to_string()))?;
            self.locked = None;
        }
        Ok(())
    }

    fn check_reserved_lock(&mut self) -> Result<bool, PageStoreError> {
        Ok(matches!(
            self.locked,
            Some(LockLevel::Reserved) | Some(LockLevel::Exclusive)
        ))
    }

    fn sector_size(&self) -> u32 {
        512
    }

    fn device_characteristics(&self) -> DeviceCharacteristics {
        DeviceCharacteristics {
            supports_mmap: false,
            atomic_write: false,
        }
    }

    fn file_control(&mut self, _op: u32, _arg: i64) -> Result<Option<i64>, PageStoreError> {
        Ok(None)
    }
}

/// An in-memory file double, used by tests and by embedders that don't
/// want a real file on disk.
#[derive(Default, Clone)]
pub struct MemFile {
    data: Vec<u8>,
    locked: Option<LockLevel>,
}

impl MemFile {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UnderlyingFile for MemFile {
    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<usize, PageStoreError> {
        let offset = offset as usize;
        if offset >= self.data.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.data.len() - offset);
        buf[..n].copy_from_slice(&self.data[offset..offset + n]);
        Ok(n)
    }

    fn write(&mut self, buf: &[u8], offset: u64) -> Result<usize, PageStoreError> {
        let offset = offset as usize;
        let end = offset + buf.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[offset..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn truncate(&mut self, size: u64) -> Result<(), PageStoreError> {
        self.data.resize(size as usize, 0);
        Ok(())
    }

    fn sync(&mut self) -> Result<(), PageStoreError> {
        Ok(())
    }

    fn file_size(&mut self) -> Result<u64, PageStoreError> {
        Ok(self.data.len() as u64)
    }

    fn lock(&mut self, level: LockLevel) -> Result<(), PageStoreError> {
        self.locked = Some(level);
        Ok(())
    }

    fn unlock(&mut self) -> Result<(), PageStoreError> {
        self.locked = None;
        Ok(())
    }

    fn check_reserved_lock(&mut self) -> Result<bool, PageStoreError> {
        Ok(matches!(
            self.locked,
            Some(LockLevel::Reserved) | Some(LockLevel::Exclusive)
        ))
    }

    fn sector_size(&self) -> u32 {
        512
    }

    fn device_characteristics(&self) -> DeviceCharacteristics {
        DeviceCharacteristics {
            supports_mmap: false,
            atomic_write: false,
        }
    }

    fn file_control(&mut self, _op: u32, _arg: i64) -> Result<Option<i64>, PageStoreError> {
        Ok(None)
    }
}
