//! Construction-time configuration surface (§6.5).
//!
//! Everything that would otherwise be process-wide global state — the
//! codec registry, the encryption key — is threaded through here instead
//! and handed to [`crate::store::PageStore::open`], per the Design Notes'
//! guidance against global mutable state and process-wide singletons.

use crate::codec::CodecRegistry;

/// Minimum configurable page size (4 KiB).
pub const MIN_PAGE_SIZE: u32 = 4096;
/// Maximum configurable page size (64 KiB).
pub const MAX_PAGE_SIZE: u32 = 65536;
/// Default page size when none is specified.
pub const DEFAULT_PAGE_SIZE: u32 = 4096;

/// What to do when a page's stored checksum doesn't match (§7, `CorruptPage`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrictChecksumMode {
    /// Fail the read with `CorruptPage`.
    Strict,
    /// Count the event and return whatever bytes decoding produced,
    /// without ever claiming success if decompression itself failed.
    Tolerant,
}

/// Hole-manager bounds (§4.3).
#[derive(Debug, Clone, Copy)]
pub struct HoleConfig {
    pub enabled: bool,
    pub max_holes: usize,
    pub min_hole_size: u32,
}

impl Default for HoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_holes: 256,
            min_hole_size: 64,
        }
    }
}

/// Write-behind buffer bounds (§4.6).
#[derive(Debug, Clone, Copy)]
pub struct BufferConfig {
    pub enabled: bool,
    pub max_entries: usize,
    pub max_total_bytes: usize,
    pub auto_flush_entries: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 256,
            max_total_bytes: 64 * 1024 * 1024,
            auto_flush_entries: 128,
        }
    }
}

/// Batch writer bounds (§4.7).
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub enabled: bool,
    pub max_pages: usize,
    pub max_memory_bytes: usize,
    pub auto_flush_threshold: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_pages: 512,
            max_memory_bytes: 32 * 1024 * 1024,
            auto_flush_threshold: 256,
        }
    }
}

/// Top-level container configuration, built once per handle.
#[derive(Clone)]
pub struct Config {
    pub page_size: u32,
    pub compress_algorithm: Option<String>,
    pub encrypt_algorithm: Option<String>,
    pub encryption_key: Option<Vec<u8>>,
    pub compression_level: i32,
    pub strict_checksum_mode: StrictChecksumMode,
    pub enable_data_recovery: bool,
    pub holes: HoleConfig,
    pub buffer: BufferConfig,
    pub batch: BatchConfig,
    pub registry: CodecRegistry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            compress_algorithm: None,
            encrypt_algorithm: None,
            encryption_key: None,
            compression_level: 6,
            strict_checksum_mode: StrictChecksumMode::Strict,
            enable_data_recovery: false,
            holes: HoleConfig::default(),
            buffer: BufferConfig::default(),
            batch: BatchConfig::default(),
            registry: CodecRegistry::with_defaults(),
        }
    }
}

impl Config {
    /// Validate the page size is a power of two within the allowed bounds.
    pub fn validate(&self) -> Result<(), crate::PageStoreError> {
        if self.page_size < MIN_PAGE_SIZE
            || self.page_size > MAX_PAGE_SIZE
            || !self.page_size.is_power_of_two()
        {
            return Err(crate::PageStoreError::Argument(format!(
                "page_size {} must be a power of two in [{}, {}]",
                self.page_size, MIN_PAGE_SIZE, MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_compression(mut self, algorithm: impl Into<String>) -> Self {
        self.compress_algorithm = Some(algorithm.into());
        self
    }

    pub fn with_encryption(mut self, algorithm: impl Into<String>, key: Vec<u8>) -> Self {
        self.encrypt_algorithm = Some(algorithm.into());
        self.encryption_key = Some(key);
        self
    }

    pub fn with_strict_checksum_mode(mut self, mode: StrictChecksumMode) -> Self {
        self.strict_checksum_mode = mode;
        self
    }

    pub fn with_data_recovery(mut self, enabled: bool) -> Self {
        self.enable_data_recovery = enabled;
        self
    }
}
