//! Transparent compression+encryption page store.
//!
//! `pagevault` sits behind the file-I/O interface of an embedded SQL engine
//! and turns a random-access logical file into a physical container that
//! stores fixed-size logical pages as variable-sized, optionally compressed
//! and encrypted, content-addressed extents. It preserves random-access
//! page semantics over a non-uniform on-disk layout while keeping the
//! physical file compact and resilient to repeated in-place rewrites.
//!
//! # CLI Reference
//!
//! The `pagevault` binary is a thin offline driver around the core plus a
//! plain-file page-copy loop: `pagevault compress` turns a flat logical
//! file into a container, `pagevault decompress` reverses it, and
//! `pagevault inspect` prints header/index/fragmentation statistics.
//!
//! ## Subcommands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | [`pagevault compress`](cli::app::Commands::Compress) | Build a container from a plain logical file |
//! | [`pagevault decompress`](cli::app::Commands::Decompress) | Rebuild a plain logical file from a container |
//! | [`pagevault inspect`](cli::app::Commands::Inspect) | Print header, index, hole list, and fragmentation stats |
//!
//! ## Global options
//!
//! All subcommands accept `--color <auto|always|never>` and `--output <file>`.
//! `inspect` additionally accepts `--json` for machine-readable output.
//!
//! # Library API
//!
//! ```no_run
//! use pagevault::config::Config;
//! use pagevault::file_io::StdFile;
//! use pagevault::store::PageStore;
//!
//! let file = StdFile::open_read_write("database.container").unwrap();
//! let mut store = PageStore::create(Box::new(file), Config::default().with_page_size(4096)).unwrap();
//!
//! store.write_range(0, &[0x41; 4096]).unwrap();
//! let page = store.read_range(0, 4096).unwrap();
//! store.sync().unwrap();
//! # let _ = page;
//! ```
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`checksum`] | CRC-32 primitive (C1) |
//! | [`codec`] | Compression/encryption plug-in contract and registry (C2) |
//! | [`container`] | Header and page index: load, validate, persist, grow (C3) |
//! | [`pipeline`] | Page codec pipeline: compress→encrypt→checksum and back (C4) |
//! | [`holes`] | Hole manager: track, merge, best-fit query freed extents (C5) |
//! | [`allocator`] | Space allocator: in-place reuse, expansion, hole reuse, append (C6) |
//! | [`store`] | Read/write path translating byte ranges into page operations (C7) |
//! | [`buffer`] | Write-behind buffer keyed by page number (C8) |
//! | [`batch`] | Batch writer: stage many pages, commit in one contiguous write (C9) |
//! | [`stats`] | Fragmentation score accounting |
//! | [`file_io`] | The collaborator file interface and its concrete implementations |
//! | [`config`] | Construction-time configuration surface |
//! | [`event_log`] | Structured NDJSON event logging for write-path operations |

pub mod allocator;
pub mod batch;
pub mod buffer;
pub mod checksum;
#[cfg(feature = "cli")]
pub mod cli;
pub mod codec;
pub mod config;
pub mod container;
pub mod event_log;
pub mod file_io;
pub mod holes;
pub mod pipeline;
pub mod stats;
pub mod store;

use thiserror::Error;

/// Errors returned by `pagevault` operations (§7 of the design).
#[derive(Error, Debug)]
pub enum PageStoreError {
    /// The file has no valid container header/magic; the caller should
    /// treat the handle as a plain pass-through file.
    #[error("not a container")]
    NotContainer,

    /// The header's magic matched but its CRC or major version did not.
    #[error("corrupt container header: {0}")]
    CorruptHeader(String),

    /// A page's checksum failed to validate, or decompression produced an
    /// unexpected length.
    #[error("corrupt page {page}: {reason}")]
    CorruptPage {
        /// Logical page number that failed verification.
        page: u64,
        /// Human-readable reason (checksum mismatch, bad decompressed length, ...).
        reason: String,
    },

    /// The page index would exceed its reserved on-disk region if persisted.
    #[error("index out of reserved space: {0}")]
    OutOfSpaceInIndex(String),

    /// Scratch-buffer allocation failed.
    #[error("allocation failure: {0}")]
    AllocationFailure(String),

    /// An error from the underlying file-layer interface, propagated unchanged.
    #[error("I/O error: {0}")]
    UnderlyingIo(String),

    /// A batch flush wrote its physical bytes but failed to persist the
    /// index update: the file now contains an orphaned extent, but no
    /// index entry points at stale data.
    #[error("write committed but index stale for page {page}: {reason}")]
    WriteCommittedIndexStale {
        /// Logical page number whose index entry failed to persist.
        page: u64,
        /// Underlying error that caused the index save to fail.
        reason: String,
    },

    /// An invalid argument was supplied (bad page size, out-of-range page number, ...).
    #[error("invalid argument: {0}")]
    Argument(String),
}
