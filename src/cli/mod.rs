//! CLI subcommand implementations for the `pagevault` binary.
//!
//! The binary is a thin offline driver: three subcommands, each an
//! `Options` struct plus a `pub fn execute(opts, writer) -> Result<(),
//! PageStoreError>` entry point, following the same shape the teacher
//! crate used for its eleven subcommands. `app::Cli`/`app::Commands` are
//! shared between `main.rs` and `build.rs` (for man page generation) via
//! `include!()`.
//!
//! # Subcommands
//!
//! | Command | Module | Purpose |
//! |---------|--------|---------|
//! | `pagevault compress` | [`compress`] | Build a container from a plain logical file |
//! | `pagevault decompress` | [`decompress`] | Rebuild a plain logical file from a container |
//! | `pagevault inspect` | [`inspect`] | Print header, index, and summary statistics |
//!
//! # Common patterns
//!
//! - **`--json`** — structured output via `#[derive(Serialize)]` reports.
//! - **`--color`** (global) — control colored terminal output.
//! - **`--output`** (global) — redirect output to a file instead of stdout.

pub mod app;
pub mod compress;
pub mod decompress;
pub mod inspect;

/// Write a line to the given writer, converting io::Error to PageStoreError.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err(|e| $crate::PageStoreError::UnderlyingIo(e.to_string()))
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err(|e| $crate::PageStoreError::UnderlyingIo(e.to_string()))
    };
}

pub(crate) use wprintln;
