use clap::{Parser, Subcommand, ValueEnum};

/// Mirrors [`crate::config::DEFAULT_PAGE_SIZE`]. Kept as a literal here
/// (rather than referencing `crate::config`) since this file is also
/// `include!`d verbatim by `build.rs`, which has no `pagevault` crate to
/// resolve `crate::` paths against.
const DEFAULT_PAGE_SIZE: u32 = 4096;

#[derive(Parser)]
#[command(name = "pagevault")]
#[command(about = "Transparent compression+encryption page store driver")]
#[command(version)]
pub struct Cli {
    /// Control colored output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a container from a plain logical file
    Compress {
        /// Path to the plain (uncontainerized) input file
        #[arg(short, long)]
        input: String,

        /// Path to the container file to create
        #[arg(short, long)]
        output: String,

        /// Logical page size in bytes (must be a power of two, 4096-65536)
        #[arg(long = "page-size", default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,

        /// Compression algorithm to apply to each page (e.g. zlib, lz4)
        #[arg(long)]
        compress: Option<String>,

        /// Encryption algorithm to apply to each page (e.g. aes256-cbc)
        #[arg(long)]
        encrypt: Option<String>,

        /// Path to a raw key file, required when `--encrypt` is set
        #[arg(long = "key-file")]
        key_file: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Rebuild a plain logical file from a container
    Decompress {
        /// Path to the container file to read
        #[arg(short, long)]
        input: String,

        /// Path to the plain output file to create
        #[arg(short, long)]
        output: String,

        /// Path to a raw key file, required if the container is encrypted
        #[arg(long = "key-file")]
        key_file: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print header, index, hole list, and fragmentation stats
    Inspect {
        /// Path to the container file to inspect
        #[arg(short, long)]
        input: String,

        /// Show the per-page index table, not just the summary
        #[arg(short, long)]
        verbose: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
