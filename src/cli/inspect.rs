//! `pagevault inspect`: print header, index, and summary statistics for
//! a container without needing a working codec/key setup (reads the
//! header and index directly, the way the teacher's `inno dump`/`inno
//! parse` read raw page structure without decrypting anything).

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use crate::cli::wprintln;
use crate::container::Container;
use crate::file_io::StdFile;
use crate::PageStoreError;

pub struct InspectOptions {
    pub input: String,
    pub verbose: bool,
    pub json: bool,
}

#[derive(Serialize)]
struct InspectReport {
    path: String,
    major: u16,
    minor: u16,
    page_size: u32,
    total_pages: u32,
    logical_size_pages: u64,
    compress_algorithm: String,
    encrypt_algorithm: String,
    original_bytes: u64,
    stored_bytes: u64,
    compression_ratio_percent: u32,
    pages: Option<Vec<PageRow>>,
}

#[derive(Serialize)]
struct PageRow {
    page: u64,
    offset: u64,
    stored_size: u32,
    original_size: u32,
    compressed: bool,
    encrypted: bool,
    sparse: bool,
}

pub fn execute(opts: &InspectOptions, writer: &mut dyn Write) -> Result<(), PageStoreError> {
    let mut file = StdFile::open_read_write(&opts.input)?;
    let container = Container::open(&mut file)?;
    let header = &container.header;

    let pages = if opts.verbose {
        Some(
            container
                .index
                .iter()
                .filter(|(_, e)| e.is_allocated())
                .map(|(page, e)| PageRow {
                    page,
                    offset: e.offset,
                    stored_size: e.stored_size,
                    original_size: e.original_size,
                    compressed: e.compressed,
                    encrypted: e.encrypted,
                    sparse: e.is_hole,
                })
                .collect(),
        )
    } else {
        None
    };

    if opts.json {
        let report = InspectReport {
            path: opts.input.clone(),
            major: header.major,
            minor: header.minor,
            page_size: header.page_size,
            total_pages: header.total_pages,
            logical_size_pages: header.logical_size_pages,
            compress_algorithm: header.compress_name.clone(),
            encrypt_algorithm: header.encrypt_name.clone(),
            original_bytes: header.original_total_bytes,
            stored_bytes: header.stored_total_bytes,
            compression_ratio_percent: header.compression_ratio_percent(),
            pages,
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| PageStoreError::Argument(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    wprintln!(writer, "{}", opts.input)?;
    wprintln!(
        writer,
        "  Format version:  {}.{}",
        header.major,
        header.minor
    )?;
    wprintln!(writer, "  Page size:       {}", header.page_size)?;
    wprintln!(
        writer,
        "  Pages:           {} logical, {} indexed",
        header.logical_size_pages,
        header.total_pages
    )?;
    wprintln!(
        writer,
        "  Compression:     {}",
        if header.compress_name.is_empty() {
            "none".into()
        } else {
            header.compress_name.clone()
        }
    )?;
    wprintln!(
        writer,
        "  Encryption:      {}",
        if header.encrypt_name.is_empty() {
            "none".into()
        } else {
            header.encrypt_name.clone()
        }
    )?;
    wprintln!(
        writer,
        "  Ratio:           {}",
        format!("{}%", header.compression_ratio_percent()).green()
    )?;

    if let Some(pages) = pages {
        wprintln!(writer)?;
        wprintln!(writer, "  page  offset      stored  original  flags")?;
        for row in pages {
            let flags = if row.sparse {
                "S-".to_string()
            } else {
                match (row.compressed, row.encrypted) {
                    (true, true) => "CE".to_string(),
                    (true, false) => "C-".to_string(),
                    (false, true) => "-E".to_string(),
                    (false, false) => "--".to_string(),
                }
            };
            wprintln!(
                writer,
                "  {:>4}  {:>10}  {:>6}  {:>8}  {}",
                row.page,
                row.offset,
                row.stored_size,
                row.original_size,
                flags
            )?;
        }
    }

    Ok(())
}
