//! `pagevault compress`: build a container from a plain logical file.
//! Grounded in the teacher's `cli::defrag::execute`, which reads a whole
//! source file, transforms it page by page, and reports a `Serialize`
//! summary in JSON or human-readable form.

use std::fs::File;
use std::io::{Read, Write};

use colored::Colorize;
use serde::Serialize;

use crate::cli::wprintln;
use crate::config::Config;
use crate::file_io::StdFile;
use crate::store::PageStore;
use crate::PageStoreError;

pub struct CompressOptions {
    pub input: String,
    pub output: String,
    pub page_size: u32,
    pub compress: Option<String>,
    pub encrypt: Option<String>,
    pub key_file: Option<String>,
    pub json: bool,
}

#[derive(Serialize)]
struct CompressReport {
    input: String,
    output: String,
    pages_written: u64,
    original_bytes: u64,
    stored_bytes: u64,
    compression_ratio_percent: u32,
}

pub fn execute(opts: &CompressOptions, writer: &mut dyn Write) -> Result<(), PageStoreError> {
    let mut input = File::open(&opts.input)
        .map_err(|e| PageStoreError::UnderlyingIo(format!("cannot open {}: {}", opts.input, e)))?;

    let key = load_key(opts.key_file.as_deref())?;
    let mut config = Config::default().with_page_size(opts.page_size);
    if let Some(algo) = &opts.compress {
        config = config.with_compression(algo.clone());
    }
    if let (Some(algo), Some(key)) = (&opts.encrypt, key) {
        config = config.with_encryption(algo.clone(), key);
    } else if opts.encrypt.is_some() {
        return Err(PageStoreError::Argument(
            "--encrypt requires --key-file".to_string(),
        ));
    }

    let file = StdFile::open_read_write(&opts.output)?;
    let mut store = PageStore::create(Box::new(file), config)?;

    let page_size = opts.page_size as usize;
    let mut buf = vec![0u8; page_size];
    let mut page = 0u64;
    loop {
        let n = input
            .read(&mut buf)
            .map_err(|e| PageStoreError::UnderlyingIo(e.to_string()))?;
        if n == 0 {
            break;
        }
        if n < page_size {
            buf[n..].fill(0);
        }
        store.write_page(page, &buf)?;
        page += 1;
        if n < page_size {
            break;
        }
    }
    store.sync()?;
    let stats = store.stats();
    store.close()?;

    if opts.json {
        let report = CompressReport {
            input: opts.input.clone(),
            output: opts.output.clone(),
            pages_written: page,
            original_bytes: stats.original_total_bytes,
            stored_bytes: stats.stored_total_bytes,
            compression_ratio_percent: stats.compression_ratio_percent,
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| PageStoreError::Argument(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
    } else {
        wprintln!(writer, "Compressed {} -> {}", opts.input, opts.output)?;
        wprintln!(writer, "  Pages written:   {}", page)?;
        wprintln!(
            writer,
            "  Compression:     {}",
            format!("{}%", stats.compression_ratio_percent).green()
        )?;
    }
    Ok(())
}

fn load_key(path: Option<&str>) -> Result<Option<Vec<u8>>, PageStoreError> {
    match path {
        None => Ok(None),
        Some(path) => {
            let mut key = Vec::new();
            File::open(path)
                .and_then(|mut f| f.read_to_end(&mut key))
                .map_err(|e| {
                    PageStoreError::UnderlyingIo(format!("cannot read key file {}: {}", path, e))
                })?;
            Ok(Some(key))
        }
    }
}
