//! `pagevault decompress`: rebuild a plain logical file from a container.

use std::fs::File;
use std::io::{Read, Write};

use serde::Serialize;

use crate::cli::wprintln;
use crate::config::Config;
use crate::file_io::StdFile;
use crate::store::PageStore;
use crate::PageStoreError;

pub struct DecompressOptions {
    pub input: String,
    pub output: String,
    pub key_file: Option<String>,
    pub json: bool,
}

#[derive(Serialize)]
struct DecompressReport {
    input: String,
    output: String,
    pages_read: u64,
}

pub fn execute(opts: &DecompressOptions, writer: &mut dyn Write) -> Result<(), PageStoreError> {
    let key = match &opts.key_file {
        Some(path) => {
            let mut key = Vec::new();
            File::open(path)
                .and_then(|mut f| f.read_to_end(&mut key))
                .map_err(|e| {
                    PageStoreError::UnderlyingIo(format!("cannot read key file {}: {}", path, e))
                })?;
            Some(key)
        }
        None => None,
    };

    let mut config = Config::default();
    config.encryption_key = key;

    let file = StdFile::open_read_write(&opts.input)?;
    let mut store = PageStore::open(Box::new(file), config)?;

    let mut out = File::create(&opts.output).map_err(|e| {
        PageStoreError::UnderlyingIo(format!("cannot create {}: {}", opts.output, e))
    })?;

    let total_pages = store.logical_size_pages();
    for page in 0..total_pages {
        let bytes = store.read_page(page)?;
        out.write_all(&bytes)
            .map_err(|e| PageStoreError::UnderlyingIo(e.to_string()))?;
    }

    if opts.json {
        let report = DecompressReport {
            input: opts.input.clone(),
            output: opts.output.clone(),
            pages_read: total_pages,
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| PageStoreError::Argument(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
    } else {
        wprintln!(writer, "Decompressed {} -> {}", opts.input, opts.output)?;
        wprintln!(writer, "  Pages read:      {}", total_pages)?;
    }
    Ok(())
}
