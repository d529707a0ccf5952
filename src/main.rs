#[cfg(not(feature = "cli"))]
compile_error!("The `pagevault` binary requires the `cli` feature. Build with `--features cli`.");

use std::fs::File;
use std::io::Write;
use std::process;

use clap::Parser;

use pagevault::cli;
use pagevault::cli::app::{Cli, ColorMode, Commands};
use pagevault::PageStoreError;

fn main() {
    let cli = Cli::parse();

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {}
    }

    let writer_result: Result<Box<dyn Write>, PageStoreError> = match &cli.output {
        Some(path) => File::create(path)
            .map(|f| Box::new(f) as Box<dyn Write>)
            .map_err(|e| PageStoreError::UnderlyingIo(format!("cannot create {}: {}", path, e))),
        None => Ok(Box::new(std::io::stdout()) as Box<dyn Write>),
    };

    let mut writer = match writer_result {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let result = match &cli.command {
        Commands::Compress {
            input,
            output,
            page_size,
            compress,
            encrypt,
            key_file,
            json,
        } => cli::compress::execute(
            &cli::compress::CompressOptions {
                input: input.clone(),
                output: output.clone(),
                page_size: *page_size,
                compress: compress.clone(),
                encrypt: encrypt.clone(),
                key_file: key_file.clone(),
                json: *json,
            },
            writer.as_mut(),
        ),
        Commands::Decompress {
            input,
            output,
            key_file,
            json,
        } => cli::decompress::execute(
            &cli::decompress::DecompressOptions {
                input: input.clone(),
                output: output.clone(),
                key_file: key_file.clone(),
                json: *json,
            },
            writer.as_mut(),
        ),
        Commands::Inspect {
            input,
            verbose,
            json,
        } => cli::inspect::execute(
            &cli::inspect::InspectOptions {
                input: input.clone(),
                verbose: *verbose,
                json: *json,
            },
            writer.as_mut(),
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
