//! # isa-convert
//!
//! A command-line tool for converting and validating ISA metadata.
//!
//! ## Usage
//!
//! ```bash
//! # Tabular directory to JSON document
//! isa-convert convert-tabular-to-document BII-I-1/ BII-I-1.json
//!
//! # JSON document to tabular directory
//! isa-convert convert-document-to-tabular BII-I-1.json out/ --config isa.toml
//!
//! # Validate either form
//! isa-convert -v validate BII-I-1/
//! ```
//!
//! Exits with 0 on success, 1 on a failed conversion or a fatal validation
//! diagnostic, and 2 on a usage error.

use clap::Parser;
use std::process::ExitCode;

mod cli;

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    cli::init_logging(cli.verbosity());

    match cli::dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
