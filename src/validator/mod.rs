//! # Validation
//!
//! Collects diagnostics about a tabular directory or a JSON document without
//! stopping at the first problem. Each [`Diagnostic`] carries a severity, a
//! four-digit rule code, a message and the file it concerns.
//!
//! ## Validation Checklist
//!
//! 1. **Structure**: the investigation file exists (0001), every table it
//!    names has a file name (3005) and exists (0002), and all files are
//!    UTF-8 (0005)
//! 2. **Load**: the investigation reads without a fatal error (0010)
//! 3. **Metadata**: dates (3001), DOIs (3002), PubMed IDs (3003), term
//!    sources (3007, 3008)
//! 4. **Data**: declared protocols (1007, 1019) and factors (1008, 1021),
//!    assay samples (1013), graph alternation (4001) and prev/next
//!    pointers (4002)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use isa::validator::validate;
//! use std::path::Path;
//!
//! let report = validate(Path::new("BII-I-1"))?;
//! println!("{}", report);
//! if report.has_fatal() {
//!     std::process::exit(1);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::isatab::{self, decode_text};
use crate::isajson;
use crate::model::Investigation;

pub use report::{Diagnostic, Severity, ValidationReport};

mod data;
mod metadata;
mod report;
mod structure;


/// Main validation entry point
///
/// A directory, or an `i_*.txt` file inside one, is validated as the
/// tabular layout; any other file as a JSON document.
pub fn validate(path: &Path) -> Result<ValidationReport> {
    if path.is_dir() {
        return validate_directory(path);
    }
    if !path.exists() {
        let mut report = ValidationReport::new(path.display().to_string());
        report.add(Diagnostic::fatal(
            "0001",
            "Path does not exist",
            path.display().to_string(),
        ));
        return Ok(report);
    }
    let name = file_name(path);
    if name.starts_with("i_") && name.ends_with(".txt") {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        return validate_directory(dir);
    }
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut report = validate_document(BufReader::new(file), &name)?;
    report.target = path.display().to_string();
    Ok(report)
}

/// Validate a directory holding an investigation file and its tables
pub fn validate_directory(dir: &Path) -> Result<ValidationReport> {
    let mut report = ValidationReport::new(dir.display().to_string());

    // 1. Structure
    let Some(path) = structure::check_investigation_file(dir, &mut report) else {
        return Ok(report);
    };
    let investigation_file = file_name(&path);
    let text = structure::read_text(&path, &mut report)?;
    let declared = match isatab::read_investigation(Cursor::new(text)) {
        Ok(declared) => declared,
        Err(e) => {
            report.add(Diagnostic::fatal("0010", e.to_string(), investigation_file));
            return Ok(report);
        }
    };
    structure::check_table_files(dir, &declared, &mut report)?;
    if report.has_fatal() {
        return Ok(report);
    }

    // 2. Load
    let investigation = match isatab::load(dir) {
        Ok(investigation) => investigation,
        Err(e) => {
            report.add(Diagnostic::fatal("0010", e.to_string(), dir.display().to_string()));
            return Ok(report);
        }
    };

    // 3. and 4.
    check_investigation(&investigation, &investigation_file, &mut report);
    Ok(report)
}

/// Validate a JSON document read from `reader`; `name` labels the
/// diagnostics
pub fn validate_document<R: Read>(mut reader: R, name: &str) -> Result<ValidationReport> {
    let mut report = ValidationReport::new(name);
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .with_context(|| format!("Failed to read {}", name))?;
    structure::check_encoding(&bytes, name, &mut report);

    let investigation = match isajson::loads(&decode_text(&bytes, name)) {
        Ok(investigation) => investigation,
        Err(e) => {
            report.add(Diagnostic::fatal("0010", e.to_string(), name));
            return Ok(report);
        }
    };
    check_investigation(&investigation, name, &mut report);
    Ok(report)
}

/// Run the metadata and data checks on an investigation already in memory
///
/// `source_file` labels diagnostics about investigation-level declarations.
pub fn check_investigation(
    investigation: &Investigation,
    source_file: &str,
    report: &mut ValidationReport,
) {
    metadata::check_metadata(investigation, source_file, report);
    data::check_data(investigation, report);
    info!(
        "Validated investigation '{}': {} fatal, {} warnings, {} info",
        investigation.identifier,
        report.fatal_count(),
        report.warning_count(),
        report.info_count()
    );
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
