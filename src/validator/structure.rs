use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

use crate::isatab::{self, decode_text, legacy_encoding, IsaTabError};
use crate::model::Investigation;

use super::{file_name, Diagnostic, ValidationReport};

/// Step 1: locate the investigation file of a directory
pub(crate) fn check_investigation_file(
    dir: &Path,
    report: &mut ValidationReport,
) -> Option<PathBuf> {
    match isatab::find_investigation_file(dir) {
        Ok(path) => {
            debug!("Investigation file: {}", path.display());
            Some(path)
        }
        Err(IsaTabError::MultipleInvestigationFiles(_)) => {
            report.add(Diagnostic::fatal(
                "0001",
                "More than one i_*.txt investigation file",
                dir.display().to_string(),
            ));
            None
        }
        Err(e) => {
            report.add(Diagnostic::fatal(
                "0001",
                format!("No investigation file found: {}", e),
                dir.display().to_string(),
            ));
            None
        }
    }
}

/// Read a file as text, warning when it is not UTF-8
pub(crate) fn read_text(path: &Path, report: &mut ValidationReport) -> Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = file_name(path);
    check_encoding(&bytes, &name, report);
    Ok(decode_text(&bytes, &name))
}

/// Flag bytes that are not UTF-8, naming the likely encoding
pub(crate) fn check_encoding(bytes: &[u8], name: &str, report: &mut ValidationReport) {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Err(e) = std::str::from_utf8(body) {
        report.add(Diagnostic::warning(
            "0005",
            format!(
                "File is not UTF-8 (invalid byte at offset {}); read as {}",
                e.valid_up_to(),
                legacy_encoding(body).name()
            ),
            name,
        ));
    }
}

/// Step 2: every study and assay named by the investigation file has a
/// file name and exists in the directory
pub(crate) fn check_table_files(
    dir: &Path,
    declared: &Investigation,
    report: &mut ValidationReport,
) -> Result<()> {
    for (s, study) in declared.studies.iter().enumerate() {
        let location = if study.identifier.is_empty() {
            format!("study {}", s + 1)
        } else {
            format!("study {}", study.identifier)
        };
        check_table_file(dir, &study.filename, "Study File Name", &location, report)?;
        for (a, assay) in study.assays.iter().enumerate() {
            let location = format!("{}, assay {}", location, a + 1);
            check_table_file(dir, &assay.filename, "Study Assay File Name", &location, report)?;
        }
    }
    Ok(())
}

fn check_table_file(
    dir: &Path,
    filename: &str,
    label: &str,
    location: &str,
    report: &mut ValidationReport,
) -> Result<()> {
    if filename.trim().is_empty() {
        report.add(Diagnostic::fatal(
            "3005",
            format!("{} is empty", label),
            location,
        ));
        return Ok(());
    }
    let path = dir.join(filename);
    if !path.is_file() {
        report.add(Diagnostic::fatal(
            "0002",
            format!("Referenced file {} does not exist", filename),
            location,
        ));
        return Ok(());
    }
    let bytes =
        fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    check_encoding(&bytes, filename, report);
    Ok(())
}
