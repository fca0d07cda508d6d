//! Tabular layout: an investigation file plus study and assay tables
//!
//! ## Directory layout
//!
//! ```text
//! study_dir/
//! ├── i_investigation.txt   # declarations, one transposed section per block
//! ├── s_study.txt           # one per study: sources, sampling, samples
//! └── a_assay.txt           # one per assay: samples through data files
//! ```
//!
//! [`load`] reads a whole directory into an [`Investigation`]; [`dump`]
//! writes one back. The table readers and writers are also exposed for
//! callers that manage files themselves.

mod columns;
mod error;
mod investigation;
mod table_reader;
mod table_writer;

#[cfg(test)]
mod tests;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, WINDOWS_1252};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::model::{
    Assay, Investigation, MaterialKind, OntologySource, Protocol, Study, DEFAULT_MAX_PATHS,
    UNKNOWN_PROTOCOL,
};

pub use columns::{assay_name_label, Column, ASSAY_NAME_LABELS};
pub use error::IsaTabError;
pub use investigation::{read_investigation, write_investigation};

use table_reader::{parse_table, ParsedTable, TableContext};
use table_writer::{write_table, TableInput};

/// File name used for the investigation file by [`dump`]
pub const INVESTIGATION_FILE_NAME: &str = "i_investigation.txt";

/// Options for writing study and assay tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabularWriterConfig {
    /// Cap on source-to-sink paths enumerated per table
    pub max_paths: usize,
    /// Repeat sample factor values in assay tables
    pub write_factor_values_in_assays: bool,
}

impl Default for TabularWriterConfig {
    fn default() -> Self {
        Self {
            max_paths: DEFAULT_MAX_PATHS,
            write_factor_values_in_assays: false,
        }
    }
}

/// Encoding of bytes that are not UTF-8: the one named by a UTF-16
/// byte-order mark, else Windows-1252
pub(crate) fn legacy_encoding(bytes: &[u8]) -> &'static Encoding {
    Encoding::for_bom(bytes).map_or(WINDOWS_1252, |(encoding, _)| encoding)
}

/// Decode file bytes as UTF-8, dropping a byte-order mark
///
/// Input that is not UTF-8 is decoded with [`legacy_encoding`] and a
/// warning naming it.
pub(crate) fn decode_text(bytes: &[u8], name: &str) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            let encoding = legacy_encoding(bytes);
            warn!("{} is not valid UTF-8 ({}); decoding as {}", name, e, encoding.name());
            let (text, _, _) = encoding.decode(bytes);
            text.into_owned()
        }
    }
}

fn declare_unknown_protocol(study: &mut Study, table: &ParsedTable) {
    if table.uses_unknown_protocol && study.protocol(UNKNOWN_PROTOCOL).is_none() {
        info!("Declaring protocol '{}' in study {}", UNKNOWN_PROTOCOL, study.identifier);
        study.protocols.push(Protocol::unknown());
    }
}

/// Read a study table into `study`, resolving it against the study's
/// declarations
///
/// Replaces the study's sources, samples, other materials and process
/// sequence.
pub fn read_study_table<R: Read>(
    reader: R,
    term_sources: &[OntologySource],
    study: &mut Study,
) -> Result<(), IsaTabError> {
    let ctx = TableContext {
        protocols: &study.protocols,
        factors: &study.factors,
        term_sources,
        study_samples: None,
        technology_type: "",
    };
    let table = parse_table(reader, &study.filename, &ctx)?;
    if let Some(data) = table.data_files.first() {
        return Err(IsaTabError::MisplacedColumn {
            label: data.label.label().to_string(),
            owner: "study table".to_string(),
        });
    }
    declare_unknown_protocol(study, &table);

    study.sources.clear();
    study.samples.clear();
    study.other_materials.clear();
    for material in table.materials {
        match material.kind {
            MaterialKind::Source => study.sources.push(material),
            MaterialKind::Sample => study.samples.push(material),
            _ => study.other_materials.push(material),
        }
    }
    study.process_sequence = table.processes;
    info!(
        "Study {}: {} sources, {} samples, {} processes",
        study.identifier,
        study.sources.len(),
        study.samples.len(),
        study.process_sequence.len()
    );
    Ok(())
}

/// Read an assay table into `assay`
///
/// Samples are resolved against `study.samples`; an `unknown` protocol used
/// by the table is declared on the study.
pub fn read_assay_table<R: Read>(
    reader: R,
    term_sources: &[OntologySource],
    study: &mut Study,
    assay: &mut Assay,
) -> Result<(), IsaTabError> {
    let ctx = TableContext {
        protocols: &study.protocols,
        factors: &study.factors,
        term_sources,
        study_samples: Some(&study.samples),
        technology_type: &assay.technology_type.term,
    };
    let table = parse_table(reader, &assay.filename, &ctx)?;
    declare_unknown_protocol(study, &table);

    assay.samples.clear();
    assay.other_materials.clear();
    for material in table.materials {
        match material.kind {
            MaterialKind::Sample => assay.samples.push(material),
            _ => assay.other_materials.push(material),
        }
    }
    assay.data_files = table.data_files;
    assay.process_sequence = table.processes;
    info!(
        "Assay {}: {} samples, {} data files, {} processes",
        assay.filename,
        assay.samples.len(),
        assay.data_files.len(),
        assay.process_sequence.len()
    );
    Ok(())
}

/// Write the study table of `study`
pub fn write_study_table<W: Write>(
    study: &Study,
    config: &TabularWriterConfig,
    writer: W,
) -> Result<(), IsaTabError> {
    let input = TableInput {
        materials: study.materials().collect(),
        data_files: &[],
        processes: &study.process_sequence,
        protocols: &study.protocols,
        technology_type: "",
        assay: false,
        factor_values: true,
    };
    write_table(&input, config.max_paths, writer)
}

/// Write the table of one of `study`'s assays
pub fn write_assay_table<W: Write>(
    study: &Study,
    assay: &Assay,
    config: &TabularWriterConfig,
    writer: W,
) -> Result<(), IsaTabError> {
    let input = TableInput {
        materials: assay.materials().collect(),
        data_files: &assay.data_files,
        processes: &assay.process_sequence,
        protocols: &study.protocols,
        technology_type: &assay.technology_type.term,
        assay: true,
        factor_values: config.write_factor_values_in_assays,
    };
    write_table(&input, config.max_paths, writer)
}

/// Locate the single `i_*.txt` file of a directory
pub fn find_investigation_file(dir: &Path) -> Result<PathBuf, IsaTabError> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_investigation = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.starts_with("i_") && n.ends_with(".txt"));
        if is_investigation && path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    match found.len() {
        0 => Err(IsaTabError::FileNotFound(dir.join("i_*.txt"))),
        1 => Ok(found.remove(0)),
        _ => Err(IsaTabError::MultipleInvestigationFiles(dir.to_path_buf())),
    }
}

fn open_table(dir: &Path, name: &str) -> Result<BufReader<File>, IsaTabError> {
    let path = dir.join(name);
    if !path.is_file() {
        return Err(IsaTabError::FileNotFound(path));
    }
    Ok(BufReader::new(File::open(path)?))
}

/// Load an investigation with all its study and assay tables
pub fn load(dir: impl AsRef<Path>) -> Result<Investigation, IsaTabError> {
    let dir = dir.as_ref();
    let path = find_investigation_file(dir)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!("Loading {}", path.display());
    let mut investigation = read_investigation(BufReader::new(File::open(&path)?))
        .map_err(|e| e.in_file(&name))?;

    let term_sources = investigation.ontology_sources.clone();
    for study in &mut investigation.studies {
        let filename = study.filename.clone();
        let reader = open_table(dir, &filename)?;
        read_study_table(reader, &term_sources, study).map_err(|e| e.in_file(&filename))?;

        let mut assays = std::mem::take(&mut study.assays);
        for assay in &mut assays {
            let filename = assay.filename.clone();
            let reader = open_table(dir, &filename)?;
            read_assay_table(reader, &term_sources, study, assay)
                .map_err(|e| e.in_file(&filename))?;
        }
        study.assays = assays;
    }
    Ok(investigation)
}

/// Write `path` through a temporary file in the same directory, so a
/// failed write leaves any previous file intact
fn write_atomic<F>(path: &Path, write: F) -> Result<(), IsaTabError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), IsaTabError>,
{
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    file.persist(path).map_err(|e| IsaTabError::Io(e.error))?;
    Ok(())
}

/// Write an investigation as a directory of tables
pub fn dump(
    investigation: &Investigation,
    dir: impl AsRef<Path>,
    config: &TabularWriterConfig,
) -> Result<(), IsaTabError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    write_atomic(&dir.join(INVESTIGATION_FILE_NAME), |w| {
        write_investigation(investigation, w)
    })?;
    for study in &investigation.studies {
        write_atomic(&dir.join(&study.filename), |w| {
            write_study_table(study, config, w)
        })
        .map_err(|e| e.in_file(&study.filename))?;
        for assay in &study.assays {
            write_atomic(&dir.join(&assay.filename), |w| {
                write_assay_table(study, assay, config, w)
            })
            .map_err(|e| e.in_file(&assay.filename))?;
        }
    }
    info!("Wrote investigation to {}", dir.display());
    Ok(())
}
