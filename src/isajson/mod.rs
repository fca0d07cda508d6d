//! Document layout: a single JSON record holding the whole investigation
//!
//! Cross-references are singleton `{ "@id": ... }` records. [`load`]
//! resolves them into the object model, failing on the first dangling
//! reference; [`dump`] mints fresh identifiers from each entity's position
//! in its container, so dumping equal investigations yields equal documents.
//!
//! ```text
//! {
//!   "identifier": ..., "ontologySourceReferences": [...],
//!   "studies": [{
//!     "protocols": [...], "factors": [...],
//!     "materials": { "sources": [...], "samples": [...], "otherMaterials": [...] },
//!     "processSequence": [...],
//!     "assays": [{ "dataFiles": [...], "processSequence": [...] }]
//!   }]
//! }
//! ```

mod error;
mod reader;
mod wire;
mod writer;


use std::io::{Read, Write};

use log::info;
use serde::{Deserialize, Serialize};

use crate::isatab::decode_text;
use crate::model::Investigation;

pub use error::IsaJsonError;

/// Process comment carrying the array design of a hybridization
pub const ARRAY_DESIGN_COMMENT: &str = "Array Design REF";

/// Process comment carrying the tabular label of the process name, such as
/// `Scan Name`
pub const NAME_LABEL_COMMENT: &str = "Assay Name Label";

/// Options for writing documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentWriterConfig {
    /// Indent the output
    pub pretty: bool,
}

impl Default for DocumentWriterConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// Parse a document held in a string
pub fn loads(text: &str) -> Result<Investigation, IsaJsonError> {
    let document: wire::WireInvestigation = serde_json::from_str(text)?;
    let investigation = reader::from_document(&document)?;
    info!(
        "Loaded investigation '{}' with {} studies",
        investigation.identifier,
        investigation.studies.len()
    );
    Ok(investigation)
}

/// Read a document from a stream
///
/// A byte-order mark is skipped and invalid UTF-8 is replaced with a
/// warning before parsing.
pub fn load<R: Read>(mut reader: R) -> Result<Investigation, IsaJsonError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    loads(&decode_text(&bytes, "document"))
}

/// Serialize an investigation to a string
pub fn dumps(
    investigation: &Investigation,
    config: &DocumentWriterConfig,
) -> Result<String, IsaJsonError> {
    if investigation.identifier.trim().is_empty() {
        return Err(IsaJsonError::MissingIdentifier);
    }
    let document = writer::to_document(investigation);
    let text = if config.pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };
    Ok(text)
}

/// Write an investigation as a document
pub fn dump<W: Write>(
    investigation: &Investigation,
    mut writer: W,
    config: &DocumentWriterConfig,
) -> Result<(), IsaJsonError> {
    let text = dumps(investigation, config)?;
    writer.write_all(text.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
