//! Object model of an investigation
//!
//! The entity records mirror the nesting of an ISA investigation:
//!
//! ```text
//! Investigation
//! ├── OntologySource*            named vocabularies
//! └── Study*
//!     ├── Protocol*, StudyFactor* declarations referenced by name
//!     ├── Material* (sources, samples, other materials)
//!     ├── Process*                study provenance graph
//!     └── Assay*
//!         ├── Material*, DataFile*
//!         └── Process*            assay provenance graph
//! ```
//!
//! Cross-references are non-owning: processes name their protocol, factor
//! values name their factor, and process inputs/outputs hold [`NodeId`]s of
//! materials and data files owned by the enclosing study or assay.

mod annotation;
mod error;
pub mod graph;
mod investigation;
mod node;
mod protocol;

pub use annotation::{
    format_number, is_extended_date, Comment, OntologyAnnotation, OntologySource, Value,
};
pub use error::ModelError;
pub use graph::{GraphNode, ProvenanceGraph, DEFAULT_MAX_PATHS};
pub use investigation::{Assay, Investigation, Person, Publication, Study};
pub use node::{
    Characteristic, DataFile, DataFileLabel, FactorValue, Material, MaterialKind, NodeId,
    ParameterValue, Process,
};
pub use protocol::{Protocol, ProtocolComponent, ProtocolParameter, StudyFactor, UNKNOWN_PROTOCOL};

#[cfg(test)]
mod tests;
