//! # isa - ISA experimental metadata in Rust
//!
//! `isa` reads, writes, converts and validates descriptions of life-science
//! investigations in their two canonical forms: a directory of tab-separated
//! tables ("ISA-Tab") and a single JSON document ("ISA-JSON"). Both bind to
//! one object model capturing the provenance graph of each study: sources
//! turned by protocol applications into samples, extracts, labeled extracts
//! and finally data files.
//!
//! ## Key Features
//!
//! - **Lossless tabular IO**: wide study and assay tables are folded into
//!   process nodes and unfolded again with stable column order.
//!
//! - **Document IO**: serde-derived records with `@id` cross-references,
//!   minted deterministically on output.
//!
//! - **Study design generator**: arms, cells, treatments and sample/assay
//!   plans expanded into a complete study, with quality-control samples.
//!
//! - **Validator**: a report of coded diagnostics instead of a first error.
//!
//! ## Quick Start - Tabular to Document
//!
//! ```rust,no_run
//! use isa::isajson::{self, DocumentWriterConfig};
//! use isa::isatab;
//!
//! let investigation = isatab::load("BII-I-1")?;
//! let document = isajson::dumps(&investigation, &DocumentWriterConfig::default())?;
//! println!("{}", document);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Generating a Study
//!
//! ```rust,no_run
//! use isa::design::{StudyArm, StudyCell, StudyDesign, Treatment, InterventionType};
//! use isa::model::FactorValue;
//!
//! let treatment = Treatment::new(
//!     InterventionType::Chemical,
//!     vec![FactorValue::new("AGENT", "nitroglycerin")],
//! );
//! let mut arm = StudyArm::new("ARM_00", 10);
//! arm.add_item(StudyCell::with_elements("ARM_00_CELL_00", [treatment.into()])?, None)?;
//!
//! let mut design = StudyDesign::new("01", "nitroglycerin");
//! design.add_arm(arm)?;
//! let investigation = design.generate_investigation()?;
//! isa::isatab::dump(&investigation, "out", &Default::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! This creates a directory structure:
//! ```text
//! out/
//! ├── i_investigation.txt   # declarations
//! └── s_01.txt              # 10 subjects, no samples without a plan
//! ```
//!
//! ## Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`model`]: entity records and the provenance graph
//! - [`isatab`]: investigation file and wide-table reader/writer
//! - [`isajson`]: JSON document reader/writer
//! - [`design`]: study-design description and generator
//! - [`validator`]: diagnostics over a directory or a document

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod design;
pub mod isajson;
pub mod isatab;
pub mod model;
pub mod validator;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::design::{
        augment_study, AssayGraph, DesignError, StudyArm, StudyCell, StudyDesign,
        StudyDesignFactory,
    };
    pub use crate::isajson::{DocumentWriterConfig, IsaJsonError};
    pub use crate::isatab::{IsaTabError, TabularWriterConfig};
    pub use crate::model::{
        Assay, DataFile, Investigation, Material, ModelError, NodeId, OntologyAnnotation,
        Process, Protocol, Study, Value,
    };
    pub use crate::validator::{validate, Diagnostic, Severity, ValidationReport};
}
