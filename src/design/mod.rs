//! Study design: describe a planned study and generate its metadata
//!
//! A [`StudyDesign`] holds [`StudyArm`]s; each arm is an ordered sequence of
//! [`StudyCell`]s made of treatment and non-treatment [`Element`]s, and each
//! cell may carry a [`SampleAndAssayPlan`] naming the samples taken during it
//! and the [`AssayGraph`] workflows they go through.
//!
//! ```text
//! StudyDesign
//! └── StudyArm*  (group size, subject type)
//!     └── (StudyCell, Option<SampleAndAssayPlan>)*
//!                          ├── ProductNode*  sample types
//!                          └── AssayGraph*   protocol/product DAG + QualityControl
//! ```
//!
//! [`StudyDesign::generate_study`] turns the design into a [`Study`](crate::model::Study)
//! and [`augment_study`] adds quality-control samples to it afterwards.

mod arm;
mod assay_graph;
mod cell;
mod element;
mod error;
mod factory;
mod generator;
mod plan;
mod qc;

#[cfg(test)]
mod tests;

pub use arm::{default_source_type, StudyArm, NCIT};
pub use assay_graph::{AssayGraph, ProductStep, ProtocolStep, WorkflowStep};
pub use cell::{CellItem, StudyCell};
pub use element::{
    base_factors, Element, InterventionType, NonTreatment, NonTreatmentType, Treatment,
    AGENT_FACTOR, DURATION_FACTOR, INTENSITY_FACTOR,
};
pub use error::DesignError;
pub use factory::{
    GroupSizes, Periods, PlannedPeriod, PlannedTreatment, StudyDesignFactory, TreatmentFactory,
    DEFAULT_STUDY_IDENTIFIER,
};
pub use generator::{
    StudyDesign, DEFAULT_PERFORMER, RUN_ORDER_PARAMETER, SAMPLING_PROTOCOL,
    SEQUENCE_ORDER_FACTOR, STUDY_STEP_PARAMETER, TREATMENT_STEP_COMMENT,
};
pub use plan::{
    ProductNode, ProductType, ProtocolNode, QualityControl, SampleAndAssayPlan, SequenceNode,
};
pub use qc::{augment_study, interspersed_count};
