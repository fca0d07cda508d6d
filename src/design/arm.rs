//! Study arms: the sequence of cells a group of subjects goes through

use crate::model::{Characteristic, OntologyAnnotation};

use super::cell::StudyCell;
use super::element::{Element, NonTreatmentType, Treatment};
use super::plan::SampleAndAssayPlan;
use super::DesignError;

pub(crate) const SCREEN_ERROR: &str = "A SCREEN cell can only be inserted into an empty arm_map.";
pub(crate) const RUN_IN_ERROR: &str =
    "A RUN-IN cell can only be inserted into an arm_map containing a SCREEN.";
pub(crate) const WASHOUT_ERROR: &str =
    "A WASHOUT cell cannot be put next to a cell ending with a WASHOUT.";
pub(crate) const COMPLETE_ARM_ERROR: &str =
    "StudyArm complete. No more cells can be added after a FOLLOW-UP cell.";
pub(crate) const FOLLOW_UP_ERROR: &str =
    "A FOLLOW-UP cell cannot be put next to a SCREEN or a RUN-IN cell.";
pub(crate) const FOLLOW_UP_EMPTY_ARM_ERROR: &str =
    "A FOLLOW-UP cell cannot be put into an empty StudyArm.";

/// Ontology source of the default subject type
pub const NCIT: &str = "NCIT";

/// Subject type used when an arm does not name one: human study subjects
pub fn default_source_type() -> Characteristic {
    Characteristic::new(
        OntologyAnnotation::from_cells(
            "Study Subject",
            NCIT,
            "http://purl.obolibrary.org/obo/NCIT_C41189",
        ),
        OntologyAnnotation::from_cells("Human", NCIT, "http://purl.obolibrary.org/obo/NCIT_C14225"),
    )
}

/// A named group of subjects and the ordered cells they go through, each
/// with an optional sample-and-assay plan
#[derive(Debug, Clone, PartialEq)]
pub struct StudyArm {
    /// Name, unique within a design
    pub name: String,
    /// Kind of subject enrolled
    pub source_type: Characteristic,
    /// Further characteristics of every subject
    pub source_characteristics: Vec<Characteristic>,
    /// Number of subjects
    pub group_size: usize,
    arm_map: Vec<(StudyCell, Option<SampleAndAssayPlan>)>,
}

impl StudyArm {
    /// Create an arm of human subjects with no cells
    pub fn new(name: &str, group_size: usize) -> Self {
        Self {
            name: name.to_string(),
            source_type: default_source_type(),
            source_characteristics: Vec::new(),
            group_size,
            arm_map: Vec::new(),
        }
    }

    /// Set the kind of subject enrolled
    pub fn with_source_type(mut self, source_type: Characteristic) -> Self {
        self.source_type = source_type;
        self
    }

    /// Cells with their plans, in order
    pub fn arm_map(&self) -> &[(StudyCell, Option<SampleAndAssayPlan>)] {
        &self.arm_map
    }

    /// Cells in order
    pub fn cells(&self) -> impl Iterator<Item = &StudyCell> {
        self.arm_map.iter().map(|(cell, _)| cell)
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.arm_map.len()
    }

    /// Whether the arm has no cell
    pub fn is_empty(&self) -> bool {
        self.arm_map.is_empty()
    }

    /// Whether the arm ends with a follow-up; a completed arm takes no more cells
    pub fn is_completed(&self) -> bool {
        self.arm_map
            .last()
            .is_some_and(|(cell, _)| cell.contains(NonTreatmentType::FollowUp))
    }

    /// Treatments given in the arm, in order
    pub fn treatments(&self) -> Vec<Treatment> {
        self.cells()
            .flat_map(StudyCell::elements)
            .filter_map(|element| match element {
                Element::Treatment(t) => Some(t),
                Element::NonTreatment(_) => None,
            })
            .collect()
    }

    /// Append a cell with its plan
    ///
    /// Screens open an empty arm, a run-in follows a screen or opens the
    /// arm, washouts never follow a period without treatment and a follow-up
    /// closes a non-empty arm that does not end in a screen or run-in.
    pub fn add_item(
        &mut self,
        cell: StudyCell,
        plan: Option<SampleAndAssayPlan>,
    ) -> Result<(), DesignError> {
        if self.is_completed() {
            return Err(DesignError::ArmRule(COMPLETE_ARM_ERROR.to_string()));
        }
        if self.cells().any(|c| c.name == cell.name) {
            return Err(DesignError::Duplicate {
                kind: "study cell",
                name: cell.name,
            });
        }
        let last = self.arm_map.last().map(|(c, _)| c);

        if cell.contains(NonTreatmentType::Screen) && !self.is_empty() {
            return Err(DesignError::ArmRule(SCREEN_ERROR.to_string()));
        }
        if cell.contains(NonTreatmentType::RunIn) {
            let after_screen = self.arm_map.len() == 1
                && last.is_some_and(|c| c.contains(NonTreatmentType::Screen));
            if !self.is_empty() && !after_screen {
                return Err(DesignError::ArmRule(RUN_IN_ERROR.to_string()));
            }
        }
        if cell.starts_with(NonTreatmentType::Washout)
            && last.is_some_and(StudyCell::ends_with_non_treatment)
        {
            return Err(DesignError::ArmRule(WASHOUT_ERROR.to_string()));
        }
        if cell.contains(NonTreatmentType::FollowUp) {
            match last {
                None => return Err(DesignError::ArmRule(FOLLOW_UP_EMPTY_ARM_ERROR.to_string())),
                Some(c)
                    if c.contains(NonTreatmentType::Screen)
                        || c.contains(NonTreatmentType::RunIn) =>
                {
                    return Err(DesignError::ArmRule(FOLLOW_UP_ERROR.to_string()))
                }
                Some(_) => {}
            }
        }
        self.arm_map.push((cell, plan));
        Ok(())
    }
}
