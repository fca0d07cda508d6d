//! Shortcuts building treatments and whole designs from a few parameters

use log::debug;

use crate::model::{FactorValue, StudyFactor, Value};

use super::arm::StudyArm;
use super::cell::StudyCell;
use super::element::{base_factors, InterventionType, NonTreatment, NonTreatmentType, Treatment};
use super::generator::StudyDesign;
use super::plan::SampleAndAssayPlan;
use super::DesignError;

/// Identifier given to designs built by [`StudyDesignFactory`]
pub const DEFAULT_STUDY_IDENTIFIER: &str = "01";

/// Builds every treatment of a full-factorial design
#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentFactory {
    /// Intervention type of the generated treatments
    pub intervention: InterventionType,
    factors: Vec<(StudyFactor, Vec<Value>)>,
}

impl TreatmentFactory {
    /// A factory over the agent, intensity and duration factors
    pub fn new(intervention: InterventionType) -> Self {
        Self::with_factors(intervention, base_factors())
    }

    /// A factory over custom factors
    pub fn with_factors(
        intervention: InterventionType,
        factors: impl IntoIterator<Item = StudyFactor>,
    ) -> Self {
        Self {
            intervention,
            factors: factors.into_iter().map(|f| (f, Vec::new())).collect(),
        }
    }

    /// Factors with the values collected so far
    pub fn factors(&self) -> &[(StudyFactor, Vec<Value>)] {
        &self.factors
    }

    /// Add a value to a factor of the factory; repeated values are ignored
    pub fn add_factor_value(
        &mut self,
        factor_name: &str,
        value: impl Into<Value>,
    ) -> Result<(), DesignError> {
        let Some((_, values)) = self.factors.iter_mut().find(|(f, _)| f.name == factor_name)
        else {
            return Err(DesignError::UnknownNode {
                kind: "factor",
                name: factor_name.to_string(),
            });
        };
        let value = value.into();
        if !values.contains(&value) {
            values.push(value);
        }
        Ok(())
    }

    /// One treatment per combination of factor values, first factor varying
    /// slowest; empty when any factor has no value
    pub fn compute_full_factorial_design(&self) -> Vec<Treatment> {
        if self.factors.iter().any(|(_, values)| values.is_empty()) {
            return Vec::new();
        }
        let combinations = self.factors.iter().fold(
            vec![Vec::new()],
            |combinations: Vec<Vec<FactorValue>>, (factor, values)| {
                combinations
                    .iter()
                    .flat_map(|prefix| {
                        values.iter().map(move |value| {
                            let mut combination = prefix.clone();
                            combination.push(FactorValue::new(&factor.name, value.clone()));
                            combination
                        })
                    })
                    .collect()
            },
        );
        debug!(
            "Full factorial design over {} factors: {} treatments",
            self.factors.len(),
            combinations.len()
        );
        combinations
            .into_iter()
            .map(|factor_values| Treatment::new(self.intervention, factor_values))
            .collect()
    }
}

/// A treatment and the plan applied while it is given
pub type PlannedTreatment = (Treatment, Option<SampleAndAssayPlan>);

/// A non-treatment period and the plan applied during it
pub type PlannedPeriod = (NonTreatment, Option<SampleAndAssayPlan>);

/// Optional periods framing the treatments of a generated design
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Periods {
    /// Opening screen
    pub screen: Option<PlannedPeriod>,
    /// Run-in after the screen
    pub run_in: Option<PlannedPeriod>,
    /// Washout between consecutive treatments
    pub washout: Option<PlannedPeriod>,
    /// Closing follow-up
    pub follow_up: Option<PlannedPeriod>,
}

impl Periods {
    fn validate(&self) -> Result<(), DesignError> {
        let expected = [
            (&self.screen, NonTreatmentType::Screen),
            (&self.run_in, NonTreatmentType::RunIn),
            (&self.washout, NonTreatmentType::Washout),
            (&self.follow_up, NonTreatmentType::FollowUp),
        ];
        for (period, kind) in expected {
            if let Some((element, _)) = period {
                if element.kind != kind {
                    return Err(DesignError::InvalidAttribute(format!(
                        "a {} was given where a {} is expected",
                        element.kind, kind
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Subjects per arm: the same for every arm or one count per arm
#[derive(Debug, Clone, PartialEq)]
pub enum GroupSizes {
    /// Same size for every arm
    Uniform(usize),
    /// One size per arm, in arm order
    PerArm(Vec<usize>),
}

impl GroupSizes {
    fn resolve(&self, arms: usize) -> Result<Vec<usize>, DesignError> {
        match self {
            GroupSizes::Uniform(size) => Ok(vec![*size; arms]),
            GroupSizes::PerArm(sizes) if sizes.len() == arms => Ok(sizes.clone()),
            GroupSizes::PerArm(sizes) => Err(DesignError::InvalidAttribute(format!(
                "{} group sizes given for {} arms",
                sizes.len(),
                arms
            ))),
        }
    }
}

/// Builds parallel, crossover, single-arm and concomitant designs
///
/// Arms are named `ARM_00`, `ARM_01`, ... and their cells
/// `ARM_00_CELL_00`, `ARM_00_CELL_01`, ...
pub struct StudyDesignFactory;

impl StudyDesignFactory {
    /// One arm per treatment
    pub fn compute_parallel_design(
        treatments: &[PlannedTreatment],
        group_sizes: &GroupSizes,
        periods: &Periods,
    ) -> Result<StudyDesign, DesignError> {
        periods.validate()?;
        let sizes = group_sizes.resolve(treatments.len())?;
        let mut design = StudyDesign::new(DEFAULT_STUDY_IDENTIFIER, "parallel design");
        for (i, (treatment, size)) in treatments.iter().zip(sizes).enumerate() {
            let mut arm = ArmBuilder::new(i, size, periods)?;
            arm.push_treatment(treatment)?;
            design.add_arm(arm.finish()?)?;
        }
        Ok(design)
    }

    /// One arm per ordering of the treatments, with a washout between
    /// consecutive treatments when one is given
    pub fn compute_crossover_design(
        treatments: &[PlannedTreatment],
        group_sizes: &GroupSizes,
        periods: &Periods,
    ) -> Result<StudyDesign, DesignError> {
        periods.validate()?;
        let orderings = permutations(treatments.len());
        let sizes = group_sizes.resolve(orderings.len())?;
        let mut design = StudyDesign::new(DEFAULT_STUDY_IDENTIFIER, "crossover design");
        for (i, (ordering, size)) in orderings.iter().zip(sizes).enumerate() {
            let mut arm = ArmBuilder::new(i, size, periods)?;
            arm.push_sequence(ordering.iter().map(|&t| &treatments[t]))?;
            design.add_arm(arm.finish()?)?;
        }
        Ok(design)
    }

    /// A single arm giving every treatment in order, with a washout between
    /// consecutive treatments when one is given
    pub fn compute_single_arm_design(
        treatments: &[PlannedTreatment],
        group_size: usize,
        periods: &Periods,
    ) -> Result<StudyDesign, DesignError> {
        periods.validate()?;
        let mut design = StudyDesign::new(DEFAULT_STUDY_IDENTIFIER, "single arm design");
        let mut arm = ArmBuilder::new(0, group_size, periods)?;
        arm.push_sequence(treatments.iter())?;
        design.add_arm(arm.finish()?)?;
        Ok(design)
    }

    /// A single arm with one cell giving all treatments together
    pub fn compute_concomitant_treatments_design(
        treatments: &[Treatment],
        plan: Option<SampleAndAssayPlan>,
        group_size: usize,
        periods: &Periods,
    ) -> Result<StudyDesign, DesignError> {
        periods.validate()?;
        let mut design = StudyDesign::new(DEFAULT_STUDY_IDENTIFIER, "concomitant treatments design");
        let mut arm = ArmBuilder::new(0, group_size, periods)?;
        let mut cell = StudyCell::new(&arm.next_cell_name());
        cell.insert_concomitant(treatments.to_vec())?;
        arm.push(cell, plan)?;
        design.add_arm(arm.finish()?)?;
        Ok(design)
    }
}

struct ArmBuilder<'p> {
    arm: StudyArm,
    periods: &'p Periods,
}

impl<'p> ArmBuilder<'p> {
    /// Start an arm with the screen and run-in periods
    fn new(index: usize, group_size: usize, periods: &'p Periods) -> Result<Self, DesignError> {
        let mut builder = Self {
            arm: StudyArm::new(&format!("ARM_{:02}", index), group_size),
            periods,
        };
        for period in [&periods.screen, &periods.run_in].into_iter().flatten() {
            builder.push_period(period)?;
        }
        Ok(builder)
    }

    fn next_cell_name(&self) -> String {
        format!("{}_CELL_{:02}", self.arm.name, self.arm.len())
    }

    fn push(&mut self, cell: StudyCell, plan: Option<SampleAndAssayPlan>) -> Result<(), DesignError> {
        self.arm.add_item(cell, plan)
    }

    fn push_period(&mut self, (element, plan): &PlannedPeriod) -> Result<(), DesignError> {
        let cell = StudyCell::with_elements(&self.next_cell_name(), [element.clone().into()])?;
        self.push(cell, plan.clone())
    }

    fn push_treatment(&mut self, (treatment, plan): &PlannedTreatment) -> Result<(), DesignError> {
        let cell = StudyCell::with_elements(&self.next_cell_name(), [treatment.clone().into()])?;
        self.push(cell, plan.clone())
    }

    fn push_sequence<'t>(
        &mut self,
        treatments: impl Iterator<Item = &'t PlannedTreatment>,
    ) -> Result<(), DesignError> {
        let periods = self.periods;
        for (i, treatment) in treatments.enumerate() {
            if i > 0 {
                if let Some(washout) = &periods.washout {
                    self.push_period(washout)?;
                }
            }
            self.push_treatment(treatment)?;
        }
        Ok(())
    }

    /// Close the arm with the follow-up period
    fn finish(mut self) -> Result<StudyArm, DesignError> {
        let periods = self.periods;
        if let Some(follow_up) = &periods.follow_up {
            self.push_period(follow_up)?;
        }
        Ok(self.arm)
    }
}

/// Every ordering of `0..n`, in lexicographic order
fn permutations(n: usize) -> Vec<Vec<usize>> {
    fn extend(prefix: &mut Vec<usize>, n: usize, out: &mut Vec<Vec<usize>>) {
        if prefix.len() == n {
            out.push(prefix.clone());
            return;
        }
        for i in 0..n {
            if !prefix.contains(&i) {
                prefix.push(i);
                extend(prefix, n, out);
                prefix.pop();
            }
        }
    }
    let mut out = Vec::new();
    extend(&mut Vec::with_capacity(n), n, &mut out);
    out
}
