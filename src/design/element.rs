//! Elements of a study cell: treatments and non-treatment periods

use std::fmt;

use crate::model::{FactorValue, OntologyAnnotation, StudyFactor, Value};

/// Name of the factor carrying the duration of every element
pub const DURATION_FACTOR: &str = "DURATION";
/// Name of the factor carrying the perturbation agent of a treatment
pub const AGENT_FACTOR: &str = "AGENT";
/// Name of the factor carrying the intensity of a treatment
pub const INTENSITY_FACTOR: &str = "INTENSITY";

/// The three factors a treatment is built from, with their factor types
pub fn base_factors() -> [StudyFactor; 3] {
    [
        StudyFactor::new(AGENT_FACTOR, "perturbation agent"),
        StudyFactor::new(INTENSITY_FACTOR, "intensity"),
        StudyFactor::new(DURATION_FACTOR, "time"),
    ]
}

/// Kind of a period in which no treatment is given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NonTreatmentType {
    /// Subject screening before enrolment
    Screen,
    /// Run-in before the first treatment
    RunIn,
    /// Washout between treatments
    Washout,
    /// Follow-up after the last treatment
    FollowUp,
    /// Observation without intervention
    ObservationPeriod,
}

impl NonTreatmentType {
    /// Term used in generated metadata
    pub fn term(&self) -> &'static str {
        match self {
            NonTreatmentType::Screen => "screen",
            NonTreatmentType::RunIn => "run-in",
            NonTreatmentType::Washout => "washout",
            NonTreatmentType::FollowUp => "follow-up",
            NonTreatmentType::ObservationPeriod => "observation period",
        }
    }
}

impl fmt::Display for NonTreatmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.term())
    }
}

/// Kind of intervention a treatment applies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InterventionType {
    /// Drug or other chemical agent
    Chemical,
    /// Behavioural intervention
    Behavioural,
    /// Surgical procedure
    Surgical,
    /// Biological agent
    Biological,
    /// Radiation
    Radiological,
    /// Diet
    Dietary,
    /// Not stated
    #[default]
    Unspecified,
}

impl InterventionType {
    /// Term used in generated metadata
    pub fn term(&self) -> &'static str {
        match self {
            InterventionType::Chemical => "chemical intervention",
            InterventionType::Behavioural => "behavioural intervention",
            InterventionType::Surgical => "surgical intervention",
            InterventionType::Biological => "biological intervention",
            InterventionType::Radiological => "radiological intervention",
            InterventionType::Dietary => "dietary intervention",
            InterventionType::Unspecified => "unspecified intervention",
        }
    }
}

/// A period without intervention and its duration
#[derive(Debug, Clone, PartialEq)]
pub struct NonTreatment {
    /// Kind of period
    pub kind: NonTreatmentType,
    /// Duration, as a value of the duration factor
    pub duration: FactorValue,
}

impl NonTreatment {
    /// Create a period lasting `duration` in an optional unit
    pub fn new(kind: NonTreatmentType, duration: f64, unit: Option<OntologyAnnotation>) -> Self {
        let mut value = FactorValue::new(DURATION_FACTOR, duration);
        value.unit = unit;
        Self {
            kind,
            duration: value,
        }
    }
}

/// An intervention described by a set of factor values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Treatment {
    /// Kind of intervention
    pub intervention: InterventionType,
    /// Factor values, typically agent, intensity and duration
    pub factor_values: Vec<FactorValue>,
}

impl Treatment {
    /// Create a treatment from its factor values
    pub fn new(intervention: InterventionType, factor_values: Vec<FactorValue>) -> Self {
        Self {
            intervention,
            factor_values,
        }
    }

    /// The duration factor value, if the treatment has one
    pub fn duration(&self) -> Option<&FactorValue> {
        self.factor_values
            .iter()
            .find(|fv| fv.factor_name == DURATION_FACTOR)
    }

    /// Value of the named factor
    pub fn factor_value(&self, factor_name: &str) -> Option<&Value> {
        self.factor_values
            .iter()
            .find(|fv| fv.factor_name == factor_name)
            .map(|fv| &fv.value)
    }
}

/// A single step of a study cell
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// An intervention
    Treatment(Treatment),
    /// A period without intervention
    NonTreatment(NonTreatment),
}

impl Element {
    /// Kind of the period, `None` for treatments
    pub fn non_treatment_type(&self) -> Option<NonTreatmentType> {
        match self {
            Element::NonTreatment(nt) => Some(nt.kind),
            Element::Treatment(_) => None,
        }
    }

    /// Whether this element is a period of the given kind
    pub fn is(&self, kind: NonTreatmentType) -> bool {
        self.non_treatment_type() == Some(kind)
    }

    /// Whether this element is a treatment
    pub fn is_treatment(&self) -> bool {
        matches!(self, Element::Treatment(_))
    }

    /// Factor values the element contributes to samples taken during it
    pub fn factor_values(&self) -> Vec<&FactorValue> {
        match self {
            Element::Treatment(t) => t.factor_values.iter().collect(),
            Element::NonTreatment(nt) => vec![&nt.duration],
        }
    }
}

impl From<Treatment> for Element {
    fn from(treatment: Treatment) -> Self {
        Element::Treatment(treatment)
    }
}

impl From<NonTreatment> for Element {
    fn from(non_treatment: NonTreatment) -> Self {
        Element::NonTreatment(non_treatment)
    }
}
