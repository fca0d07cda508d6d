use super::{Comment, OntologyAnnotation};

/// A named variable of a protocol
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtocolParameter {
    /// Parameter name term
    pub name: OntologyAnnotation,
}

impl ProtocolParameter {
    /// Create a parameter with a plain name
    pub fn new(name: &str) -> Self {
        Self {
            name: OntologyAnnotation::new(name),
        }
    }
}

/// Instrument, software or reagent used by a protocol
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtocolComponent {
    /// Component name
    pub name: String,
    /// Component type term
    pub component_type: OntologyAnnotation,
}

/// A protocol declared by a study and referenced by name from processes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Protocol {
    /// Name, unique within the study
    pub name: String,
    /// Protocol type term (e.g. "sample collection")
    pub protocol_type: OntologyAnnotation,
    /// Free-text description
    pub description: String,
    /// Location of the full protocol text
    pub uri: String,
    /// Protocol version
    pub version: String,
    /// Declared parameters
    pub parameters: Vec<ProtocolParameter>,
    /// Declared components
    pub components: Vec<ProtocolComponent>,
    /// Attached comments
    pub comments: Vec<Comment>,
}

/// Name of the protocol inserted where a table omits a `Protocol REF`
pub const UNKNOWN_PROTOCOL: &str = "unknown";

impl Protocol {
    /// Create a protocol with a name and a type term
    pub fn new(name: &str, protocol_type: impl Into<OntologyAnnotation>) -> Self {
        Self {
            name: name.to_string(),
            protocol_type: protocol_type.into(),
            ..Default::default()
        }
    }

    /// The placeholder protocol used for implicit `Protocol REF` columns
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_PROTOCOL.to_string(),
            description:
                "This protocol was auto-generated where a protocol could not be determined."
                    .to_string(),
            ..Default::default()
        }
    }

    /// Declare a parameter by name
    pub fn with_parameter(mut self, name: &str) -> Self {
        self.parameters.push(ProtocolParameter::new(name));
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Look up a declared parameter by its name term
    pub fn parameter(&self, name: &str) -> Option<&ProtocolParameter> {
        self.parameters.iter().find(|p| p.name.term == name)
    }
}

/// An experimental independent variable declared by a study
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudyFactor {
    /// Name, unique within the study
    pub name: String,
    /// Factor type term
    pub factor_type: OntologyAnnotation,
    /// Attached comments
    pub comments: Vec<Comment>,
}

impl StudyFactor {
    /// Create a factor
    pub fn new(name: &str, factor_type: impl Into<OntologyAnnotation>) -> Self {
        Self {
            name: name.to_string(),
            factor_type: factor_type.into(),
            comments: Vec::new(),
        }
    }
}
