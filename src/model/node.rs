//! Nodes of the provenance graph: materials, data files and processes.

use std::fmt;

use super::{Comment, ModelError, OntologyAnnotation, Value};

/// Opaque identifier of a material, data file or process within a study
///
/// Readers and the design generator synthesize identifiers of the form
/// `<kind>/<name>` for materials and data files and `process/<n>` for
/// processes, so equal content loaded from either surface form compares equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    /// Wrap an arbitrary identifier string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier of a material of the given kind
    pub fn material(kind: MaterialKind, name: &str) -> Self {
        Self(format!("{}/{}", kind.id_prefix(), name))
    }

    /// Identifier of a data file
    pub fn data_file(name: &str) -> Self {
        Self(format!("data/{}", name))
    }

    /// Identifier of the n-th process of a process sequence
    pub fn process(index: usize) -> Self {
        Self(format!("process/{}", index))
    }

    /// The raw identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind tag of a material node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    /// Study subject or biological source
    Source,
    /// Sample taken from a source
    Sample,
    /// Extract prepared from a sample
    Extract,
    /// Labeled extract
    LabeledExtract,
}

impl MaterialKind {
    /// Identity column label in the tabular form
    pub fn column_label(&self) -> &'static str {
        match self {
            MaterialKind::Source => "Source Name",
            MaterialKind::Sample => "Sample Name",
            MaterialKind::Extract => "Extract Name",
            MaterialKind::LabeledExtract => "Labeled Extract Name",
        }
    }

    /// Inverse of [`MaterialKind::column_label`]
    pub fn from_column_label(label: &str) -> Option<Self> {
        match label {
            "Source Name" => Some(MaterialKind::Source),
            "Sample Name" => Some(MaterialKind::Sample),
            "Extract Name" => Some(MaterialKind::Extract),
            "Labeled Extract Name" => Some(MaterialKind::LabeledExtract),
            _ => None,
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            MaterialKind::Source => "source",
            MaterialKind::Sample => "sample",
            MaterialKind::Extract => "extract",
            MaterialKind::LabeledExtract => "labeledextract",
        }
    }
}

/// Category, value and optional unit describing a property of a material
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Characteristic {
    /// What is being described (e.g. "organism")
    pub category: OntologyAnnotation,
    /// The description itself
    pub value: Value,
    /// Unit of a numeric value
    pub unit: Option<OntologyAnnotation>,
}

impl Characteristic {
    /// Create a characteristic
    pub fn new(category: impl Into<OntologyAnnotation>, value: impl Into<Value>) -> Self {
        Self {
            category: category.into(),
            value: value.into(),
            unit: None,
        }
    }

    /// Attach a unit
    pub fn with_unit(mut self, unit: OntologyAnnotation) -> Self {
        self.unit = Some(unit);
        self
    }
}

/// A bare string is taken as the category term of an empty characteristic.
impl From<&str> for Characteristic {
    fn from(category: &str) -> Self {
        Self::new(category, Value::default())
    }
}

/// Realization of a study factor on a sample, referencing the factor by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactorValue {
    /// Name of the study factor
    pub factor_name: String,
    /// Factor level
    pub value: Value,
    /// Unit of a numeric level
    pub unit: Option<OntologyAnnotation>,
}

impl FactorValue {
    /// Create a factor value
    pub fn new(factor_name: &str, value: impl Into<Value>) -> Self {
        Self {
            factor_name: factor_name.to_string(),
            value: value.into(),
            unit: None,
        }
    }

    /// Attach a unit
    pub fn with_unit(mut self, unit: OntologyAnnotation) -> Self {
        self.unit = Some(unit);
        self
    }
}

/// Realization of a protocol parameter in a process, referencing it by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterValue {
    /// Term of the protocol parameter
    pub parameter_name: String,
    /// Parameter setting
    pub value: Value,
    /// Unit of a numeric setting
    pub unit: Option<OntologyAnnotation>,
}

impl ParameterValue {
    /// Create a parameter value
    pub fn new(parameter_name: &str, value: impl Into<Value>) -> Self {
        Self {
            parameter_name: parameter_name.to_string(),
            value: value.into(),
            unit: None,
        }
    }

    /// Attach a unit
    pub fn with_unit(mut self, unit: OntologyAnnotation) -> Self {
        self.unit = Some(unit);
        self
    }
}

/// A source, sample, extract or labeled extract
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Identifier used by process inputs/outputs
    pub id: NodeId,
    /// Name as written in the identity column
    pub name: String,
    /// Kind tag
    pub kind: MaterialKind,
    /// Characteristics in input order
    pub characteristics: Vec<Characteristic>,
    /// Factor values, only for samples
    pub factor_values: Vec<FactorValue>,
    /// Sources this sample derives from, only for samples
    pub derives_from: Vec<NodeId>,
    /// Attached comments
    pub comments: Vec<Comment>,
}

impl Material {
    /// Create a material; its identifier is derived from kind and name
    pub fn new(kind: MaterialKind, name: &str) -> Self {
        Self {
            id: NodeId::material(kind, name),
            name: name.to_string(),
            kind,
            characteristics: Vec::new(),
            factor_values: Vec::new(),
            derives_from: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Create a source
    pub fn source(name: &str) -> Self {
        Self::new(MaterialKind::Source, name)
    }

    /// Create a sample
    pub fn sample(name: &str) -> Self {
        Self::new(MaterialKind::Sample, name)
    }

    /// Add a characteristic, given either as a full record or a category term
    pub fn with_characteristic(mut self, characteristic: impl Into<Characteristic>) -> Self {
        self.characteristics.push(characteristic.into());
        self
    }

    /// Add a factor value; rejected on anything but a sample
    pub fn add_factor_value(&mut self, factor_value: FactorValue) -> Result<(), ModelError> {
        if self.kind != MaterialKind::Sample {
            return Err(ModelError::InvalidAttribute(format!(
                "factor values are only allowed on samples, not on {}",
                self.kind.column_label()
            )));
        }
        self.factor_values.push(factor_value);
        Ok(())
    }

    /// Record that this sample derives from a source
    pub fn add_derives_from(&mut self, source: &NodeId) -> Result<(), ModelError> {
        if self.kind != MaterialKind::Sample {
            return Err(ModelError::InvalidAttribute(format!(
                "derives-from is only allowed on samples, not on {}",
                self.kind.column_label()
            )));
        }
        if !self.derives_from.contains(source) {
            self.derives_from.push(source.clone());
        }
        Ok(())
    }

    /// Find a characteristic by category term
    pub fn characteristic(&self, category: &str) -> Option<&Characteristic> {
        self.characteristics.iter().find(|c| c.category.term == category)
    }
}

/// Kind of data a data file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFileLabel {
    /// Raw Data File
    RawData,
    /// Raw Spectral Data File
    RawSpectralData,
    /// Derived Spectral Data File
    DerivedSpectralData,
    /// Derived Array Data File
    DerivedArrayData,
    /// Derived Array Data Matrix File
    DerivedArrayDataMatrix,
    /// Array Data File
    ArrayData,
    /// Protein Assignment File
    ProteinAssignment,
    /// Peptide Assignment File
    PeptideAssignment,
    /// Post Translational Modification Assignment File
    PtmAssignment,
    /// Acquisition Parameter Data File
    AcquisitionParameterData,
    /// Free Induction Decay Data File
    FreeInductionDecayData,
    /// Image File
    Image,
    /// Derived Data File
    DerivedData,
    /// Metabolite Assignment File
    MetaboliteAssignment,
    /// Metabolite Identification File
    MetaboliteIdentification,
}

impl DataFileLabel {
    /// Every label, in the order used for column lookup
    pub const ALL: [DataFileLabel; 15] = [
        DataFileLabel::RawData,
        DataFileLabel::RawSpectralData,
        DataFileLabel::DerivedSpectralData,
        DataFileLabel::DerivedArrayData,
        DataFileLabel::DerivedArrayDataMatrix,
        DataFileLabel::ArrayData,
        DataFileLabel::ProteinAssignment,
        DataFileLabel::PeptideAssignment,
        DataFileLabel::PtmAssignment,
        DataFileLabel::AcquisitionParameterData,
        DataFileLabel::FreeInductionDecayData,
        DataFileLabel::Image,
        DataFileLabel::DerivedData,
        DataFileLabel::MetaboliteAssignment,
        DataFileLabel::MetaboliteIdentification,
    ];

    /// Column label in the tabular form, also the `type` in the document form
    pub fn label(&self) -> &'static str {
        match self {
            DataFileLabel::RawData => "Raw Data File",
            DataFileLabel::RawSpectralData => "Raw Spectral Data File",
            DataFileLabel::DerivedSpectralData => "Derived Spectral Data File",
            DataFileLabel::DerivedArrayData => "Derived Array Data File",
            DataFileLabel::DerivedArrayDataMatrix => "Derived Array Data Matrix File",
            DataFileLabel::ArrayData => "Array Data File",
            DataFileLabel::ProteinAssignment => "Protein Assignment File",
            DataFileLabel::PeptideAssignment => "Peptide Assignment File",
            DataFileLabel::PtmAssignment => "Post Translational Modification Assignment File",
            DataFileLabel::AcquisitionParameterData => "Acquisition Parameter Data File",
            DataFileLabel::FreeInductionDecayData => "Free Induction Decay Data File",
            DataFileLabel::Image => "Image File",
            DataFileLabel::DerivedData => "Derived Data File",
            DataFileLabel::MetaboliteAssignment => "Metabolite Assignment File",
            DataFileLabel::MetaboliteIdentification => "Metabolite Identification File",
        }
    }

    /// Inverse of [`DataFileLabel::label`]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.label() == label)
    }
}

impl fmt::Display for DataFileLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A file produced by a process
#[derive(Debug, Clone, PartialEq)]
pub struct DataFile {
    /// Identifier used by process inputs/outputs
    pub id: NodeId,
    /// File name
    pub name: String,
    /// Data kind
    pub label: DataFileLabel,
    /// Attached comments
    pub comments: Vec<Comment>,
}

impl DataFile {
    /// Create a data file; its identifier is derived from the file name
    pub fn new(label: DataFileLabel, name: &str) -> Self {
        Self {
            id: NodeId::data_file(name),
            name: name.to_string(),
            label,
            comments: Vec::new(),
        }
    }
}

/// One application of a protocol
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Process {
    /// Identifier, unique within the enclosing process sequence
    pub id: NodeId,
    /// Name from an assay-name column, or empty
    pub name: String,
    /// Label of the assay-name column the name came from, kept only when it
    /// differs from the label chosen by protocol and technology type
    pub name_label: Option<String>,
    /// Name of the protocol executed, declared in the enclosing study
    pub executes_protocol: String,
    /// Date the protocol was performed
    pub date: Option<String>,
    /// Who performed it
    pub performer: Option<String>,
    /// Parameter settings
    pub parameter_values: Vec<ParameterValue>,
    /// Array design used by a hybridization
    pub array_design_ref: Option<String>,
    /// Ordered inputs
    pub inputs: Vec<NodeId>,
    /// Ordered outputs
    pub outputs: Vec<NodeId>,
    /// Preceding process on a linear chain
    pub previous_process: Option<NodeId>,
    /// Following process on a linear chain
    pub next_process: Option<NodeId>,
    /// Attached comments
    pub comments: Vec<Comment>,
}

impl Process {
    /// Create a process executing the named protocol
    pub fn new(id: NodeId, protocol: &str) -> Self {
        Self {
            id,
            executes_protocol: protocol.to_string(),
            ..Default::default()
        }
    }

    /// Append an input unless already present
    pub fn add_input(&mut self, node: &NodeId) -> Result<(), ModelError> {
        if self.outputs.contains(node) {
            return Err(ModelError::InvalidEdge(format!(
                "{} is already an output of process {}",
                node, self.id
            )));
        }
        if !self.inputs.contains(node) {
            self.inputs.push(node.clone());
        }
        Ok(())
    }

    /// Append an output unless already present
    pub fn add_output(&mut self, node: &NodeId) -> Result<(), ModelError> {
        if self.inputs.contains(node) {
            return Err(ModelError::InvalidEdge(format!(
                "{} is already an input of process {}",
                node, self.id
            )));
        }
        if !self.outputs.contains(node) {
            self.outputs.push(node.clone());
        }
        Ok(())
    }

    /// Replace all parameter values
    pub fn set_parameter_values(&mut self, values: impl IntoIterator<Item = ParameterValue>) {
        self.parameter_values = values.into_iter().collect();
    }
}
