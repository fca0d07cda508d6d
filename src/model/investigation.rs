use super::graph::ProvenanceGraph;
use super::{
    Comment, DataFile, Material, ModelError, NodeId, OntologyAnnotation, OntologySource,
    Process, Protocol, StudyFactor,
};

/// A publication attached to an investigation or a study
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Publication {
    /// PubMed identifier
    pub pubmed_id: String,
    /// Digital object identifier
    pub doi: String,
    /// Comma-separated author list
    pub author_list: String,
    /// Publication title
    pub title: String,
    /// Publication status term
    pub status: OntologyAnnotation,
    /// Attached comments
    pub comments: Vec<Comment>,
}

/// A contact person
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    /// Last name
    pub last_name: String,
    /// First name
    pub first_name: String,
    /// Middle initials
    pub mid_initials: String,
    /// E-mail address
    pub email: String,
    /// Phone number
    pub phone: String,
    /// Fax number
    pub fax: String,
    /// Postal address
    pub address: String,
    /// Affiliation
    pub affiliation: String,
    /// Role terms
    pub roles: Vec<OntologyAnnotation>,
    /// Attached comments
    pub comments: Vec<Comment>,
}

/// Top-level container of studies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Investigation {
    /// Investigation identifier
    pub identifier: String,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Submission date
    pub submission_date: String,
    /// Public release date
    pub public_release_date: String,
    /// Declared controlled vocabularies
    pub ontology_sources: Vec<OntologySource>,
    /// Publications
    pub publications: Vec<Publication>,
    /// Contacts
    pub contacts: Vec<Person>,
    /// Studies, in declaration order
    pub studies: Vec<Study>,
    /// Attached comments
    pub comments: Vec<Comment>,
}

impl Investigation {
    /// Create an investigation with an identifier
    pub fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            ..Default::default()
        }
    }

    /// Look up an ontology source by name
    pub fn ontology_source(&self, name: &str) -> Option<&OntologySource> {
        self.ontology_sources.iter().find(|s| s.name == name)
    }

    /// Declare an ontology source; names must be unique
    pub fn add_ontology_source(&mut self, source: OntologySource) -> Result<(), ModelError> {
        if self.ontology_source(&source.name).is_some() {
            return Err(ModelError::Duplicate {
                kind: "ontology source",
                name: source.name,
            });
        }
        self.ontology_sources.push(source);
        Ok(())
    }
}

/// A study: declarations, materials, the sampling process sequence and assays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Study {
    /// Study identifier
    pub identifier: String,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Submission date
    pub submission_date: String,
    /// Public release date
    pub public_release_date: String,
    /// Name of the study table (`s_*.txt`)
    pub filename: String,
    /// Study design descriptor terms
    pub design_descriptors: Vec<OntologyAnnotation>,
    /// Publications
    pub publications: Vec<Publication>,
    /// Contacts
    pub contacts: Vec<Person>,
    /// Declared factors
    pub factors: Vec<StudyFactor>,
    /// Declared protocols
    pub protocols: Vec<Protocol>,
    /// Source materials
    pub sources: Vec<Material>,
    /// Sample materials
    pub samples: Vec<Material>,
    /// Extracts or labeled extracts appearing in the study table
    pub other_materials: Vec<Material>,
    /// Processes of the study table
    pub process_sequence: Vec<Process>,
    /// Assays
    pub assays: Vec<Assay>,
    /// Attached comments
    pub comments: Vec<Comment>,
}

impl Study {
    /// Create a study with identifier and table filename
    pub fn new(identifier: &str, filename: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            filename: filename.to_string(),
            ..Default::default()
        }
    }

    /// Look up a declared protocol by name
    pub fn protocol(&self, name: &str) -> Option<&Protocol> {
        self.protocols.iter().find(|p| p.name == name)
    }

    /// Declare a protocol; names must be unique
    pub fn add_protocol(&mut self, protocol: Protocol) -> Result<(), ModelError> {
        if self.protocol(&protocol.name).is_some() {
            return Err(ModelError::Duplicate {
                kind: "protocol",
                name: protocol.name,
            });
        }
        self.protocols.push(protocol);
        Ok(())
    }

    /// Look up a declared factor by name
    pub fn factor(&self, name: &str) -> Option<&StudyFactor> {
        self.factors.iter().find(|f| f.name == name)
    }

    /// Declare a factor; names must be unique
    pub fn add_factor(&mut self, factor: StudyFactor) -> Result<(), ModelError> {
        if self.factor(&factor.name).is_some() {
            return Err(ModelError::Duplicate {
                kind: "factor",
                name: factor.name,
            });
        }
        self.factors.push(factor);
        Ok(())
    }

    /// Look up a sample by name
    pub fn sample_by_name(&self, name: &str) -> Option<&Material> {
        self.samples.iter().find(|s| s.name == name)
    }

    /// Look up any material of the study table by identifier
    pub fn material(&self, id: &NodeId) -> Option<&Material> {
        self.sources
            .iter()
            .chain(&self.samples)
            .chain(&self.other_materials)
            .find(|m| m.id == *id)
    }

    /// Every material of the study table, sources first
    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.sources
            .iter()
            .chain(&self.samples)
            .chain(&self.other_materials)
    }

    /// Provenance graph of the study process sequence
    pub fn graph(&self) -> Result<ProvenanceGraph, ModelError> {
        ProvenanceGraph::build(self.materials(), std::iter::empty(), &self.process_sequence)
    }

    /// Distinct characteristic categories used by the study materials
    pub fn characteristic_categories(&self) -> Vec<OntologyAnnotation> {
        characteristic_categories(self.materials())
    }

    /// Distinct units used by the study materials and processes
    pub fn unit_categories(&self) -> Vec<OntologyAnnotation> {
        unit_categories(self.materials(), &self.process_sequence)
    }
}

/// An assay: the measurement workflow applied to some of a study's samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assay {
    /// Measurement type term
    pub measurement_type: OntologyAnnotation,
    /// Technology type term
    pub technology_type: OntologyAnnotation,
    /// Technology platform
    pub technology_platform: String,
    /// Name of the assay table (`a_*.txt`)
    pub filename: String,
    /// Samples consumed by the assay
    pub samples: Vec<Material>,
    /// Extracts and labeled extracts
    pub other_materials: Vec<Material>,
    /// Data files produced
    pub data_files: Vec<DataFile>,
    /// Processes of the assay table
    pub process_sequence: Vec<Process>,
    /// Attached comments
    pub comments: Vec<Comment>,
}

impl Assay {
    /// Create an assay with a table filename
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            ..Default::default()
        }
    }

    /// Every material of the assay table, samples first
    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.samples.iter().chain(&self.other_materials)
    }

    /// Look up any material of the assay table by identifier
    pub fn material(&self, id: &NodeId) -> Option<&Material> {
        self.materials().find(|m| m.id == *id)
    }

    /// Look up a data file by identifier
    pub fn data_file(&self, id: &NodeId) -> Option<&DataFile> {
        self.data_files.iter().find(|d| d.id == *id)
    }

    /// Provenance graph of the assay process sequence
    pub fn graph(&self) -> Result<ProvenanceGraph, ModelError> {
        ProvenanceGraph::build(self.materials(), &self.data_files, &self.process_sequence)
    }

    /// Distinct characteristic categories used by the assay materials
    pub fn characteristic_categories(&self) -> Vec<OntologyAnnotation> {
        characteristic_categories(self.materials())
    }

    /// Distinct units used by the assay materials and processes
    pub fn unit_categories(&self) -> Vec<OntologyAnnotation> {
        unit_categories(self.materials(), &self.process_sequence)
    }
}

fn push_unique(list: &mut Vec<OntologyAnnotation>, item: &OntologyAnnotation) {
    if !list.contains(item) {
        list.push(item.clone());
    }
}

fn characteristic_categories<'a>(
    materials: impl Iterator<Item = &'a Material>,
) -> Vec<OntologyAnnotation> {
    let mut categories = Vec::new();
    for material in materials {
        for c in &material.characteristics {
            push_unique(&mut categories, &c.category);
        }
    }
    categories
}

fn unit_categories<'a>(
    materials: impl Iterator<Item = &'a Material>,
    processes: &[Process],
) -> Vec<OntologyAnnotation> {
    let mut units = Vec::new();
    for material in materials {
        let characteristic_units = material.characteristics.iter().filter_map(|c| c.unit.as_ref());
        let factor_units = material.factor_values.iter().filter_map(|f| f.unit.as_ref());
        for unit in characteristic_units.chain(factor_units) {
            push_unique(&mut units, unit);
        }
    }
    for process in processes {
        for unit in process.parameter_values.iter().filter_map(|p| p.unit.as_ref()) {
            push_unique(&mut units, unit);
        }
    }
    units
}
