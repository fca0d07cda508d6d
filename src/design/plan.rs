//! Sample-and-assay plans: what is sampled from each subject and which
//! workflows the samples go through

use std::fmt;

use crate::model::{Characteristic, MaterialKind, OntologyAnnotation, ParameterValue};

use super::assay_graph::AssayGraph;
use super::DesignError;

/// Kind of entity a product node stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductType {
    /// Study subject
    Source,
    /// Sample taken from a subject
    Sample,
    /// Extract of a sample
    Extract,
    /// Labeled extract
    LabeledExtract,
    /// Data file produced by a protocol
    DataFile,
}

impl ProductType {
    /// Material kind generated for this node type, `None` for data files
    pub fn material_kind(&self) -> Option<MaterialKind> {
        match self {
            ProductType::Source => Some(MaterialKind::Source),
            ProductType::Sample => Some(MaterialKind::Sample),
            ProductType::Extract => Some(MaterialKind::Extract),
            ProductType::LabeledExtract => Some(MaterialKind::LabeledExtract),
            ProductType::DataFile => None,
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProductType::Source => "source",
            ProductType::Sample => "sample",
            ProductType::Extract => "extract",
            ProductType::LabeledExtract => "labeled extract",
            ProductType::DataFile => "data file",
        })
    }
}

/// A material or data file template in a plan or assay graph
#[derive(Debug, Clone, PartialEq)]
pub struct ProductNode {
    /// Identifier, unique within its graph or plan
    pub id: String,
    /// What the node generates
    pub node_type: ProductType,
    /// Name, used to mint the names of generated data files
    pub name: String,
    /// Characteristics given to every generated material
    pub characteristics: Vec<Characteristic>,
    size: usize,
    /// File extension of generated data files, without the dot
    pub extension: Option<String>,
}

impl ProductNode {
    /// Create a node generating `size` entities per input
    pub fn new(
        id: &str,
        node_type: ProductType,
        name: &str,
        size: usize,
    ) -> Result<Self, DesignError> {
        let mut node = Self {
            id: id.to_string(),
            node_type,
            name: name.to_string(),
            characteristics: Vec::new(),
            size: 1,
            extension: None,
        };
        node.set_size(size)?;
        Ok(node)
    }

    /// Number of entities generated per input
    pub fn size(&self) -> usize {
        self.size
    }

    /// Change the number of entities generated per input
    pub fn set_size(&mut self, size: usize) -> Result<(), DesignError> {
        if size == 0 {
            return Err(DesignError::InvalidAttribute(format!(
                "size of product node {} must be a positive integer",
                self.id
            )));
        }
        self.size = size;
        Ok(())
    }

    /// Add a characteristic
    pub fn with_characteristic(mut self, characteristic: impl Into<Characteristic>) -> Self {
        self.characteristics.push(characteristic.into());
        self
    }

    /// Set the extension of generated data files
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = Some(extension.trim_start_matches('.').to_string());
        self
    }

    /// Term naming the kind of sample: the value of the first characteristic
    pub(crate) fn type_term(&self) -> String {
        self.characteristics
            .first()
            .map(|c| c.value.to_string())
            .unwrap_or_else(|| self.name.clone())
    }
}

/// A protocol step template in an assay graph
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolNode {
    /// Identifier, unique within its graph
    pub id: String,
    /// Name of the protocol executed
    pub name: String,
    /// Type of the protocol executed
    pub protocol_type: OntologyAnnotation,
    /// Parameter values given to every generated process
    pub parameter_values: Vec<ParameterValue>,
    replicates: usize,
}

impl ProtocolNode {
    /// Create a node generating one process per input
    pub fn new(id: &str, name: &str, protocol_type: impl Into<OntologyAnnotation>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            protocol_type: protocol_type.into(),
            parameter_values: Vec::new(),
            replicates: 1,
        }
    }

    /// Number of processes generated per input
    pub fn replicates(&self) -> usize {
        self.replicates
    }

    /// Set the number of processes generated per input
    pub fn with_replicates(mut self, replicates: usize) -> Result<Self, DesignError> {
        if replicates == 0 {
            return Err(DesignError::InvalidAttribute(format!(
                "Replicates must be a positive integer. {} was supplied.",
                replicates
            )));
        }
        self.replicates = replicates;
        Ok(self)
    }

    /// Add a parameter value
    pub fn with_parameter_value(mut self, value: ParameterValue) -> Self {
        self.parameter_values.push(value);
        self
    }
}

/// A node of an assay graph
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceNode {
    /// Protocol application
    Protocol(ProtocolNode),
    /// Material or data product
    Product(ProductNode),
}

impl SequenceNode {
    /// Identifier of the node
    pub fn id(&self) -> &str {
        match self {
            SequenceNode::Protocol(p) => &p.id,
            SequenceNode::Product(p) => &p.id,
        }
    }

    /// Number of entities generated per input
    pub fn multiplicity(&self) -> usize {
        match self {
            SequenceNode::Protocol(p) => p.replicates(),
            SequenceNode::Product(p) => p.size(),
        }
    }

    /// Whether the node is a protocol step
    pub fn is_protocol(&self) -> bool {
        matches!(self, SequenceNode::Protocol(_))
    }
}

impl From<ProtocolNode> for SequenceNode {
    fn from(node: ProtocolNode) -> Self {
        SequenceNode::Protocol(node)
    }
}

impl From<ProductNode> for SequenceNode {
    fn from(node: ProductNode) -> Self {
        SequenceNode::Product(node)
    }
}

/// Quality-control samples run alongside the real samples of an assay
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityControl {
    /// Samples run before the first real sample
    pub pre_run: Option<ProductNode>,
    /// Samples run after the last real sample
    pub post_run: Option<ProductNode>,
    interspersed: Vec<(ProductNode, usize)>,
}

impl QualityControl {
    /// Create a plan with optional pre-run and post-run batches
    pub fn new(
        pre_run: Option<ProductNode>,
        post_run: Option<ProductNode>,
    ) -> Result<Self, DesignError> {
        for node in pre_run.iter().chain(&post_run) {
            check_sample_node(node)?;
        }
        Ok(Self {
            pre_run,
            post_run,
            interspersed: Vec::new(),
        })
    }

    /// Run one sample of `node` after every `interval` real samples
    pub fn add_interspersed(
        &mut self,
        node: ProductNode,
        interval: usize,
    ) -> Result<(), DesignError> {
        check_sample_node(&node)?;
        if interval == 0 {
            return Err(DesignError::InvalidAttribute(
                "Sample type interval must be a positive integer".to_string(),
            ));
        }
        self.interspersed.push((node, interval));
        Ok(())
    }

    /// Interspersed sample nodes and their intervals
    pub fn interspersed(&self) -> &[(ProductNode, usize)] {
        &self.interspersed
    }
}

fn check_sample_node(node: &ProductNode) -> Result<(), DesignError> {
    if node.node_type != ProductType::Sample {
        return Err(DesignError::InvalidAttribute(format!(
            "quality-control node {} must be a sample node, not a {} node",
            node.id, node.node_type
        )));
    }
    Ok(())
}

/// Sample types collected in a cell and the assays they feed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleAndAssayPlan {
    /// Name of the plan
    pub name: String,
    sample_plan: Vec<ProductNode>,
    assay_plan: Vec<AssayGraph>,
    sample_to_assay_map: Vec<(String, String)>,
}

impl SampleAndAssayPlan {
    /// Create an empty plan
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Sample types collected, in insertion order
    pub fn sample_plan(&self) -> &[ProductNode] {
        &self.sample_plan
    }

    /// Assay graphs, in insertion order
    pub fn assay_plan(&self) -> &[AssayGraph] {
        &self.assay_plan
    }

    /// Declare a sample type
    pub fn add_sample_type(&mut self, node: ProductNode) -> Result<(), DesignError> {
        if node.node_type != ProductType::Sample {
            return Err(DesignError::InvalidAttribute(format!(
                "sample plan node {} must be a sample node, not a {} node",
                node.id, node.node_type
            )));
        }
        if self.sample_plan.iter().any(|s| s.id == node.id) {
            return Err(DesignError::Duplicate {
                kind: "sample type",
                name: node.id,
            });
        }
        self.sample_plan.push(node);
        Ok(())
    }

    /// Declare an assay graph
    pub fn add_assay_graph(&mut self, graph: AssayGraph) -> Result<(), DesignError> {
        if self.assay_plan.iter().any(|g| g.id == graph.id) {
            return Err(DesignError::Duplicate {
                kind: "assay graph",
                name: graph.id,
            });
        }
        self.assay_plan.push(graph);
        Ok(())
    }

    /// Send samples of a declared type through a declared assay graph
    pub fn map_sample_to_assay(&mut self, sample_id: &str, assay_id: &str) -> Result<(), DesignError> {
        if !self.sample_plan.iter().any(|s| s.id == sample_id) {
            return Err(DesignError::UnknownNode {
                kind: "sample type",
                name: sample_id.to_string(),
            });
        }
        if !self.assay_plan.iter().any(|g| g.id == assay_id) {
            return Err(DesignError::UnknownNode {
                kind: "assay graph",
                name: assay_id.to_string(),
            });
        }
        let pair = (sample_id.to_string(), assay_id.to_string());
        if !self.sample_to_assay_map.contains(&pair) {
            self.sample_to_assay_map.push(pair);
        }
        Ok(())
    }

    /// Whether samples of the given type feed the given assay graph
    pub fn is_mapped(&self, sample_id: &str, assay_id: &str) -> bool {
        self.sample_to_assay_map
            .iter()
            .any(|(s, a)| s == sample_id && a == assay_id)
    }
}
